//! End-to-end import scenarios against the in-memory store.

use agsload_core::memory::StoreOp;
use agsload_core::{
    import_document, CampaignId, CrsRegistry, CrsRole, EpsgCode, ExchangeDocument, ImportConfig,
    LoadError, Loader, MemoryStore, Point, Reprojector, Table, Value,
};

const BNG: EpsgCode = EpsgCode::new(27700);
const UTM30N: EpsgCode = EpsgCode::new(32630);
const WGS84: EpsgCode = EpsgCode::new(4326);

fn scenario_document() -> ExchangeDocument {
    ExchangeDocument::from_tables(vec![
        Table::from_records(
            "LOCA",
            vec![vec![
                ("LOCA_LOCX", Value::Real(100.0)),
                ("LOCA_LOCY", Value::Real(200.0)),
            ]],
        ),
        Table::from_records("SAMP", vec![vec![("SAMP_ID", Value::from("A1"))]]),
    ])
    .unwrap()
}

fn site_document() -> ExchangeDocument {
    ExchangeDocument::from_tables(vec![
        Table::from_records("PROJ", vec![vec![("PROJ_ID", Value::from("P-101"))]]),
        Table::from_records(
            "LOCA",
            vec![
                vec![
                    ("LOCA_ID", Value::from("BH1")),
                    ("LOCA_LOCX", Value::Real(451_200.5)),
                    ("LOCA_LOCY", Value::Real(206_100.25)),
                ],
                vec![
                    ("LOCA_ID", Value::from("BH2")),
                    ("LOCA_LOCX", Value::Integer(451_300)),
                    ("LOCA_LOCY", Value::Integer(206_050)),
                ],
            ],
        ),
        Table::from_records(
            "GEOL",
            vec![
                vec![("LOCA_ID", Value::from("BH1")), ("GEOL_TOP", Value::Real(0.0))],
                vec![("LOCA_ID", Value::from("BH1")), ("GEOL_TOP", Value::Real(1.2))],
                vec![("LOCA_ID", Value::from("BH2")), ("GEOL_TOP", Value::Real(0.0))],
            ],
        ),
    ])
    .unwrap()
}

struct NoCodes;

impl CrsRegistry for NoCodes {
    fn is_known_code(&self, _code: EpsgCode) -> bool {
        false
    }
}

#[test]
fn test_scenario_empty_destination() {
    let mut store = MemoryStore::new();
    let report = import_document(&mut store, &ImportConfig::new(BNG, "site"), scenario_document())
        .unwrap();

    assert_eq!(report.campaign_id.value(), 1);

    let loca = store.table("site", "loca").unwrap();
    assert_eq!(loca.num_rows(), 1);
    assert_eq!(loca.points(), &[Point::new(100.0, 10_200.0, BNG)]);
    assert_eq!(loca.column_values("campaign_id"), vec![Value::Integer(1)]);
    assert_eq!(loca.geometry.as_ref().unwrap().column, "geom");
    assert_eq!(loca.geometry.as_ref().unwrap().srid, Some(BNG));

    let samp = store.table("site", "samp").unwrap();
    assert_eq!(samp.num_rows(), 1);
    assert_eq!(samp.column_values("samp_id"), vec![Value::from("A1")]);
    assert_eq!(samp.column_values("campaign_id"), vec![Value::Integer(1)]);
    assert!(samp.geometry.is_none());
}

#[test]
fn test_scenario_existing_layer() {
    let mut store = MemoryStore::new();
    store.seed_location_layer("site", &[1, 3, 2]);

    let report = import_document(&mut store, &ImportConfig::new(BNG, "site"), scenario_document())
        .unwrap();
    assert_eq!(report.campaign_id.value(), 4);

    let loca = store.table("site", "loca").unwrap();
    assert_eq!(loca.num_rows(), 4);
    assert_eq!(loca.points().len(), 4);
    assert_eq!(loca.points().last(), Some(&Point::new(100.0, 10_200.0, BNG)));
    assert_eq!(
        store.table("site", "samp").unwrap().column_values("campaign_id"),
        vec![Value::Integer(4)]
    );
}

#[test]
fn test_explicit_campaign_id_wins() {
    let mut store = MemoryStore::new();
    store.seed_location_layer("site", &[50]);

    let config = ImportConfig::new(BNG, "site").with_campaign_id(CampaignId::new(42).unwrap());
    let report = import_document(&mut store, &config, scenario_document()).unwrap();

    assert_eq!(report.campaign_id.value(), 42);
    assert!(!store
        .operations()
        .iter()
        .any(|op| matches!(op, StoreOp::MaxValue { .. } | StoreOp::TableExists { .. })));
}

#[test]
fn test_invalid_target_touches_nothing() {
    let mut store = MemoryStore::new();
    let config = ImportConfig::new(EpsgCode::new(999_999), "site");

    match import_document(&mut store, &config, scenario_document()) {
        Err(LoadError::InvalidReferenceSystem { role, code }) => {
            assert_eq!(role, CrsRole::Target);
            assert_eq!(code.value(), 999_999);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(store.operations().is_empty());
}

#[test]
fn test_invalid_source_touches_nothing() {
    let mut store = MemoryStore::new();
    let config = ImportConfig::new(BNG, "site").with_source_crs(EpsgCode::new(1));

    let err = import_document(&mut store, &config, scenario_document()).unwrap_err();
    assert!(matches!(
        err,
        LoadError::InvalidReferenceSystem {
            role: CrsRole::Source,
            ..
        }
    ));
    assert!(store.operations().is_empty());
}

#[test]
fn test_custom_registry_is_consulted() {
    let mut store = MemoryStore::new();
    let mut loader = Loader::with_registry(&mut store, NoCodes);
    let err = loader
        .import(&ImportConfig::new(BNG, "site"), scenario_document())
        .unwrap_err();
    assert!(matches!(err, LoadError::InvalidReferenceSystem { .. }));
    assert!(store.operations().is_empty());
}

#[test]
fn test_same_source_and_target_is_identity() {
    let mut with_source = MemoryStore::new();
    let mut without_source = MemoryStore::new();

    let config = ImportConfig::new(BNG, "site");
    import_document(&mut without_source, &config, site_document()).unwrap();
    let report = import_document(
        &mut with_source,
        &config.clone().with_source_crs(BNG),
        site_document(),
    )
    .unwrap();

    assert_eq!(report.reprojected_from, None);
    assert_eq!(
        with_source.table("site", "loca").unwrap().points(),
        without_source.table("site", "loca").unwrap().points()
    );
    assert_eq!(
        without_source.table("site", "loca").unwrap().points(),
        &[
            Point::new(451_200.5, 216_100.25, BNG),
            Point::new(451_300.0, 216_050.0, BNG),
        ]
    );
}

#[test]
fn test_reprojection_applies_after_offset() {
    let mut store = MemoryStore::new();
    let config = ImportConfig::new(UTM30N, "site").with_source_crs(BNG);
    let report = import_document(&mut store, &config, site_document()).unwrap();
    assert_eq!(report.reprojected_from, Some(BNG));

    let expected = Reprojector::new(BNG, UTM30N)
        .unwrap()
        .transform(&[
            Point::new(451_200.5, 216_100.25, BNG),
            Point::new(451_300.0, 216_050.0, BNG),
        ])
        .unwrap();

    let stored = store.table("site", "loca").unwrap();
    assert_eq!(stored.points(), expected.as_slice());
    assert!(stored.points().iter().all(|p| p.srid == UTM30N));
    assert_eq!(stored.geometry.as_ref().unwrap().srid, Some(UTM30N));
    // Attribute coordinates are written untouched.
    assert_eq!(
        stored.column_values("loca_locx"),
        vec![Value::Real(451_200.5), Value::Integer(451_300)]
    );
}

#[test]
fn test_reprojected_location_lands_on_control_point() {
    // Ordnance Survey worked example; the stored northing is 10000 m short of it.
    let document = ExchangeDocument::from_tables(vec![Table::from_records(
        "LOCA",
        vec![vec![
            ("LOCA_ID", Value::from("CP1")),
            ("LOCA_LOCX", Value::Real(651_409.903)),
            ("LOCA_LOCY", Value::Real(303_177.270)),
        ]],
    )])
    .unwrap();

    let mut store = MemoryStore::new();
    let config = ImportConfig::new(WGS84, "site").with_source_crs(BNG);
    import_document(&mut store, &config, document).unwrap();

    let point = store.table("site", "loca").unwrap().points()[0];
    let dy = (point.y - 52.658_007) * 111_200.0;
    let dx = (point.x - 1.716_073) * 111_200.0 * 52.658_f64.to_radians().cos();
    assert!(dx.hypot(dy) < 5.0, "off by ({:.1}, {:.1}) m", dx, dy);
    assert_eq!(point.srid, WGS84);
}

#[test]
fn test_every_row_shares_one_campaign_id() {
    let mut store = MemoryStore::new();
    store.seed_location_layer("site", &[6]);
    import_document(&mut store, &ImportConfig::new(BNG, "site"), site_document()).unwrap();

    for name in ["proj", "geol"] {
        let ids = store.table("site", name).unwrap().column_values("campaign_id");
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|v| *v == Value::Integer(7)), "{}: {:?}", name, ids);
    }
    let loca_ids = store.table("site", "loca").unwrap().column_values("campaign_id");
    assert_eq!(&loca_ids[1..], &[Value::Integer(7), Value::Integer(7)]);
}

#[test]
fn test_columns_are_lower_cased() {
    let mut store = MemoryStore::new();
    import_document(&mut store, &ImportConfig::new(BNG, "site"), site_document()).unwrap();

    assert_eq!(store.table_names("site"), vec!["geol", "loca", "proj"]);
    let loca = store.table("site", "loca").unwrap();
    assert_eq!(
        loca.columns,
        vec!["loca_id", "loca_locx", "loca_locy", "campaign_id"]
    );
    assert!(store
        .table("site", "geol")
        .unwrap()
        .columns
        .iter()
        .all(|c| *c == c.to_lowercase()));
}

#[test]
fn test_writes_follow_document_order() {
    let mut store = MemoryStore::new();
    import_document(&mut store, &ImportConfig::new(BNG, "site"), site_document()).unwrap();

    let writes: Vec<_> = store
        .operations()
        .iter()
        .filter_map(|op| match op {
            StoreOp::Append { table, .. } => Some(format!("attr:{}", table)),
            StoreOp::AppendSpatial { table, .. } => Some(format!("spatial:{}", table)),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec!["attr:proj", "spatial:loca", "attr:geol"]);
}

#[test]
fn test_reimport_is_not_idempotent() {
    let mut store = MemoryStore::new();
    let config = ImportConfig::new(BNG, "site");

    let first = import_document(&mut store, &config, scenario_document()).unwrap();
    let second = import_document(&mut store, &config, scenario_document()).unwrap();

    assert_eq!(first.campaign_id.value(), 1);
    assert_eq!(second.campaign_id.value(), 2);

    let samp = store.table("site", "samp").unwrap();
    assert_eq!(
        samp.column_values("samp_id"),
        vec![Value::from("A1"), Value::from("A1")]
    );
    assert_eq!(
        samp.column_values("campaign_id"),
        vec![Value::Integer(1), Value::Integer(2)]
    );
}

#[test]
fn test_schemas_are_independent() {
    let mut store = MemoryStore::new();
    store.seed_location_layer("north", &[12]);

    let report =
        import_document(&mut store, &ImportConfig::new(BNG, "south"), scenario_document()).unwrap();
    assert_eq!(report.campaign_id.value(), 1);
}

#[test]
fn test_malformed_location_leaves_earlier_tables() {
    let mut store = MemoryStore::new();
    let doc = ExchangeDocument::from_tables(vec![
        Table::from_records("PROJ", vec![vec![("PROJ_ID", Value::from("P-101"))]]),
        Table::from_records(
            "LOCA",
            vec![vec![
                ("LOCA_ID", Value::from("BH1")),
                ("LOCA_LOCX", Value::from("unknown")),
                ("LOCA_LOCY", Value::Real(1.0)),
            ]],
        ),
        Table::from_records("GEOL", vec![vec![("GEOL_TOP", Value::Real(0.0))]]),
    ])
    .unwrap();

    let err = import_document(&mut store, &ImportConfig::new(BNG, "site"), doc).unwrap_err();
    assert!(matches!(err, LoadError::MalformedLocationData { row: 0, .. }));
    assert!(err.may_leave_partial_import());

    assert_eq!(store.table_names("site"), vec!["proj"]);
}

#[test]
fn test_store_failure_mid_import_is_not_rolled_back() {
    let mut store = MemoryStore::new();
    store.fail_writes_to("geol", "permission denied for table geol");

    let err =
        import_document(&mut store, &ImportConfig::new(BNG, "site"), site_document()).unwrap_err();
    assert!(matches!(err, LoadError::DestinationUnavailable(_)));
    assert!(err.to_string().contains("permission denied"));

    assert!(store.table("site", "proj").is_some());
    assert!(store.table("site", "loca").is_some());
    assert!(store.table("site", "geol").is_none());
}
