//! agsload: append AGS4 site investigation files to a PostGIS schema.
//!
//! Every import gets a fresh campaign id shared by all of its tables; the `LOCA`
//! group becomes a point layer in the target reference system.

use agsload_core::EpsgCode;
use agsload_logging::{init_logging, LogConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::check_epsg::CheckEpsgArgs;
use cli::config::DbArgs;
use cli::import::ImportArgs;
use cli::inspect::InspectArgs;

#[derive(Parser, Debug)]
#[command(name = "agsload", version, about = "Load AGS4 files into PostGIS")]
struct Cli {
    /// Enable verbose logging (debug to stderr and the log file)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append an AGS4 file to a PostGIS schema as a new campaign
    Import {
        /// AGS4 file to load
        file: PathBuf,

        /// EPSG code of the written geometry (e.g. 27700)
        #[arg(long)]
        target_epsg: EpsgCode,

        /// EPSG code of LOCA_LOCX/LOCA_LOCY when they differ from the target
        #[arg(long)]
        source_epsg: Option<EpsgCode>,

        /// Destination schema
        #[arg(long)]
        schema: String,

        /// Use this campaign id instead of allocating the next one
        #[arg(long)]
        campaign_id: Option<i64>,

        /// Output the import report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Parse an AGS4 file and list its groups (no database required)
    Inspect {
        /// AGS4 file to inspect
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether an EPSG code is in the bundled registry
    CheckEpsg {
        /// EPSG code, with or without the EPSG: prefix
        code: EpsgCode,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Import { json, .. } | Commands::Inspect { json, .. } => *json,
            Commands::CheckEpsg { .. } => false,
        }
    }
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Import {
            file,
            target_epsg,
            source_epsg,
            schema,
            campaign_id,
            json,
            db,
        } => cli::import::run(ImportArgs {
            file,
            target_epsg,
            source_epsg,
            schema,
            campaign_id,
            db,
            json,
        }),
        Commands::Inspect { file, json } => cli::inspect::run(InspectArgs { file, json }),
        Commands::CheckEpsg { code } => cli::check_epsg::run(CheckEpsgArgs { code }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep stdout clean for JSON consumers.
    let _log_guard = match init_logging(LogConfig {
        app_name: "agsload",
        verbose: cli.verbose,
        quiet: cli.command.wants_json(),
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
