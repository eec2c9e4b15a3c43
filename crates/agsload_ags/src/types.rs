//! AGS4 data types and cell conversion.

use agsload_core::Value;

/// Column data type as declared on the `TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// `nDP`: fixed number of decimal places.
    DecimalPlaces(u8),
    /// `nSF`: significant figures.
    SignificantFigures(u8),
    /// `nSCI`: scientific notation.
    Scientific(u8),
    /// Everything else (`ID`, `PA`, `X`, `DT`, `YN`, ...).
    Text,
}

impl DataType {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_uppercase();
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (digits, suffix) = raw.split_at(split);
        let Ok(n) = digits.parse::<u8>() else {
            return DataType::Text;
        };
        match suffix {
            "DP" => DataType::DecimalPlaces(n),
            "SF" => DataType::SignificantFigures(n),
            "SCI" => DataType::Scientific(n),
            _ => DataType::Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, DataType::Text)
    }

    /// Convert a raw cell. Empty or unparseable numeric cells become null.
    pub fn convert(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            DataType::Text => Value::Text(raw.to_string()),
            DataType::DecimalPlaces(0) => match trimmed.parse::<i64>() {
                Ok(v) => Value::Integer(v),
                Err(_) => parse_real(trimmed),
            },
            _ => parse_real(trimmed),
        }
    }
}

fn parse_real(raw: &str) -> Value {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Value::Real(v),
        _ => Value::Null,
    }
}
