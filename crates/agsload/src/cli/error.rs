//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use agsload_core::{CrsRole, EpsgCode};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// File does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified AGS file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!(
                    "TRY: Look for AGS files: ls {}/*.ags",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
            ])
    }

    /// File exists but is not a readable AGS4 document
    pub fn cannot_parse_ags(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read AGS file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Verify the file is AGS4 (GROUP/HEADING/UNIT/TYPE/DATA lines)".to_string(),
                format!("TRY: Inspect the file structure: agsload inspect {}", path.display()),
            ])
    }

    /// EPSG code unknown to the registry
    pub fn invalid_epsg(code: EpsgCode, role: Option<CrsRole>) -> Self {
        let message = match role {
            Some(role) => format!("Unknown {} reference system: EPSG:{}", role, code),
            None => format!("Unknown reference system: EPSG:{}", code),
        };
        Self::new(message)
            .with_context("The code is not in the bundled EPSG registry")
            .with_suggestions([
                format!("TRY: Check the code: agsload check-epsg {}", code),
                "TRY: British National Grid is 27700, WGS 84 is 4326".to_string(),
            ])
    }

    /// Could not reach the destination database
    pub fn connection_failed(target: &str, reason: &str) -> Self {
        Self::new("Failed to connect to database")
            .with_context(format!("Database: {}", target))
            .with_suggestions([
                format!("Error: {}", reason),
                "TRY: Check --host/--port or AGSLOAD_DB_HOST/AGSLOAD_DB_PORT".to_string(),
                "TRY: Verify credentials with: psql -h HOST -U USER DATABASE".to_string(),
                "TRY: Ensure the PostGIS extension is installed: CREATE EXTENSION postgis;"
                    .to_string(),
            ])
    }

    /// Configuration file is missing or malformed
    pub fn config_error(path: &Path, reason: &str) -> Self {
        Self::new(format!("Invalid config file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: The file needs a [database] section with host, port, database, user"
                    .to_string(),
                "TRY: Pass connection settings as flags instead (--host, --user, ...)".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
