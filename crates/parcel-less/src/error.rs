//! Error types for LESS asset processing.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;

use parcel_less_runtime::RuntimeError;
use thiserror::Error;

/// Errors that can occur while transforming a LESS asset.
///
/// Every variant is fatal for the asset being compiled. A missing optional
/// input (no config file) is not an error and never produces one of these.
#[derive(Debug, Error)]
pub enum LessError {
    /// A config file exists but its content could not be parsed
    #[error("Failed to parse config file {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// An import or url() reference could not be mapped to a file
    #[error("Cannot resolve '{specifier}' from {}", .importer.display())]
    Resolution { specifier: String, importer: PathBuf },

    /// A resolved file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The stylesheet compiler reported a diagnostic; passed through unmodified
    #[error("{message}{}", location(.filename, .line, .column))]
    Compile {
        message: String,
        filename: Option<PathBuf>,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// The transform options are unusable (e.g. a relative project root)
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Runtime failure outside of a specific file read
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LessError {
    /// Build a compile error with only a message.
    pub fn compile(message: impl Into<String>) -> Self {
        LessError::Compile {
            message: message.into(),
            filename: None,
            line: None,
            column: None,
        }
    }
}

fn location(filename: &Option<PathBuf>, line: &Option<usize>, column: &Option<usize>) -> String {
    let Some(filename) = filename else {
        return String::new();
    };
    match (line, column) {
        (Some(line), Some(column)) => format!(" in {} on line {}, column {}", filename.display(), line, column),
        (Some(line), None) => format!(" in {} on line {}", filename.display(), line),
        _ => format!(" in {}", filename.display()),
    }
}
