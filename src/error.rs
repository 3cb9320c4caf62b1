//! Error types for report generation

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading coverage or producing a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// A file in the tree has no coverage record
    #[error("No coverage record for file: {0}")]
    MissingRecord(String),

    /// A record references ids it does not define
    #[error("Malformed coverage record for {path}: {message}")]
    MalformedRecord { path: String, message: String },

    /// Coverage JSON could not be parsed
    #[error("Failed to parse coverage JSON {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Coverage input could not be read
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination could not be written
    #[error("Failed to write report to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Emitted elements did not close in the order they were opened
    #[error("Unbalanced XML: {0}")]
    UnbalancedXml(String),
}

impl ReportError {
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
