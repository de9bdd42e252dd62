use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing required setting `{0}` (config file or environment)")]
    MissingSetting(&'static str),

    #[error("invalid setting `{name}`: {message}")]
    InvalidSetting { name: &'static str, message: String },

    #[error("could not connect to database {database} on {server}: {message}")]
    Connect {
        server: String,
        database: String,
        message: String,
    },

    #[error("query failed: {0}")]
    Query(String),

    #[error("unexpected column {index} in result row: {message}")]
    Column { index: usize, message: String },

    #[error("could not read supplementary file {path}: {message}")]
    InputFile { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to write report: {0}")]
    Export(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}
