use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Cannot read {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Missing column {column} in {path:?}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Invalid timestamp {value:?}: {reason}")]
    TimestampParse { value: String, reason: String },
}

impl PlotError {
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PlotError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn timestamp(value: &str, reason: impl ToString) -> Self {
        PlotError::TimestampParse {
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}
