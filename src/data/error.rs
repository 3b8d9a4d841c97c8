use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data layer.
///
/// `DataUnavailable` and `SchemaMismatch` are raised at load time, before
/// any filtering or aggregation happens. Value coercion failures are not
/// errors: the offending cell becomes [`Value::Missing`] and is counted in
/// the dataset's [`LoadReport`].
///
/// [`Value::Missing`]: super::model::Value::Missing
/// [`LoadReport`]: super::model::LoadReport
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("{}: missing required column(s): {}", path.display(), missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl DataError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DataError::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
