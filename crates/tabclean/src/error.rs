//! Error types for the cleaning and analysis pipeline.
//!
//! Every fallible library operation returns [`Result`], whose error side is
//! [`TabcleanError`]. Errors carry a stable code so that callers (the CLI's
//! `--json` mode in particular) can branch on the kind without parsing the
//! message.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum TabcleanError {
    /// Malformed or empty table, out-of-range threshold, or a column that
    /// does not hold the kind of data its schema declares.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A column that still has missing values has no observed values to
    /// compute a median or mode from.
    #[error("Column '{0}' has no non-missing values to impute from")]
    EmptyColumn(String),

    /// Too few observed values to estimate quartiles.
    #[error("Column '{column}' has {found} non-missing values, at least {required} are required")]
    InsufficientData {
        column: String,
        required: usize,
        found: usize,
    },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TabcleanError>,
    },
}

impl TabcleanError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TabcleanError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, preserved through [`TabcleanError::WithContext`].
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::EmptyColumn(_) => "EMPTY_COLUMN",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Strip any context wrappers and return the underlying error.
    pub fn root(&self) -> &TabcleanError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error was caused by the caller's data or parameters
    /// rather than by I/O or the dataframe engine.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidInput(_)
                | Self::EmptyColumn(_)
                | Self::InsufficientData { .. }
                | Self::ColumnNotFound(_)
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for TabcleanError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TabcleanError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, TabcleanError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TabcleanError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TabcleanError::Io(e).with_context(context))
    }
}
