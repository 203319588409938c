use thiserror::Error;

/// Failure reported by a native client call.
/// Carries whatever error code and message the native library exposed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct NativeError {
    pub code: Option<String>,
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {message}")]
    Query {
        code: Option<String>,
        message: String,
    },

    #[error("Prepare failed: {message}")]
    Prepare {
        code: Option<String>,
        message: String,
    },

    #[error("Execution failed: {message}")]
    Execution {
        code: Option<String>,
        message: String,
    },

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

impl AdapterError {
    pub(crate) fn query(err: NativeError) -> Self {
        AdapterError::Query {
            code: err.code,
            message: err.message,
        }
    }

    pub(crate) fn prepare(err: NativeError) -> Self {
        AdapterError::Prepare {
            code: err.code,
            message: err.message,
        }
    }

    pub(crate) fn execution(err: NativeError) -> Self {
        AdapterError::Execution {
            code: err.code,
            message: err.message,
        }
    }

    /// Native error code, for the error kinds that carry one.
    pub fn native_code(&self) -> Option<&str> {
        match self {
            AdapterError::Query { code, .. }
            | AdapterError::Prepare { code, .. }
            | AdapterError::Execution { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Result type alias for native client calls
pub type NativeResult<T> = std::result::Result<T, NativeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_code_is_carried() {
        let err = AdapterError::prepare(NativeError::with_code("335544569", "Dynamic SQL Error"));
        assert_eq!(err.native_code(), Some("335544569"));
        assert_eq!(err.to_string(), "Prepare failed: Dynamic SQL Error");
    }

    #[test]
    fn test_usage_error_has_no_code() {
        let err = AdapterError::Usage("already prepared".to_string());
        assert_eq!(err.native_code(), None);
    }
}
