//! # Command Error Type
//!
//! What a failed command prints on stderr.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbError::Business(CoreError) ──► code = CoreError::code()             │
//! │                                   message = Display                    │
//! │                                                                         │
//! │  DbError (persistence)        ──► code = DbError::code()               │
//! │                                   message = generic, detail is logged  │
//! │                                                                         │
//! │  bad JSON payload             ──► INVALID_PAYLOAD                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::error;

use atelier_db::DbError;

/// Error printed by a failed command.
///
/// ```json
/// {
///   "code": "OVER_RETURN",
///   "message": "Cannot return 3 of sale item 5f0c...: only 2 remaining"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

impl CommandError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn payload(message: impl Into<String>) -> Self {
        CommandError::new("INVALID_PAYLOAD", message)
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        CommandError::new("NOT_FOUND", format!("{} not found: {}", entity, id))
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<DbError> for CommandError {
    fn from(err: DbError) -> Self {
        let code = err.code();
        match err {
            DbError::Business(e) => CommandError::new(code, e.to_string()),
            DbError::NotFound { .. }
            | DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. } => CommandError::new(code, err.to_string()),
            DbError::ConnectionFailed(ref e) | DbError::MigrationFailed(ref e) => {
                error!("Database unavailable: {}", e);
                CommandError::new(code, "Database unavailable")
            }
            DbError::QueryFailed(ref e)
            | DbError::TransactionFailed(ref e)
            | DbError::Internal(ref e) => {
                // Log the actual error but return a generic message
                error!("Database operation failed: {}", e);
                CommandError::new(code, "Database operation failed")
            }
            DbError::PoolExhausted => CommandError::new(code, "Database pool exhausted"),
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::payload(err.to_string())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::payload(format!("cannot read payload: {}", err))
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::CoreError;

    #[test]
    fn test_business_error_keeps_code_and_message() {
        let err: CommandError = DbError::from(CoreError::OverReturn {
            sale_item_id: "item-1".to_string(),
            remaining: 2,
            requested: 3,
        })
        .into();

        assert_eq!(err.code, "OVER_RETURN");
        assert!(err.message.contains("only 2 remaining"));
    }

    #[test]
    fn test_query_failure_is_generic() {
        let err: CommandError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, "QUERY_FAILED");
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serializes_code_and_message() {
        let json = serde_json::to_value(CommandError::not_found("Sale", "42")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Sale not found: 42");
    }
}
