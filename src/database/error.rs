//! Order storage errors

use thiserror::Error;

/// Result type for order storage operations
pub type DbResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Order '{order_id}' not found")]
    OrderNotFound { order_id: String },

    #[error("Order '{order_id}' left in status '{status}' after payment update")]
    UnexpectedStatus { order_id: String, status: String },

    #[error("Order store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Order query failed: {message}")]
    Query { message: String },
}

impl DatabaseError {
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable {
                    message: error.to_string(),
                }
            }
            sqlx::Error::Database(db_err) => Self::Query {
                message: db_err.message().to_string(),
            },
            _ => Self::Query {
                message: error.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound { .. })
    }
}
