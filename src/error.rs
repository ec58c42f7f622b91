//! Application error taxonomy
//!
//! Errors raised while initiating a payment or reconciling a callback. Each
//! kind maps to a fixed, secret-free public message via [`AppError::public_message`];
//! the full `Display` form is for internal logs only.

use std::fmt;
use thiserror::Error;

/// Result type for gateway operations
pub type AppResult<T> = Result<T, AppError>;

/// Missing or malformed gateway settings
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InfrastructureError {
    #[error("Missing configuration value '{key}' for gateway {gateway}")]
    MissingSetting { gateway: String, key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidSetting { key: String, message: String },
}

/// Failures talking to, or reported by, the payment processor or a collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("{provider} transport failure: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} rejected the request: {message}")]
    GatewayRejected { provider: String, message: String },

    #[error("Order fulfillment failed for {order_id}: {message}")]
    Fulfillment { order_id: String, message: String },
}

/// Order data that breaks a request invariant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Order id must not be empty")]
    EmptyOrderId,

    #[error("Total amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppErrorKind {
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{} ({})", self.kind, context)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AppError {
    pub fn new(kind: impl Into<AppErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn missing_setting(gateway: &str, key: &str) -> Self {
        Self::new(InfrastructureError::MissingSetting {
            gateway: gateway.to_string(),
            key: key.to_string(),
        })
    }

    pub fn invalid_setting(key: &str, message: impl Into<String>) -> Self {
        Self::new(InfrastructureError::InvalidSetting {
            key: key.to_string(),
            message: message.into(),
        })
    }

    pub fn fulfillment(order_id: &str, message: impl Into<String>) -> Self {
        Self::new(ExternalError::Fulfillment {
            order_id: order_id.to_string(),
            message: message.into(),
        })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, AppErrorKind::Infrastructure(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation(_))
    }

    /// Message safe to return to an HTTP caller
    pub fn public_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Infrastructure(_) => "Payment gateway is not configured".to_string(),
            AppErrorKind::Validation(e) => e.to_string(),
            AppErrorKind::External(ExternalError::Transport { .. }) => {
                "Payment gateway is unreachable".to_string()
            }
            AppErrorKind::External(ExternalError::GatewayRejected { .. }) => {
                "Payment gateway rejected the request".to_string()
            }
            AppErrorKind::External(ExternalError::Fulfillment { .. }) => {
                "Order update failed".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = AppError::missing_setting("Duitku", "api_key").with_context("pay");
        assert_eq!(
            err.to_string(),
            "Missing configuration value 'api_key' for gateway Duitku (pay)"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_public_message_hides_details() {
        let err = AppError::new(ExternalError::GatewayRejected {
            provider: "Duitku".to_string(),
            message: r#"{"statusCode":"01","statusMessage":"bad signature"}"#.to_string(),
        });
        assert_eq!(err.public_message(), "Payment gateway rejected the request");

        let err = AppError::invalid_setting("environment", "expected sandbox or production");
        assert_eq!(err.public_message(), "Payment gateway is not configured");
    }

    #[test]
    fn test_validation_message_is_public() {
        let err = AppError::new(ValidationError::NonPositiveAmount { amount: 0 });
        assert!(err.is_validation());
        assert_eq!(err.public_message(), "Total amount must be positive, got 0");
    }
}
