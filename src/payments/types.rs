//! Payment gateway types and data structures
//!
//! Requests, callbacks and outcomes shared by the signing, building, sending
//! and reconciliation stages.

use crate::error::{AppError, AppResult, ExternalError, ValidationError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Merchant secrets, read from configuration for every request
#[derive(Clone, PartialEq, Eq)]
pub struct MerchantCredentials {
    pub merchant_code: String,
    pub api_key: String,
}

impl MerchantCredentials {
    pub fn new(merchant_code: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            merchant_code: merchant_code.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("merchant_code", &self.merchant_code)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Processor environment the merchant account lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(AppError::invalid_setting(
                "environment",
                format!("expected 'sandbox' or 'production', got '{}'", other),
            )),
        }
    }
}

/// Which processor API a merchant account talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// `createInvoice` API, SHA-256 signature carried in `x-duitku-*` headers
    #[default]
    Invoice,
    /// `v2/inquiry` API, MD5 signatures on both requests and callbacks
    Inquiry,
}

impl FromStr for ProtocolVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(ProtocolVariant::Invoice),
            "inquiry" => Ok(ProtocolVariant::Inquiry),
            other => Err(AppError::invalid_setting(
                "protocol",
                format!("expected 'invoice' or 'inquiry', got '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
}

/// Order as submitted by the shop, before gateway-specific URLs are attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOrder {
    pub order_id: String,
    /// Amount in smallest currency unit
    pub total_amount: i64,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub payer_email: String,
}

/// Everything needed to sign and build one payment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPaymentRequest {
    pub order_id: String,
    /// Amount in smallest currency unit
    pub total_amount: i64,
    pub line_items: Vec<LineItem>,
    pub payer_email: String,
    pub callback_url: String,
    pub return_url: String,
}

impl OrderPaymentRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.order_id.trim().is_empty() {
            return Err(AppError::new(ValidationError::EmptyOrderId));
        }
        if self.total_amount <= 0 {
            return Err(AppError::new(ValidationError::NonPositiveAmount {
                amount: self.total_amount,
            }));
        }
        Ok(())
    }
}

/// A request ready to be POSTed; lives only for the duration of one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SignedOutboundRequest {
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub headers: Vec<(String, String)>,
    pub timestamp_millis: Option<i64>,
}

/// Status notification posted by the processor. Every field is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCallback {
    #[serde(default)]
    pub merchant_code: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub result_code: Option<String>,
    /// Processor-side transaction reference, kept for the audit log
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
}

/// Accepts `"10000"` and `10000` alike, rendering integers in plain decimal.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
        }),
    )
}

/// Result of one payment initiation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Processor accepted the request
    Success {
        payment_url: String,
        reference: Option<String>,
    },
    /// Processor answered but refused
    Rejected {
        status_code: Option<String>,
        raw_response: String,
    },
    /// The request never produced a usable 2xx answer
    TransportFailure {
        reason: String,
        raw_response: Option<String>,
    },
}

impl PaymentOutcome {
    pub fn payment_url(&self) -> Option<&str> {
        match self {
            PaymentOutcome::Success { payment_url, .. } => Some(payment_url),
            _ => None,
        }
    }

    /// Error describing why the attempt produced no payment URL
    pub fn failure(&self, provider: &str) -> Option<AppError> {
        match self {
            PaymentOutcome::Success { .. } => None,
            PaymentOutcome::Rejected {
                status_code,
                raw_response,
            } => Some(AppError::new(ExternalError::GatewayRejected {
                provider: provider.to_string(),
                message: format!(
                    "status {}: {}",
                    status_code.as_deref().unwrap_or("-"),
                    raw_response
                ),
            })),
            PaymentOutcome::TransportFailure { reason, .. } => {
                Some(AppError::new(ExternalError::Transport {
                    provider: provider.to_string(),
                    message: reason.clone(),
                }))
            }
        }
    }
}

/// Verdict on one callback delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Paid,
    ExpiredOrFailed,
    InvalidSignature,
    MissingFields,
    UnknownStatus,
}

/// Body returned to the processor for a callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// HTTP status plus body acknowledging a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAck {
    pub status: u16,
    pub body: AckBody,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: AckBody {
                success: true,
                message: None,
            },
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: AckBody {
                success: false,
                message: Some(message.to_string()),
            },
        }
    }
}
