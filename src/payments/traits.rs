//! Collaborator and provider trait definitions
//!
//! Everything the gateway core needs from the outside world goes through one
//! of these traits so each stage can be exercised with a substitute.

use crate::error::{AppResult, ExternalError};
use crate::payments::types::{CheckoutOrder, GatewayCallback, PaymentOutcome, WebhookAck};
use async_trait::async_trait;

/// Named string settings, looked up per gateway.
///
/// Implementations must not cache: credentials can rotate between calls.
pub trait ConfigProvider: Send + Sync {
    /// Raw value for `key`, or `None` when unset
    fn get(&self, gateway: &str, key: &str) -> Option<String>;
}

/// Order-side effect of a confirmed payment.
///
/// `mark_paid` must be idempotent: the processor delivers callbacks at least
/// once, and the reconciler forwards every `Paid` delivery.
#[async_trait]
pub trait OrderFulfillment: Send + Sync {
    async fn mark_paid(&self, order_id: &str, gateway: &str) -> AppResult<()>;
}

/// Builds the page the payer lands on after leaving the processor
pub trait ReturnUrlResolver: Send + Sync {
    /// `Err` when no return page is configured for the order
    fn return_url(&self, order_id: &str) -> AppResult<String>;
}

/// Raw HTTP answer, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used for the outbound processor call
#[async_trait]
pub trait HttpSender: Send + Sync {
    /// POST `body` as JSON. `Err` only when no HTTP answer was received.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<HttpReply, ExternalError>;
}

/// Trait for payment gateway implementations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Name the gateway is registered under, also passed to fulfillment
    fn name(&self) -> &str;

    /// Initiate a payment and return where the payer should be redirected
    ///
    /// # Returns
    /// * `Err` - configuration or validation problem, raised before any network call
    /// * `Ok(PaymentOutcome)` - what the processor (or the transport) answered
    async fn initiate_payment(&self, order: CheckoutOrder) -> AppResult<PaymentOutcome>;

    /// Verify a status callback and apply it to the order
    ///
    /// Never fails: every path produces an acknowledgement for the processor.
    async fn handle_callback(&self, callback: GatewayCallback) -> WebhookAck;
}
