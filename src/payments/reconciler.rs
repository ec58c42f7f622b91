//! Applies verified callbacks to orders

use crate::payments::traits::OrderFulfillment;
use crate::payments::types::{CallbackOutcome, GatewayCallback, WebhookAck};
use std::sync::Arc;
use tracing::{error, info};

/// Turns a [`CallbackOutcome`] into at most one fulfillment call and the
/// acknowledgement for the processor.
///
/// No deduplication happens here; repeated `Paid` deliveries reach
/// [`OrderFulfillment::mark_paid`] each time.
#[derive(Clone)]
pub struct OrderReconciler {
    fulfillment: Arc<dyn OrderFulfillment>,
    gateway: String,
}

impl OrderReconciler {
    pub fn new(fulfillment: Arc<dyn OrderFulfillment>, gateway: impl Into<String>) -> Self {
        Self {
            fulfillment,
            gateway: gateway.into(),
        }
    }

    pub async fn reconcile(
        &self,
        outcome: CallbackOutcome,
        callback: &GatewayCallback,
    ) -> WebhookAck {
        let order_id = callback.merchant_order_id.as_deref().unwrap_or_default();
        let reference = callback.reference.as_deref().unwrap_or("-");

        match outcome {
            CallbackOutcome::Paid => {
                match self.fulfillment.mark_paid(order_id, &self.gateway).await {
                    Ok(()) => {
                        info!(
                            "Order {} paid via {} (reference {})",
                            order_id, self.gateway, reference
                        );
                        WebhookAck::ok()
                    }
                    Err(e) => {
                        error!(
                            "Failed to mark order {} paid via {} (reference {}): {}",
                            order_id, self.gateway, reference, e
                        );
                        WebhookAck::error(500, &e.public_message())
                    }
                }
            }
            CallbackOutcome::ExpiredOrFailed => {
                info!(
                    "{} reported order {} expired or failed (reference {})",
                    self.gateway, order_id, reference
                );
                WebhookAck::ok()
            }
            CallbackOutcome::MissingFields => WebhookAck::error(400, "Missing parameters"),
            CallbackOutcome::InvalidSignature => WebhookAck::error(400, "Invalid signature"),
            CallbackOutcome::UnknownStatus => WebhookAck::error(400, "Invalid status"),
        }
    }
}
