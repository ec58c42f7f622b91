//! Request and callback signing for both processor APIs

use crate::payments::types::{
    GatewayCallback, MerchantCredentials, OrderPaymentRequest, ProtocolVariant,
};
use sha2::{Digest, Sha256};

/// Signing rules for one protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureStrategy {
    variant: ProtocolVariant,
}

impl SignatureStrategy {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Signature for an outbound payment request.
    ///
    /// Invoice: `sha256(merchantCode + timestamp + apiKey)`.
    /// Inquiry: `md5(merchantCode + orderId + totalAmount + apiKey)`; the
    /// timestamp is ignored.
    pub fn compute_outbound_signature(
        &self,
        credentials: &MerchantCredentials,
        order: &OrderPaymentRequest,
        timestamp_millis: i64,
    ) -> String {
        match self.variant {
            ProtocolVariant::Invoice => sha256_hex(&format!(
                "{}{}{}",
                credentials.merchant_code, timestamp_millis, credentials.api_key
            )),
            ProtocolVariant::Inquiry => md5_hex(&format!(
                "{}{}{}{}",
                credentials.merchant_code, order.order_id, order.total_amount, credentials.api_key
            )),
        }
    }

    /// Whether callbacks of this variant carry a checkable signature.
    ///
    /// The invoice API documents none, so invoice callbacks are only checked
    /// when the merchant opts in.
    pub fn verifies_callbacks(&self, opt_in: bool) -> bool {
        match self.variant {
            ProtocolVariant::Inquiry => true,
            ProtocolVariant::Invoice => opt_in,
        }
    }

    /// Signature the processor should have attached to `callback`.
    ///
    /// `None` when a field that goes into the hash is missing.
    pub fn expected_callback_signature(
        &self,
        api_key: &str,
        callback: &GatewayCallback,
    ) -> Option<String> {
        let merchant_code = callback.merchant_code.as_deref()?;
        let amount = callback.amount.as_deref()?;
        let merchant_order_id = callback.merchant_order_id.as_deref()?;
        Some(callback_signature(api_key, merchant_code, amount, merchant_order_id))
    }

    pub fn verify_inbound_signature(&self, api_key: &str, callback: &GatewayCallback) -> bool {
        match (
            self.expected_callback_signature(api_key, callback),
            callback.signature.as_deref(),
        ) {
            (Some(expected), Some(received)) => constant_time_eq(&expected, received),
            _ => false,
        }
    }
}

/// `md5(merchantCode + amount + merchantOrderId + apiKey)`
pub fn callback_signature(
    api_key: &str,
    merchant_code: &str,
    amount: &str,
    merchant_order_id: &str,
) -> String {
    md5_hex(&format!(
        "{}{}{}{}",
        merchant_code, amount, merchant_order_id, api_key
    ))
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
