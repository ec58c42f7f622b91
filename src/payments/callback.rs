//! Callback authentication and status dispatch

use crate::payments::signature::SignatureStrategy;
use crate::payments::types::{CallbackOutcome, GatewayCallback, ProtocolVariant};
use tracing::{debug, error, warn};

const RESULT_SUCCESS: &str = "00";
const RESULT_EXPIRED: &str = "01";
const RESULT_FAILED: &str = "02";

/// Evaluates one callback delivery: required fields, then signature, then
/// result code. The first failing step decides the outcome.
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    strategy: SignatureStrategy,
    api_key: String,
    verify_signature: bool,
}

impl CallbackVerifier {
    /// `force_signature_check` turns on the MD5 check for invoice callbacks,
    /// which the processor does not document as signed.
    pub fn new(
        variant: ProtocolVariant,
        api_key: impl Into<String>,
        force_signature_check: bool,
    ) -> Self {
        let strategy = SignatureStrategy::new(variant);
        Self {
            strategy,
            api_key: api_key.into(),
            verify_signature: strategy.verifies_callbacks(force_signature_check),
        }
    }

    pub fn verify(&self, callback: &GatewayCallback) -> CallbackOutcome {
        let order_id = callback.merchant_order_id.as_deref().unwrap_or("-");

        if !has_required_fields(callback) {
            error!("Duitku callback missing parameters: {:?}", callback);
            return CallbackOutcome::MissingFields;
        }

        if self.verify_signature {
            let expected = self
                .strategy
                .expected_callback_signature(&self.api_key, callback)
                .unwrap_or_default();
            let received = callback.signature.as_deref().unwrap_or_default();
            debug!(
                received_signature = received,
                calculated_signature = %expected,
                "Duitku callback signature verification for order {}",
                order_id
            );

            if !self.strategy.verify_inbound_signature(&self.api_key, callback) {
                error!(
                    received_signature = received,
                    calculated_signature = %expected,
                    "Invalid Duitku callback signature for order {}",
                    order_id
                );
                return CallbackOutcome::InvalidSignature;
            }
        } else {
            warn!(
                "Accepting unsigned Duitku invoice callback for order {}; signature not verified",
                order_id
            );
        }

        match callback.result_code.as_deref() {
            Some(RESULT_SUCCESS) => CallbackOutcome::Paid,
            Some(RESULT_EXPIRED) | Some(RESULT_FAILED) => CallbackOutcome::ExpiredOrFailed,
            other => {
                warn!(
                    "Unknown Duitku result code {:?} for order {}",
                    other, order_id
                );
                CallbackOutcome::UnknownStatus
            }
        }
    }
}

fn has_required_fields(callback: &GatewayCallback) -> bool {
    [
        &callback.merchant_code,
        &callback.amount,
        &callback.merchant_order_id,
        &callback.signature,
    ]
    .iter()
    .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::signature::callback_signature;

    const KEY: &str = "732B39FC61796845775D2C4FB05332AF";

    fn signed(result_code: &str) -> GatewayCallback {
        GatewayCallback {
            merchant_code: Some("DXXXX".to_string()),
            amount: Some("150000".to_string()),
            merchant_order_id: Some("1042".to_string()),
            signature: Some(callback_signature(KEY, "DXXXX", "150000", "1042")),
            result_code: Some(result_code.to_string()),
            ..Default::default()
        }
    }

    fn inquiry() -> CallbackVerifier {
        CallbackVerifier::new(ProtocolVariant::Inquiry, KEY, false)
    }

    #[test]
    fn test_status_dispatch() {
        let verifier = inquiry();
        assert_eq!(verifier.verify(&signed("00")), CallbackOutcome::Paid);
        assert_eq!(verifier.verify(&signed("01")), CallbackOutcome::ExpiredOrFailed);
        assert_eq!(verifier.verify(&signed("02")), CallbackOutcome::ExpiredOrFailed);
        assert_eq!(verifier.verify(&signed("99")), CallbackOutcome::UnknownStatus);
        assert_eq!(verifier.verify(&signed("")), CallbackOutcome::UnknownStatus);

        let mut no_code = signed("00");
        no_code.result_code = None;
        assert_eq!(verifier.verify(&no_code), CallbackOutcome::UnknownStatus);
    }

    #[test]
    fn test_bad_signature_rejected_for_every_result_code() {
        let verifier = inquiry();
        for code in ["00", "01", "02", "99"] {
            let mut cb = signed(code);
            cb.signature = Some("0".repeat(32));
            assert_eq!(verifier.verify(&cb), CallbackOutcome::InvalidSignature);
        }
    }

    #[test]
    fn test_tampered_amount_rejected() {
        let mut cb = signed("00");
        cb.amount = Some("1".to_string());
        assert_eq!(inquiry().verify(&cb), CallbackOutcome::InvalidSignature);
    }

    #[test]
    fn test_missing_fields_checked_before_signature() {
        let verifier = inquiry();
        let clear: [fn(&mut GatewayCallback); 4] = [
            |cb| cb.merchant_code = None,
            |cb| cb.amount = Some(String::new()),
            |cb| cb.merchant_order_id = None,
            |cb| cb.signature = Some(String::new()),
        ];
        for clear_field in clear {
            let mut cb = signed("00");
            clear_field(&mut cb);
            assert_eq!(verifier.verify(&cb), CallbackOutcome::MissingFields);
        }
    }

    #[test]
    fn test_result_code_is_not_required() {
        let mut cb = signed("00");
        cb.result_code = None;
        assert_ne!(inquiry().verify(&cb), CallbackOutcome::MissingFields);
    }

    #[test]
    fn test_invoice_callbacks_skip_signature_by_default() {
        let verifier = CallbackVerifier::new(ProtocolVariant::Invoice, KEY, false);

        let mut cb = signed("00");
        cb.signature = Some("anything".to_string());
        assert_eq!(verifier.verify(&cb), CallbackOutcome::Paid);

        // fields are still required
        cb.merchant_order_id = None;
        assert_eq!(verifier.verify(&cb), CallbackOutcome::MissingFields);
    }

    #[test]
    fn test_invoice_callbacks_verified_when_opted_in() {
        let verifier = CallbackVerifier::new(ProtocolVariant::Invoice, KEY, true);
        assert_eq!(verifier.verify(&signed("00")), CallbackOutcome::Paid);

        let mut cb = signed("00");
        cb.signature = Some("anything".to_string());
        assert_eq!(verifier.verify(&cb), CallbackOutcome::InvalidSignature);
    }
}
