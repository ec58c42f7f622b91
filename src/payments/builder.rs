//! Outbound payment request assembly

use crate::error::{AppError, AppResult};
use crate::payments::signature::SignatureStrategy;
use crate::payments::types::{
    Environment, LineItem, MerchantCredentials, OrderPaymentRequest, ProtocolVariant,
    SignedOutboundRequest,
};
use serde_json::json;

const INVOICE_SANDBOX_URL: &str = "https://api-sandbox.duitku.com/api/merchant/createInvoice";
const INVOICE_PRODUCTION_URL: &str = "https://api-prod.duitku.com/api/merchant/createInvoice";
const INQUIRY_SANDBOX_URL: &str = "https://sandbox.duitku.com/webapi/api/merchant/v2/inquiry";
const INQUIRY_PRODUCTION_URL: &str =
    "https://passport.duitku.com/webapi/api/merchant/v2/inquiry";

/// Create-payment endpoint for an environment and API
pub fn endpoint_for(environment: Environment, variant: ProtocolVariant) -> &'static str {
    match (variant, environment) {
        (ProtocolVariant::Invoice, Environment::Sandbox) => INVOICE_SANDBOX_URL,
        (ProtocolVariant::Invoice, Environment::Production) => INVOICE_PRODUCTION_URL,
        (ProtocolVariant::Inquiry, Environment::Sandbox) => INQUIRY_SANDBOX_URL,
        (ProtocolVariant::Inquiry, Environment::Production) => INQUIRY_PRODUCTION_URL,
    }
}

/// `"A x2, B x1"`
pub fn describe_products(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} x{}", item.name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds a signed create-payment request for one attempt
#[derive(Debug, Clone)]
pub struct PaymentRequestBuilder {
    credentials: MerchantCredentials,
    environment: Environment,
    strategy: SignatureStrategy,
    payment_method: Option<String>,
    endpoint_override: Option<String>,
}

impl PaymentRequestBuilder {
    pub fn new(
        credentials: MerchantCredentials,
        environment: Environment,
        variant: ProtocolVariant,
    ) -> Self {
        Self {
            credentials,
            environment,
            strategy: SignatureStrategy::new(variant),
            payment_method: None,
            endpoint_override: None,
        }
    }

    pub fn payment_method(mut self, payment_method: Option<String>) -> Self {
        self.payment_method = payment_method.filter(|m| !m.trim().is_empty());
        self
    }

    /// Send to `endpoint` instead of the processor's URL for the environment
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    pub fn build(
        &self,
        order: &OrderPaymentRequest,
        timestamp_millis: i64,
    ) -> AppResult<SignedOutboundRequest> {
        self.check_settings(order)?;
        order.validate()?;

        let variant = self.strategy.variant();
        let signature =
            self.strategy
                .compute_outbound_signature(&self.credentials, order, timestamp_millis);

        let mut payload = json!({
            "merchantCode": self.credentials.merchant_code,
            "paymentAmount": order.total_amount,
            "merchantOrderId": order.order_id,
            "productDetails": describe_products(&order.line_items),
            "merchantUserInfo": order.payer_email,
            "email": order.payer_email,
            "callbackUrl": order.callback_url,
            "returnUrl": order.return_url,
            "signature": signature,
        });

        match variant {
            ProtocolVariant::Invoice => {
                payload["additionalParam"] = json!("");
                if let Some(method) = &self.payment_method {
                    payload["paymentMethod"] = json!(method);
                }
            }
            ProtocolVariant::Inquiry => {
                // check_settings guarantees a method for this API
                payload["paymentMethod"] = json!(self.payment_method.clone().unwrap_or_default());
            }
        }

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        let timestamp = match variant {
            ProtocolVariant::Invoice => {
                headers.push(("x-duitku-signature".to_string(), signature.clone()));
                headers.push(("x-duitku-timestamp".to_string(), timestamp_millis.to_string()));
                headers.push((
                    "x-duitku-merchantcode".to_string(),
                    self.credentials.merchant_code.clone(),
                ));
                Some(timestamp_millis)
            }
            ProtocolVariant::Inquiry => None,
        };

        let endpoint = self
            .endpoint_override
            .clone()
            .unwrap_or_else(|| endpoint_for(self.environment, variant).to_string());

        Ok(SignedOutboundRequest {
            endpoint,
            payload,
            signature,
            headers,
            timestamp_millis: timestamp,
        })
    }

    fn check_settings(&self, order: &OrderPaymentRequest) -> AppResult<()> {
        if self.credentials.merchant_code.trim().is_empty() {
            return Err(AppError::missing_setting("Duitku", "merchant_code"));
        }
        if self.credentials.api_key.trim().is_empty() {
            return Err(AppError::missing_setting("Duitku", "api_key"));
        }
        if order.callback_url.trim().is_empty() {
            return Err(AppError::missing_setting("Duitku", "callback_url"));
        }
        if order.return_url.trim().is_empty() {
            return Err(AppError::missing_setting("Duitku", "return_url"));
        }
        if self.strategy.variant() == ProtocolVariant::Inquiry && self.payment_method.is_none() {
            return Err(AppError::missing_setting("Duitku", "payment_method"));
        }
        Ok(())
    }
}
