//! Duitku payment gateway
//!
//! Wires configuration, signing, the create-payment call and callback
//! reconciliation into the two operations the shop exposes. Settings are read
//! through the [`ConfigProvider`] on every call so rotated credentials apply
//! to the very next request.

use crate::error::{AppError, AppResult};
use crate::payments::builder::PaymentRequestBuilder;
use crate::payments::callback::CallbackVerifier;
use crate::payments::client::GatewayClient;
use crate::payments::reconciler::OrderReconciler;
use crate::payments::traits::{
    ConfigProvider, HttpSender, OrderFulfillment, PaymentProvider, ReturnUrlResolver,
};
use crate::payments::types::{
    CheckoutOrder, Environment, GatewayCallback, MerchantCredentials,
    OrderPaymentRequest, PaymentOutcome, ProtocolVariant, WebhookAck,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const GATEWAY_NAME: &str = "Duitku";

/// Setting keys understood by the gateway
pub mod keys {
    pub const MERCHANT_CODE: &str = "merchant_code";
    pub const API_KEY: &str = "api_key";
    pub const CALLBACK_URL: &str = "callback_url";
    pub const ENVIRONMENT: &str = "environment";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const PROTOCOL: &str = "protocol";
    pub const RETURN_URL_TEMPLATE: &str = "return_url_template";
    pub const VERIFY_CALLBACK_SIGNATURE: &str = "verify_callback_signature";
}

/// Snapshot of the gateway settings for one pay attempt
#[derive(Debug, Clone)]
pub struct PaySettings {
    pub credentials: MerchantCredentials,
    pub callback_url: String,
    pub environment: Environment,
    pub payment_method: Option<String>,
    pub protocol: ProtocolVariant,
}

impl PaySettings {
    pub fn load(config: &dyn ConfigProvider) -> AppResult<Self> {
        let merchant_code = required(config, keys::MERCHANT_CODE)?;
        let api_key = required(config, keys::API_KEY)?;
        let callback_url = required(config, keys::CALLBACK_URL)?;
        let environment = required(config, keys::ENVIRONMENT)?.parse::<Environment>()?;

        Ok(Self {
            credentials: MerchantCredentials::new(merchant_code, api_key),
            callback_url,
            environment,
            payment_method: optional(config, keys::PAYMENT_METHOD),
            protocol: protocol(config)?,
        })
    }
}

fn required(config: &dyn ConfigProvider, key: &str) -> AppResult<String> {
    optional(config, key).ok_or_else(|| AppError::missing_setting(GATEWAY_NAME, key))
}

fn optional(config: &dyn ConfigProvider, key: &str) -> Option<String> {
    config
        .get(GATEWAY_NAME, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn protocol(config: &dyn ConfigProvider) -> AppResult<ProtocolVariant> {
    optional(config, keys::PROTOCOL)
        .map(|p| p.parse::<ProtocolVariant>())
        .transpose()
        .map(Option::unwrap_or_default)
}

fn flag(config: &dyn ConfigProvider, key: &str) -> AppResult<bool> {
    match optional(config, key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(AppError::invalid_setting(
            key,
            format!("expected a boolean, got '{}'", other),
        )),
    }
}

/// Return page from the `return_url_template` setting, `{order_id}` substituted
pub struct TemplateReturnUrl {
    config: Arc<dyn ConfigProvider>,
}

impl TemplateReturnUrl {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }
}

impl ReturnUrlResolver for TemplateReturnUrl {
    fn return_url(&self, order_id: &str) -> AppResult<String> {
        required(self.config.as_ref(), keys::RETURN_URL_TEMPLATE)
            .map(|template| template.replace("{order_id}", order_id))
    }
}

/// Duitku implementation of [`PaymentProvider`]
#[derive(Clone)]
pub struct DuitkuProvider {
    config: Arc<dyn ConfigProvider>,
    client: GatewayClient,
    reconciler: OrderReconciler,
    return_urls: Arc<dyn ReturnUrlResolver>,
    endpoint_override: Option<String>,
}

impl DuitkuProvider {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        sender: Arc<dyn HttpSender>,
        fulfillment: Arc<dyn OrderFulfillment>,
        return_urls: Arc<dyn ReturnUrlResolver>,
    ) -> Self {
        Self {
            config,
            client: GatewayClient::new(sender),
            reconciler: OrderReconciler::new(fulfillment, GATEWAY_NAME),
            return_urls,
            endpoint_override: None,
        }
    }

    /// Post create-payment requests to `endpoint` regardless of environment
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    /// Configured environment, if it parses
    pub fn environment(&self) -> Option<Environment> {
        optional(self.config.as_ref(), keys::ENVIRONMENT)
            .and_then(|e| e.parse::<Environment>().ok())
    }

    fn verifier(&self) -> AppResult<CallbackVerifier> {
        let config = self.config.as_ref();
        let protocol = protocol(config)?;
        let force = flag(config, keys::VERIFY_CALLBACK_SIGNATURE)?;
        let api_key = match protocol {
            ProtocolVariant::Inquiry => required(config, keys::API_KEY)?,
            ProtocolVariant::Invoice if force => required(config, keys::API_KEY)?,
            ProtocolVariant::Invoice => optional(config, keys::API_KEY).unwrap_or_default(),
        };
        Ok(CallbackVerifier::new(protocol, api_key, force))
    }
}

#[async_trait]
impl PaymentProvider for DuitkuProvider {
    fn name(&self) -> &str {
        GATEWAY_NAME
    }

    async fn initiate_payment(&self, order: CheckoutOrder) -> AppResult<PaymentOutcome> {
        let settings = PaySettings::load(self.config.as_ref())
            .map_err(|e| e.with_context("initiate payment"))?;

        info!(
            "Initiating Duitku payment: order={} amount={} environment={} protocol={:?}",
            order.order_id,
            order.total_amount,
            settings.environment.as_str(),
            settings.protocol
        );

        let return_url = self
            .return_urls
            .return_url(&order.order_id)
            .map_err(|e| e.with_context("initiate payment"))?;

        let request = OrderPaymentRequest {
            return_url,
            callback_url: settings.callback_url.clone(),
            order_id: order.order_id,
            total_amount: order.total_amount,
            line_items: order.line_items,
            payer_email: order.payer_email,
        };

        let mut builder = PaymentRequestBuilder::new(
            settings.credentials,
            settings.environment,
            settings.protocol,
        )
        .payment_method(settings.payment_method);
        if let Some(endpoint) = &self.endpoint_override {
            builder = builder.endpoint(endpoint.clone());
        }

        let signed = builder.build(&request, chrono::Utc::now().timestamp_millis())?;
        let outcome = self.client.send(&signed).await;

        match outcome.failure(GATEWAY_NAME) {
            None => info!("Duitku payment ready for order {}", request.order_id),
            Some(e) => error!("Payment for order {} failed: {}", request.order_id, e),
        }

        Ok(outcome)
    }

    async fn handle_callback(&self, callback: GatewayCallback) -> WebhookAck {
        debug!("Duitku webhook data: {:?}", callback);

        let verifier = match self.verifier() {
            Ok(verifier) => verifier,
            Err(e) => {
                error!("Cannot verify Duitku callback: {}", e);
                return WebhookAck::error(500, &e.public_message());
            }
        };

        let outcome = verifier.verify(&callback);
        self.reconciler.reconcile(outcome, &callback).await
    }
}
