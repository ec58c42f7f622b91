pub mod health;
pub mod payments;

use crate::payments::traits::PaymentProvider;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentProvider>,
    pub environment: String,
}

/// Routes without middleware; the binary adds tracing and request ids
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payments", post(payments::create_payment))
        .route("/webhooks/duitku", post(payments::duitku_webhook))
        .with_state(state)
}
