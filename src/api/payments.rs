use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::api::AppState;
use crate::payments::types::{CheckoutOrder, GatewayCallback, PaymentOutcome, WebhookAck};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CreatePaymentResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payment_url: None,
            reference: None,
            message: Some(message.into()),
        }
    }
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(order): Json<CheckoutOrder>,
) -> (StatusCode, Json<CreatePaymentResponse>) {
    let order_id = order.order_id.clone();

    match state.gateway.initiate_payment(order).await {
        Ok(PaymentOutcome::Success {
            payment_url,
            reference,
        }) => (
            StatusCode::OK,
            Json(CreatePaymentResponse {
                success: true,
                payment_url: Some(payment_url),
                reference,
                message: None,
            }),
        ),
        Ok(outcome) => {
            let message = outcome
                .failure(state.gateway.name())
                .map(|e| e.public_message())
                .unwrap_or_default();
            (
                StatusCode::BAD_GATEWAY,
                Json(CreatePaymentResponse::failure(message)),
            )
        }
        Err(e) => {
            error!("Payment for order {} not started: {}", order_id, e);
            let status = if e.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(CreatePaymentResponse::failure(e.public_message())))
        }
    }
}

/// Processor callback; accepts form-encoded or JSON bodies
pub async fn duitku_webhook(State(state): State<AppState>, request: Request) -> Response {
    let ack = match parse_callback(request).await {
        Some(callback) => state.gateway.handle_callback(callback).await,
        None => {
            warn!("Unreadable Duitku callback body");
            WebhookAck::error(400, "Missing parameters")
        }
    };

    ack_response(ack)
}

async fn parse_callback(request: Request) -> Option<GatewayCallback> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        Json::<GatewayCallback>::from_request(request, &())
            .await
            .ok()
            .map(|Json(callback)| callback)
    } else {
        Form::<GatewayCallback>::from_request(request, &())
            .await
            .ok()
            .map(|Form(callback)| callback)
    }
}

fn ack_response(ack: WebhookAck) -> Response {
    let status = StatusCode::from_u16(ack.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ack.body)).into_response()
}
