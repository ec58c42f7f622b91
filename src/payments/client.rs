//! Create-payment call to the processor

use crate::error::ExternalError;
use crate::payments::traits::{HttpReply, HttpSender};
use crate::payments::types::{PaymentOutcome, SignedOutboundRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SUCCESS_STATUS: &str = "00";

/// reqwest-backed [`HttpSender`]
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> Result<Self, ExternalError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("duitku-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExternalError::Transport {
                provider: "Duitku".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<HttpReply, ExternalError> {
        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let request = request.json(body);

        let response = request.send().await.map_err(|e| ExternalError::Transport {
            provider: "Duitku".to_string(),
            message: if e.is_timeout() {
                format!("Request timed out: {}", e)
            } else {
                format!("Request error: {}", e)
            },
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpReply { status, body })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    status_code: Option<String>,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    payment_url: Option<String>,
    #[serde(default)]
    reference: Option<String>,
}

/// Sends signed requests and interprets the processor's answer.
///
/// One attempt per call; retry policy belongs to the caller.
#[derive(Clone)]
pub struct GatewayClient {
    sender: Arc<dyn HttpSender>,
}

impl GatewayClient {
    pub fn new(sender: Arc<dyn HttpSender>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, request: &SignedOutboundRequest) -> PaymentOutcome {
        let reply = match self
            .sender
            .post_json(&request.endpoint, &request.headers, &request.payload)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("Duitku request to {} failed: {}", request.endpoint, e);
                return PaymentOutcome::TransportFailure {
                    reason: e.to_string(),
                    raw_response: None,
                };
            }
        };

        if !reply.is_success() {
            error!(
                "Duitku payment error: HTTP {} from {}: {}",
                reply.status, request.endpoint, reply.body
            );
            return PaymentOutcome::TransportFailure {
                reason: format!("HTTP {}", reply.status),
                raw_response: Some(reply.body),
            };
        }

        interpret_response(reply.body)
    }
}

fn interpret_response(body: String) -> PaymentOutcome {
    let parsed = match serde_json::from_str::<CreatePaymentResponse>(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to parse Duitku response: {}: {}", e, body);
            return PaymentOutcome::Rejected {
                status_code: None,
                raw_response: body,
            };
        }
    };

    let status_code = parsed.status_code.clone();
    match (status_code.as_deref(), parsed.payment_url) {
        (Some(SUCCESS_STATUS), Some(payment_url)) if !payment_url.is_empty() => {
            info!(
                "Duitku payment created: reference={}",
                parsed.reference.as_deref().unwrap_or("-")
            );
            PaymentOutcome::Success {
                payment_url,
                reference: parsed.reference,
            }
        }
        (Some(SUCCESS_STATUS), _) => {
            warn!("Duitku reported success without a payment URL: {}", body);
            PaymentOutcome::Rejected {
                status_code: parsed.status_code,
                raw_response: body,
            }
        }
        (code, _) => {
            error!(
                "Duitku payment rejected: statusCode={} statusMessage={}: {}",
                code.unwrap_or("-"),
                parsed.status_message.as_deref().unwrap_or("-"),
                body
            );
            PaymentOutcome::Rejected {
                status_code: parsed.status_code,
                raw_response: body,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubSender {
        reply: Result<HttpReply, ExternalError>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSender {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpSender for StubSender {
        async fn post_json(
            &self,
            url: &str,
            _headers: &[(String, String)],
            _body: &serde_json::Value,
        ) -> Result<HttpReply, ExternalError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.reply.clone()
        }
    }

    fn request(endpoint: &str) -> SignedOutboundRequest {
        SignedOutboundRequest {
            endpoint: endpoint.to_string(),
            payload: json!({ "merchantOrderId": "1" }),
            signature: "sig".to_string(),
            headers: vec![("x-duitku-signature".to_string(), "sig".to_string())],
            timestamp_millis: Some(1),
        }
    }

    #[tokio::test]
    async fn test_success_returns_payment_url() {
        let sender = StubSender::replying(
            200,
            r#"{"statusCode":"00","paymentUrl":"https://pay.example/x"}"#,
        );
        let client = GatewayClient::new(sender.clone());
        let outcome = client.send(&request("https://gw.example/create")).await;

        assert_eq!(
            outcome,
            PaymentOutcome::Success {
                payment_url: "https://pay.example/x".to_string(),
                reference: None,
            }
        );
        assert_eq!(sender.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let body = r#"{"statusCode":"01"}"#;
        let client = GatewayClient::new(StubSender::replying(200, body));
        let outcome = client.send(&request("https://gw.example/create")).await;

        assert_eq!(
            outcome,
            PaymentOutcome::Rejected {
                status_code: Some("01".to_string()),
                raw_response: body.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure_without_retry() {
        let sender = StubSender::replying(500, "upstream exploded");
        let client = GatewayClient::new(sender.clone());
        let outcome = client.send(&request("https://gw.example/create")).await;

        assert_eq!(
            outcome,
            PaymentOutcome::TransportFailure {
                reason: "HTTP 500".to_string(),
                raw_response: Some("upstream exploded".to_string()),
            }
        );
        assert_eq!(sender.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_error_is_transport_failure() {
        let sender = Arc::new(StubSender {
            reply: Err(ExternalError::Transport {
                provider: "Duitku".to_string(),
                message: "connection refused".to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        });
        let outcome = GatewayClient::new(sender)
            .send(&request("https://gw.example/create"))
            .await;

        assert!(matches!(
            outcome,
            PaymentOutcome::TransportFailure { raw_response: None, .. }
        ));
    }

    #[test]
    fn test_success_code_without_url_is_rejected() {
        let outcome = interpret_response(r#"{"statusCode":"00","paymentUrl":""}"#.to_string());
        assert!(matches!(outcome, PaymentOutcome::Rejected { .. }));
        assert_eq!(outcome.payment_url(), None);
    }

    #[test]
    fn test_unparseable_body_is_rejected() {
        let outcome = interpret_response("<html>maintenance</html>".to_string());
        assert_eq!(
            outcome,
            PaymentOutcome::Rejected {
                status_code: None,
                raw_response: "<html>maintenance</html>".to_string(),
            }
        );
    }

    #[test]
    fn test_reference_is_kept() {
        let outcome = interpret_response(
            r#"{"merchantCode":"D1","reference":"D1ABC","paymentUrl":"https://pay.example/y","statusCode":"00","statusMessage":"SUCCESS"}"#
                .to_string(),
        );
        assert_eq!(outcome.payment_url(), Some("https://pay.example/y"));
        assert!(matches!(
            outcome,
            PaymentOutcome::Success { reference: Some(ref r), .. } if r == "D1ABC"
        ));
    }

    #[tokio::test]
    async fn test_reqwest_sender_posts_json_with_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/merchant/createInvoice")
            .match_header("x-duitku-signature", "sig")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({ "merchantOrderId": "1" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"statusCode":"00","paymentUrl":"https://pay.example/x","reference":"R1"}"#)
            .expect(1)
            .create_async()
            .await;

        let sender = Arc::new(ReqwestSender::new(Duration::from_secs(5)).unwrap());
        let client = GatewayClient::new(sender);
        let outcome = client
            .send(&request(&format!("{}/api/merchant/createInvoice", server.url())))
            .await;

        mock.assert_async().await;
        assert_eq!(outcome.payment_url(), Some("https://pay.example/x"));
    }

    #[tokio::test]
    async fn test_reqwest_sender_reports_http_500() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/create")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let sender = Arc::new(ReqwestSender::new(Duration::from_secs(5)).unwrap());
        let outcome = GatewayClient::new(sender)
            .send(&request(&format!("{}/create", server.url())))
            .await;

        assert!(matches!(
            outcome,
            PaymentOutcome::TransportFailure { raw_response: Some(ref body), .. } if body == "oops"
        ));
    }
}
