// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Routes:
//! - `GET {webhook_path}` verification handshake
//! - `POST {webhook_path}` signed message deliveries
//! - `GET /health` liveness probe

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::{HeaderMap, StatusCode};
use motofleet_config::model::{GatewayConfig, WhatsAppConfig};
use motofleet_core::{FleetError, TransportMessage};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::handler::extract_messages;
use crate::signature::{SIGNATURE_HEADER, SignatureValidation, verify_signature};
use crate::types::WebhookPayload;

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    /// Inbound queue of the [`crate::WhatsAppChannel`].
    pub inbound_tx: mpsc::Sender<TransportMessage>,
    /// Token expected in `hub.verify_token`. `None` rejects every handshake.
    pub verify_token: Option<String>,
    /// App secret for signature checks. `None` disables them.
    pub app_secret: Option<String>,
}

impl WebhookState {
    pub fn new(inbound_tx: mpsc::Sender<TransportMessage>, config: &WhatsAppConfig) -> Self {
        Self {
            inbound_tx,
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
        }
    }
}

/// Query string of the verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET {webhook_path}
///
/// Echoes `hub.challenge` when the mode is `subscribe` and the token matches.
pub async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_matches = match (&state.verify_token, &params.verify_token) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };

    match (params.mode.as_deref(), token_matches, params.challenge) {
        (Some("subscribe"), true, Some(challenge)) => {
            info!("webhook verification succeeded");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!(mode = ?params.mode, "webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST {webhook_path}
///
/// Answers 401 when the signature check fails. Otherwise always 200, so Meta
/// does not redeliver payloads the bot cannot parse.
pub async fn receive_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let validation = verify_signature(state.app_secret.as_deref(), header, &body);
    if !validation.is_accepted() {
        warn!(?validation, "rejecting webhook delivery");
        return StatusCode::UNAUTHORIZED;
    }
    if validation == SignatureValidation::NotConfigured {
        debug!("app secret not configured, skipping signature check");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "unparseable webhook payload");
            return StatusCode::OK;
        }
    };

    for msg in extract_messages(&payload) {
        let message_id = msg.message_id.clone();
        debug!(message_id = %message_id, from = %msg.from, "queueing inbound message");
        if state.inbound_tx.send(msg).await.is_err() {
            warn!(message_id = %message_id, "inbound queue closed, dropping message");
            break;
        }
    }

    StatusCode::OK
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Builds the webhook router with the handshake and delivery routes mounted
/// on `webhook_path`.
pub fn webhook_router(webhook_path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(webhook_path, get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `host:port` from `config` and serves `router` until `cancel` fires.
pub async fn serve(
    config: &GatewayConfig,
    router: Router,
    cancel: CancellationToken,
) -> Result<(), FleetError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| FleetError::Transport {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("webhook server listening on {addr}");
    serve_on(listener, router, cancel).await
}

/// Serves `router` on an already bound listener until `cancel` fires.
pub async fn serve_on(
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> Result<(), FleetError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| FleetError::Transport {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("webhook server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::Request;
    use motofleet_core::TransportPayload;
    use tower::ServiceExt;

    use crate::signature::sign;

    const SECRET: &str = "app-secret";

    fn state(app_secret: Option<&str>) -> (WebhookState, mpsc::Receiver<TransportMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let state = WebhookState {
            inbound_tx: tx,
            verify_token: Some("verify-me".into()),
            app_secret: app_secret.map(str::to_string),
        };
        (state, rx)
    }

    fn delivery(body: &str) -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "1", "changes": [{"field": "messages", "value": {
                "messaging_product": "whatsapp",
                "messages": [{
                    "from": "972500000001",
                    "id": "wamid.A",
                    "timestamp": "1760000000",
                    "type": "text",
                    "text": {"body": body}
                }]
            }}]}]
        })
        .to_string()
    }

    fn post(body: String, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn handshake_echoes_challenge() {
        let (state, _rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=1158201444")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "1158201444");
    }

    #[tokio::test]
    async fn handshake_wrong_token_forbidden() {
        let (state, _rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn handshake_wrong_mode_forbidden() {
        let (state, _rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=unsubscribe&hub.verify_token=verify-me&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_delivery_is_queued() {
        let (state, mut rx) = state(Some(SECRET));
        let body = delivery("1");
        let sig = sign(SECRET, body.as_bytes());

        let resp = webhook_router("/webhook", state)
            .oneshot(post(body, Some(sig)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.from, "972500000001");
        assert_eq!(msg.payload, TransportPayload::Text { body: "1".into() });
    }

    #[tokio::test]
    async fn tampered_delivery_unauthorized() {
        let (state, mut rx) = state(Some(SECRET));
        let sig = sign(SECRET, delivery("1").as_bytes());

        let resp = webhook_router("/webhook", state)
            .oneshot(post(delivery("2"), Some(sig)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsigned_delivery_unauthorized_when_secret_set() {
        let (state, _rx) = state(Some(SECRET));
        let resp = webhook_router("/webhook", state)
            .oneshot(post(delivery("1"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_delivery_accepted_without_secret() {
        let (state, mut rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(post(delivery("3"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn garbage_body_still_ok() {
        let (state, mut rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(post("not json".into(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (state, _rx) = state(None);
        let resp = webhook_router("/webhook", state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn serve_on_stops_when_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (state, _rx) = state(None);
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve_on(
            listener,
            webhook_router("/webhook", state),
            cancel.clone(),
        ));
        cancel.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
