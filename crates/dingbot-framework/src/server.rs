//! HTTP endpoint for outgoing-robot callbacks.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use dingbot_core::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dispatcher::{Credentials, DispatchOutcome, OutgoingDispatcher, log_rejection};

/// Default callback path.
pub const DEFAULT_PATH: &str = "/outgoing";

const REPLY_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Builds a router that serves `dispatcher` at `path` (POST only).
pub fn router(dispatcher: OutgoingDispatcher, path: &str) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Router::new()
        .route(&path, post(outgoing_handler))
        .with_state(Arc::new(dispatcher))
}

/// Binds `addr` and serves callbacks until `shutdown` is cancelled.
pub async fn listen(
    addr: &str,
    path: &str,
    dispatcher: OutgoingDispatcher,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let router = router(dispatcher, path);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, path = %path, "Outgoing robot server listening");

    let server = axum::serve(listener, router);
    tokio::select! {
        result = server => {
            if let Err(e) = &result {
                error!(error = %e, "Outgoing robot server error");
            }
            result
        }
        _ = shutdown.cancelled() => {
            info!("Outgoing robot server shutting down");
            Ok(())
        }
    }
}

async fn outgoing_handler(
    State(dispatcher): State<Arc<OutgoingDispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let credentials = Credentials {
        timestamp: header_str(&headers, "timestamp"),
        sign: header_str(&headers, "sign"),
        token: header_str(&headers, "token"),
    };

    match dispatcher.handle(credentials, &body) {
        Ok(outcome) => {
            if let DispatchOutcome::Invoked { command, .. } = &outcome {
                debug!(command = %command, "Outgoing command handled");
            }
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, REPLY_CONTENT_TYPE)],
                outcome.into_body(),
            )
                .into_response()
        }
        Err(err @ Error::Authentication(_)) => {
            log_rejection(&err);
            (StatusCode::UNAUTHORIZED, err.to_string()).into_response()
        }
        Err(err @ Error::Serialization(_)) => {
            debug!(error = %err, "Malformed outgoing callback");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => {
            error!(error = %err, "Failed to handle outgoing callback");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use dingbot_core::{Message, Signer};
    use serde_json::json;
    use tower::ServiceExt;

    fn app(dispatcher: OutgoingDispatcher) -> Router {
        router(dispatcher, "outgoing")
    }

    fn hello_dispatcher() -> OutgoingDispatcher {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(
            "hello",
            |args| {
                Message::text(format!("hi {}", args[0]))
                    .to_bytes()
                    .unwrap()
            },
            1,
            true,
        );
        OutgoingDispatcher::new(registry)
    }

    fn post_outgoing() -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri("/outgoing")
            .header("content-type", "application/json")
    }

    fn payload(content: &str, mentioned: bool) -> serde_json::Value {
        json!({
            "msgtype": "text",
            "text": {"content": content},
            "senderNick": "alice",
            "isInAtList": mentioned
        })
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body.to_vec())
    }

    fn json_request(value: serde_json::Value) -> Request<Body> {
        post_outgoing()
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_mentioned_command_echoes_handler_bytes() {
        let (status, content_type, body) =
            send(app(hello_dispatcher()), json_request(payload("hello world", true))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(REPLY_CONTENT_TYPE));
        assert_eq!(body, Message::text("hi world").to_bytes().unwrap());
    }

    #[tokio::test]
    async fn test_missing_mention_gets_usage_reply() {
        let (status, _, body) =
            send(app(hello_dispatcher()), json_request(payload("hello world", false))).await;

        assert_eq!(status, StatusCode::OK);
        let reply: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(
            reply["text"]["content"]
                .as_str()
                .unwrap()
                .contains("requires mentioning")
        );
    }

    #[tokio::test]
    async fn test_unknown_command_is_ok() {
        let (status, _, body) =
            send(app(hello_dispatcher()), json_request(payload("unknown arg", true))).await;

        assert_eq!(status, StatusCode::OK);
        let reply: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply["msgtype"], "text");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/outgoing")
            .body(Body::from("{oops"))
            .unwrap();
        let (status, _, _) = send(app(hello_dispatcher()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let dispatcher = hello_dispatcher().with_secret("app-secret");
        let forged = Signer::new("wrong").unwrap().sign_now();
        let value = payload("hello world", true);
        let req = post_outgoing()
            .header("timestamp", forged.timestamp.to_string())
            .header("sign", forged.sign.clone())
            .body(Body::from(value.to_string()))
            .unwrap();

        let (status, _, _) = send(app(dispatcher), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        let dispatcher = hello_dispatcher().with_secret("app-secret");
        let signature = Signer::new("app-secret").unwrap().sign_now();
        let value = payload("hello there", true);
        let req = post_outgoing()
            .header("timestamp", signature.timestamp.to_string())
            .header("sign", signature.sign.clone())
            .body(Body::from(value.to_string()))
            .unwrap();

        let (status, _, body) = send(app(dispatcher), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Message::text("hi there").to_bytes().unwrap());
    }

    #[tokio::test]
    async fn test_token_header() {
        let value = payload("hello world", true);

        let missing = json_request(value.clone());
        let (status, _, _) = send(app(hello_dispatcher().with_token("tkn")), missing).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = post_outgoing()
            .header("token", "tkn")
            .body(Body::from(value.to_string()))
            .unwrap();
        let (status, _, _) = send(app(hello_dispatcher().with_token("tkn")), req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let req = Request::builder()
            .method("GET")
            .uri("/outgoing")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app(hello_dispatcher()), req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_listen_stops_on_cancel() {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(listen(
            "127.0.0.1:0",
            DEFAULT_PATH,
            hello_dispatcher(),
            shutdown.clone(),
        ));
        shutdown.cancel();
        assert!(task.await.unwrap().is_ok());
    }
}
