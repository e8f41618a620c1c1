use arith_mcp_core::jsonrpc::{
    error_response, parse_message, JsonRpcMessage, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::router;
use crate::server::Server;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// How a request's response is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Json,
    EventStream,
}

/// Handle POST /mcp: one JSON-RPC request, notification or response.
pub async fn handle_mcp_post(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(mode) = response_mode(&headers, server.json_response()) else {
        return (
            StatusCode::NOT_ACCEPTABLE,
            Json(error_response(
                Value::Null,
                INVALID_REQUEST,
                "Client must accept application/json or text/event-stream",
            )),
        )
            .into_response();
    };

    // Parse JSON body
    let value: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Unparseable MCP body");
            return (
                StatusCode::OK,
                Json(error_response(Value::Null, PARSE_ERROR, "Parse error")),
            )
                .into_response();
        }
    };

    // Parse the JSON-RPC message (request vs notification)
    let message = match parse_message(&value) {
        Ok(msg) => msg,
        Err(err) => {
            let resp = JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id: value.get("id").cloned().unwrap_or(Value::Null),
                result: None,
                error: Some(err),
            };
            return (StatusCode::OK, Json(resp)).into_response();
        }
    };

    let session_id = extract_session_id(&headers);

    match message {
        JsonRpcMessage::Notification(notif) => {
            debug!(method = %notif.method, "MCP notification received");
            router::handle_notification(server.sessions(), session_id.as_deref(), &notif);
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::Response(resp) => {
            debug!(id = %resp.id, "MCP client response received (ignored)");
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::Request(req) => {
            debug!(method = %req.method, id = %req.id, "MCP request received");

            if req.method == "initialize" {
                // Initialize does not require an existing session
                let (resp, new_session_id) = router::dispatch_request(&server, None, &req);
                let mut response = respond(mode, resp);
                if let Some(sid) = new_session_id {
                    if let Ok(val) = HeaderValue::from_str(&sid) {
                        response.headers_mut().insert(SESSION_HEADER, val);
                    }
                }
                return response;
            }

            // ping is answered whether or not the session is known.
            if !server.stateless() && req.method != "ping" {
                match session_id.as_deref() {
                    None => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(error_response(
                                req.id,
                                INVALID_REQUEST,
                                "Missing mcp-session-id header",
                            )),
                        )
                            .into_response();
                    }
                    Some(sid) if !server.sessions().contains(sid) => {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(error_response(req.id, INVALID_REQUEST, "Session not found")),
                        )
                            .into_response();
                    }
                    Some(_) => {}
                }
            }

            let (resp, _) = router::dispatch_request(&server, session_id.as_deref(), &req);
            respond(mode, resp)
        }
    }
}

/// Handle GET /mcp. No standalone server stream is offered.
pub async fn handle_mcp_get() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "Server-initiated streams are not supported",
    )
}

/// Handle DELETE /mcp: terminate the session named in the header.
pub async fn handle_mcp_delete(State(server): State<Arc<Server>>, headers: HeaderMap) -> Response {
    let session_id = match extract_session_id(&headers) {
        Some(sid) => sid,
        None => {
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match server.sessions().remove_session(&session_id) {
        Some(session) => {
            debug!(
                session_id = %session_id,
                protocol_version = %session.protocol_version,
                client = ?session.client_info,
                age_secs = session.created_at.elapsed().as_secs(),
                idle_secs = session.last_activity.elapsed().as_secs(),
                "MCP session deleted"
            );
            StatusCode::OK.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Write a response either as a single-event stream or as a JSON body.
fn respond(mode: ResponseMode, resp: JsonRpcResponse) -> Response {
    match mode {
        ResponseMode::Json => (StatusCode::OK, Json(resp)).into_response(),
        ResponseMode::EventStream => match Event::default().event("message").json_data(&resp) {
            Ok(event) => {
                Sse::new(tokio_stream::once(Ok::<_, std::convert::Infallible>(event)))
                    .into_response()
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode event, falling back to JSON body");
                (StatusCode::OK, Json(resp)).into_response()
            }
        },
    }
}

/// Pick the response mode from the Accept header. None means the client
/// accepts neither JSON nor event streams.
pub fn response_mode(headers: &HeaderMap, json_response: bool) -> Option<ResponseMode> {
    let accept = match headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        Some(a) if !a.trim().is_empty() => a.to_ascii_lowercase(),
        _ => return Some(ResponseMode::Json),
    };
    let wildcard = accept.contains("*/*");
    let json = wildcard || accept.contains("application/json");
    let stream = wildcard || accept.contains("text/event-stream");

    match (json, stream) {
        (_, true) if !json_response => Some(ResponseMode::EventStream),
        (true, _) => Some(ResponseMode::Json),
        (false, true) => Some(ResponseMode::EventStream),
        (false, false) => None,
    }
}

/// Extract the mcp-session-id from request headers.
fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn event_stream_preferred_when_accepted() {
        let headers = accept("application/json, text/event-stream");
        assert_eq!(response_mode(&headers, false), Some(ResponseMode::EventStream));
        assert_eq!(response_mode(&headers, true), Some(ResponseMode::Json));
    }

    #[test]
    fn json_only_clients_get_json() {
        assert_eq!(
            response_mode(&accept("application/json"), false),
            Some(ResponseMode::Json)
        );
        assert_eq!(response_mode(&HeaderMap::new(), false), Some(ResponseMode::Json));
    }

    #[test]
    fn stream_only_clients_get_a_stream_even_in_json_mode() {
        assert_eq!(
            response_mode(&accept("text/event-stream"), true),
            Some(ResponseMode::EventStream)
        );
    }

    #[test]
    fn unacceptable_types_are_refused() {
        assert_eq!(response_mode(&accept("text/html"), false), None);
    }

    async fn post(server: &Arc<Server>, session: Option<&'static str>, body: &str) -> Response {
        let mut headers = accept("application/json, text/event-stream");
        if let Some(sid) = session {
            headers.insert(SESSION_HEADER, HeaderValue::from_static(sid));
        }
        handle_mcp_post(State(server.clone()), headers, body.to_string()).await
    }

    #[tokio::test]
    async fn ping_ignores_unknown_session() {
        let server = Server::new_for_test();
        let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        assert_eq!(post(&server, Some("gone"), ping).await.status(), StatusCode::OK);
        assert_eq!(post(&server, None, ping).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn other_requests_need_a_known_session() {
        let server = Server::new_for_test();
        let list = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;
        assert_eq!(post(&server, Some("gone"), list).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(post(&server, None, list).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let server = Server::new_for_test();
        let sid = server.sessions().create_session("2025-06-18".into(), None);
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(&sid).unwrap());

        let resp = handle_mcp_delete(State(server.clone()), headers.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(server.sessions().is_empty());
        let resp = handle_mcp_delete(State(server.clone()), headers).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn session_header_is_read() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(extract_session_id(&headers).as_deref(), Some("abc"));
        assert_eq!(extract_session_id(&HeaderMap::new()), None);
    }
}
