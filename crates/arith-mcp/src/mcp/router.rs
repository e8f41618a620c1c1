use arith_mcp_core::jsonrpc::{error_response, INVALID_REQUEST};
use arith_mcp_core::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use tracing::debug;

use super::session::{SessionManager, SessionStatus};
use crate::server::Server;

/// Dispatch a JSON-RPC request, enforcing the session lifecycle.
/// Returns the response and an optional new session ID (set only for initialize).
pub fn dispatch_request(
    server: &Server,
    session_id: Option<&str>,
    request: &JsonRpcRequest,
) -> (JsonRpcResponse, Option<String>) {
    let dispatcher = server.dispatcher();
    match request.method.as_str() {
        "initialize" => {
            let response = dispatcher.handle(request);
            if response.is_error() || server.stateless() {
                return (response, None);
            }
            let sid = create_session(server.sessions(), request, &response);
            (response, Some(sid))
        }
        "ping" => (dispatcher.handle(request), None),
        _ => {
            if !server.stateless() {
                if let Err(err_resp) = validate_session(server.sessions(), session_id, &request.id) {
                    return (err_resp, None);
                }
            }
            (dispatcher.handle(request), None)
        }
    }
}

/// Handle a JSON-RPC notification (no response expected).
pub fn handle_notification(
    sessions: &SessionManager,
    session_id: Option<&str>,
    notification: &JsonRpcNotification,
) {
    match notification.method.as_str() {
        "notifications/initialized" => {
            if let Some(sid) = session_id {
                if sessions.mark_initialized(sid) {
                    debug!(session_id = sid, "Session marked as initialized");
                } else {
                    debug!(session_id = sid, "Session not found for initialized notification");
                }
            }
        }
        "notifications/cancelled" => {
            debug!(method = "notifications/cancelled", "Cancellation notification received (no-op)");
        }
        other => {
            debug!(method = other, "Unknown notification received");
        }
    }
}

fn create_session(
    sessions: &SessionManager,
    request: &JsonRpcRequest,
    response: &JsonRpcResponse,
) -> String {
    let negotiated = response
        .result
        .as_ref()
        .and_then(|r| r.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let client_info = request
        .params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .cloned();

    let sid = sessions.create_session(negotiated, client_info);
    debug!(session_id = %sid, "MCP session created");
    sid
}

fn validate_session(
    sessions: &SessionManager,
    session_id: Option<&str>,
    id: &Value,
) -> Result<(), JsonRpcResponse> {
    let sid = session_id.ok_or_else(|| {
        error_response(
            id.clone(),
            INVALID_REQUEST,
            "No session ID provided. Send an initialize request first.",
        )
    })?;

    match sessions.status(sid) {
        SessionStatus::Unknown => Err(error_response(
            id.clone(),
            INVALID_REQUEST,
            "Session not found. Send an initialize request first.",
        )),
        SessionStatus::AwaitingInitialized => Err(error_response(
            id.clone(),
            INVALID_REQUEST,
            "Session not initialized. Send notifications/initialized first.",
        )),
        SessionStatus::Ready => {
            sessions.touch(sid);
            Ok(())
        }
    }
}
