//! Hand-rolled streamable HTTP client.
//!
//! [`StreamableClient`] owns the session lifecycle: it sends `initialize`,
//! captures the `mcp-session-id` the server hands back, follows up with
//! `notifications/initialized` and from then on attaches the session id to
//! every request. Responses are read from the body as a lazy frame stream.

pub mod error;
pub mod stream;
pub mod transport;

use arith_mcp_core::jsonrpc;
use arith_mcp_core::types::{
    CallToolResult, GetPromptResult, Implementation, InitializeParams, InitializeResult,
    ListPromptsResult, ListResourcesResult, ListToolsResult, ReadResourceResult,
    PROTOCOL_VERSION_LATEST,
};
use arith_mcp_core::{Frame, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub use error::{ClientError, SessionError};
pub use stream::FrameStream;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

use crate::mcp::transport::SESSION_HEADER;

const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub client_info: Implementation,
    /// Version requested in `initialize`.
    pub protocol_version: String,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_info: Implementation::new(client_name, env!("CARGO_PKG_VERSION")),
            protocol_version: PROTOCOL_VERSION_LATEST.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The frames of one response body, read until the reply to `id` shows up.
pub struct ResponseFrames {
    id: Value,
    session_id: Option<String>,
    frames: FrameStream,
}

impl ResponseFrames {
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Session id header carried by this response, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.frames.next().await
    }

    /// Pull frames until the response to this request arrives. Anything else
    /// the server interleaves is skipped.
    pub async fn into_response(mut self) -> Result<JsonRpcResponse, ClientError> {
        while let Some(frame) = self.frames.next().await {
            match frame? {
                Frame::Message(JsonRpcMessage::Response(resp)) if resp.id == self.id => {
                    return Ok(resp);
                }
                Frame::Message(JsonRpcMessage::Response(resp)) => {
                    debug!(id = %resp.id, expected = %self.id, "Skipping response to another request");
                }
                Frame::Message(other) => {
                    debug!(method = other.method().unwrap_or_default(), "Skipping server message");
                }
                Frame::Raw(raw) => {
                    warn!(payload = %raw, "Skipping undecodable frame");
                }
            }
        }
        Err(ClientError::Protocol(format!(
            "stream ended without a response to request {}",
            self.id
        )))
    }
}

pub struct StreamableClient<T = HttpTransport> {
    transport: T,
    endpoint: Url,
    options: ClientOptions,
    state: SessionState,
    session_id: Option<String>,
    protocol_version: Option<String>,
    next_id: u64,
}

impl StreamableClient<HttpTransport> {
    pub fn connect(endpoint: Url, options: ClientOptions) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(options.timeout)?;
        Ok(Self::with_transport(transport, endpoint, options))
    }
}

impl<T: Transport> StreamableClient<T> {
    pub fn with_transport(transport: T, endpoint: Url, options: ClientOptions) -> Self {
        Self {
            transport,
            endpoint,
            options,
            state: SessionState::Uninitialized,
            session_id: None,
            protocol_version: None,
            next_id: 1,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Version the server agreed to, once initialized.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the handshake. On an error reply the client drops back to
    /// `Uninitialized` so the caller can try again.
    pub async fn initialize(&mut self) -> Result<InitializeResult, ClientError> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Closed => return Err(SessionError::Closed.into()),
            SessionState::Initializing | SessionState::Ready => {
                return Err(SessionError::AlreadyInitialized.into())
            }
        }

        self.state = SessionState::Initializing;
        let outcome = self.handshake().await;
        if outcome.is_err() && self.state == SessionState::Initializing {
            self.state = SessionState::Uninitialized;
            self.session_id = None;
            self.protocol_version = None;
        }
        outcome
    }

    async fn handshake(&mut self) -> Result<InitializeResult, ClientError> {
        let params = InitializeParams {
            protocol_version: self.options.protocol_version.clone(),
            capabilities: json!({}),
            client_info: self.options.client_info.clone(),
        };
        let frames = self
            .post_request("initialize", Some(serde_json::to_value(&params)?))
            .await?;
        let session_id = frames.session_id.clone();
        let response = self.collect(frames).await?;
        let init: InitializeResult = serde_json::from_value(response.into_result()?)?;

        self.session_id = session_id;
        self.protocol_version = Some(init.protocol_version.clone());
        match &self.session_id {
            Some(sid) => info!(session_id = %sid, version = %init.protocol_version, "Session established"),
            None => info!(version = %init.protocol_version, "Server issued no session id, continuing without one"),
        }

        self.post_notification("notifications/initialized", None)
            .await?;
        self.state = SessionState::Ready;
        Ok(init)
    }

    /// Send a request and wait for its result.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ClientError> {
        let frames = self.send_request(method, params).await?;
        let response = self.collect(frames).await?;
        Ok(response.into_result()?)
    }

    /// Send a request and hand back the undecoded response stream.
    pub async fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<ResponseFrames, ClientError> {
        self.ensure_ready()?;
        if method == "initialize" {
            return Err(SessionError::AlreadyInitialized.into());
        }
        self.post_request(method, params).await
    }

    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.post_notification(method, params).await
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.request("ping", None).await.map(|_| ())
    }

    pub async fn list_tools(&mut self) -> Result<ListToolsResult, ClientError> {
        self.call("tools/list", None).await
    }

    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ClientError> {
        self.call(
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    pub async fn list_resources(&mut self) -> Result<ListResourcesResult, ClientError> {
        self.call("resources/list", None).await
    }

    pub async fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult, ClientError> {
        self.call("resources/read", Some(json!({ "uri": uri }))).await
    }

    pub async fn list_prompts(&mut self) -> Result<ListPromptsResult, ClientError> {
        self.call("prompts/list", None).await
    }

    pub async fn get_prompt(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<GetPromptResult, ClientError> {
        self.call(
            "prompts/get",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    /// Close the client, asking the server to drop the session if one was issued.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;

        let Some(sid) = self.session_id.clone() else {
            return Ok(());
        };
        let status = self.transport.delete(&self.endpoint, self.headers()).await?;
        if status.is_success() {
            debug!(session_id = %sid, "Session terminated");
        } else {
            debug!(session_id = %sid, status = %status, "Server did not terminate the session");
        }
        Ok(())
    }

    async fn call<R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R, ClientError> {
        let value = self.request(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Closed => Err(SessionError::Closed),
            SessionState::Uninitialized | SessionState::Initializing => {
                Err(SessionError::NotInitialized)
            }
        }
    }

    async fn post_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<ResponseFrames, ClientError> {
        let id = Value::from(self.next_id);
        self.next_id += 1;

        let request = JsonRpcRequest::new(id.clone(), method, params);
        let body = jsonrpc::encode(&request.into())?;
        debug!(method, id = %id, "Sending MCP request");

        let response = self.post(body).await?;
        let session_id = response.header(SESSION_HEADER).map(str::to_string);
        let content_type = response.content_type().map(str::to_string);
        Ok(ResponseFrames {
            id,
            session_id,
            frames: stream::frames_for(content_type.as_deref(), response.body),
        })
    }

    async fn post_notification(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), ClientError> {
        let notification = JsonRpcNotification::new(method, params);
        let body = jsonrpc::encode(&notification.into())?;
        debug!(method, "Sending MCP notification");

        let response = self.post(body).await?;
        if response.status != StatusCode::ACCEPTED {
            debug!(method, status = %response.status, "Notification answered with a body, ignoring it");
        }
        Ok(())
    }

    async fn post(&mut self, body: Vec<u8>) -> Result<TransportResponse, ClientError> {
        let headers = self.headers();
        let response = match self.transport.post(&self.endpoint, headers, body).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Transport failure, closing session");
                self.state = SessionState::Closed;
                return Err(err.into());
            }
        };

        let status = response.status;
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND && self.session_id.is_some() {
            warn!(session_id = ?self.session_id, "Server no longer knows this session, closing");
            self.state = SessionState::Closed;
        }
        Err(ClientError::Status { status })
    }

    async fn collect(&mut self, frames: ResponseFrames) -> Result<JsonRpcResponse, ClientError> {
        let result = frames.into_response().await;
        if let Err(ClientError::Transport(err)) = &result {
            warn!(error = %err, "Response stream failed, closing session");
            self.state = SessionState::Closed;
        }
        result
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        if let Some(sid) = &self.session_id {
            match HeaderValue::from_str(sid) {
                Ok(value) => {
                    headers.insert(SESSION_HEADER, value);
                }
                Err(_) => warn!(session_id = %sid, "Session id is not a valid header value"),
            }
        }
        if let Some(version) = self.protocol_version.as_deref() {
            if let Ok(value) = HeaderValue::from_str(version) {
                headers.insert(PROTOCOL_VERSION_HEADER, value);
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arith_mcp_core::jsonrpc::{INTERNAL_ERROR, INVALID_PARAMS};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream as futures_stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Reply {
        Http {
            status: StatusCode,
            content_type: &'static str,
            session_id: Option<&'static str>,
            body: String,
        },
        Refused,
    }

    impl Reply {
        fn sse(messages: &[Value]) -> Self {
            let body = messages
                .iter()
                .map(|m| format!("event: message\ndata: {m}\n\n"))
                .collect();
            Reply::Http {
                status: StatusCode::OK,
                content_type: "text/event-stream",
                session_id: None,
                body,
            }
        }

        fn sse_raw(body: &str) -> Self {
            Reply::Http {
                status: StatusCode::OK,
                content_type: "text/event-stream",
                session_id: None,
                body: body.to_string(),
            }
        }

        fn json(status: StatusCode, message: Value) -> Self {
            Reply::Http {
                status,
                content_type: "application/json",
                session_id: None,
                body: message.to_string(),
            }
        }

        fn accepted() -> Self {
            Reply::Http {
                status: StatusCode::ACCEPTED,
                content_type: "application/json",
                session_id: None,
                body: String::new(),
            }
        }

        fn with_session(mut self, sid: &'static str) -> Self {
            if let Reply::Http { session_id, .. } = &mut self {
                *session_id = Some(sid);
            }
            self
        }
    }

    struct Recorded {
        method: &'static str,
        headers: HeaderMap,
        body: Value,
    }

    impl Recorded {
        fn session(&self) -> Option<&str> {
            self.headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
        }
    }

    #[derive(Default)]
    struct MockTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<Recorded>>,
    }

    impl MockTransport {
        fn requests(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
            self.requests.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(
            &self,
            _url: &Url,
            headers: HeaderMap,
            body: Vec<u8>,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(Recorded {
                method: "POST",
                headers,
                body: serde_json::from_slice(&body).unwrap(),
            });
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");
            match reply {
                Reply::Refused => Err(TransportError::Connect("connection refused".into())),
                Reply::Http {
                    status,
                    content_type,
                    session_id,
                    body,
                } => {
                    let mut headers = HeaderMap::new();
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                    if let Some(sid) = session_id {
                        headers.insert(SESSION_HEADER, HeaderValue::from_static(sid));
                    }
                    let chunks: Vec<Result<Bytes, TransportError>> = vec![Ok(Bytes::from(body))];
                    Ok(TransportResponse {
                        status,
                        headers,
                        body: futures_stream::iter(chunks).boxed(),
                    })
                }
            }
        }

        async fn delete(&self, _url: &Url, headers: HeaderMap) -> Result<StatusCode, TransportError> {
            self.requests.lock().unwrap().push(Recorded {
                method: "DELETE",
                headers,
                body: Value::Null,
            });
            Ok(StatusCode::OK)
        }
    }

    fn ok(id: u64, result: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "result": result})
    }

    fn init_result() -> Value {
        json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "arith-mcp", "version": "0.1.0"}
        })
    }

    fn client(replies: Vec<Reply>) -> StreamableClient<MockTransport> {
        let transport = MockTransport {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        };
        StreamableClient::with_transport(
            transport,
            Url::parse("http://127.0.0.1:8000/mcp").unwrap(),
            ClientOptions::new("test-client"),
        )
    }

    async fn ready_client(extra: Vec<Reply>) -> StreamableClient<MockTransport> {
        let mut replies = vec![
            Reply::sse(&[ok(1, init_result())]).with_session("sess-123"),
            Reply::accepted(),
        ];
        replies.extend(extra);
        let mut client = client(replies);
        client.initialize().await.unwrap();
        client
    }

    #[tokio::test]
    async fn initialize_captures_session_and_sends_initialized() {
        let client = ready_client(vec![]).await;
        assert_eq!(client.state(), SessionState::Ready);
        assert_eq!(client.session_id(), Some("sess-123"));
        assert_eq!(client.protocol_version(), Some("2025-06-18"));

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body["method"], "initialize");
        assert_eq!(requests[0].body["params"]["clientInfo"]["name"], "test-client");
        assert_eq!(requests[0].session(), None);
        assert_eq!(requests[1].body["method"], "notifications/initialized");
        assert!(requests[1].body.get("id").is_none());
        assert_eq!(requests[1].session(), Some("sess-123"));
    }

    #[tokio::test]
    async fn session_id_is_attached_verbatim() {
        let mut client = ready_client(vec![
            Reply::sse(&[ok(2, json!({"tools": []}))]),
            Reply::json(StatusCode::OK, ok(3, json!({}))),
        ])
        .await;
        assert!(client.list_tools().await.unwrap().tools.is_empty());
        client.ping().await.unwrap();

        let requests = client.transport().requests();
        for req in requests.iter().skip(1) {
            assert_eq!(req.session(), Some("sess-123"));
        }
        assert_eq!(
            requests[2].headers[CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );
    }

    #[tokio::test]
    async fn operations_before_initialize_are_rejected() {
        let mut client = client(vec![]);
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::NotInitialized)));
        let err = client.notify("notifications/cancelled", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::NotInitialized)));
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let mut client = ready_client(vec![]).await;
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::AlreadyInitialized)));
        let err = client.send_request("initialize", None).await.err().unwrap();
        assert!(matches!(err, ClientError::Session(SessionError::AlreadyInitialized)));
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn initialize_error_allows_retry() {
        let mut client = client(vec![
            Reply::json(
                StatusCode::OK,
                json!({"jsonrpc": "2.0", "id": 1, "error": {"code": INVALID_PARAMS, "message": "Missing protocolVersion"}}),
            ),
            Reply::sse(&[ok(2, init_result())]).with_session("second"),
            Reply::accepted(),
        ]);

        let err = client.initialize().await.unwrap_err();
        assert_eq!(err.rpc_code(), Some(INVALID_PARAMS));
        assert_eq!(client.state(), SessionState::Uninitialized);
        assert_eq!(client.session_id(), None);

        client.initialize().await.unwrap();
        assert_eq!(client.state(), SessionState::Ready);
        assert_eq!(client.session_id(), Some("second"));
    }

    #[tokio::test]
    async fn transport_failure_closes_the_session() {
        let mut client = ready_client(vec![Reply::Refused]).await;
        let err = client.call_tool("add", json!({"a": 1, "b": 2})).await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(client.state(), SessionState::Closed);

        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::Closed)));
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::Closed)));
    }

    #[tokio::test]
    async fn refused_initialize_closes_the_session() {
        let mut client = client(vec![Reply::Refused]);
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(TransportError::Connect(_))));
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn not_found_with_session_closes_it() {
        let mut client = ready_client(vec![Reply::json(
            StatusCode::NOT_FOUND,
            json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -32600, "message": "Session not found"}}),
        )])
        .await;
        let err = client.list_resources().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status } if status == StatusCode::NOT_FOUND
        ));
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn interleaved_frames_are_skipped() {
        let body = format!(
            "data: {}\n\ndata: not json\n\ndata: {}\n\ndata: {}\n\n",
            json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}}),
            ok(99, json!({})),
            ok(2, json!({"content": [{"type": "text", "text": "5"}], "isError": false})),
        );
        let mut client = ready_client(vec![Reply::sse_raw(&body)]).await;
        let result = client.call_tool("add", json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(result.first_text(), Some("5"));
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn stream_without_matching_response_is_a_protocol_error() {
        let mut client = ready_client(vec![Reply::sse(&[json!({
            "jsonrpc": "2.0", "method": "notifications/progress", "params": {}
        })])])
        .await;
        let err = client.list_prompts().await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)), "got {err:?}");
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn rpc_errors_surface_code_and_message() {
        let mut client = ready_client(vec![Reply::sse(&[json!({
            "jsonrpc": "2.0", "id": 2,
            "error": {"code": INTERNAL_ERROR, "message": "Division by zero is not allowed."}
        })])])
        .await;
        let err = client.call_tool("divide", json!({"a": 1, "b": 0})).await.unwrap_err();
        match err {
            ClientError::Rpc { code, message, .. } => {
                assert_eq!(code, INTERNAL_ERROR);
                assert_eq!(message, "Division by zero is not allowed.");
            }
            other => panic!("expected an RPC error, got {other:?}"),
        }
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn request_ids_increase() {
        let mut client = ready_client(vec![
            Reply::sse(&[ok(2, json!({"resources": []}))]),
            Reply::sse(&[ok(3, json!({"prompts": []}))]),
        ])
        .await;
        client.list_resources().await.unwrap();
        client.list_prompts().await.unwrap();

        let ids: Vec<Value> = client
            .transport()
            .requests()
            .iter()
            .filter_map(|r| r.body.get("id").cloned())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn send_request_exposes_frames() {
        let mut client = ready_client(vec![Reply::sse(&[
            json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {}}),
            ok(2, json!({})),
        ])])
        .await;
        let mut frames = client.send_request("ping", None).await.unwrap();
        assert_eq!(frames.id(), &json!(2));
        let first = frames.next_frame().await.unwrap().unwrap();
        assert!(matches!(first, Frame::Message(JsonRpcMessage::Notification(_))));
        let response = frames.into_response().await.unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn sessionless_server_is_supported() {
        let mut client = client(vec![
            Reply::sse(&[ok(1, init_result())]),
            Reply::accepted(),
            Reply::sse(&[ok(2, json!({"contents": [{"uri": "greeting://hello", "mimeType": "text/plain", "text": "hi"}]}))]),
        ]);
        client.initialize().await.unwrap();
        assert_eq!(client.session_id(), None);

        let read = client.read_resource("greeting://hello").await.unwrap();
        assert_eq!(read.contents[0].text, "hi");
        assert!(client.transport().requests().iter().all(|r| r.session().is_none()));
    }

    #[tokio::test]
    async fn shutdown_deletes_the_session() {
        let mut client = ready_client(vec![]).await;
        client.shutdown().await.unwrap();
        assert_eq!(client.state(), SessionState::Closed);
        {
            let requests = client.transport().requests();
            let last = requests.last().unwrap();
            assert_eq!(last.method, "DELETE");
            assert_eq!(last.session(), Some("sess-123"));
        }

        client.shutdown().await.unwrap();
        assert_eq!(client.transport().requests().len(), 3);
        let err = client.get_prompt("greeting_prompt", json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::Closed)));
    }
}
