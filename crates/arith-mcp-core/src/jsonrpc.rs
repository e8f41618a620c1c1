use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

// JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Split the response into its result or its error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(err),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Any JSON-RPC envelope. Serializes to the bare envelope object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.method),
            JsonRpcMessage::Notification(notif) => Some(&notif.method),
            JsonRpcMessage::Response(_) => None,
        }
    }
}

impl From<JsonRpcRequest> for JsonRpcMessage {
    fn from(req: JsonRpcRequest) -> Self {
        JsonRpcMessage::Request(req)
    }
}

impl From<JsonRpcNotification> for JsonRpcMessage {
    fn from(notif: JsonRpcNotification) -> Self {
        JsonRpcMessage::Notification(notif)
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(resp: JsonRpcResponse) -> Self {
        JsonRpcMessage::Response(resp)
    }
}

fn invalid_request(detail: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INVALID_REQUEST, format!("Invalid Request: {}", detail))
}

/// Parse a JSON value into a JsonRpcMessage.
///
/// A `method` field makes the envelope a request or notification; presence of
/// "id" (even if null) distinguishes the two. Otherwise the envelope must be a
/// response carrying exactly one of `result` and `error`.
pub fn parse_message(body: &Value) -> Result<JsonRpcMessage, JsonRpcError> {
    let obj = body
        .as_object()
        .ok_or_else(|| invalid_request("expected JSON object"))?;

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        _ => return Err(invalid_request("jsonrpc must be \"2.0\"")),
    }

    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");

    if obj.contains_key("method") {
        if has_result || has_error {
            return Err(invalid_request("method and result/error are exclusive"));
        }
        if obj.contains_key("id") {
            serde_json::from_value::<JsonRpcRequest>(body.clone())
                .map(JsonRpcMessage::Request)
                .map_err(invalid_request)
        } else {
            serde_json::from_value::<JsonRpcNotification>(body.clone())
                .map(JsonRpcMessage::Notification)
                .map_err(invalid_request)
        }
    } else if has_result || has_error {
        parse_response(obj, has_result, has_error).map(JsonRpcMessage::Response)
    } else {
        Err(invalid_request("missing method field"))
    }
}

// Built by hand so that `"result": null` survives as Some(Null).
fn parse_response(
    obj: &Map<String, Value>,
    has_result: bool,
    has_error: bool,
) -> Result<JsonRpcResponse, JsonRpcError> {
    if has_result && has_error {
        return Err(invalid_request("response has both result and error"));
    }
    let id = obj
        .get("id")
        .cloned()
        .ok_or_else(|| invalid_request("response without id"))?;

    let error = match obj.get("error") {
        Some(err) => {
            let mut parsed = serde_json::from_value::<JsonRpcError>(err.clone())
                .map_err(|e| invalid_request(format!("malformed error object: {}", e)))?;
            // `"data": null` is a value, not an absent field.
            parsed.data = err.get("data").cloned();
            Some(parsed)
        }
        None => None,
    };

    Ok(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        result: obj.get("result").cloned(),
        error,
    })
}

/// Decode raw bytes into a JsonRpcMessage.
pub fn decode(bytes: &[u8]) -> Result<JsonRpcMessage, JsonRpcError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)))?;
    parse_message(&value)
}

/// Encode a message as a single-line JSON document.
pub fn encode(message: &JsonRpcMessage) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(message)
}

/// Create a success response with the given id and result.
pub fn success_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        result: Some(result),
        error: None,
    }
}

/// Create an error response with the given id, code, and message.
pub fn error_response(id: Value, code: i64, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        result: None,
        error: Some(JsonRpcError::new(code, message)),
    }
}
