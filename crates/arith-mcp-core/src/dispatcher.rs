use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{DispatchError, HandlerError};
use crate::jsonrpc::{success_response, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use crate::registry::Registry;
use crate::types::{
    CallToolResult, ContentBlock, GetPromptResult, Implementation, InitializeResult,
    ListPromptsResult, ListResourcesResult, ListToolsResult, ReadResourceResult,
    ResourceContents, PROTOCOL_VERSION_LATEST, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Routes JSON-RPC requests to the handlers of a frozen registry.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Registry,
    server_info: Implementation,
}

impl Dispatcher {
    pub fn new(registry: Registry, server_info: Implementation) -> Self {
        Self {
            registry,
            server_info,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Handle one request. Always returns a response echoing the request id
    /// with exactly one of result or error set.
    pub fn handle(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match self.route(&request.method, request.params.as_ref()) {
            Ok(result) => success_response(request.id.clone(), result),
            Err(err) => {
                match &err {
                    DispatchError::Handler(e) => {
                        warn!(method = %request.method, error = %e, "Handler failed")
                    }
                    other => debug!(method = %request.method, error = %other, "Request rejected"),
                }
                err.into_response(request.id.clone())
            }
        }
    }

    /// Handle any envelope. Only requests produce a response.
    pub fn handle_message(&self, message: &JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(req) => Some(self.handle(req)),
            JsonRpcMessage::Notification(notif) => {
                debug!(method = %notif.method, "Notification needs no response");
                None
            }
            JsonRpcMessage::Response(resp) => {
                debug!(id = %resp.id, "Ignoring response sent to server");
                None
            }
        }
    }

    fn route(&self, method: &str, params: Option<&Value>) -> Result<Value, DispatchError> {
        let params = params_object(params)?;
        match method {
            "initialize" => self.initialize(&params),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&ListToolsResult {
                tools: self.registry.tools().iter().map(|t| t.to_tool()).collect(),
            }),
            "tools/call" => self.call_tool(&params),
            "resources/list" => to_result(&ListResourcesResult {
                resources: self
                    .registry
                    .resources()
                    .iter()
                    .map(|r| r.to_resource())
                    .collect(),
            }),
            "resources/read" => self.read_resource(&params),
            "prompts/list" => to_result(&ListPromptsResult {
                prompts: self.registry.prompts().iter().map(|p| p.to_prompt()).collect(),
            }),
            "prompts/get" => self.get_prompt(&params),
            other => Err(DispatchError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        let requested = params
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DispatchError::InvalidParams("Missing protocolVersion".into()))?;

        let negotiated = if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested
        } else {
            PROTOCOL_VERSION_LATEST
        };

        debug!(
            client_version = %requested,
            negotiated_version = %negotiated,
            client = ?params.get("clientInfo"),
            "MCP initialize request"
        );

        to_result(&InitializeResult {
            protocol_version: negotiated.to_string(),
            capabilities: json!({
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
                "prompts": { "listChanged": false },
            }),
            server_info: self.server_info.clone(),
            instructions: None,
        })
    }

    fn call_tool(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        let name = required_str(params, "name")?;
        let tool = self
            .registry
            .tool(name)
            .ok_or_else(|| DispatchError::InvalidParams(format!("Unknown tool: {}", name)))?;
        let arguments = object_field(params, "arguments")?;

        tool.validate(&arguments)?;
        debug!(tool = %name, "Calling tool");
        let output = tool.call(&arguments)?;

        let text = match output {
            Value::String(s) => s,
            other => other.to_string(),
        };
        to_result(&CallToolResult {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        })
    }

    fn read_resource(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        let uri = required_str(params, "uri")?;
        let resource = self
            .registry
            .resource(uri)
            .ok_or_else(|| DispatchError::InvalidParams(format!("Unknown resource: {}", uri)))?;

        debug!(uri = %uri, "Reading resource");
        let text = resource.read()?;
        to_result(&ReadResourceResult {
            contents: vec![ResourceContents {
                uri: resource.uri.clone(),
                mime_type: Some(resource.mime_type.clone()),
                text,
            }],
        })
    }

    fn get_prompt(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        let name = required_str(params, "name")?;
        let prompt = self
            .registry
            .prompt(name)
            .ok_or_else(|| DispatchError::InvalidParams(format!("Unknown prompt: {}", name)))?;
        let arguments = prompt.resolve_arguments(&object_field(params, "arguments")?)?;

        debug!(prompt = %name, "Rendering prompt");
        let messages = prompt.render(&arguments)?;
        to_result(&GetPromptResult {
            description: Some(prompt.description.clone()),
            messages,
        })
    }
}

fn params_object(params: Option<&Value>) -> Result<Map<String, Value>, DispatchError> {
    match params {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(DispatchError::InvalidParams("params must be an object".into())),
    }
}

fn required_str<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, DispatchError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DispatchError::InvalidParams(format!("Missing required parameter: {}", key)))
}

fn object_field(params: &Map<String, Value>, key: &str) -> Result<Map<String, Value>, DispatchError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(DispatchError::InvalidParams(format!("{} must be an object", key))),
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value)
        .map_err(|e| DispatchError::Handler(HandlerError::new(format!("serialize result: {}", e))))
}
