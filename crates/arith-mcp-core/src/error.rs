use serde_json::Value;
use thiserror::Error;

use crate::jsonrpc::{
    error_response, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND,
};

/// Failure raised by a tool, resource or prompt handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors produced while dispatching a request. All of them end up as
/// JSON-RPC error envelopes; none cross the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid Request: {0}")]
    Protocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    pub fn code(&self) -> i64 {
        match self {
            DispatchError::Protocol(_) => INVALID_REQUEST,
            DispatchError::MethodNotFound(_) => METHOD_NOT_FOUND,
            DispatchError::InvalidParams(_) => INVALID_PARAMS,
            DispatchError::Handler(_) => INTERNAL_ERROR,
        }
    }

    pub fn into_response(self, id: Value) -> JsonRpcResponse {
        error_response(id, self.code(), self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("resource already registered: {0}")]
    DuplicateResource(String),

    #[error("prompt already registered: {0}")]
    DuplicatePrompt(String),

    #[error("resource uri must have the form scheme://path: {0}")]
    InvalidUri(String),
}
