use arith_mcp_core::JsonRpcError;
use reqwest::StatusCode;
use serde_json::Value;

use super::transport::TransportError;

/// Operation attempted in the wrong lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("session is not initialized; call initialize first")]
    NotInitialized,
    #[error("session is already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("server returned error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("unexpected HTTP status {status}")]
    Status { status: StatusCode },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<JsonRpcError> for ClientError {
    fn from(err: JsonRpcError) -> Self {
        ClientError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

impl ClientError {
    /// True when the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(TransportError::Connect(_) | TransportError::Timeout)
        )
    }

    /// JSON-RPC error code, for errors the server answered with.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            ClientError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arith_mcp_core::jsonrpc::INTERNAL_ERROR;

    #[test]
    fn rpc_errors_keep_code_and_message() {
        let err = ClientError::from(JsonRpcError::new(
            INTERNAL_ERROR,
            "Division by zero is not allowed.",
        ));
        assert_eq!(err.rpc_code(), Some(INTERNAL_ERROR));
        assert!(!err.is_unreachable());
        assert_eq!(
            err.to_string(),
            "server returned error -32603: Division by zero is not allowed."
        );
    }

    #[test]
    fn unreachable_is_distinguishable() {
        let err = ClientError::from(TransportError::Connect("connection refused".into()));
        assert!(err.is_unreachable());
        assert_eq!(err.rpc_code(), None);
    }
}
