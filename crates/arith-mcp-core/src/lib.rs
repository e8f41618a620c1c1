//! Sans-IO core of the arith-mcp streamable HTTP server and client.
//!
//! Holds the JSON-RPC envelope codec, the `text/event-stream` frame decoder,
//! the tool/resource/prompt registry and the request dispatcher. Nothing in
//! here touches the network.

pub mod dispatcher;
pub mod error;
pub mod event_stream;
pub mod jsonrpc;
pub mod registry;
pub mod types;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, HandlerError, RegistryError};
pub use event_stream::{DecoderState, EventStreamDecoder, Frame};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
pub use registry::{ParamKind, ParamSpec, PromptParam, Registry, RegistryBuilder};
