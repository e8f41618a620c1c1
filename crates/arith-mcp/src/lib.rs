pub mod client;
pub mod config;
pub mod demo;
pub mod mcp;
pub mod server;
