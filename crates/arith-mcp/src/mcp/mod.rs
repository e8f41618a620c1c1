pub mod prompts;
pub mod resources;
pub mod router;
pub mod session;
pub mod tools;
pub mod transport;

use arith_mcp_core::types::Implementation;
use arith_mcp_core::{Dispatcher, Registry, RegistryError};

pub use router::{dispatch_request, handle_notification};
pub use session::SessionManager;

/// Build the dispatcher serving the arithmetic tools, resources and prompts.
pub fn build_dispatcher(server_name: &str) -> Result<Dispatcher, RegistryError> {
    let mut builder = Registry::builder();
    tools::register(&mut builder)?;
    resources::register(&mut builder)?;
    prompts::register(&mut builder)?;
    Ok(Dispatcher::new(
        builder.build(),
        Implementation::new(server_name, env!("CARGO_PKG_VERSION")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_everything() {
        let dispatcher = build_dispatcher("arith-mcp").unwrap();
        let registry = dispatcher.registry();
        let tools: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tools, vec!["add", "subtract", "multiply", "divide"]);
        let uris: Vec<&str> = registry.resources().iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["greeting://hello", "math://constants"]);
        let prompts: Vec<&str> = registry.prompts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(prompts, vec!["math_problem", "greeting_prompt"]);
    }
}
