use arith_mcp_core::{RegistryBuilder, RegistryError};

pub const GREETING: &str = "Hello from MCP! This is a sample resource.";

pub const MATH_CONSTANTS: &str = "
Common Mathematical Constants:
- π (Pi): 3.14159265359
- e (Euler's number): 2.71828182846
- φ (Golden ratio): 1.61803398875
- √2 (Square root of 2): 1.41421356237
";

pub fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_resource(
            "greeting://hello",
            "get_greeting",
            "A simple greeting resource",
            || Ok(GREETING.to_string()),
        )?
        .register_resource(
            "math://constants",
            "get_math_constants",
            "Mathematical constants resource",
            || Ok(MATH_CONSTANTS.to_string()),
        )?;
    Ok(())
}
