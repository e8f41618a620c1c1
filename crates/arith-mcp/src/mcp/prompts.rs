use std::collections::BTreeMap;

use arith_mcp_core::types::PromptMessage;
use arith_mcp_core::{HandlerError, PromptParam, RegistryBuilder, RegistryError};

pub fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_prompt(
            "math_problem",
            "Generate a math problem prompt",
            vec![
                PromptParam::new("operation", "+"),
                PromptParam::new("num1", "5"),
                PromptParam::new("num2", "3"),
            ],
            math_problem,
        )?
        .register_prompt(
            "greeting_prompt",
            "Generate a personalized greeting prompt",
            vec![PromptParam::new("name", "World")],
            greeting_prompt,
        )?;
    Ok(())
}

fn math_problem(args: &BTreeMap<String, String>) -> Result<Vec<PromptMessage>, HandlerError> {
    let operation = arg(args, "operation")?;
    let num1 = int(args, "num1")?;
    let num2 = int(args, "num2")?;
    Ok(vec![PromptMessage::user(format!(
        "Solve this math problem: {} {} {} = ?",
        num1, operation, num2
    ))])
}

fn greeting_prompt(args: &BTreeMap<String, String>) -> Result<Vec<PromptMessage>, HandlerError> {
    let name = arg(args, "name")?;
    Ok(vec![PromptMessage::user(format!(
        "Create a friendly and warm greeting for {}. Make it enthusiastic!",
        name
    ))])
}

fn arg<'a>(args: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, HandlerError> {
    args.get(key)
        .map(String::as_str)
        .ok_or_else(|| HandlerError::new(format!("missing argument {}", key)))
}

fn int(args: &BTreeMap<String, String>, key: &str) -> Result<i64, HandlerError> {
    let raw = arg(args, key)?;
    raw.trim()
        .parse()
        .map_err(|_| HandlerError::new(format!("{} must be an integer, got {:?}", key, raw)))
}
