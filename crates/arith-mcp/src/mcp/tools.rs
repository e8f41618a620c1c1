use arith_mcp_core::{HandlerError, ParamKind, ParamSpec, RegistryBuilder, RegistryError};
use serde_json::{json, Map, Value};

/// Register the four arithmetic tools.
pub fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_tool("add", "Add 2 integers a and b", int_pair(), |args| {
            let (a, b) = operands(args)?;
            a.checked_add(b)
                .map(|v| json!(v))
                .ok_or_else(|| overflow("add"))
        })?
        .register_tool("subtract", "Subtract 2 integers a and b", int_pair(), |args| {
            let (a, b) = operands(args)?;
            a.checked_sub(b)
                .map(|v| json!(v))
                .ok_or_else(|| overflow("subtract"))
        })?
        .register_tool("multiply", "Multiply 2 integers a and b", int_pair(), |args| {
            let (a, b) = operands(args)?;
            a.checked_mul(b)
                .map(|v| json!(v))
                .ok_or_else(|| overflow("multiply"))
        })?
        .register_tool("divide", "Divide 2 integers a and b", int_pair(), |args| {
            let (a, b) = operands(args)?;
            if b == 0 {
                return Err(HandlerError::new("Division by zero is not allowed."));
            }
            Ok(json!(a as f64 / b as f64))
        })?;
    Ok(())
}

fn int_pair() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("a", ParamKind::Integer),
        ParamSpec::required("b", ParamKind::Integer),
    ]
}

fn operands(args: &Map<String, Value>) -> Result<(i64, i64), HandlerError> {
    Ok((int_arg(args, "a")?, int_arg(args, "b")?))
}

fn int_arg(args: &Map<String, Value>, key: &str) -> Result<i64, HandlerError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| HandlerError::new(format!("{} must be a 64-bit integer", key)))
}

fn overflow(op: &str) -> HandlerError {
    HandlerError::new(format!("Integer overflow in {}", op))
}
