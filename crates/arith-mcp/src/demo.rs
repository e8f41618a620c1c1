//! Client walkthrough: drives every operation of the arithmetic server once
//! and prints the results.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use url::Url;

use crate::client::{ClientError, ClientOptions, StreamableClient, Transport};
use crate::config::ClientConfig;

pub async fn run(config: &ClientConfig) -> Result<()> {
    let url = Url::parse(&config.url).with_context(|| format!("Invalid server URL {}", config.url))?;
    let options = ClientOptions::new(config.client_name.clone())
        .with_timeout(Duration::from_secs(config.timeout_secs));
    let mut client = StreamableClient::connect(url, options)?;

    let outcome = walkthrough(&mut client, &mut std::io::stdout()).await;

    if let Err(err) = &outcome {
        if err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_unreachable)
        {
            eprintln!(
                "{} could not reach {}. Is the server running? Start it with `arith-mcp serve`.",
                "error:".red().bold(),
                config.url
            );
        }
    }
    outcome
}

pub async fn walkthrough<T: Transport, W: Write>(
    client: &mut StreamableClient<T>,
    out: &mut W,
) -> Result<()> {
    let init = client.initialize().await.context("initialize failed")?;
    section(out, "initialize")?;
    writeln!(out, "SID={}", client.session_id().unwrap_or("<none>"))?;
    print_json(out, &init)?;

    section(out, "notifications/initialized")?;
    writeln!(out, "Sent after initialize, server acknowledged\n")?;

    let added = client.call_tool("add", json!({"a": 2, "b": 3})).await?;
    section(out, "tools/call (add)")?;
    print_json(out, &added)?;

    let tools = client.list_tools().await?;
    section(out, "tools/list")?;
    print_json(out, &tools)?;

    let resources = client.list_resources().await?;
    section(out, "resources/list")?;
    print_json(out, &resources)?;

    for uri in ["greeting://hello", "math://constants"] {
        let contents = client.read_resource(uri).await?;
        section(out, &format!("resources/read ({uri})"))?;
        print_json(out, &contents)?;
    }

    let prompts = client.list_prompts().await?;
    section(out, "prompts/list")?;
    print_json(out, &prompts)?;

    let math = client
        .get_prompt(
            "math_problem",
            json!({"operation": "+", "num1": "10", "num2": "20"}),
        )
        .await?;
    section(out, "prompts/get (math_problem)")?;
    print_json(out, &math)?;

    let greeting = client
        .get_prompt("greeting_prompt", json!({"name": "Alice"}))
        .await?;
    section(out, "prompts/get (greeting_prompt)")?;
    print_json(out, &greeting)?;

    for (tool, a, b) in [("subtract", 10, 4), ("multiply", 6, 7), ("divide", 20, 4)] {
        let result = client.call_tool(tool, json!({"a": a, "b": b})).await?;
        section(out, &format!("tools/call ({tool} {a}, {b})"))?;
        print_json(out, &result)?;
    }

    section(out, "tools/call (divide 1, 0)")?;
    match client.call_tool("divide", json!({"a": 1, "b": 0})).await {
        Ok(result) => print_json(out, &result)?,
        Err(err @ ClientError::Rpc { .. }) => {
            writeln!(out, "{} {err}\n", "expected error:".yellow())?;
        }
        Err(err) => return Err(err.into()),
    }

    client.shutdown().await?;
    writeln!(out, "{}", "Session closed".green())?;
    Ok(())
}

fn section<W: Write>(out: &mut W, title: &str) -> std::io::Result<()> {
    writeln!(out, "{}", format!("=== {title} ===").bold().cyan())
}

fn print_json<W: Write, S: Serialize>(out: &mut W, value: &S) -> Result<()> {
    writeln!(out, "{}\n", serde_json::to_string_pretty(value)?)?;
    Ok(())
}
