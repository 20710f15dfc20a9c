use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use umg_models::config::UmgConfig;
use umg_models::invocation::ToolInvocation;

#[derive(Parser, Debug)]
#[command(name = "umg", about = "Unified Market Gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/umg.toml")]
    config: String,

    /// Read the tool invocation JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Print the client-facing tool declarations and exit
    #[arg(long)]
    list_tools: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config; a missing file falls back to defaults
    let config: UmgConfig = match std::fs::read_to_string(&cli.config) {
        Ok(raw) => {
            toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", cli.config))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %cli.config, "Config file not found, using defaults");
            UmgConfig::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config: {}", cli.config));
        }
    };

    let gateway = umg::build_gateway(&config).context("Failed to build gateway")?;

    if cli.list_tools {
        gateway.discover_capabilities().await;
        return print_json(&serde_json::to_value(gateway.list_tools())?, cli.pretty);
    }

    // Read invocation
    let invocation_json = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let invocation: ToolInvocation =
        serde_json::from_str(&invocation_json).context("Failed to parse ToolInvocation JSON")?;

    // Typed gateway errors become structured client payloads, not process
    // failures; only config/input problems exit non-zero.
    let output = match gateway
        .invoke(
            &invocation.tool,
            invocation.arguments,
            invocation.correlation_id,
        )
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(tool = %invocation.tool, error = %e, "Tool invocation failed");
            e.to_client_json()
        }
    };

    print_json(&output, cli.pretty)
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
