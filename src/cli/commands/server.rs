use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;
use std::time::Duration;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the API /health endpoint")]
    Health {
        #[arg(long, env = "GRC_SERVER_URL", default_value = "http://localhost:3000", help = "Server base URL")]
        url: String,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let endpoint = format!("{}/health", url.trim_end_matches('/'));

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            let response = client
                .get(&endpoint)
                .send()
                .await
                .with_context(|| format!("failed to reach {}", endpoint))?;

            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);

            if status.is_success() {
                output_success(&output_format, &format!("{} is healthy", url), body.get("data").cloned())
            } else {
                output_error(&output_format, &format!("{} is unhealthy ({})", url, status), Some("UNHEALTHY"))?;
                anyhow::bail!("health check failed with status {}", status)
            }
        }
    }
}
