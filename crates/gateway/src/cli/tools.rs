//! `birdcall tools`: list what the server exposes.

use std::time::{Duration, Instant};

use anyhow::Context;

use bc_domain::config::Config;
use bc_domain::tool::ToolDescriptor;
use bc_mcp_client::McpClient;

/// What one `tools` run found out about the server.
#[derive(Debug)]
pub struct ServerSummary {
    pub name: String,
    pub version: String,
    pub url: String,
    pub round_trip: Duration,
    pub tools: Vec<ToolDescriptor>,
}

/// Connect, check liveness with `ping`, fetch the tool list, disconnect.
pub async fn inspect(config: &Config, server: Option<String>) -> anyhow::Result<ServerSummary> {
    let client_cfg = super::client_config(config, server);
    let client = McpClient::connect(&client_cfg).await?;

    let result = async {
        let started = Instant::now();
        client.ping().await.context("pinging server")?;
        let round_trip = started.elapsed();
        let tools = client.list_tools().await.context("listing tools")?;
        anyhow::Ok((round_trip, tools))
    }
    .await;
    client.close().await;
    let (round_trip, tools) = result?;

    let info = &client.server_info().server_info;
    Ok(ServerSummary {
        name: info.name.clone(),
        version: info.version.clone(),
        url: client_cfg.server_url,
        round_trip,
        tools,
    })
}

pub async fn list(config: &Config, server: Option<String>) -> anyhow::Result<()> {
    let summary = inspect(config, server).await?;

    println!(
        "{} {} at {} (ping {} ms)",
        summary.name,
        summary.version,
        summary.url,
        summary.round_trip.as_millis()
    );
    if summary.tools.is_empty() {
        println!("No tools available.");
        return Ok(());
    }
    let width = summary.tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in &summary.tools {
        println!("  {:width$}  {}", tool.name, tool.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bc_tools::twitter::{InMemoryTwitter, TwitterApi};

    use crate::api;
    use crate::bootstrap::build_app_state_with;

    #[tokio::test]
    async fn inspect_pings_and_lists_then_closes() {
        let api: Arc<dyn TwitterApi> = Arc::new(InMemoryTwitter::default());
        let (state, _rx) = build_app_state_with(Arc::new(Config::default()), api).unwrap();
        let app = api::app(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{addr}/mcp");
        let summary = inspect(&Config::default(), Some(url.clone())).await.unwrap();

        assert_eq!(summary.name, "birdcall");
        assert_eq!(summary.url, url);
        assert_eq!(summary.tools.len(), 7);
        assert_eq!(summary.tools[0].name, "tweet");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn inspect_fails_without_a_server() {
        let err = inspect(&Config::default(), Some("http://127.0.0.1:9/mcp".into()))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("127.0.0.1:9"), "{err:#}");
    }
}
