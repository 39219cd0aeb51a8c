//! Client-side subcommands that talk to a running agent.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use parley_acp::{PeerLink, PeerLinkConfig};
use parley_core::{AgentDescriptor, TaskRequest, TaskState};

use crate::output;

fn link(url: &str) -> Result<PeerLink> {
    Ok(PeerLink::new(url, PeerLinkConfig::default())?)
}

pub async fn describe(url: &str) -> Result<()> {
    let descriptor = link(url)?.fetch_descriptor().await?;
    println!("{}", serde_json::to_string_pretty(&descriptor.to_value())?);
    Ok(())
}

pub async fn send(url: &str, message: &str, session: &str) -> Result<()> {
    let request = TaskRequest::fresh(session, message);
    let result = link(url)?.submit_task(&request).await?;
    if result.state == TaskState::Failed {
        output::note_error(&format!("task {} failed", request.task_id));
    }
    println!("state: {}", result.state);
    println!("{}", result.output);
    Ok(())
}

pub async fn peers(url: &str) -> Result<()> {
    let endpoint = format!("{}/peers", url.trim().trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("Failed to reach {endpoint}"))?;
    if !response.status().is_success() {
        bail!("{endpoint} answered {}", response.status());
    }
    let body: Value = response.json().await?;
    let peers = parse_peers(body)?;
    if peers.is_empty() {
        println!("No peers registered.");
    } else {
        print!("{}", output::peer_table(&peers));
    }
    Ok(())
}

fn parse_peers(body: Value) -> Result<Vec<AgentDescriptor>> {
    let Value::Array(items) = body else {
        bail!("expected a JSON array of descriptors");
    };
    items
        .into_iter()
        .map(|item| AgentDescriptor::from_value(item).map_err(anyhow::Error::from))
        .collect()
}
