//! `parley serve`: load config, register with peers, run the gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use parley_acp::{serve, Announcer, GatewayState, PeerLinkConfig, PeerRegistry};
use parley_agent::{default_skill_table, KeywordRouter, RouteTarget, RoutingRule};
use parley_config::{apply_all_defaults, validate, ParleyConfig, RouteRule};

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Config file (defaults to ~/.parley/agent.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Port to bind the gateway to
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Agent name to advertise
    #[arg(short, long)]
    pub name: Option<String>,
    /// Seed peer URL; repeat for several
    #[arg(long = "peer")]
    pub peers: Vec<String>,
    /// Host agent to announce this agent to at startup
    #[arg(long)]
    pub host_url: Option<String>,
}

impl ServeArgs {
    /// Flags win over the file. The result goes back through defaults and
    /// validation so overrides are normalized like file values.
    fn apply(&self, mut config: ParleyConfig) -> Result<ParleyConfig> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(name) = &self.name {
            config.agent.name = name.clone();
        }
        if !self.peers.is_empty() {
            config.peers = self.peers.clone();
        }
        if let Some(host) = &self.host_url {
            config.host_url = Some(host.clone());
        }

        let config = apply_all_defaults(config);
        let report = validate(&config);
        if !report.is_valid() {
            let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
            bail!("invalid options:\n  {}", messages.join("\n  "));
        }
        Ok(config)
    }
}

async fn load_config(args: &ServeArgs) -> Result<ParleyConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(crate::default_config_path);
    let config = parley_config::load_and_prepare(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    args.apply(config)
}

/// Config routes as router rules. A route naming both or neither target is
/// rejected by validation, so it is skipped here.
pub fn routing_rules(routes: &[RouteRule]) -> Vec<RoutingRule> {
    routes
        .iter()
        .filter_map(|route| {
            let target = match (&route.skill, &route.delegate) {
                (Some(skill), None) => RouteTarget::Skill(skill.clone()),
                (None, Some(peer)) => RouteTarget::Peer(peer.clone()),
                _ => return None,
            };
            Some(RoutingRule::new(&route.keywords, target))
        })
        .collect()
}

pub async fn run_server(args: ServeArgs) -> Result<()> {
    let config = load_config(&args).await?;

    logging::init_logger(
        &config.logging.level,
        config.logging.dir.as_deref().map(Path::new),
    );

    let descriptor = config.descriptor()?;
    info!(
        agent = %descriptor.name(),
        url = %descriptor.url(),
        peers = config.peers.len(),
        "Starting Parley agent"
    );

    let link_config = PeerLinkConfig {
        descriptor_timeout: Duration::from_secs(config.timeouts.descriptor_secs),
        rpc_timeout: Duration::from_secs(config.timeouts.rpc_secs),
    };
    let registry = Arc::new(PeerRegistry::with_config(
        link_config,
        config.session_tag.clone(),
    ));

    let report = registry.register_self(&config.peers).await;
    for (url, err) in &report.failed {
        warn!(url = %url, error = %err, "Seed peer unavailable");
    }
    info!(registered = ?report.registered, "Peer discovery finished");

    let router = KeywordRouter::new(
        descriptor.name(),
        default_skill_table(Arc::clone(&registry)),
        Arc::clone(&registry),
    )
    .with_rules(routing_rules(&config.routes))
    .with_fallback_peer(config.fallback_peer.clone());

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Gateway listening");

    let state = GatewayState::new(descriptor.clone(), registry, Arc::new(router));
    let server = tokio::spawn(serve(listener, state));

    if let Some(host) = &config.host_url {
        let timeout = Duration::from_secs(config.timeouts.register_secs);
        if let Err(e) = Announcer::announce_to(host, &descriptor, timeout).await {
            warn!(host = %host, error = %e, "Could not register with host");
        }
    }

    tokio::select! {
        joined = server => match joined {
            Ok(Ok(())) => info!("Gateway stopped"),
            Ok(Err(e)) => {
                error!(error = %e, "Gateway failed");
                return Err(e);
            }
            Err(e) => return Err(e.into()),
        },
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
