//! HTTP node wrapping the ledger core: API, UDP peer discovery and block
//! propagation.
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod gossip;
pub mod mining;
pub mod payload;
pub mod propagate;
pub mod state;

pub use api::router;
pub use config::{GossipConfig, NodeConfig};
pub use error::NodeError;
pub use state::AppState;

use ledger_core::PeerRegistry;
use tracing::info;

/// Starts gossip, bootstraps from the bootnode when configured to, and serves
/// the HTTP API until ctrl-c.
pub async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let mut registry = PeerRegistry::new();
    for ip in config
        .advertise_ips
        .iter()
        .copied()
        .chain(gossip::detect_local_ip())
    {
        info!(%ip, "treating address as our own");
        registry.add_own_ip(ip);
    }

    let mut state = AppState::new(config.clone()).with_registry(registry);
    if let Some(gossip_config) = &config.gossip {
        let gossip = gossip::Gossip::bind(gossip_config.bind, gossip_config.target).await?;
        gossip.spawn_listener(state.peers());
        gossip.spawn_beacon(gossip_config.interval, state.peers(), config.peer_ttl);
        state = state.with_gossip(gossip);
    }

    if !config.serve_bootnode {
        bootstrap::bootstrap_or_warn(&state).await;
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("ledger-node listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
