use ledger_core::{Block, Chain, Ledger};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::NodeError;
use crate::state::AppState;

/// Body of `GET /bootnode`.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub state: BTreeMap<String, i64>,
    pub blocks: Vec<Block>,
}

pub async fn fetch_snapshot(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Snapshot, NodeError> {
    let url = format!("{}/bootnode", base_url.trim_end_matches('/'));
    let snapshot = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Snapshot>()
        .await?;
    Ok(snapshot)
}

/// Turns a snapshot into chain and ledger. With `verify` off the blocks are
/// taken on trust, as long as there is at least one.
pub fn adopt(snapshot: Snapshot, verify: bool) -> Result<(Chain, Ledger), NodeError> {
    let chain = if verify {
        Chain::from_verified_blocks(snapshot.blocks)?
    } else {
        Chain::from_blocks(snapshot.blocks)?
    };
    Ok((chain, Ledger::from_balances(snapshot.state)))
}

/// Seeds local state from the configured bootnode. On failure the node keeps
/// its fresh genesis-only state.
pub async fn bootstrap(state: &AppState) -> Result<(), NodeError> {
    let config = state.config();
    let client = reqwest::Client::builder()
        .timeout(config.push_timeout)
        .build()?;
    let snapshot = fetch_snapshot(&client, &config.bootnode_url).await?;
    let (chain, ledger) = adopt(snapshot, config.verify_snapshot)?;
    info!(url = %config.bootnode_url, height = chain.tip().index, "bootstrapped from bootnode");
    state.replace(chain, ledger).await;
    Ok(())
}

pub async fn bootstrap_or_warn(state: &AppState) {
    if let Err(err) = bootstrap(state).await {
        warn!(%err, url = %state.config().bootnode_url, "bootstrap failed; starting from genesis");
    }
}
