use ledger_core::Block;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::PUSH_BACKOFF_MS;
use crate::payload::BlockEnvelope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered { attempts: u32 },
    /// The peer answered 4xx; retrying would not change its mind.
    Refused { status: u16, reason: String },
    Failed { attempts: u32, error: String },
}

/// Pushes newly mined blocks to every known peer. Each push is independent
/// and its result is only logged.
#[derive(Clone)]
pub struct Propagator {
    client: reqwest::Client,
    peer_port: u16,
    timeout: Duration,
    attempts: u32,
}

impl Propagator {
    pub fn new(peer_port: u16, timeout: Duration, attempts: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            peer_port,
            timeout,
            attempts: attempts.max(1),
        }
    }

    pub fn broadcast(&self, block: &Block, peers: Vec<IpAddr>) -> Vec<JoinHandle<PushOutcome>> {
        if peers.is_empty() {
            debug!(index = block.index, "no peers to propagate to");
            return vec![];
        }
        let envelope = match BlockEnvelope::encode(block) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%err, "block not propagated");
                return vec![];
            }
        };
        peers
            .into_iter()
            .map(|ip| {
                let propagator = self.clone();
                let envelope = envelope.clone();
                let index = block.index;
                tokio::spawn(async move {
                    let outcome = propagator.push(ip, &envelope).await;
                    match &outcome {
                        PushOutcome::Delivered { attempts } => {
                            info!(%ip, index, attempts, "block delivered")
                        }
                        PushOutcome::Refused { status, reason } => {
                            warn!(%ip, index, status, %reason, "peer refused block")
                        }
                        PushOutcome::Failed { attempts, error } => {
                            warn!(%ip, index, attempts, %error, "block push failed")
                        }
                    }
                    outcome
                })
            })
            .collect()
    }

    pub async fn push(&self, ip: IpAddr, envelope: &BlockEnvelope) -> PushOutcome {
        let url = format!("http://{}/blocks", SocketAddr::new(ip, self.peer_port));
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            let sent = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(envelope)
                .send()
                .await;
            match sent {
                Ok(res) if res.status().is_success() => {
                    return PushOutcome::Delivered { attempts: attempt }
                }
                Ok(res) if res.status().is_client_error() => {
                    let status = res.status().as_u16();
                    let reason = res.text().await.unwrap_or_default();
                    return PushOutcome::Refused { status, reason };
                }
                Ok(res) => last_error = format!("status {}", res.status()),
                Err(err) => last_error = err.to_string(),
            }
            if attempt < self.attempts {
                let backoff = Duration::from_millis(PUSH_BACKOFF_MS * u64::from(attempt));
                tokio::time::sleep(backoff).await;
            }
        }
        PushOutcome::Failed {
            attempts: self.attempts,
            error: last_error,
        }
    }
}
