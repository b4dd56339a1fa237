use ledger_core::{
    Account, AddressProvider, Block, Chain, HmacAddressProvider, Ledger, LedgerState, Peer,
    PeerRegistry, Transaction,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::gossip::Gossip;
use crate::propagate::Propagator;

/// Shared handle to everything a node mutates. Chain and ledger sit behind
/// one lock and are only touched through the methods here; no lock is held
/// while mining or talking to the network.
#[derive(Clone)]
pub struct AppState {
    config: Arc<NodeConfig>,
    ledger: Arc<Mutex<LedgerState>>,
    peers: Arc<Mutex<PeerRegistry>>,
    /// Serializes local mining jobs so each builds on the latest tip.
    mining: Arc<Mutex<()>>,
    /// Cancelled and replaced whenever the tip moves under a running job.
    tip_epoch: Arc<Mutex<CancellationToken>>,
    propagator: Propagator,
    gossip: Option<Gossip>,
    accounts: Arc<dyn AddressProvider>,
}

impl AppState {
    pub fn new(config: NodeConfig) -> Self {
        let propagator = Propagator::new(
            config.peer_http_port,
            config.push_timeout,
            config.push_attempts,
        );
        Self {
            config: Arc::new(config),
            ledger: Arc::new(Mutex::new(LedgerState::new())),
            peers: Arc::new(Mutex::new(PeerRegistry::new())),
            mining: Arc::new(Mutex::new(())),
            tip_epoch: Arc::new(Mutex::new(CancellationToken::new())),
            propagator,
            gossip: None,
            accounts: Arc::new(HmacAddressProvider),
        }
    }

    pub fn with_registry(mut self, registry: PeerRegistry) -> Self {
        self.peers = Arc::new(Mutex::new(registry));
        self
    }

    pub fn with_gossip(mut self, gossip: Gossip) -> Self {
        self.gossip = Some(gossip);
        self
    }

    pub fn with_address_provider(mut self, accounts: Arc<dyn AddressProvider>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn peers(&self) -> Arc<Mutex<PeerRegistry>> {
        Arc::clone(&self.peers)
    }

    pub(crate) fn mining_lock(&self) -> &Mutex<()> {
        &self.mining
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.ledger.lock().await.chain().blocks().to_vec()
    }

    pub async fn tip(&self) -> Block {
        self.ledger.lock().await.tip().clone()
    }

    pub async fn balances(&self) -> Ledger {
        self.ledger.lock().await.ledger().clone()
    }

    pub async fn snapshot(&self) -> LedgerState {
        self.ledger.lock().await.clone()
    }

    pub async fn peer_snapshot(&self) -> BTreeMap<String, Peer> {
        self.peers.lock().await.snapshot()
    }

    pub async fn check_funds(&self, tx: &Transaction) -> Result<(), NodeError> {
        self.ledger
            .lock()
            .await
            .ledger()
            .ensure_funds(&tx.from_address, tx.amount)?;
        Ok(())
    }

    /// Builds the pending block for `tx` together with the token that fires
    /// once the tip it builds on is replaced. Both are taken under the ledger
    /// lock, so no peer block can slip in between.
    pub async fn prepare_transaction(
        &self,
        tx: Transaction,
    ) -> Result<(Block, CancellationToken), NodeError> {
        let ledger = self.ledger.lock().await;
        let pending = ledger.prepare_transaction(tx)?;
        let token = self.mining_token().await;
        Ok((pending, token))
    }

    pub async fn commit_mined(&self, block: Block) -> Result<Block, NodeError> {
        Ok(self.ledger.lock().await.commit_mined(block)?.clone())
    }

    /// Token for a mining job that fires when the tip changes underneath it.
    pub async fn mining_token(&self) -> CancellationToken {
        self.tip_epoch.lock().await.child_token()
    }

    async fn tip_moved(&self) {
        let mut epoch = self.tip_epoch.lock().await;
        epoch.cancel();
        *epoch = CancellationToken::new();
    }

    /// Validates and applies a block mined by a peer.
    pub async fn accept_block(&self, block: Block) -> Result<Block, NodeError> {
        let mut ledger = self.ledger.lock().await;
        match ledger.accept_block(block) {
            Ok(accepted) => {
                let accepted = accepted.clone();
                // still under the ledger lock: the epoch and the tip move together
                self.tip_moved().await;
                Ok(accepted)
            }
            Err(rejection) => {
                warn!(%rejection, "rejected block from peer");
                Err(rejection.into())
            }
        }
    }

    pub async fn replace(&self, chain: Chain, ledger: Ledger) {
        let mut state = self.ledger.lock().await;
        state.replace(chain, ledger);
        self.tip_moved().await;
    }

    /// Fans `block` out to every currently known peer.
    pub async fn propagate(&self, block: &Block) {
        let peers = self.peers.lock().await.addresses();
        self.propagator.broadcast(block, peers);
    }

    pub async fn create_account(&self, password: &str) -> Account {
        let account = self.accounts.new_account(password);
        let balance = self.ledger.lock().await.credit_if_unseen(&account.address);
        info!(address = %account.address, balance, "account created");
        if let Some(gossip) = &self.gossip {
            gossip.announce_account(&account.address).await;
        }
        account
    }
}
