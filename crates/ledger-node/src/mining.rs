use ledger_core::{pow, Block, MineError, Transaction};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, info_span, warn, Instrument, Span};

use crate::error::NodeError;
use crate::state::AppState;

/// What a transaction request learns within its acknowledgment window.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Mined, applied to the ledger and appended.
    Committed(Block),
    /// Still mining (or still queued when `None`); the job keeps running and
    /// commits on its own.
    Pending(Option<Block>),
}

pub async fn submit_transaction(
    state: &AppState,
    tx: Transaction,
) -> Result<Submission, NodeError> {
    if tx.amount == 0 {
        return Err(NodeError::InvalidRequest("amount must be positive".into()));
    }
    if tx.from_address.is_empty() || tx.to_address.is_empty() {
        return Err(NodeError::InvalidRequest("addresses must not be empty".into()));
    }
    state.check_funds(&tx).await?;

    let (mut job, mut started) = spawn_job(state.clone(), tx);
    match timeout(state.config().ack_timeout, &mut job).await {
        Ok(joined) => joined
            .map_err(|e| NodeError::Internal(format!("mining job aborted: {e}")))?
            .map(Submission::Committed),
        Err(_) => Ok(Submission::Pending(started.try_recv().ok())),
    }
}

/// Spawns the job for `tx`. The receiver yields the unmined block once the
/// job holds the mining lock. The job outlives its handle; a failure is
/// logged either way.
fn spawn_job(
    state: AppState,
    tx: Transaction,
) -> (JoinHandle<Result<Block, NodeError>>, oneshot::Receiver<Block>) {
    let (started_tx, started_rx) = oneshot::channel();
    let span = info_span!(
        "mining_job",
        from = %tx.from_address,
        to = %tx.to_address,
        amount = tx.amount,
        index = field::Empty,
    );
    let job = async move {
        let result = run_job(state, tx, started_tx).await;
        if let Err(err) = &result {
            warn!(%err, "mining job failed; transaction dropped");
        }
        result
    };
    (tokio::spawn(job.instrument(span)), started_rx)
}

/// Builds, mines and commits one block for `tx`, then propagates it.
async fn run_job(
    state: AppState,
    tx: Transaction,
    started: oneshot::Sender<Block>,
) -> Result<Block, NodeError> {
    let _turn = state.mining_lock().lock().await;
    let (pending, token) = state.prepare_transaction(tx).await?;
    Span::current().record("index", pending.index);
    let _ = started.send(pending.clone());
    mine_and_commit(&state, pending, token).await
}

async fn mine_and_commit(
    state: &AppState,
    pending: Block,
    token: CancellationToken,
) -> Result<Block, NodeError> {
    let mine_timeout = state.config().mine_timeout;
    let deadline = Instant::now() + mine_timeout;
    let job_token = token.clone();
    let stop = move || job_token.is_cancelled() || Instant::now() >= deadline;
    if stop() {
        return Err(interrupted(&token, mine_timeout));
    }

    let index = pending.index;
    debug!(index, "mining started");
    let (mined, result) = tokio::task::spawn_blocking(move || {
        let mut block = pending;
        let result = pow::mine(&mut block, stop);
        (block, result)
    })
    .await
    .map_err(|e| NodeError::Internal(format!("miner thread failed: {e}")))?;

    match result {
        Ok(attempts) => info!(index, attempts, hash = %mined.hash, "block mined"),
        Err(MineError::Interrupted { attempts }) => {
            warn!(index, attempts, "mining interrupted");
            return Err(interrupted(&token, mine_timeout));
        }
    }

    let committed = state.commit_mined(mined).await?;
    state.propagate(&committed).await;
    Ok(committed)
}

fn interrupted(token: &CancellationToken, mine_timeout: Duration) -> NodeError {
    if token.is_cancelled() {
        NodeError::MiningCancelled
    } else {
        NodeError::MiningTimedOut(mine_timeout)
    }
}
