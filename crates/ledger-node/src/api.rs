use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Account, Block, Ledger, LedgerState, Peer, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;

use crate::error::NodeError;
use crate::mining::{submit_transaction, Submission};
use crate::payload::BlockEnvelope;
use crate::state::AppState;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct Head {
    height: u64,
    hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    pub from_address: String,
    pub to_address: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxReceipt {
    pub status: String,
    pub message: String,
    pub block: Option<Block>,
}

#[derive(Deserialize)]
pub struct AccountIn {
    pub password: String,
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain/head", get(head))
        .route("/peers", get(peers))
        .route("/blocks", get(blocks).post(receive_block))
        .route("/transactions", post(transaction))
        .route("/account", get(balances).post(create_account));
    if state.config().serve_bootnode {
        app = app.route("/bootnode", get(bootnode));
    }
    app.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn head(State(state): State<AppState>) -> Json<Head> {
    let tip = state.tip().await;
    Json(Head {
        height: tip.index,
        hash: tip.hash,
    })
}

async fn peers(State(state): State<AppState>) -> Json<BTreeMap<String, Peer>> {
    Json(state.peer_snapshot().await)
}

async fn blocks(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.blocks().await)
}

async fn receive_block(
    State(state): State<AppState>,
    payload: Result<Json<BlockEnvelope>, JsonRejection>,
) -> Result<&'static str, NodeError> {
    let Json(envelope) = payload
        .map_err(|e| NodeError::InvalidRequest(format!("undecodable block: {}", e.body_text())))?;
    let block = envelope.into_block()?;
    state.accept_block(block).await?;
    Ok("Block is valid")
}

async fn transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<(StatusCode, Json<TxReceipt>), NodeError> {
    let tx = Transaction::new(tx.from_address, tx.to_address, tx.amount);
    let (status, receipt) = match submit_transaction(&state, tx).await? {
        Submission::Committed(block) => (
            StatusCode::OK,
            TxReceipt {
                status: "committed".into(),
                message: "Transfer complete".into(),
                block: Some(block),
            },
        ),
        Submission::Pending(block) => (
            StatusCode::ACCEPTED,
            TxReceipt {
                status: "mining".into(),
                message: "Transfer accepted; block is still being mined".into(),
                block,
            },
        ),
    };
    Ok((status, Json(receipt)))
}

async fn balances(State(state): State<AppState>) -> Json<Ledger> {
    Json(state.balances().await)
}

async fn create_account(
    State(state): State<AppState>,
    Json(input): Json<AccountIn>,
) -> Result<(StatusCode, Json<Account>), NodeError> {
    if input.password.is_empty() {
        return Err(NodeError::InvalidRequest("password must not be empty".into()));
    }
    let account = state.create_account(&input.password).await;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn bootnode(State(state): State<AppState>) -> Json<LedgerState> {
    Json(state.snapshot().await)
}
