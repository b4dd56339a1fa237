use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger_core::{ChainError, CommitError, LedgerError, Rejection};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Funds(#[from] LedgerError),

    #[error("Block is not valid: {0}")]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("mining cancelled: chain tip changed")]
    MiningCancelled,

    #[error("mining gave up after {0:?}")]
    MiningTimedOut(std::time::Duration),

    #[error("snapshot rejected: {0}")]
    Snapshot(#[from] ChainError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::InvalidRequest(_) | NodeError::Funds(_) | NodeError::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            NodeError::Commit(_) | NodeError::MiningCancelled | NodeError::MiningTimedOut(_) => {
                StatusCode::CONFLICT
            }
            NodeError::Snapshot(_) | NodeError::Http(_) => StatusCode::BAD_GATEWAY,
            NodeError::Io(_) | NodeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
