use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{FieldMap, HexDigest, Ledger, LedgerError, Transaction, ValidationFailure};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::constants::{SERVICE_NAME, SERVICE_VERSION};

/// Writers (submit, mine) take the lock exclusively; everything else reads.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub network: String,
}

impl AppState {
    pub fn new(ledger: Ledger, network: impl Into<String>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            network: network.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("mining task failed: {0}")]
    MiningTask(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Ledger(LedgerError::MalformedTransaction(_))
            | ApiError::Ledger(LedgerError::MalformedBlock(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Ledger(_) | ApiError::MiningTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BlockNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
    pub version: String,
    pub network: String,
    pub block_height: u64,
    pub peer_count: u64,
    pub pending: usize,
    pub difficulty: u32,
    pub valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct TxIn {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub metadata: Option<FieldMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxAccepted {
    pub message: String,
    pub transaction_hash: HexDigest,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MineRequest {
    pub validator: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(flatten)]
    pub failure: Option<ValidationFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    pub balance: i128,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/transactions", post(submit_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/mine", post(mine))
        .route("/blocks/latest", get(latest_block))
        .route("/blocks/{index}", get(block_by_index))
        .route("/chain", get(chain))
        .route("/chain/validate", get(validate_chain))
        .route("/balance/{address}", get(balance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("Welcome to the {SERVICE_NAME} API"),
        "status": "/status",
        "chain": "/chain",
    }))
}

async fn status(State(state): State<AppState>) -> Json<Status> {
    let ledger = state.ledger.read().await;
    Json(Status {
        status: "active".to_string(),
        version: SERVICE_VERSION.to_string(),
        network: state.network.clone(),
        block_height: ledger.height(),
        peer_count: 0,
        pending: ledger.pending().len(),
        difficulty: ledger.difficulty(),
        valid: ledger.validate(),
    })
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        timestamp: unix_now(),
    })
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Json<TxAccepted> {
    let transaction = Transaction {
        sender: tx.sender,
        recipient: tx.recipient,
        amount: tx.amount,
        timestamp: tx.timestamp.unwrap_or_else(unix_now),
        signature: tx.signature,
        metadata: tx.metadata,
    };
    info!(
        "New transaction: {} -> {}",
        transaction.sender, transaction.recipient
    );
    let transaction_hash = transaction.hash();
    state.ledger.write().await.submit_transaction(transaction);
    Json(TxAccepted {
        message: "Transaction created successfully".to_string(),
        transaction_hash,
        status: "pending".to_string(),
    })
}

async fn pending_transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.read().await.pending().to_vec())
}

/// The owned write guard moves onto the blocking pool, so concurrent mine
/// requests queue behind it and never see the same pending buffer.
async fn mine(
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> Result<Json<FieldMap>, ApiError> {
    let mut ledger = state.ledger.clone().write_owned().await;
    let block =
        tokio::task::spawn_blocking(move || ledger.mine_pending(&req.validator)).await??;
    Ok(Json(block.to_record()))
}

async fn latest_block(State(state): State<AppState>) -> Json<FieldMap> {
    Json(state.ledger.read().await.latest_block().to_record())
}

async fn block_by_index(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> Result<Json<FieldMap>, ApiError> {
    let ledger = state.ledger.read().await;
    ledger
        .block(index)
        .map(|block| Json(block.to_record()))
        .ok_or(ApiError::BlockNotFound(index))
}

async fn chain(State(state): State<AppState>) -> Json<Vec<FieldMap>> {
    Json(state.ledger.read().await.to_records())
}

async fn validate_chain(State(state): State<AppState>) -> Json<ValidationReport> {
    let failure = state.ledger.read().await.verify().err();
    Json(ValidationReport {
        valid: failure.is_none(),
        failure,
    })
}

async fn balance(State(state): State<AppState>, Path(address): Path<String>) -> Json<Balance> {
    let balance = state.ledger.read().await.balance_of(&address);
    Json(Balance { address, balance })
}
