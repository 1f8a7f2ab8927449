use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use ajo_piggybank::{
    ChainClient, ContractState, ContractStats, DiagnosticsReport, ObservedTransaction,
    SavedDraft, Submission, TimelockStatus, Toast, TxRecord,
};

use super::types::{
    ConnectRequest, DashboardSnapshot, DepositRequest, SaveDraftRequest, SessionInfo,
    StatusResponse,
};
use crate::error::DashboardError;
use crate::manager::DashboardManager;

type Manager<C> = State<Arc<DashboardManager<C>>>;

// ============================================================================
// Session
// ============================================================================

pub async fn connect_handler<C: ChainClient>(
    State(manager): Manager<C>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<SessionInfo>, DashboardError> {
    let session = manager.connect(&req.address).await?;
    Ok(Json(session))
}

pub async fn disconnect_handler<C: ChainClient>(State(manager): Manager<C>) -> Json<SessionInfo> {
    Json(manager.disconnect())
}

// ============================================================================
// Contract state
// ============================================================================

pub async fn dashboard_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Json<DashboardSnapshot> {
    Json(manager.snapshot().await)
}

pub async fn timelock_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<TimelockStatus>, DashboardError> {
    Ok(Json(manager.timelock()?))
}

pub async fn refresh_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<ContractState>, DashboardError> {
    let state = manager.refresh().await?;
    Ok(Json(state))
}

pub async fn admin_stats_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<ContractStats>, DashboardError> {
    let stats = manager.admin_stats().await?;
    Ok(Json(stats))
}

// ============================================================================
// Writes
// ============================================================================

pub async fn deposit_handler<C: ChainClient>(
    State(manager): Manager<C>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<Submission>, DashboardError> {
    let submission = manager.deposit(&req.amount).await?;
    Ok(Json(submission))
}

pub async fn withdraw_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<Submission>, DashboardError> {
    let submission = manager.withdraw().await?;
    Ok(Json(submission))
}

pub async fn withdraw_all_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<Submission>, DashboardError> {
    let submission = manager.withdraw_all().await?;
    Ok(Json(submission))
}

// ============================================================================
// Transactions & toasts
// ============================================================================

pub async fn transactions_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Json<Vec<ObservedTransaction>> {
    Json(manager.recent_transactions())
}

pub async fn submissions_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Json<Vec<TxRecord>> {
    Json(manager.submissions())
}

pub async fn toasts_handler<C: ChainClient>(State(manager): Manager<C>) -> Json<Vec<Toast>> {
    Json(manager.toasts())
}

pub async fn dismiss_toast_handler<C: ChainClient>(
    State(manager): Manager<C>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, DashboardError> {
    manager.dismiss_toast(&id)?;
    Ok(Json(StatusResponse {
        id,
        status: "dismissed".to_string(),
    }))
}

// ============================================================================
// Saved drafts
// ============================================================================

pub async fn list_bookmarks_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<Vec<SavedDraft>>, DashboardError> {
    Ok(Json(manager.list_drafts()?))
}

pub async fn save_bookmark_handler<C: ChainClient>(
    State(manager): Manager<C>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<SavedDraft>, DashboardError> {
    let draft = manager.save_draft(req)?;
    Ok(Json(draft))
}

pub async fn delete_bookmark_handler<C: ChainClient>(
    State(manager): Manager<C>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, DashboardError> {
    manager.delete_draft(&id)?;
    Ok(Json(StatusResponse {
        id,
        status: "deleted".to_string(),
    }))
}

// ============================================================================
// Diagnostics
// ============================================================================

pub async fn diagnostics_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Json<DiagnosticsReport> {
    Json(manager.diagnostics().await)
}

pub async fn clear_diagnostics_handler<C: ChainClient>(
    State(manager): Manager<C>,
) -> Result<Json<StatusResponse>, DashboardError> {
    manager.clear_diagnostics()?;
    Ok(Json(StatusResponse {
        id: "diagnostics".to_string(),
        status: "cleared".to_string(),
    }))
}
