use ajo_piggybank::{PiggyBankError, PreconditionError, StorageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    NotOwner(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PiggyBankError> for DashboardError {
    fn from(e: PiggyBankError) -> Self {
        match e {
            PiggyBankError::Validation(v) => Self::Validation(v.to_string()),
            PiggyBankError::Precondition(PreconditionError::NotOwner) => {
                Self::NotOwner(PreconditionError::NotOwner.to_string())
            }
            PiggyBankError::Precondition(p) => Self::Precondition(p.to_string()),
            PiggyBankError::Network(msg) => Self::Network(msg),
            PiggyBankError::Transaction(msg) => Self::Transaction(msg),
            PiggyBankError::NotConfigured(msg) => Self::NotConfigured(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::Precondition(_) => StatusCode::CONFLICT,
            DashboardError::NotOwner(_) => StatusCode::FORBIDDEN,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Transaction(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
