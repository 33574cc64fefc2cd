//! Error taxonomy for the directory core.
//!
//! `DirectoryError` mirrors spec.md §7: transport faults (`Network` /
//! `Timeout`) are recoverable and carry a retry affordance; `Server` is a
//! GraphQL-reported failure surfaced verbatim and never auto-retried;
//! `Unauthorized` / `SessionExpired` drive the refresh protocol; the remaining
//! variants report export, plan-gating, storage, and serialization faults.
//! `is_recoverable()` / `is_auth()` classify a failure in the teacher's style.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Export already in progress")]
    ExportInProgress,

    #[error("Export error: {0}")]
    Export(String),

    #[error("Plan limit: {feature} not available on the {plan} plan")]
    PlanLimit { feature: String, plan: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DirectoryError {
    /// Transport-level faults the caller may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DirectoryError::Network(_) | DirectoryError::Timeout { .. }
        )
    }

    /// Failures that route through the authentication / refresh cycle.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            DirectoryError::Unauthorized(_) | DirectoryError::SessionExpired
        )
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Serialization(err.to_string())
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
