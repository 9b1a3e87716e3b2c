//! Error taxonomy for the learning core
//!
//! Three families: malformed input (rejected with a typed error or a
//! safe default), referential errors (unknown/non-active trade ids),
//! and persistence failures (logged and degraded, never fatal at
//! startup).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// `record_outcome` referenced an id with no matching active trade.
    /// Surfaced explicitly: swallowing it would desynchronize the trade
    /// count from reality.
    #[error("trade not found or not active: {0}")]
    TradeNotFound(String),

    /// A trade already reached `Completed`; terminal state is irreversible.
    #[error("trade {0} is already completed")]
    TradeAlreadyCompleted(String),

    /// Required trade fields missing or out of range.
    #[error("invalid trade entry: {0}")]
    InvalidEntry(String),

    /// Malformed outcome payload (non-finite exit price etc).
    #[error("invalid trade outcome: {0}")]
    InvalidOutcome(String),

    /// Persistence boundary failure. Load-time failures are handled
    /// internally by falling back to defaults; save-time failures are
    /// logged by the engine and surfaced here only from explicit
    /// save/load calls.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
