//! Error taxonomy for the migration tool.
//!
//! Configuration and authentication problems are fatal and abort an
//! invocation before anything has been mutated. Provider errors are split
//! into transient (the record keeps its phase, re-running the phase
//! retries) and permanent (the record moves to `Failed`); the orchestrator
//! branches on this split at the per-record boundary.

use crate::models::Phase;
use thiserror::Error;

/// All failure classes surfaced by the migration core.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Invalid or unusable configuration, detected before any provider call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The Azure CLI session is missing or expired.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Subscription selection produced an empty working set.
    #[error("no subscriptions available after applying include/exclude filters")]
    NoSubscriptionsAvailable,

    /// Provider call failed in a way that a later re-run may succeed.
    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    /// Provider call failed permanently for this record.
    #[error("provider error: {0}")]
    ProviderPermanent(String),

    /// A replacement address did not pass reachability validation.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// A phase precondition was not met; the record is skipped, not failed.
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Cleanup would delete resources but was not explicitly confirmed.
    #[error("cleanup would delete legacy addresses; re-run with --confirm to proceed")]
    ConfirmationRequired,

    /// Attempted backward or invalid phase transition.
    #[error("invalid phase transition {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    /// Inventory snapshot could not be read or written.
    #[error("inventory store error: {0}")]
    Store(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// True for errors that leave the record in its prior phase so a later
    /// invocation of the same phase can retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, MigrationError::ProviderTransient(_))
    }
}
