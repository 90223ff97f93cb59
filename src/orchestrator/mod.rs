//! Migration orchestration: the phase state machine.
//!
//! Each phase walks the inventory in stable discovery order, one record at
//! a time, gating on the record's `phase` field. Errors are isolated at
//! the record boundary: one failing record never aborts its siblings.
//! - [`create`] - Allocate Standard replacements and attach overlap configs
//! - [`validate`] - Probe replacement addresses for reachability
//! - [`cleanup`] - Soak-gated removal of the legacy addresses

mod cleanup;
mod create;
mod validate;

pub use cleanup::{run_cleanup, soak_hours_remaining};
pub use create::run_create;
pub use validate::run_validate;

use crate::azure::client::InterfaceRef;
use crate::models::InventoryRecord;
use colored::Colorize;
use std::time::Duration;

/// Per-invocation counts, one per phase run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Records that advanced a phase.
    pub succeeded: usize,
    /// Records skipped by a precondition (wrong phase, unsupported kind,
    /// soak not elapsed, dry-run).
    pub skipped: usize,
    /// Records left in their prior phase for a later retry (transient
    /// provider errors, failed validation probes).
    pub retryable: usize,
    /// Records that moved to `Failed`.
    pub failed: usize,
}

impl PhaseOutcome {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// One summary line per phase run.
    pub fn log(&self, phase: &str) {
        let failed = if self.failed > 0 {
            self.failed.to_string().on_red().to_string()
        } else {
            self.failed.to_string()
        };
        log::info!(
            "{phase} finished: {} advanced, {} skipped, {} retryable, {failed} failed",
            self.succeeded,
            self.skipped,
            self.retryable
        );
    }
}

/// Pause before acting on the next record once a full batch has been
/// processed. Throughput control for the provider's rate limits, not a
/// correctness boundary.
pub(crate) fn batch_pause(acted: usize, batch_size: usize, delay: Duration) {
    if acted > 0 && batch_size > 0 && acted % batch_size == 0 && !delay.is_zero() {
        log::info!(
            "batch of {batch_size} done, pausing {}s before the next",
            delay.as_secs()
        );
        std::thread::sleep(delay);
    }
}

/// Interface reference for a NIC-bound record, when both halves survived
/// discovery.
pub(crate) fn nic_ref(record: &InventoryRecord) -> Option<InterfaceRef> {
    match (&record.consumer_name, &record.consumer_resource_group) {
        (Some(name), Some(resource_group)) => Some(InterfaceRef {
            name: name.clone(),
            resource_group: resource_group.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_failure_flag() {
        let mut outcome = PhaseOutcome::default();
        assert!(!outcome.has_failures());
        outcome.failed = 1;
        assert!(outcome.has_failures());
    }

    #[test]
    fn test_zero_delay_never_sleeps() {
        // Would hang the test suite if it slept.
        batch_pause(10, 10, Duration::ZERO);
        batch_pause(0, 10, Duration::from_secs(60));
        batch_pause(5, 10, Duration::from_secs(60));
    }
}
