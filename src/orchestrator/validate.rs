//! Validate phase: probe replacement addresses.

use super::{batch_pause, PhaseOutcome};
use crate::config::MigrationConfig;
use crate::models::{InventoryRecord, Phase};
use crate::validation::Prober;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Probe every `Created` record's replacement address.
///
/// Passing records advance to `Validated`; failing ones stay `Created`
/// with a note, so the phase can be re-run until the workload answers.
/// No provider state is mutated. `cancel` is honored between records.
pub async fn run_validate(
    prober: &dyn Prober,
    records: &mut [InventoryRecord],
    config: &MigrationConfig,
    cancel: &AtomicBool,
) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::default();
    let mut acted = 0;

    for record in records.iter_mut() {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("cancellation requested, stopping validate before the next record");
            break;
        }
        if record.phase != Phase::Created {
            log::debug!("{}: {} record, skipping validate", record.name, record.phase);
            outcome.skipped += 1;
            continue;
        }
        if record.replacement_address.is_empty() {
            // Created implies a replacement address; a hand-edited
            // snapshot can break that.
            log::warn!(
                "{}: Created but no replacement address recorded, skipping",
                record.name
            );
            outcome.skipped += 1;
            continue;
        }

        batch_pause(acted, config.batch_size, config.batch_delay());
        acted += 1;

        let report = prober
            .probe(&record.replacement_address, &config.validation.ports)
            .await;

        if report.reachable() {
            record.push_note(&format!("validated: {}", report.describe()));
            match record.set_phase(Phase::Validated, Utc::now()) {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    record.fail(&format!("phase transition rejected: {e}"));
                    outcome.failed += 1;
                }
            }
        } else {
            log::warn!(
                "{}: {} not reachable ({}), staying Created",
                record.name,
                record.replacement_address,
                report.describe()
            );
            record.push_note(&format!("validation failed: {}", report.describe()));
            outcome.retryable += 1;
        }
    }

    outcome
}
