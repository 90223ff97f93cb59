//! Cleanup phase: soak-gated deletion of legacy addresses.

use super::{batch_pause, nic_ref, PhaseOutcome};
use crate::azure::client::{InterfaceRef, PublicIpClient};
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::models::{ConsumerKind, InventoryRecord, Phase};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

/// Delete the legacy address of every `Validated` record past the soak
/// period.
///
/// `now` is captured once at invocation start; a record short of the
/// threshold at that instant stays skipped for the whole run, which can
/// only delay a deletion, never hurry one. Deletion requires the explicit
/// confirmation flag: when deletable records exist without it, the whole
/// invocation aborts before any mutation. `cancel` is honored between
/// records, never mid-record.
pub fn run_cleanup(
    client: &dyn PublicIpClient,
    records: &mut [InventoryRecord],
    config: &MigrationConfig,
    confirmed: bool,
    dry_run: bool,
    now: DateTime<Utc>,
    cancel: &AtomicBool,
) -> Result<PhaseOutcome, MigrationError> {
    let soak = Duration::hours(config.soak_period_hours);

    let deletable = records
        .iter()
        .filter(|r| r.phase == Phase::Validated && past_soak(r, soak, now))
        .count();
    if deletable > 0 && !confirmed && !dry_run {
        log::error!(
            "{deletable} record(s) are past the {}h soak period but --confirm was not given",
            config.soak_period_hours
        );
        return Err(MigrationError::ConfirmationRequired);
    }

    let mut outcome = PhaseOutcome::default();
    let mut acted = 0;

    for record in records.iter_mut() {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("cancellation requested, stopping cleanup before the next record");
            break;
        }
        if record.phase != Phase::Validated {
            log::debug!("{}: {} record, skipping cleanup", record.name, record.phase);
            outcome.skipped += 1;
            continue;
        }

        let entered_created = match record.phase_timestamp {
            Some(stamp) => stamp,
            None => {
                log::warn!(
                    "{}: no phase timestamp, cannot evaluate soak period, skipping",
                    record.name
                );
                outcome.skipped += 1;
                continue;
            }
        };
        let elapsed = now - entered_created;
        if elapsed < soak {
            log::info!(
                "{}: soak period not elapsed, {} hours remaining",
                record.name,
                soak_hours_remaining(soak, elapsed)
            );
            outcome.skipped += 1;
            continue;
        }

        if dry_run {
            log::info!(
                "[dry-run] would delete legacy public IP {}/{} ({})",
                record.resource_group,
                record.name,
                record.legacy_address
            );
            outcome.skipped += 1;
            continue;
        }

        batch_pause(acted, config.batch_size, config.batch_delay());
        acted += 1;

        match cleanup_one(client, record, now) {
            Ok(()) => outcome.succeeded += 1,
            Err(e) if e.is_transient() => {
                log::warn!("{}: transient error, cleanup will retry: {e}", record.name);
                record.push_note(&format!("transient error during cleanup, retry: {e}"));
                outcome.retryable += 1;
            }
            Err(e) => {
                log::error!("{}: cleanup failed: {e}", record.name);
                record.fail(&format!("cleanup failed: {e}"));
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}

/// Whole hours until a record becomes deletable.
pub fn soak_hours_remaining(soak: Duration, elapsed: Duration) -> i64 {
    (soak - elapsed).num_hours()
}

fn past_soak(record: &InventoryRecord, soak: Duration, now: DateTime<Utc>) -> bool {
    record
        .phase_timestamp
        .map(|stamp| now - stamp >= soak)
        .unwrap_or(false)
}

fn cleanup_one(
    client: &dyn PublicIpClient,
    record: &mut InventoryRecord,
    now: DateTime<Utc>,
) -> Result<(), MigrationError> {
    if record.consumer_kind == ConsumerKind::NetworkInterface {
        if let Some(nic) = nic_ref(record) {
            detach_legacy(client, record, &nic)?;
        }
    }

    client.delete_address(&record.subscription_id, &record.resource_group, &record.name)?;
    record.push_note("legacy address deleted");
    record.set_phase(Phase::Completed, now)?;
    log::info!("{}: migration completed", record.name);
    Ok(())
}

/// Dissociate the legacy address from whichever ip configuration still
/// references it. Already-absent counts as success so re-runs are safe.
fn detach_legacy(
    client: &dyn PublicIpClient,
    record: &mut InventoryRecord,
    nic: &InterfaceRef,
) -> Result<(), MigrationError> {
    let interface = client.resolve_interface(&record.subscription_id, nic)?;
    let suffix = format!("/publicipaddresses/{}", record.name.to_ascii_lowercase());

    let legacy_config = interface.ip_configurations.iter().find(|c| {
        c.public_ip_address
            .as_ref()
            .map(|r| r.id.to_ascii_lowercase().ends_with(&suffix))
            .unwrap_or(false)
    });

    match legacy_config {
        Some(config) => {
            client.detach_public_ip(&record.subscription_id, nic, &config.name)?;
            record.push_note(&format!(
                "legacy address detached from ip configuration {}",
                config.name
            ));
        }
        None => {
            log::info!(
                "{}: no ip configuration on {} still references the legacy address",
                record.name,
                nic.name
            );
            record.push_note("legacy address already detached");
        }
    }
    Ok(())
}
