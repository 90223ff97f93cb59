//! Create phase: allocate Standard replacements.

use super::{batch_pause, nic_ref, PhaseOutcome};
use crate::azure::client::{AddressSpec, InterfaceRef, PublicIpClient};
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::models::{ipconfig_name, ConsumerKind, InventoryRecord, Phase};
use crate::validation::security_rule_warning;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Drive every eligible `Pending` record to `Created`.
///
/// Eligible means `Pending` and attached to nothing or to a network
/// interface; everything else is skipped. Dry-run logs the intended
/// actions and touches neither the records nor the provider. `cancel` is
/// honored between records, never mid-record.
pub fn run_create(
    client: &dyn PublicIpClient,
    records: &mut [InventoryRecord],
    config: &MigrationConfig,
    dry_run: bool,
    cancel: &AtomicBool,
) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::default();
    let mut acted = 0;

    for record in records.iter_mut() {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("cancellation requested, stopping create before the next record");
            break;
        }
        if record.phase != Phase::Pending {
            log::debug!("{}: already {}, skipping create", record.name, record.phase);
            outcome.skipped += 1;
            continue;
        }
        if !record.automation_eligible() {
            log::info!(
                "{}: {} consumers are not automated, skipping",
                record.name,
                record.consumer_kind
            );
            outcome.skipped += 1;
            continue;
        }

        if dry_run {
            log_planned_create(record, config);
            outcome.skipped += 1;
            continue;
        }

        batch_pause(acted, config.batch_size, config.batch_delay());
        acted += 1;

        match create_one(client, record, config) {
            Ok(()) => outcome.succeeded += 1,
            Err(e) if e.is_transient() => {
                log::warn!("{}: transient error, create will retry: {e}", record.name);
                record.push_note(&format!("transient error during create, retry: {e}"));
                outcome.retryable += 1;
            }
            Err(e) => {
                log::error!("{}: create failed: {e}", record.name);
                record.fail(&format!("create failed: {e}"));
                outcome.failed += 1;
            }
        }
    }

    outcome
}

fn log_planned_create(record: &InventoryRecord, config: &MigrationConfig) {
    log::info!(
        "[dry-run] would create public IP {} in {}/{}: sku=Standard allocation={} version={} zones={:?} tag {}={}",
        record.replacement_name,
        record.resource_group,
        record.location,
        config.standard_allocation_method,
        config.address_version,
        if config.use_zones { config.zones.clone() } else { vec![] },
        config.tag_key,
        config.tag_value
    );
    if record.consumer_kind == ConsumerKind::NetworkInterface {
        log::info!(
            "[dry-run] would attach ip configuration {} to interface {:?}/{:?}",
            ipconfig_name(&record.replacement_name),
            record.consumer_resource_group,
            record.consumer_name
        );
    }
}

fn create_one(
    client: &dyn PublicIpClient,
    record: &mut InventoryRecord,
    config: &MigrationConfig,
) -> Result<(), MigrationError> {
    let spec = AddressSpec {
        name: record.replacement_name.clone(),
        resource_group: record.resource_group.clone(),
        location: record.location.clone(),
        allocation_method: config.standard_allocation_method,
        version: config.address_version,
        zones: if config.use_zones {
            config.zones.clone()
        } else {
            vec![]
        },
        tag_key: config.tag_key.clone(),
        tag_value: config.tag_value.clone(),
    };

    let created = client.create_address(&record.subscription_id, &spec)?;
    let replacement_address = created.ip_address.clone().unwrap_or_default();
    if replacement_address.is_empty() {
        // Created implies an allocated address; Static allocation always
        // returns one.
        return Err(MigrationError::ProviderPermanent(format!(
            "{} was created without an ip address",
            created.name
        )));
    }

    if record.consumer_kind == ConsumerKind::NetworkInterface {
        let nic = nic_ref(record).ok_or_else(|| {
            MigrationError::ProviderPermanent(format!(
                "{} lacks its interface reference",
                record.name
            ))
        })?;
        attach_overlap_config(client, record, &nic, &created.id)?;
        check_security_rules(client, record, &nic, config);
    }

    record.replacement_address = replacement_address;
    record.replacement_resource_id = created.id;
    record.set_phase(Phase::Created, Utc::now())?;
    log::info!(
        "{}: replacement {} allocated at {}",
        record.name,
        record.replacement_name,
        record.replacement_address
    );
    Ok(())
}

/// Attach the overlap ip configuration, skipping when an earlier run
/// already did: the derived name is stable, so retries are no-ops.
fn attach_overlap_config(
    client: &dyn PublicIpClient,
    record: &mut InventoryRecord,
    nic: &InterfaceRef,
    address_id: &str,
) -> Result<(), MigrationError> {
    let config_name = ipconfig_name(&record.replacement_name);
    let interface = client.resolve_interface(&record.subscription_id, nic)?;

    if interface
        .ip_configurations
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(&config_name))
    {
        log::info!(
            "{}: ip configuration {config_name} already present on {}, skipping attach",
            record.name,
            nic.name
        );
        record.push_note(&format!(
            "secondary ip configuration {config_name} already present on {}",
            nic.name
        ));
        return Ok(());
    }

    client.attach_secondary_config(&record.subscription_id, nic, &config_name, address_id)?;
    record.push_note(&format!(
        "secondary ip configuration {config_name} attached to {}",
        nic.name
    ));
    Ok(())
}

/// Visibility only: a missing allow rule is a warning note, not a failure.
fn check_security_rules(
    client: &dyn PublicIpClient,
    record: &mut InventoryRecord,
    nic: &InterfaceRef,
    config: &MigrationConfig,
) {
    match client.get_security_rules(&record.subscription_id, nic) {
        Ok(rules) => {
            if let Some(warning) = security_rule_warning(&rules, &config.validation.ports) {
                log::warn!("{}: {warning}", record.name);
                record.push_note(&warning);
            }
        }
        Err(e) => {
            log::warn!("{}: security rule check failed: {e}", record.name);
        }
    }
}
