//! Inventory record and its phase lifecycle.

use super::consumer::ConsumerKind;
use crate::error::MigrationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a legacy name to derive the Standard replacement name.
const REPLACEMENT_SUFFIX: &str = "-std";
/// Suffix appended to the replacement name to derive the overlap ip
/// configuration name.
const IPCONFIG_SUFFIX: &str = "-ipcfg";
/// Azure caps public IP and ip configuration names at 80 characters.
const MAX_RESOURCE_NAME_LEN: usize = 80;

/// Lifecycle phase of one inventory record.
///
/// Transitions only move forward (Pending -> Created -> Validated ->
/// Completed) or sideways into Failed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Created,
    Validated,
    Completed,
    Failed,
}

impl Phase {
    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_advance(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Pending, Phase::Created)
                | (Phase::Created, Phase::Validated)
                | (Phase::Validated, Phase::Completed)
        ) || (next == Phase::Failed && !matches!(self, Phase::Completed | Phase::Failed))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Pending => "Pending",
            Phase::Created => "Created",
            Phase::Validated => "Validated",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        };
        write!(f, "{label}")
    }
}

/// Derive the replacement address name from a legacy name.
///
/// Pure and stable: the same legacy name always yields the same
/// replacement name, across runs and retries. The base is truncated so the
/// result never exceeds the Azure resource name limit.
pub fn replacement_name(legacy_name: &str) -> String {
    let budget = MAX_RESOURCE_NAME_LEN - REPLACEMENT_SUFFIX.len();
    let base: String = legacy_name.chars().take(budget).collect();
    format!("{base}{REPLACEMENT_SUFFIX}")
}

/// Derive the overlap ip configuration name from a replacement name.
/// Stable for the same reason as [`replacement_name`].
pub fn ipconfig_name(replacement_name: &str) -> String {
    let budget = MAX_RESOURCE_NAME_LEN - IPCONFIG_SUFFIX.len();
    let base: String = replacement_name.chars().take(budget).collect();
    format!("{base}{IPCONFIG_SUFFIX}")
}

/// One Basic SKU public IP address tracked through the migration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InventoryRecord {
    /// Azure subscription id the address lives in.
    pub subscription_id: String,
    /// Azure subscription display name.
    pub subscription_name: String,
    /// Name of the legacy address resource.
    pub name: String,
    /// Resource group of the legacy address.
    pub resource_group: String,
    /// Azure region location.
    pub location: String,
    /// Currently allocated address (empty if unallocated).
    pub legacy_address: String,
    /// What the address is attached to.
    pub consumer_kind: ConsumerKind,
    /// Name of the consuming resource, when attached.
    pub consumer_name: Option<String>,
    /// Resource group of the consuming resource, when attached.
    pub consumer_resource_group: Option<String>,
    /// DNS label configured on the legacy address, if any.
    pub dns_label: Option<String>,
    /// Fully qualified DNS name of the legacy address, if any.
    pub dns_fqdn: Option<String>,
    /// Derived name of the Standard replacement address.
    pub replacement_name: String,
    /// Allocated replacement address (empty until creation succeeds).
    pub replacement_address: String,
    /// ARM id of the replacement address (empty until creation succeeds).
    pub replacement_resource_id: String,
    /// Lifecycle phase.
    pub phase: Phase,
    /// When the record last entered `Created`; anchors the soak period.
    pub phase_timestamp: Option<DateTime<Utc>>,
    /// Append-only diagnostic trail.
    pub notes: String,
}

impl InventoryRecord {
    /// Advance the lifecycle, rejecting backward or skipping transitions.
    ///
    /// Entering `Created` stamps `phase_timestamp`, which the cleanup soak
    /// computation anchors on.
    pub fn set_phase(&mut self, next: Phase, when: DateTime<Utc>) -> Result<(), MigrationError> {
        if !self.phase.can_advance(next) {
            return Err(MigrationError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        if next == Phase::Created {
            self.phase_timestamp = Some(when);
        }
        self.phase = next;
        Ok(())
    }

    /// Move to `Failed` with a diagnostic note. Never rejects; any
    /// in-flight phase may fail sideways.
    pub fn fail(&mut self, note: &str) {
        self.push_note(note);
        self.phase = Phase::Failed;
    }

    /// Append to the diagnostic trail. Existing notes are never rewritten.
    pub fn push_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push_str("; ");
        }
        self.notes.push_str(note);
    }

    /// Whether the Create/Cleanup phases may act on this record. Load
    /// balancer and VPN gateway frontends need coordinated manual
    /// migration and stay Pending under this tool.
    pub fn automation_eligible(&self) -> bool {
        matches!(
            self.consumer_kind,
            ConsumerKind::Unattached | ConsumerKind::NetworkInterface
        )
    }
}
