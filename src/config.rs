//! Typed migration configuration.
//!
//! The configuration is a JSON document with camelCase keys. Every field
//! has a documented default so an empty `{}` file is a valid starting
//! point. Validation runs once at load time and fails fast; a phase never
//! discovers a missing field halfway through a batch.

use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Allocation method for the replacement Standard SKU addresses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMethod {
    Static,
    Dynamic,
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMethod::Static => write!(f, "Static"),
            AllocationMethod::Dynamic => write!(f, "Dynamic"),
        }
    }
}

/// IP version of the replacement addresses.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVersion {
    IPv4,
    IPv6,
}

impl fmt::Display for AddressVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressVersion::IPv4 => write!(f, "IPv4"),
            AddressVersion::IPv6 => write!(f, "IPv6"),
        }
    }
}

/// Reachability probe settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    /// TCP ports probed on each replacement address. Default `[80, 443]`.
    pub ports: Vec<u16>,
    /// Per-probe timeout in seconds. Default 5.
    pub timeout_seconds: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            ports: vec![80, 443],
            timeout_seconds: 5,
        }
    }
}

/// Top-level configuration document.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationConfig {
    /// Default subscription id, used when `scanAllSubscriptions` is false.
    pub subscription_id: String,
    /// Display name of the default subscription (informational).
    pub subscription_name: String,
    /// Scan every subscription visible to the current credentials.
    pub scan_all_subscriptions: bool,
    /// Keep only subscriptions matching these ids or display names.
    pub include_subscriptions: Vec<String>,
    /// Drop subscriptions matching these ids or display names. Exclude
    /// wins over include.
    pub exclude_subscriptions: Vec<String>,
    /// Records acted on before pausing. Default 10.
    pub batch_size: usize,
    /// Pause between batches in minutes. Default 1.
    pub delay_between_batches_minutes: u64,
    /// Hours a record must soak at `Validated` before cleanup. Default 48.
    pub soak_period_hours: i64,
    /// Allocation method for replacement addresses. Default `Static`.
    pub standard_allocation_method: AllocationMethod,
    /// IP version for replacement addresses. Default `IPv4`.
    pub address_version: AddressVersion,
    /// Pin replacement addresses to availability zones.
    pub use_zones: bool,
    /// Zone list applied when `useZones` is true.
    pub zones: Vec<String>,
    /// Tag key stamped on every replacement address. Default `pip-migration`.
    pub tag_key: String,
    /// Tag value stamped on every replacement address. Default
    /// `basic-to-standard`.
    pub tag_value: String,
    /// Reachability probe settings.
    pub validation: ValidationConfig,
    /// Directory holding inventory snapshots. Default `inventory`.
    pub output_dir: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            subscription_id: String::new(),
            subscription_name: String::new(),
            scan_all_subscriptions: false,
            include_subscriptions: vec![],
            exclude_subscriptions: vec![],
            batch_size: 10,
            delay_between_batches_minutes: 1,
            soak_period_hours: 48,
            standard_allocation_method: AllocationMethod::Static,
            address_version: AddressVersion::IPv4,
            use_zones: false,
            zones: vec![],
            tag_key: "pip-migration".to_string(),
            tag_value: "basic-to-standard".to_string(),
            validation: ValidationConfig::default(),
            output_dir: "inventory".to_string(),
        }
    }
}

impl MigrationConfig {
    /// Load and validate a configuration file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration document
    ///
    /// # Returns
    /// * `Ok(MigrationConfig)` - Parsed and validated configuration
    /// * `Err(MigrationError::Configuration)` - Unreadable file, malformed
    ///   JSON (with the failing path), or a validation rule violation
    pub fn load(path: &Path) -> Result<MigrationConfig, MigrationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::Configuration(format!(
                "cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        let config: MigrationConfig = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| {
                let json_path = e.path().to_string();
                MigrationError::Configuration(format!(
                    "config file {} invalid at {json_path}: {}",
                    path.display(),
                    e.inner()
                ))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Fail-fast validation of the loaded document.
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.batch_size == 0 {
            return Err(MigrationError::Configuration(
                "batchSize must be at least 1".to_string(),
            ));
        }
        if self.soak_period_hours < 0 {
            return Err(MigrationError::Configuration(
                "soakPeriodHours must not be negative".to_string(),
            ));
        }
        if !self.scan_all_subscriptions && self.subscription_id.is_empty() {
            return Err(MigrationError::Configuration(
                "subscriptionId is required when scanAllSubscriptions is false".to_string(),
            ));
        }
        if self.use_zones && self.zones.is_empty() {
            return Err(MigrationError::Configuration(
                "zones must not be empty when useZones is true".to_string(),
            ));
        }
        if self.standard_allocation_method == AllocationMethod::Dynamic {
            // Azure rejects Dynamic allocation on Standard SKU addresses.
            return Err(MigrationError::Configuration(
                "standardAllocationMethod must be Static: Standard SKU addresses do not support Dynamic allocation".to_string(),
            ));
        }
        if self.validation.ports.is_empty() {
            return Err(MigrationError::Configuration(
                "validation.ports must list at least one port".to_string(),
            ));
        }
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.delay_between_batches_minutes * 60)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.timeout_seconds)
    }
}
