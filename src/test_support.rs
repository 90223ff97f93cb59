//! Scripted provider client and record builders shared by unit tests.

use crate::azure::client::{
    AddressDescriptor, AddressSpec, InterfaceDescriptor, InterfaceRef, IpConfigDescriptor,
    PublicIpClient, ResourceRef, RuleDescriptor, Sku, SubscriptionDescriptor,
};
use crate::error::MigrationError;
use crate::models::{replacement_name, ConsumerKind, InventoryRecord, Phase};
use crate::validation::{ProbeReport, Prober};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

pub(crate) enum FailKind {
    Transient,
    Permanent,
}

impl FailKind {
    fn to_error(&self, what: &str) -> MigrationError {
        match self {
            FailKind::Transient => {
                MigrationError::ProviderTransient(format!("{what}: simulated throttle"))
            }
            FailKind::Permanent => {
                MigrationError::ProviderPermanent(format!("{what}: simulated failure"))
            }
        }
    }
}

/// Scripted [`PublicIpClient`]; mutating calls are recorded for
/// assertions.
#[derive(Default)]
pub(crate) struct FakeClient {
    pub subscriptions: Vec<SubscriptionDescriptor>,
    /// Basic addresses per subscription id.
    pub addresses: HashMap<String, Vec<AddressDescriptor>>,
    /// Interfaces by name.
    pub interfaces: HashMap<String, InterfaceDescriptor>,
    pub rules: Vec<RuleDescriptor>,
    /// Subscription ids whose listing fails.
    pub fail_lists: HashSet<String>,
    /// Interface names whose lookup fails.
    pub fail_interfaces: HashSet<String>,
    /// Replacement names whose creation fails.
    pub fail_create: HashMap<String, FailKind>,
    /// Legacy names whose deletion fails.
    pub fail_delete: HashMap<String, FailKind>,
    pub created: RefCell<Vec<String>>,
    pub attached: RefCell<Vec<String>>,
    pub detached: RefCell<Vec<String>>,
    pub deleted: RefCell<Vec<String>>,
}

impl FakeClient {
    /// Total mutating calls observed.
    pub fn mutations(&self) -> usize {
        self.created.borrow().len()
            + self.attached.borrow().len()
            + self.detached.borrow().len()
            + self.deleted.borrow().len()
    }
}

impl PublicIpClient for FakeClient {
    fn list_subscriptions(&self) -> Result<Vec<SubscriptionDescriptor>, MigrationError> {
        Ok(self.subscriptions.clone())
    }

    fn list_legacy_addresses(
        &self,
        subscription: &str,
    ) -> Result<Vec<AddressDescriptor>, MigrationError> {
        if self.fail_lists.contains(subscription) {
            return Err(MigrationError::ProviderPermanent(format!(
                "listing {subscription}: simulated failure"
            )));
        }
        Ok(self.addresses.get(subscription).cloned().unwrap_or_default())
    }

    fn resolve_interface(
        &self,
        _subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<InterfaceDescriptor, MigrationError> {
        if self.fail_interfaces.contains(&nic.name) {
            return Err(MigrationError::ProviderPermanent(format!(
                "nic {}: simulated failure",
                nic.name
            )));
        }
        self.interfaces.get(&nic.name).cloned().ok_or_else(|| {
            MigrationError::ProviderPermanent(format!("nic {} not found", nic.name))
        })
    }

    fn create_address(
        &self,
        subscription: &str,
        spec: &AddressSpec,
    ) -> Result<AddressDescriptor, MigrationError> {
        if let Some(kind) = self.fail_create.get(&spec.name) {
            return Err(kind.to_error(&format!("creating {}", spec.name)));
        }
        self.created.borrow_mut().push(spec.name.clone());
        let serial = self.created.borrow().len();
        Ok(AddressDescriptor {
            id: format!(
                "/subscriptions/{subscription}/resourceGroups/{}/providers/Microsoft.Network/publicIPAddresses/{}",
                spec.resource_group, spec.name
            ),
            name: spec.name.clone(),
            resource_group: spec.resource_group.clone(),
            location: spec.location.clone(),
            ip_address: Some(format!("203.0.113.{serial}")),
            sku: Some(Sku {
                name: "Standard".to_string(),
            }),
            public_ip_allocation_method: Some("Static".to_string()),
            dns_settings: None,
            ip_configuration: None,
        })
    }

    fn attach_secondary_config(
        &self,
        _subscription: &str,
        _nic: &InterfaceRef,
        config_name: &str,
        _address_id: &str,
    ) -> Result<(), MigrationError> {
        self.attached.borrow_mut().push(config_name.to_string());
        Ok(())
    }

    fn detach_public_ip(
        &self,
        _subscription: &str,
        _nic: &InterfaceRef,
        config_name: &str,
    ) -> Result<(), MigrationError> {
        self.detached.borrow_mut().push(config_name.to_string());
        Ok(())
    }

    fn delete_address(
        &self,
        _subscription: &str,
        _resource_group: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        if let Some(kind) = self.fail_delete.get(name) {
            return Err(kind.to_error(&format!("deleting {name}")));
        }
        self.deleted.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn get_security_rules(
        &self,
        _subscription: &str,
        _nic: &InterfaceRef,
    ) -> Result<Vec<RuleDescriptor>, MigrationError> {
        Ok(self.rules.clone())
    }
}

/// Prober with a fixed answer.
pub(crate) struct StaticProber {
    pub reachable: bool,
}

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, _address: &str, ports: &[u16]) -> ProbeReport {
        ProbeReport {
            icmp: false,
            per_port: ports.iter().map(|&p| (p, self.reachable)).collect(),
        }
    }
}

pub(crate) fn subscription(id: &str, name: &str) -> SubscriptionDescriptor {
    SubscriptionDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        state: Some("Enabled".to_string()),
    }
}

/// A Basic SKU address, optionally attached via an ip configuration id.
pub(crate) fn basic_address(name: &str, ip_configuration_id: Option<&str>) -> AddressDescriptor {
    AddressDescriptor {
        id: format!(
            "/subscriptions/sub-1/resourceGroups/rg-app/providers/Microsoft.Network/publicIPAddresses/{name}"
        ),
        name: name.to_string(),
        resource_group: "rg-app".to_string(),
        location: "australiaeast".to_string(),
        ip_address: Some("20.1.2.3".to_string()),
        sku: Some(Sku {
            name: "Basic".to_string(),
        }),
        public_ip_allocation_method: Some("Dynamic".to_string()),
        dns_settings: None,
        ip_configuration: ip_configuration_id.map(|id| ResourceRef { id: id.to_string() }),
    }
}

/// An interface with the given ip configurations; each entry is
/// `(config_name, public_ip_id)`.
pub(crate) fn nic_interface(
    name: &str,
    configs: &[(&str, Option<&str>)],
) -> InterfaceDescriptor {
    InterfaceDescriptor {
        id: format!(
            "/subscriptions/sub-1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/{name}"
        ),
        name: name.to_string(),
        resource_group: "rg-app".to_string(),
        ip_configurations: configs
            .iter()
            .map(|(config_name, public_ip)| IpConfigDescriptor {
                name: config_name.to_string(),
                primary: None,
                public_ip_address: public_ip.map(|id| ResourceRef { id: id.to_string() }),
                subnet: None,
            })
            .collect(),
        network_security_group: None,
    }
}

/// A freshly discovered record at `Pending`.
pub(crate) fn pending_record(name: &str, kind: ConsumerKind) -> InventoryRecord {
    let (consumer_name, consumer_resource_group) = match kind {
        ConsumerKind::Unattached => (None, None),
        ConsumerKind::NetworkInterface => {
            (Some("vm01-nic".to_string()), Some("rg-app".to_string()))
        }
        _ => (Some("owner".to_string()), Some("rg-app".to_string())),
    };
    InventoryRecord {
        subscription_id: "sub-1".to_string(),
        subscription_name: "Production".to_string(),
        name: name.to_string(),
        resource_group: "rg-app".to_string(),
        location: "australiaeast".to_string(),
        legacy_address: "20.1.2.3".to_string(),
        consumer_kind: kind,
        consumer_name,
        consumer_resource_group,
        dns_label: None,
        dns_fqdn: None,
        replacement_name: replacement_name(name),
        replacement_address: String::new(),
        replacement_resource_id: String::new(),
        phase: Phase::Pending,
        phase_timestamp: None,
        notes: String::new(),
    }
}

/// A record already at `Created` with its replacement allocated.
pub(crate) fn created_record(name: &str) -> InventoryRecord {
    let mut record = pending_record(name, ConsumerKind::Unattached);
    record.replacement_address = "203.0.113.50".to_string();
    record.replacement_resource_id = format!("/subscriptions/sub-1/x/{name}-std");
    record.phase = Phase::Created;
    record.phase_timestamp = Some(Utc::now());
    record
}

/// A record already at `Validated` that entered `Created` at the given
/// instant.
pub(crate) fn validated_record(name: &str, entered_created: DateTime<Utc>) -> InventoryRecord {
    let mut record = created_record(name);
    record.phase = Phase::Validated;
    record.phase_timestamp = Some(entered_created);
    record
}
