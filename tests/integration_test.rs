//! Integration tests for azure-pip-migration
//!
//! These tests drive the full discovery -> create -> validate -> cleanup
//! workflow against a scripted provider client, persisting the inventory
//! between phases the way a real invocation does.

use async_trait::async_trait;
use azure_pip_migration::azure::client::{
    AddressDescriptor, AddressSpec, InterfaceDescriptor, InterfaceRef, IpConfigDescriptor,
    PublicIpClient, ResourceRef, RuleDescriptor, Sku, SubscriptionDescriptor,
};
use azure_pip_migration::azure::select_subscriptions;
use azure_pip_migration::config::MigrationConfig;
use azure_pip_migration::error::MigrationError;
use azure_pip_migration::inventory::{build_inventory, CsvFileStore, InventoryStore};
use azure_pip_migration::models::{ConsumerKind, Phase};
use azure_pip_migration::orchestrator::{run_cleanup, run_create, run_validate};
use azure_pip_migration::validation::{ProbeReport, Prober};
use chrono::{Duration, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

const SUB_ID: &str = "00000000-0000-0000-0000-000000000001";

fn no_cancel() -> AtomicBool {
    AtomicBool::new(false)
}

/// Scripted provider: one subscription holding 9 unattached Basic
/// addresses, 2 NIC-bound ones and 1 load balancer frontend.
#[derive(Default)]
struct ScriptedClient {
    interfaces: RefCell<HashMap<String, InterfaceDescriptor>>,
    created: RefCell<usize>,
}

impl ScriptedClient {
    fn new() -> ScriptedClient {
        let client = ScriptedClient::default();
        for (nic, pip) in [("vm01-nic", "vm01-pip"), ("vm02-nic", "vm02-pip")] {
            let legacy = pip_id(pip);
            client.interfaces.borrow_mut().insert(
                nic.to_string(),
                interface(nic, &[("ipconfig1", Some(legacy.as_str()))]),
            );
        }
        client
    }
}

fn pip_id(name: &str) -> String {
    format!(
        "/subscriptions/{SUB_ID}/resourceGroups/rg-app/providers/Microsoft.Network/publicIPAddresses/{name}"
    )
}

fn interface(name: &str, configs: &[(&str, Option<&str>)]) -> InterfaceDescriptor {
    InterfaceDescriptor {
        id: format!(
            "/subscriptions/{SUB_ID}/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/{name}"
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

fn basic_address(name: &str, ip_configuration: Option<String>) -> AddressDescriptor {
    AddressDescriptor {
        id: pip_id(name),
        name: name.to_string(),
        resource_group: "rg-app".to_string(),
        location: "australiaeast".to_string(),
        ip_address: Some("20.1.2.3".to_string()),
        sku: Some(Sku {
            name: "Basic".to_string(),
        }),
        public_ip_allocation_method: Some("Dynamic".to_string()),
        dns_settings: None,
        ip_configuration: ip_configuration.map(|id| ResourceRef { id }),
    }
}

impl PublicIpClient for ScriptedClient {
    fn list_subscriptions(&self) -> Result<Vec<SubscriptionDescriptor>, MigrationError> {
        Ok(vec![SubscriptionDescriptor {
            id: SUB_ID.to_string(),
            name: "Production".to_string(),
            state: Some("Enabled".to_string()),
        }])
    }

    fn list_legacy_addresses(
        &self,
        _subscription: &str,
    ) -> Result<Vec<AddressDescriptor>, MigrationError> {
        let mut addresses: Vec<AddressDescriptor> = (0..9)
            .map(|i| basic_address(&format!("spare-{i:02}-pip"), None))
            .collect();
        for nic in ["vm01", "vm02"] {
            addresses.push(basic_address(
                &format!("{nic}-pip"),
                Some(format!(
                    "/subscriptions/{SUB_ID}/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/{nic}-nic/ipConfigurations/ipconfig1"
                )),
            ));
        }
        addresses.push(basic_address(
            "lb-pip",
            Some(format!(
                "/subscriptions/{SUB_ID}/resourceGroups/rg-lb/providers/Microsoft.Network/loadBalancers/lb-web/frontendIPConfigurations/front01"
            )),
        ));
        Ok(addresses)
    }

    fn resolve_interface(
        &self,
        _subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<InterfaceDescriptor, MigrationError> {
        self.interfaces
            .borrow()
            .get(&nic.name)
            .cloned()
            .ok_or_else(|| {
                MigrationError::ProviderPermanent(format!("nic {} not found", nic.name))
            })
    }

    fn create_address(
        &self,
        subscription: &str,
        spec: &AddressSpec,
    ) -> Result<AddressDescriptor, MigrationError> {
        *self.created.borrow_mut() += 1;
        let serial = *self.created.borrow();
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
        nic: &InterfaceRef,
        config_name: &str,
        address_id: &str,
    ) -> Result<(), MigrationError> {
        let mut interfaces = self.interfaces.borrow_mut();
        let interface = interfaces.get_mut(&nic.name).ok_or_else(|| {
            MigrationError::ProviderPermanent(format!("nic {} not found", nic.name))
        })?;
        interface.ip_configurations.push(IpConfigDescriptor {
            name: config_name.to_string(),
            primary: None,
            public_ip_address: Some(ResourceRef {
                id: address_id.to_string(),
            }),
            subnet: None,
        });
        Ok(())
    }

    fn detach_public_ip(
        &self,
        _subscription: &str,
        nic: &InterfaceRef,
        config_name: &str,
    ) -> Result<(), MigrationError> {
        let mut interfaces = self.interfaces.borrow_mut();
        let interface = interfaces.get_mut(&nic.name).ok_or_else(|| {
            MigrationError::ProviderPermanent(format!("nic {} not found", nic.name))
        })?;
        for config in interface
            .ip_configurations
            .iter_mut()
            .filter(|c| c.name == config_name)
        {
            config.public_ip_address = None;
        }
        Ok(())
    }

    fn delete_address(
        &self,
        _subscription: &str,
        _resource_group: &str,
        _name: &str,
    ) -> Result<(), MigrationError> {
        Ok(())
    }

    fn get_security_rules(
        &self,
        _subscription: &str,
        _nic: &InterfaceRef,
    ) -> Result<Vec<RuleDescriptor>, MigrationError> {
        Ok(vec![])
    }
}

struct AlwaysReachable;

#[async_trait]
impl Prober for AlwaysReachable {
    async fn probe(&self, _address: &str, ports: &[u16]) -> ProbeReport {
        ProbeReport {
            icmp: true,
            per_port: ports.iter().map(|&p| (p, true)).collect(),
        }
    }
}

fn test_config() -> MigrationConfig {
    MigrationConfig {
        scan_all_subscriptions: true,
        delay_between_batches_minutes: 0,
        ..MigrationConfig::default()
    }
}

#[tokio::test]
async fn test_full_workflow_through_snapshots() {
    let client = ScriptedClient::new();
    let config = test_config();
    let dir = tempfile::tempdir().expect("Error creating tempdir");
    let store = CsvFileStore::new(dir.path());

    // Discovery
    let subscriptions =
        select_subscriptions(&config, client.list_subscriptions().expect("subscriptions"))
            .expect("selection");
    let records = build_inventory(&client, &subscriptions);
    assert_eq!(records.len(), 12);
    assert!(records.iter().all(|r| r.phase == Phase::Pending));
    store.save(&records).expect("Error saving discovery snapshot");

    // Create
    let mut records = store.load().expect("Error loading for create");
    let outcome = run_create(&client, &mut records, &config, false, &no_cancel());
    assert_eq!(outcome.succeeded, 11, "9 unattached + 2 NIC records");
    assert_eq!(outcome.skipped, 1, "the load balancer frontend");
    let nic_notes = records
        .iter()
        .filter(|r| r.consumer_kind == ConsumerKind::NetworkInterface)
        .filter(|r| r.notes.contains("secondary ip configuration"))
        .count();
    assert_eq!(nic_notes, 2, "attachment must be recorded in the notes");
    store.save(&records).expect("Error saving create snapshot");

    // Validate
    let mut records = store.load().expect("Error loading for validate");
    let outcome = run_validate(&AlwaysReachable, &mut records, &config, &no_cancel()).await;
    assert_eq!(outcome.succeeded, 11);
    assert!(records
        .iter()
        .filter(|r| r.consumer_kind != ConsumerKind::LoadBalancer)
        .all(|r| r.phase == Phase::Validated));
    store.save(&records).expect("Error saving validate snapshot");

    // Cleanup: soak period has elapsed for every record.
    let mut records = store.load().expect("Error loading for cleanup");
    let now = Utc::now() + Duration::hours(config.soak_period_hours + 1);
    let outcome =
        run_cleanup(&client, &mut records, &config, true, false, now, &no_cancel()).expect("cleanup runs");
    assert_eq!(outcome.succeeded, 11);
    store.save(&records).expect("Error saving cleanup snapshot");

    let records = store.load().expect("Error loading final snapshot");
    let completed = records.iter().filter(|r| r.phase == Phase::Completed).count();
    assert_eq!(completed, 11);

    // The load balancer record never moved and still carries its note.
    let lb = records
        .iter()
        .find(|r| r.consumer_kind == ConsumerKind::LoadBalancer)
        .expect("lb record");
    assert_eq!(lb.phase, Phase::Pending);
    assert!(lb.replacement_address.is_empty());
    assert!(lb.notes.contains("manual migration"));
}

#[tokio::test]
async fn test_cleanup_within_soak_period_changes_nothing() {
    let client = ScriptedClient::new();
    let config = test_config();

    let subscriptions =
        select_subscriptions(&config, client.list_subscriptions().expect("subscriptions"))
            .expect("selection");
    let mut records = build_inventory(&client, &subscriptions);
    run_create(&client, &mut records, &config, false, &no_cancel());
    run_validate(&AlwaysReachable, &mut records, &config, &no_cancel()).await;

    // Only two hours into a 48 hour soak.
    let now = Utc::now() + Duration::hours(2);
    let outcome =
        run_cleanup(&client, &mut records, &config, true, false, now, &no_cancel()).expect("cleanup runs");

    assert_eq!(outcome.succeeded, 0);
    assert!(records.iter().all(|r| r.phase != Phase::Completed));
}

#[test]
fn test_create_is_idempotent_across_reruns() {
    let client = ScriptedClient::new();
    let config = test_config();

    let subscriptions =
        select_subscriptions(&config, client.list_subscriptions().expect("subscriptions"))
            .expect("selection");
    let mut records = build_inventory(&client, &subscriptions);

    let first = run_create(&client, &mut records, &config, false, &no_cancel());
    assert_eq!(first.succeeded, 11);
    let created_after_first = *client.created.borrow();

    // A second run finds every record past Pending and does nothing.
    let second = run_create(&client, &mut records, &config, false, &no_cancel());
    assert_eq!(second.succeeded, 0);
    assert_eq!(*client.created.borrow(), created_after_first);
}
