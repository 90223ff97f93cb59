//! Inventory discovery.
//!
//! Walks the selected subscriptions, lists Basic SKU addresses and
//! classifies each one by its attachment. Discovery never aborts on a
//! partial failure: a subscription whose listing fails is skipped, and a
//! record whose interface lookup fails is degraded to `Other` with a note.

use crate::azure::client::{AddressDescriptor, InterfaceRef, PublicIpClient, SubscriptionDescriptor};
use crate::models::{classify_attachment, replacement_name, ConsumerKind, InventoryRecord, Phase};
use colored::Colorize;

/// Build the full inventory record set for the given subscriptions.
///
/// Every returned record starts at `Pending` with its replacement name
/// precomputed. Partial results are better than none; failures are logged
/// and noted, never propagated.
pub fn build_inventory(
    client: &dyn PublicIpClient,
    subscriptions: &[SubscriptionDescriptor],
) -> Vec<InventoryRecord> {
    let mut records = Vec::new();

    for subscription in subscriptions {
        log::info!(
            "scanning subscription {} ({}) for Basic SKU public IPs",
            subscription.name,
            subscription.id
        );
        let addresses = match client.list_legacy_addresses(&subscription.id) {
            Ok(addresses) => addresses,
            Err(e) => {
                log::warn!(
                    "{skipped} subscription {}: {e}",
                    subscription.name,
                    skipped = "skipped".on_red()
                );
                continue;
            }
        };
        for address in addresses {
            records.push(build_record(client, subscription, address));
        }
    }

    log::info!("discovery found {} Basic SKU address(es)", records.len());
    records
}

fn build_record(
    client: &dyn PublicIpClient,
    subscription: &SubscriptionDescriptor,
    address: AddressDescriptor,
) -> InventoryRecord {
    let config_ref = address.ip_configuration.as_ref().map(|r| r.id.as_str());
    let attachment = classify_attachment(config_ref);

    let mut record = InventoryRecord {
        subscription_id: subscription.id.clone(),
        subscription_name: subscription.name.clone(),
        name: address.name.clone(),
        resource_group: address.resource_group.clone(),
        location: address.location.clone(),
        legacy_address: address.ip_address.clone().unwrap_or_default(),
        consumer_kind: attachment.kind,
        consumer_name: attachment.owner_name.clone(),
        consumer_resource_group: attachment.resource_group.clone(),
        dns_label: address
            .dns_settings
            .as_ref()
            .and_then(|d| d.domain_name_label.clone()),
        dns_fqdn: address.dns_settings.as_ref().and_then(|d| d.fqdn.clone()),
        replacement_name: replacement_name(&address.name),
        replacement_address: String::new(),
        replacement_resource_id: String::new(),
        phase: Phase::Pending,
        phase_timestamp: None,
        notes: String::new(),
    };

    match record.consumer_kind {
        ConsumerKind::NetworkInterface => resolve_interface_details(client, &mut record),
        ConsumerKind::LoadBalancer => {
            log::warn!(
                "{} is bound to load balancer {:?}; flagged for manual migration",
                record.name,
                record.consumer_name
            );
            record.push_note("bound to a load balancer; requires manual migration");
        }
        ConsumerKind::VpnGateway => {
            log::warn!(
                "{} is bound to virtual network gateway {:?}; flagged for manual migration",
                record.name,
                record.consumer_name
            );
            record.push_note("bound to a virtual network gateway; requires manual migration");
        }
        ConsumerKind::ApplicationGateway => {
            record.push_note("application gateway frontend; migrates with its gateway");
        }
        ConsumerKind::Other => {
            if let Some(id) = config_ref {
                log::warn!("{}: unrecognized attachment {id}", record.name);
                record.push_note(&format!("unrecognized attachment {id}"));
            }
        }
        ConsumerKind::Unattached => {}
    }

    if let Some(fqdn) = &record.dns_fqdn {
        // DNS records are not mutated by this tool.
        record.push_note(&format!("carries DNS name {fqdn}; DNS cutover is manual"));
    }

    record
}

/// Confirm the owning interface exists and note its shape. A failed
/// lookup degrades the record to `Other` so Create will not touch it.
fn resolve_interface_details(client: &dyn PublicIpClient, record: &mut InventoryRecord) {
    let nic = match (&record.consumer_name, &record.consumer_resource_group) {
        (Some(name), Some(resource_group)) => InterfaceRef {
            name: name.clone(),
            resource_group: resource_group.clone(),
        },
        _ => {
            record.consumer_kind = ConsumerKind::Other;
            record.push_note("interface reference incomplete; needs manual review");
            return;
        }
    };

    match client.resolve_interface(&record.subscription_id, &nic) {
        Ok(interface) => {
            record.push_note(&format!(
                "attached to interface {}/{} ({} ip configuration(s))",
                nic.resource_group,
                nic.name,
                interface.ip_configurations.len()
            ));
        }
        Err(e) => {
            log::warn!(
                "interface lookup for {}/{} failed, degrading {} to Other: {e}",
                nic.resource_group,
                nic.name,
                record.name
            );
            record.consumer_kind = ConsumerKind::Other;
            record.push_note(&format!("interface lookup failed ({e}); needs manual review"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{basic_address, nic_interface, subscription, FakeClient};

    const NIC_CFG_A: &str = "/subscriptions/sub-1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/vm01-nic/ipConfigurations/ipconfig1";
    const NIC_CFG_B: &str = "/subscriptions/sub-1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/vm02-nic/ipConfigurations/ipconfig1";
    const LB_CFG: &str = "/subscriptions/sub-1/resourceGroups/rg-lb/providers/Microsoft.Network/loadBalancers/lb-web/frontendIPConfigurations/front01";

    #[test]
    fn test_discovery_scenario_eleven_addresses() {
        // 9 unattached + 2 NIC-attached addresses in one subscription.
        let mut client = FakeClient::default();
        client.subscriptions = vec![subscription("sub-1", "Production")];
        let mut addresses: Vec<AddressDescriptor> = (0..9)
            .map(|i| basic_address(&format!("spare-{i:02}-pip"), None))
            .collect();
        addresses.push(basic_address("vm01-pip", Some(NIC_CFG_A)));
        addresses.push(basic_address("vm02-pip", Some(NIC_CFG_B)));
        client.addresses.insert("sub-1".to_string(), addresses);
        client
            .interfaces
            .insert("vm01-nic".to_string(), nic_interface("vm01-nic", &[("ipconfig1", None)]));
        client
            .interfaces
            .insert("vm02-nic".to_string(), nic_interface("vm02-nic", &[("ipconfig1", None)]));

        let subs = client.subscriptions.clone();
        let records = build_inventory(&client, &subs);

        assert_eq!(records.len(), 11);
        let unattached = records
            .iter()
            .filter(|r| r.consumer_kind == ConsumerKind::Unattached)
            .count();
        let nic_bound = records
            .iter()
            .filter(|r| r.consumer_kind == ConsumerKind::NetworkInterface)
            .count();
        assert_eq!(unattached, 9);
        assert_eq!(nic_bound, 2);
        assert!(records.iter().all(|r| r.phase == Phase::Pending));
        assert!(records.iter().all(|r| !r.replacement_name.is_empty()));
    }

    #[test]
    fn test_failed_subscription_is_skipped_not_fatal() {
        let mut client = FakeClient::default();
        client.subscriptions = vec![
            subscription("sub-bad", "Broken"),
            subscription("sub-1", "Production"),
        ];
        client.fail_lists.insert("sub-bad".to_string());
        client
            .addresses
            .insert("sub-1".to_string(), vec![basic_address("spare-pip", None)]);

        let subs = client.subscriptions.clone();
        let records = build_inventory(&client, &subs);

        assert_eq!(records.len(), 1, "good subscription still scanned");
        assert_eq!(records[0].subscription_id, "sub-1");
    }

    #[test]
    fn test_interface_lookup_failure_degrades_to_other() {
        let mut client = FakeClient::default();
        client.subscriptions = vec![subscription("sub-1", "Production")];
        client.addresses.insert(
            "sub-1".to_string(),
            vec![basic_address("vm01-pip", Some(NIC_CFG_A))],
        );
        client.fail_interfaces.insert("vm01-nic".to_string());

        let subs = client.subscriptions.clone();
        let records = build_inventory(&client, &subs);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].consumer_kind, ConsumerKind::Other);
        assert!(records[0].notes.contains("interface lookup failed"));
    }

    #[test]
    fn test_load_balancer_flagged_for_manual_handling() {
        let mut client = FakeClient::default();
        client.subscriptions = vec![subscription("sub-1", "Production")];
        client.addresses.insert(
            "sub-1".to_string(),
            vec![basic_address("lb-pip", Some(LB_CFG))],
        );

        let subs = client.subscriptions.clone();
        let records = build_inventory(&client, &subs);

        assert_eq!(records[0].consumer_kind, ConsumerKind::LoadBalancer);
        assert_eq!(records[0].phase, Phase::Pending);
        assert!(records[0].notes.contains("manual migration"));
    }
}
