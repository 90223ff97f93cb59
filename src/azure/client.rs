//! Provider boundary for public IP operations.
//!
//! [`PublicIpClient`] is the seam between the orchestration core and
//! Azure; tests substitute a scripted implementation. [`AzCliClient`] maps
//! each operation onto one az command and parses its JSON output with
//! serde. Every method takes the target subscription id explicitly: there
//! is no process-wide "active subscription" to go stale, and each call
//! logs which subscription it is aimed at.

use super::shell::{self, FailureClass, ShellError};
use crate::config::{AddressVersion, AllocationMethod};
use crate::error::MigrationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Reference to another resource by ARM id.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DnsSettings {
    #[serde(default)]
    pub domain_name_label: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
}

/// One public IP address as returned by `az network public-ip list/create`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddressDescriptor {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub sku: Option<Sku>,
    #[serde(default)]
    pub public_ip_allocation_method: Option<String>,
    #[serde(default)]
    pub dns_settings: Option<DnsSettings>,
    #[serde(default)]
    pub ip_configuration: Option<ResourceRef>,
}

impl AddressDescriptor {
    /// Addresses created before SKUs existed carry no sku block; Azure
    /// treats them as Basic, so we do too.
    pub fn is_basic(&self) -> bool {
        match &self.sku {
            Some(sku) => sku.name.eq_ignore_ascii_case("basic"),
            None => true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigDescriptor {
    pub name: String,
    #[serde(default)]
    pub primary: Option<bool>,
    #[serde(default)]
    pub public_ip_address: Option<ResourceRef>,
    #[serde(default)]
    pub subnet: Option<ResourceRef>,
}

/// A network interface as returned by `az network nic show`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescriptor {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    #[serde(default)]
    pub ip_configurations: Vec<IpConfigDescriptor>,
    #[serde(default)]
    pub network_security_group: Option<ResourceRef>,
}

/// One network security group rule.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub name: String,
    /// "Inbound" or "Outbound".
    pub direction: String,
    /// "Allow" or "Deny".
    pub access: String,
    #[serde(default)]
    pub destination_port_range: Option<String>,
    #[serde(default)]
    pub destination_port_ranges: Vec<String>,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// Interface identity for NIC-scoped operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRef {
    pub name: String,
    pub resource_group: String,
}

/// Everything needed to allocate one Standard SKU replacement address.
#[derive(Debug, Clone)]
pub struct AddressSpec {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub allocation_method: AllocationMethod,
    pub version: AddressVersion,
    pub zones: Vec<String>,
    pub tag_key: String,
    pub tag_value: String,
}

/// Operations the migration core needs from the provider.
///
/// Mutating methods: `create_address`, `attach_secondary_config`,
/// `detach_public_ip`, `delete_address`. Everything else is read-only.
pub trait PublicIpClient {
    fn list_subscriptions(&self) -> Result<Vec<SubscriptionDescriptor>, MigrationError>;
    fn list_legacy_addresses(
        &self,
        subscription: &str,
    ) -> Result<Vec<AddressDescriptor>, MigrationError>;
    fn resolve_interface(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<InterfaceDescriptor, MigrationError>;
    fn create_address(
        &self,
        subscription: &str,
        spec: &AddressSpec,
    ) -> Result<AddressDescriptor, MigrationError>;
    fn attach_secondary_config(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
        config_name: &str,
        address_id: &str,
    ) -> Result<(), MigrationError>;
    fn detach_public_ip(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
        config_name: &str,
    ) -> Result<(), MigrationError>;
    fn delete_address(
        &self,
        subscription: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<(), MigrationError>;
    fn get_security_rules(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<Vec<RuleDescriptor>, MigrationError>;
}

/// `az network public-ip create` wraps the new address in a `publicIp` key.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    public_ip: AddressDescriptor,
}

/// Subnet shape used only to chase the NSG reference.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SubnetNsgView {
    #[serde(default)]
    network_security_group: Option<ResourceRef>,
}

/// Provider client backed by the az CLI.
#[derive(Debug, Default)]
pub struct AzCliClient;

impl AzCliClient {
    pub fn new() -> AzCliClient {
        AzCliClient
    }

    fn run_json<T: DeserializeOwned>(cmd: &str, what: &str) -> Result<T, MigrationError> {
        let output = shell::run(cmd).map_err(|e| map_shell_error(e, what))?;
        parse_json(&output, what)
    }

    fn run_unit(cmd: &str, what: &str) -> Result<(), MigrationError> {
        shell::run(cmd).map_err(|e| map_shell_error(e, what))?;
        Ok(())
    }
}

fn map_shell_error(err: ShellError, what: &str) -> MigrationError {
    let detail = format!("{what}: {}", err.stderr.trim());
    match err.class {
        FailureClass::Authentication => MigrationError::Authentication(detail),
        FailureClass::Transient => MigrationError::ProviderTransient(detail),
        FailureClass::Permanent => MigrationError::ProviderPermanent(detail),
    }
}

/// Parse az JSON output, reporting the failing path on mismatch.
fn parse_json<T: DeserializeOwned>(output: &str, what: &str) -> Result<T, MigrationError> {
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        let json_path = e.path().to_string();
        MigrationError::ProviderPermanent(format!(
            "parsing {what} response failed at {json_path}: {}",
            e.inner()
        ))
    })
}

impl PublicIpClient for AzCliClient {
    fn list_subscriptions(&self) -> Result<Vec<SubscriptionDescriptor>, MigrationError> {
        log::info!("listing subscriptions visible to the current az session");
        AzCliClient::run_json("az account list --output json", "az account list")
    }

    fn list_legacy_addresses(
        &self,
        subscription: &str,
    ) -> Result<Vec<AddressDescriptor>, MigrationError> {
        log::info!("listing public IPs in subscription {subscription}");
        let cmd =
            format!("az network public-ip list --subscription {subscription} --output json");
        let all: Vec<AddressDescriptor> =
            AzCliClient::run_json(&cmd, "az network public-ip list")?;
        let total = all.len();
        let basic: Vec<AddressDescriptor> = all.into_iter().filter(|a| a.is_basic()).collect();
        log::info!(
            "subscription {subscription}: {} of {total} public IPs are Basic SKU",
            basic.len()
        );
        Ok(basic)
    }

    fn resolve_interface(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<InterfaceDescriptor, MigrationError> {
        log::debug!(
            "resolving interface {}/{} in subscription {subscription}",
            nic.resource_group,
            nic.name
        );
        let cmd = format!(
            "az network nic show --subscription {subscription} --resource-group {} --name {} --output json",
            nic.resource_group, nic.name
        );
        AzCliClient::run_json(&cmd, "az network nic show")
    }

    fn create_address(
        &self,
        subscription: &str,
        spec: &AddressSpec,
    ) -> Result<AddressDescriptor, MigrationError> {
        log::info!(
            "creating Standard public IP {}/{} in subscription {subscription}",
            spec.resource_group,
            spec.name
        );
        let mut cmd = format!(
            "az network public-ip create --subscription {subscription} --resource-group {} --name {} --location {} --sku Standard --allocation-method {} --version {} --tags '{}={}' --output json",
            spec.resource_group,
            spec.name,
            spec.location,
            spec.allocation_method,
            spec.version,
            spec.tag_key,
            spec.tag_value
        );
        if !spec.zones.is_empty() {
            cmd.push_str(&format!(" --zone {}", spec.zones.join(" ")));
        }
        let response: CreateResponse =
            AzCliClient::run_json(&cmd, "az network public-ip create")?;
        Ok(response.public_ip)
    }

    fn attach_secondary_config(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
        config_name: &str,
        address_id: &str,
    ) -> Result<(), MigrationError> {
        log::info!(
            "attaching ip configuration {config_name} to {}/{} in subscription {subscription}",
            nic.resource_group,
            nic.name
        );
        let cmd = format!(
            "az network nic ip-config create --subscription {subscription} --resource-group {} --nic-name {} --name {config_name} --public-ip-address {address_id} --output json",
            nic.resource_group, nic.name
        );
        AzCliClient::run_unit(&cmd, "az network nic ip-config create")
    }

    fn detach_public_ip(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
        config_name: &str,
    ) -> Result<(), MigrationError> {
        log::info!(
            "dissociating public IP from ip configuration {config_name} on {}/{} in subscription {subscription}",
            nic.resource_group,
            nic.name
        );
        let cmd = format!(
            "az network nic ip-config update --subscription {subscription} --resource-group {} --nic-name {} --name {config_name} --remove publicIpAddress --output json",
            nic.resource_group, nic.name
        );
        AzCliClient::run_unit(&cmd, "az network nic ip-config update")
    }

    fn delete_address(
        &self,
        subscription: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<(), MigrationError> {
        log::info!(
            "deleting public IP {resource_group}/{name} in subscription {subscription}"
        );
        let cmd = format!(
            "az network public-ip delete --subscription {subscription} --resource-group {resource_group} --name {name} --output json"
        );
        AzCliClient::run_unit(&cmd, "az network public-ip delete")
    }

    fn get_security_rules(
        &self,
        subscription: &str,
        nic: &InterfaceRef,
    ) -> Result<Vec<RuleDescriptor>, MigrationError> {
        let interface = self.resolve_interface(subscription, nic)?;

        // The NSG can sit on the interface or on its subnet.
        let nsg_id = match interface.network_security_group {
            Some(nsg) => Some(nsg.id),
            None => {
                let subnet_id = interface
                    .ip_configurations
                    .iter()
                    .find_map(|c| c.subnet.as_ref().map(|s| s.id.clone()));
                match subnet_id {
                    Some(subnet_id) => {
                        // --ids carries the subscription, az rejects both.
                        let cmd = format!(
                            "az network vnet subnet show --ids {subnet_id} --output json"
                        );
                        let subnet: SubnetNsgView =
                            AzCliClient::run_json(&cmd, "az network vnet subnet show")?;
                        subnet.network_security_group.map(|nsg| nsg.id)
                    }
                    None => None,
                }
            }
        };

        match nsg_id {
            Some(nsg_id) => {
                let cmd = format!(
                    "az network nsg show --ids {nsg_id} --query securityRules --output json"
                );
                AzCliClient::run_json(&cmd, "az network nsg show")
            }
            None => {
                log::debug!(
                    "no security group on interface {} or its subnet",
                    nic.name
                );
                Ok(vec![])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_ip_list_fixture() {
        let raw = std::fs::read_to_string("src/tests/test_data/public_ip_list_01.json")
            .expect("Error reading fixture");
        let addresses: Vec<AddressDescriptor> =
            parse_json(&raw, "fixture").expect("Error parsing fixture");
        assert_eq!(addresses.len(), 11, "fixture should carry 11 addresses");

        let basic = addresses.iter().filter(|a| a.is_basic()).count();
        assert_eq!(basic, 11, "all fixture addresses are Basic SKU");

        let attached = addresses
            .iter()
            .filter(|a| a.ip_configuration.is_some())
            .count();
        assert_eq!(attached, 2, "two fixture addresses are NIC-bound");
    }

    #[test]
    fn test_parse_create_response() {
        let raw = r#"{
            "publicIp": {
                "id": "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/publicIPAddresses/web01-pip-std",
                "name": "web01-pip-std",
                "resourceGroup": "rg-app",
                "location": "australiaeast",
                "ipAddress": "20.5.6.7",
                "sku": { "name": "Standard" },
                "publicIpAllocationMethod": "Static"
            }
        }"#;
        let response: CreateResponse = parse_json(raw, "create").expect("Error parsing create");
        assert_eq!(response.public_ip.name, "web01-pip-std");
        assert_eq!(response.public_ip.ip_address.as_deref(), Some("20.5.6.7"));
        assert!(!response.public_ip.is_basic());
    }

    #[test]
    fn test_parse_interface() {
        let raw = r#"{
            "id": "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/vm01-nic",
            "name": "vm01-nic",
            "resourceGroup": "rg-app",
            "ipConfigurations": [
                {
                    "name": "ipconfig1",
                    "primary": true,
                    "publicIpAddress": { "id": "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/publicIPAddresses/vm01-pip" },
                    "subnet": { "id": "/subscriptions/s1/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/app" }
                }
            ],
            "networkSecurityGroup": { "id": "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/networkSecurityGroups/vm01-nsg" }
        }"#;
        let nic: InterfaceDescriptor = parse_json(raw, "nic").expect("Error parsing nic");
        assert_eq!(nic.ip_configurations.len(), 1);
        assert_eq!(nic.ip_configurations[0].primary, Some(true));
        assert!(nic.network_security_group.is_some());
    }

    #[test]
    fn test_parse_error_reports_json_path() {
        let raw = r#"[ { "id": "x", "name": "y" } ]"#;
        let err = parse_json::<Vec<AddressDescriptor>>(raw, "list")
            .expect_err("missing fields should fail");
        let message = err.to_string();
        assert!(message.contains("list"), "context missing: {message}");
    }

    #[test]
    fn test_missing_sku_counts_as_basic() {
        let raw = r#"{
            "id": "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/old-pip",
            "name": "old-pip",
            "resourceGroup": "rg",
            "location": "australiaeast"
        }"#;
        let address: AddressDescriptor = parse_json(raw, "address").expect("Error parsing");
        assert!(address.is_basic());
    }
}
