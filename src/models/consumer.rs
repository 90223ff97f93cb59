//! Classification of what a public IP address is attached to.
//!
//! An attached Basic address carries an `ipConfiguration.id` pointing into
//! the consuming resource. The consumer kind is decided by walking the ARM
//! id path segments with an exhaustive match, never by substring search;
//! anything attached but unrecognized lands on [`ConsumerKind::Other`] so
//! it stays visible in the inventory.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of resource an address is currently attached to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerKind {
    Unattached,
    NetworkInterface,
    LoadBalancer,
    ApplicationGateway,
    VpnGateway,
    Other,
}

impl fmt::Display for ConsumerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsumerKind::Unattached => "Unattached",
            ConsumerKind::NetworkInterface => "NetworkInterface",
            ConsumerKind::LoadBalancer => "LoadBalancer",
            ConsumerKind::ApplicationGateway => "ApplicationGateway",
            ConsumerKind::VpnGateway => "VpnGateway",
            ConsumerKind::Other => "Other",
        };
        write!(f, "{label}")
    }
}

/// Owner details parsed from an `ipConfiguration` ARM id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: ConsumerKind,
    /// Resource group of the owning resource, when the id carried one.
    pub resource_group: Option<String>,
    /// Name of the owning resource (interface, balancer, gateway).
    pub owner_name: Option<String>,
    /// Name of the ip configuration itself (last path segment).
    pub config_name: Option<String>,
}

impl Attachment {
    fn unattached() -> Attachment {
        Attachment {
            kind: ConsumerKind::Unattached,
            resource_group: None,
            owner_name: None,
            config_name: None,
        }
    }

    fn other(resource_group: Option<String>) -> Attachment {
        Attachment {
            kind: ConsumerKind::Other,
            resource_group,
            owner_name: None,
            config_name: None,
        }
    }
}

/// Classify an address by its `ipConfiguration` reference.
///
/// ARM ids look like
/// `/subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Network/<type>/<name>/ipConfigurations/<config>`.
/// Segment comparison is case-insensitive; ARM ids are not case-stable.
pub fn classify_attachment(ip_configuration_id: Option<&str>) -> Attachment {
    let id = match ip_configuration_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Attachment::unattached(),
    };

    let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();

    let mut resource_group = None;
    let mut type_index = None;
    for (i, segment) in segments.iter().enumerate() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            resource_group = segments.get(i + 1).map(|s| s.to_string());
        }
        if segment.eq_ignore_ascii_case("providers")
            && segments
                .get(i + 1)
                .is_some_and(|p| p.eq_ignore_ascii_case("Microsoft.Network"))
        {
            type_index = Some(i + 2);
            break;
        }
    }

    let type_index = match type_index {
        Some(i) => i,
        None => return Attachment::other(resource_group),
    };
    let resource_type = match segments.get(type_index) {
        Some(t) => *t,
        None => return Attachment::other(resource_group),
    };

    let kind = if resource_type.eq_ignore_ascii_case("networkInterfaces") {
        ConsumerKind::NetworkInterface
    } else if resource_type.eq_ignore_ascii_case("loadBalancers") {
        ConsumerKind::LoadBalancer
    } else if resource_type.eq_ignore_ascii_case("applicationGateways") {
        ConsumerKind::ApplicationGateway
    } else if resource_type.eq_ignore_ascii_case("virtualNetworkGateways") {
        ConsumerKind::VpnGateway
    } else {
        ConsumerKind::Other
    };

    let owner_name = segments.get(type_index + 1).map(|s| s.to_string());
    // The config name only exists when the id goes deeper than the owner.
    let config_name = if segments.len() > type_index + 2 {
        segments.last().map(|s| s.to_string())
    } else {
        None
    };

    Attachment {
        kind,
        resource_group,
        owner_name,
        config_name,
    }
}
