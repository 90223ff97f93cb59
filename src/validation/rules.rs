//! Security rule presence check.
//!
//! Standard SKU addresses default to deny-all inbound, unlike Basic. The
//! check only reports: a missing allow rule becomes a warning note on the
//! record, never a failure.

use crate::azure::client::RuleDescriptor;

/// Whether any inbound allow rule covers at least one of the probe ports.
pub fn has_inbound_allow(rules: &[RuleDescriptor], ports: &[u16]) -> bool {
    rules
        .iter()
        .filter(|rule| rule.direction.eq_ignore_ascii_case("inbound"))
        .filter(|rule| rule.access.eq_ignore_ascii_case("allow"))
        .any(|rule| rule_covers_any(rule, ports))
}

/// Warning text for the record's note trail, or None when covered.
pub fn security_rule_warning(rules: &[RuleDescriptor], ports: &[u16]) -> Option<String> {
    if has_inbound_allow(rules, ports) {
        None
    } else {
        let ports: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
        Some(format!(
            "no inbound allow rule covers port(s) {}; Standard SKU defaults to deny-all inbound",
            ports.join(",")
        ))
    }
}

fn rule_covers_any(rule: &RuleDescriptor, ports: &[u16]) -> bool {
    let single = rule.destination_port_range.iter();
    let multiple = rule.destination_port_ranges.iter();
    single
        .chain(multiple)
        .any(|range| ports.iter().any(|&port| range_covers(range, port)))
}

fn range_covers(range: &str, port: u16) -> bool {
    let range = range.trim();
    if range == "*" {
        return true;
    }
    if let Some((lo, hi)) = range.split_once('-') {
        match (lo.trim().parse::<u16>(), hi.trim().parse::<u16>()) {
            (Ok(lo), Ok(hi)) => lo <= port && port <= hi,
            _ => false,
        }
    } else {
        range.parse::<u16>().map(|p| p == port).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(direction: &str, access: &str, range: Option<&str>, ranges: &[&str]) -> RuleDescriptor {
        RuleDescriptor {
            name: "rule".to_string(),
            direction: direction.to_string(),
            access: access.to_string(),
            destination_port_range: range.map(|r| r.to_string()),
            destination_port_ranges: ranges.iter().map(|r| r.to_string()).collect(),
            priority: Some(100),
        }
    }

    #[test]
    fn test_wildcard_range_covers_everything() {
        let rules = vec![rule("Inbound", "Allow", Some("*"), &[])];
        assert!(has_inbound_allow(&rules, &[80, 443]));
    }

    #[test]
    fn test_single_port_match() {
        let rules = vec![rule("Inbound", "Allow", Some("443"), &[])];
        assert!(has_inbound_allow(&rules, &[80, 443]));
        assert!(!has_inbound_allow(&rules, &[22]));
    }

    #[test]
    fn test_port_range_match() {
        let rules = vec![rule("Inbound", "Allow", Some("8000-9000"), &[])];
        assert!(has_inbound_allow(&rules, &[8080]));
        assert!(!has_inbound_allow(&rules, &[80]));
    }

    #[test]
    fn test_multiple_ranges() {
        let rules = vec![rule("Inbound", "Allow", None, &["22", "80-89"])];
        assert!(has_inbound_allow(&rules, &[85]));
        assert!(!has_inbound_allow(&rules, &[443]));
    }

    #[test]
    fn test_deny_and_outbound_do_not_count() {
        let rules = vec![
            rule("Inbound", "Deny", Some("*"), &[]),
            rule("Outbound", "Allow", Some("*"), &[]),
        ];
        assert!(!has_inbound_allow(&rules, &[80]));
    }

    #[test]
    fn test_malformed_range_is_ignored() {
        let rules = vec![rule("Inbound", "Allow", Some("http"), &[])];
        assert!(!has_inbound_allow(&rules, &[80]));
    }

    #[test]
    fn test_warning_text_lists_ports() {
        let warning = security_rule_warning(&[], &[80, 443]).expect("should warn");
        assert!(warning.contains("80,443"));
        assert!(security_rule_warning(
            &[rule("Inbound", "Allow", Some("80"), &[])],
            &[80]
        )
        .is_none());
    }
}
