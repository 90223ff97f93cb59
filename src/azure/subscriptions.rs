//! Subscription selection.
//!
//! Pure filtering over the subscription list fetched once from the
//! provider; nothing here mutates provider state.

use super::client::SubscriptionDescriptor;
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use std::collections::HashSet;

/// Resolve the ordered, de-duplicated working set of subscriptions.
///
/// With `scanAllSubscriptions` false, exactly the configured default
/// subscription is returned (a [`MigrationError::Configuration`] if it is
/// not among the visible ones). Otherwise the include filter keeps
/// matching entries, then the exclude filter drops matches - exclude
/// always wins. Matching is by id or display name, case-insensitive.
pub fn select_subscriptions(
    config: &MigrationConfig,
    available: Vec<SubscriptionDescriptor>,
) -> Result<Vec<SubscriptionDescriptor>, MigrationError> {
    if !config.scan_all_subscriptions {
        let default = available
            .into_iter()
            .find(|s| matches_needle(s, &config.subscription_id))
            .ok_or_else(|| {
                MigrationError::Configuration(format!(
                    "default subscription {} is not visible to the current credentials",
                    config.subscription_id
                ))
            })?;
        log::info!(
            "using default subscription {} ({})",
            default.name,
            default.id
        );
        return Ok(vec![default]);
    }

    let mut selected: Vec<SubscriptionDescriptor> = available
        .into_iter()
        .filter(|s| {
            config.include_subscriptions.is_empty()
                || config
                    .include_subscriptions
                    .iter()
                    .any(|needle| matches_needle(s, needle))
        })
        .filter(|s| {
            !config
                .exclude_subscriptions
                .iter()
                .any(|needle| matches_needle(s, needle))
        })
        .collect();

    let mut seen = HashSet::new();
    selected.retain(|s| seen.insert(s.id.to_ascii_lowercase()));

    if selected.is_empty() {
        return Err(MigrationError::NoSubscriptionsAvailable);
    }
    log::info!("selected {} subscription(s) to scan", selected.len());
    Ok(selected)
}

fn matches_needle(subscription: &SubscriptionDescriptor, needle: &str) -> bool {
    !needle.is_empty()
        && (subscription.id.eq_ignore_ascii_case(needle)
            || subscription.name.eq_ignore_ascii_case(needle))
}
