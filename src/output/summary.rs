//! Human-readable inventory summary.
//!
//! Counts grouped by phase, consumer kind, subscription and location;
//! written next to every snapshot and printed after each phase.

use super::terminal::pad_field;
use crate::models::InventoryRecord;
use colored::Colorize;
use itertools::Itertools;

/// Render the grouped-count summary for a record set.
pub fn render_summary(records: &[InventoryRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("inventory summary: {} record(s)\n", records.len()));

    section(&mut out, "phase", records.iter().counts_by(|r| r.phase.to_string()));
    section(
        &mut out,
        "consumer kind",
        records.iter().counts_by(|r| r.consumer_kind.to_string()),
    );
    section(
        &mut out,
        "subscription",
        records.iter().counts_by(|r| r.subscription_name.clone()),
    );
    section(
        &mut out,
        "location",
        records.iter().counts_by(|r| r.location.clone()),
    );

    out
}

/// Print the summary to the terminal with a colored banner.
pub fn print_summary(records: &[InventoryRecord]) {
    println!("#{}#", "inventory".on_blue());
    print!("{}", render_summary(records));
}

fn section(out: &mut String, title: &str, counts: std::collections::HashMap<String, usize>) {
    out.push_str(&format!("by {title}:\n"));
    for (key, count) in counts.into_iter().sorted() {
        out.push_str(&format!("  {} {}\n", pad_field(key, 32), count));
    }
}
