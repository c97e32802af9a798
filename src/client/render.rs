//! Plain-text rendering of status answers for terminal output.

use broker_core::ResourceStatus;
use std::fmt::Write;

/// Renders the status list as a fixed-width table, one resource per row.
pub fn format_status_table(resources: &[ResourceStatus]) -> String {
    let mut out = String::from("Name            | Slots/Free | Users\n");
    for r in resources {
        let _ = writeln!(
            out,
            "{:<15} |  {:>4}/{:<4} | {}",
            r.name,
            r.slots,
            r.free,
            r.users.join(", ")
        );
    }
    out
}

pub fn format_details(resource: &ResourceStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Resource: {}", resource.name);
    let _ = writeln!(out, "Slots/Free: {}/{}", resource.slots, resource.free);
    let _ = writeln!(out, "Users: {}", resource.users.join(", "));
    let _ = writeln!(out, "Keywords: {}", resource.keywords.join(", "));
    let _ = writeln!(out, "Parameters:");
    if let Some(parameters) = &resource.parameters {
        for (key, value) in parameters {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }
    out
}
