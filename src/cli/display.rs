//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use std::path::Path;

use super::commands::{ConsolidationSummary, XnameRow};

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No resources found.\n".to_string();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!(
            "{:width$}",
            header.to_uppercase(),
            width = widths[i]
        ));
    }
    output.push('\n');

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        output.push('\n');
    }

    output
}

// ============================================================================
// Xname display
// ============================================================================

pub fn format_xname_table(rows: &[XnameRow]) -> String {
    let headers = &["XNAME", "KIND", "CLASS", "INSTANCE", "ROLE"];
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.xname.clone(),
                r.kind.to_string(),
                r.class_name.clone(),
                r.instance.to_string(),
                if r.role.is_empty() { "-".to_string() } else { r.role.clone() },
            ]
        })
        .collect();
    format_table(headers, rows)
}

// ============================================================================
// Consolidation display
// ============================================================================

/// Format a dry-run consolidation summary
pub fn format_summary(summary: &ConsolidationSummary) -> String {
    let cabinets: Vec<String> = summary.cabinets.iter().map(|c| format!("x{}", c)).collect();
    let mut output = String::new();
    output.push_str("Consolidation summary\n");
    output.push_str(&format!("  CSM version:  {}\n", summary.csm_version));
    output.push_str(&format!("  Cabinets:     {}\n", cabinets.join(", ")));
    output.push_str(&format!("  Blades:       {}\n", summary.blades));
    output.push_str(&format!("  Nodes:        {}\n", summary.nodes));
    output.push_str(&format!("  Host entries: {}\n", summary.hosts));

    output.push_str("\nNetworks:\n");
    for (key, cidr) in &summary.network_cidrs {
        output.push_str(&format!("  {:<10} {}\n", key, cidr));
    }

    output.push_str("\nNTP peers:\n");
    if summary.ntp_peers.is_empty() {
        output.push_str("  (none)\n");
    }
    for peer in &summary.ntp_peers {
        output.push_str(&format!("  {}\n", peer));
    }
    output
}

pub fn format_prepared(config_path: &Path, seed_dir: &Path) -> String {
    format!(
        "Prepared {}\nSeed files in {}\n",
        config_path.display(),
        seed_dir.display()
    )
}
