//! Output formatters for the reconciliation report

use anyhow::Result;
use colored::*;
use listcraft_core::{AdvisoryKind, ReconcileReport};
use std::path::Path;

/// Print the report in human-readable format with colors
pub fn print_human(output: Option<&Path>, offers: Option<&Path>, report: &ReconcileReport) {
    match output {
        Some(path) => println!("{}", format!("Written: {}", path.display()).bold()),
        None => println!("{}", "Analysis only (no --output given)".bold()),
    }
    println!();

    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Updated rows:".bold(), report.updated);
    println!("  {} {}", "Inserted rows:".bold(), report.inserted);
    println!(
        "  {} {}",
        "Unmatched base rows:".bold(),
        report.unmatched_base
    );
    if let Some(offers_path) = offers {
        println!(
            "  {} {} ({})",
            "Offers:".bold(),
            report.offers_generated,
            offers_path.display()
        );
        if report.offers_skipped > 0 {
            println!(
                "  {} {}",
                "Offers skipped:".yellow().bold(),
                report.offers_skipped
            );
        }
    }

    if report.advisories.is_empty() {
        println!();
        println!("{}", "✓ No advisories".green().bold());
        return;
    }

    println!();
    println!("{}", "Advisories:".bold().underline());
    for advisory in &report.advisories {
        let kind_str = match advisory.kind {
            AdvisoryKind::AmbiguousMatch => "WARN".yellow().bold(),
            AdvisoryKind::FormulaProtected => "INFO".blue().bold(),
            AdvisoryKind::UnresolvedPrice => "WARN".yellow().bold(),
        };
        println!(
            "  {} [{}] {}",
            kind_str,
            advisory.kind.as_str().bright_black(),
            advisory.message
        );
    }
}

/// Print the report in JSON format
pub fn print_json(output: Option<&Path>, offers: Option<&Path>, report: &ReconcileReport) -> Result<()> {
    let json = serde_json::json!({
        "output": output.map(|p| p.display().to_string()),
        "offers_file": offers.map(|p| p.display().to_string()),
        "report": report,
    });

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
