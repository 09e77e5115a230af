// src/utils/log.rs

//! Run-level log formatting on top of the `log` facade.

use crate::models::RunReport;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(60));
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("    {key}: {value}");
    }
}

/// Per work item lines followed by the run totals.
pub fn run_summary(report: &RunReport) {
    separator();
    for item in &report.items {
        match &item.fault {
            Some(fault) => log::error!("  {} FAILED: {}", item.work_item, fault),
            None => log::info!(
                "  {}: {} harvested, {} accepted, {} skipped, {} anomalies{}",
                item.work_item,
                item.harvested,
                item.accepted,
                item.skipped,
                item.anomalies.len(),
                if item.truncated { " (page cap hit)" } else { "" }
            ),
        }
    }

    let elapsed = report.finished_at - report.started_at;
    summary(
        &format!("{} ({})", report.source, report.mode),
        &[
            ("Work items", report.items.len().to_string()),
            ("Failed", report.failed_items().to_string()),
            ("Harvested", report.harvested().to_string()),
            ("Accepted", report.accepted.to_string()),
            ("Inserted", report.inserted.to_string()),
            ("Anomalies", report.anomaly_count().to_string()),
            (
                "Elapsed",
                format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0),
            ),
        ],
    );
}
