//! Read-only views over ledger totals: export snapshots and display formatting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::BranchTotals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub workspace: String,
    pub export_date: DateTime<Utc>,
    pub total_hours: f64,
    pub total_seconds: u64,
    pub branches: Vec<BranchTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTime {
    pub branch: String,
    pub seconds: u64,
    pub hours: f64,
}

/// Builds an export snapshot. Branches are ordered by time spent, then name.
pub fn export_snapshot(
    workspace: &str,
    totals: &BranchTotals,
    exported_at: DateTime<Utc>,
) -> ExportSnapshot {
    let mut branches: Vec<BranchTime> = totals
        .iter()
        .map(|(branch, &seconds)| BranchTime {
            branch: branch.clone(),
            seconds,
            hours: hours_rounded(seconds),
        })
        .collect();
    branches.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.branch.cmp(&b.branch)));

    let total_seconds = totals
        .values()
        .fold(0u64, |acc, &seconds| acc.saturating_add(seconds));

    ExportSnapshot {
        workspace: workspace.to_string(),
        export_date: exported_at,
        total_hours: hours_rounded(total_seconds),
        total_seconds,
        branches,
    }
}

fn hours_rounded(seconds: u64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Formats seconds as `1h 05m 07s`, dropping leading zero units.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
