//! Display strings for the page totals after a deletion.

use serde::Serialize;

use super::api::UpdatedTotals;

/// Rendered totals; `None` fields leave the page element untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsDisplay {
    pub total_budgeted: Option<String>,
    pub remaining: Option<String>,
    pub spent_label: Option<String>,
    pub progress: Option<Progress>,
}

/// Progress bar width and colour class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// Percentage width, capped at 100.
    pub width: f64,
    pub color_class: &'static str,
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

fn color_class(percentage: f64) -> &'static str {
    if percentage > 90.0 {
        "bg-red-500"
    } else if percentage > 75.0 {
        "bg-yellow-500"
    } else {
        "bg-green-500"
    }
}

impl From<&UpdatedTotals> for TotalsDisplay {
    fn from(totals: &UpdatedTotals) -> Self {
        let progress = totals.spent_percentage.map(|p| {
            let width = p.min(100.0);
            Progress { width, color_class: color_class(width) }
        });
        Self {
            total_budgeted: totals.total_budgeted.map(money),
            remaining: totals.remaining.map(money),
            spent_label: totals.spent_percentage.map(|p| format!("{p}% spent")),
            progress,
        }
    }
}
