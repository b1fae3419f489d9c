//! Terminal stand-in for the budget list page.

use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};
use wallai_client::budgets::{BudgetView, TotalsDisplay};

/// Records what the page would have shown, for the JSON report.
pub struct ConsoleView {
    rows: Mutex<Vec<u64>>,
    events: Mutex<Vec<Value>>,
}

impl ConsoleView {
    /// A page listing only `budget_id`.
    pub fn single(budget_id: u64) -> Self {
        Self { rows: Mutex::new(vec![budget_id]), events: Mutex::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<Value> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, event: Value) {
        tracing::debug!(%event, "view");
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl BudgetView for ConsoleView {
    fn shake_input(&self) {
        self.record(json!({ "event": "shake_input" }));
    }

    fn alert(&self, message: &str) {
        self.record(json!({ "event": "alert", "message": message }));
    }

    fn show_error_toast(&self, message: &str) {
        self.record(json!({ "event": "error_toast", "message": message }));
    }

    fn show_undo_toast(&self, budget_name: &str) {
        self.record(json!({ "event": "undo_toast", "budget": budget_name }));
    }

    fn hide_undo_toast(&self) {
        self.record(json!({ "event": "hide_undo_toast" }));
    }

    fn remove_row(&self, budget_id: u64) -> bool {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = rows.len();
        rows.retain(|id| *id != budget_id);
        rows.len() != before
    }

    fn row_count(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn update_totals(&self, totals: &TotalsDisplay) {
        self.record(json!({ "event": "totals", "totals": totals }));
    }

    fn reload(&self) {
        self.record(json!({ "event": "reload" }));
    }
}
