//! Budget deletion: server endpoints, the confirm/undo flow and totals rendering.

pub mod api;
pub mod flow;
pub mod totals;

pub use api::{AuditData, BudgetApi, DeleteRequest, Deleted, HttpBudgetApi, UpdatedTotals};
pub use flow::{BudgetView, ConfirmOutcome, DeleteFlow, DeletePhase, DeleteTarget, FlowError, FlowSettings, UndoOutcome};
pub use totals::{Progress, TotalsDisplay};
