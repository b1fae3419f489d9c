//! Budget deletion with a confirmation modal and a time-boxed undo.
//!
//! ```text
//! Closed --open--> Open --confirm (phrase ok)--> Deleting --ok--> Closed + undo window
//!                   ^  \--confirm (mismatch)--> Open (shake)       |
//!                   |                                              \--error--> Open (alert)
//!                   \------------------close / escape--------------------------/
//! ```
//!
//! At most one mutating request (delete or undo) is in flight per flow;
//! anything else that would start one is refused with [`FlowError::Busy`].
//! The undo window is a single-shot timer; arming a new one aborts the old.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use wallai_core::{AppConfig, Error};

use super::api::{AuditData, BudgetApi, DeleteRequest};
use super::totals::TotalsDisplay;

/// UI surface driven by the flow.
pub trait BudgetView: Send + Sync {
    /// Move focus to the confirmation input after the modal opens.
    fn focus_confirmation(&self) {}

    /// Invalid-phrase cue on the confirmation input.
    fn shake_input(&self);

    /// Blocking alert, used while the modal is open.
    fn alert(&self, message: &str);

    /// Transient error notification, used when no modal is open.
    fn show_error_toast(&self, message: &str);

    fn show_undo_toast(&self, budget_name: &str);

    fn hide_undo_toast(&self);

    /// Remove the row for `budget_id`. Returns false if no such row is displayed.
    fn remove_row(&self, budget_id: u64) -> bool;

    /// Budget rows still displayed.
    fn row_count(&self) -> usize;

    fn update_totals(&self, totals: &TotalsDisplay);

    /// Full page reload.
    fn reload(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("a delete or undo request is already in progress")]
    Busy,

    #[error("delete modal is not open")]
    NotOpen,
}

/// Budget selected for deletion, with the counts shown in the modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteTarget {
    pub budget_id: u64,
    pub name: String,
    pub expense_count: u32,
    pub split_count: u32,
    pub member_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePhase {
    Closed,
    Open,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmOutcome {
    /// Phrase mismatch; nothing was sent.
    Rejected,
    Deleted,
    /// Server or network failure; the modal stays open with its input.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoOutcome {
    /// No undo window is armed (never deleted, expired, or dismissed).
    Unavailable,
    Restored,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub confirmation_phrase: String,
    pub undo_window: Duration,
    pub user_agent: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FlowSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            confirmation_phrase: config.confirmation_phrase.clone(),
            undo_window: config.undo_window(),
            user_agent: config.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Delete,
    Undo,
}

#[derive(Debug)]
struct UndoWindow {
    generation: u64,
    budget_name: String,
    undo_data: Value,
    deadline: Instant,
    timer: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct FlowState {
    modal_open: bool,
    target: Option<DeleteTarget>,
    confirmation: String,
    show_error: bool,
    in_flight: Option<Mutation>,
    undo: Option<UndoWindow>,
    generation: u64,
}

impl FlowState {
    fn reset_modal(&mut self) {
        self.modal_open = false;
        self.target = None;
        self.confirmation.clear();
        self.show_error = false;
    }

    fn clear_undo(&mut self) -> bool {
        match self.undo.take() {
            Some(window) => {
                window.timer.abort();
                true
            }
            None => false,
        }
    }
}

/// Message shown to the user for a failed request.
fn user_message(err: &Error) -> String {
    match err {
        Error::HttpError(msg) | Error::Network(msg) | Error::Parse(msg) => msg.clone(),
        Error::CsrfMissing => "CSRF token not found".to_string(),
        other => other.to_string(),
    }
}

/// Delete/undo controller for one budget list.
#[derive(Clone)]
pub struct DeleteFlow {
    api: Arc<dyn BudgetApi>,
    view: Arc<dyn BudgetView>,
    settings: FlowSettings,
    state: Arc<Mutex<FlowState>>,
    client_ip: Arc<OnceCell<String>>,
}

impl DeleteFlow {
    pub fn new(api: Arc<dyn BudgetApi>, view: Arc<dyn BudgetView>, settings: FlowSettings) -> Self {
        Self {
            api,
            view,
            settings,
            state: Arc::new(Mutex::new(FlowState::default())),
            client_ip: Arc::new(OnceCell::new()),
        }
    }

    pub async fn phase(&self) -> DeletePhase {
        let state = self.state.lock().await;
        if state.in_flight == Some(Mutation::Delete) {
            DeletePhase::Deleting
        } else if state.modal_open {
            DeletePhase::Open
        } else {
            DeletePhase::Closed
        }
    }

    pub async fn target(&self) -> Option<DeleteTarget> {
        self.state.lock().await.target.clone()
    }

    pub async fn confirmation(&self) -> String {
        self.state.lock().await.confirmation.clone()
    }

    /// Whether the last confirmation attempt was rejected.
    pub async fn show_error(&self) -> bool {
        self.state.lock().await.show_error
    }

    /// Name of the budget that can currently be restored.
    pub async fn undo_available(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .undo
            .as_ref()
            .filter(|w| Instant::now() < w.deadline)
            .map(|w| w.budget_name.clone())
    }

    /// Open the confirmation modal for `target`, discarding any previous input.
    pub async fn open(&self, target: DeleteTarget) -> Result<(), FlowError> {
        {
            let mut state = self.state.lock().await;
            if state.in_flight == Some(Mutation::Delete) {
                return Err(FlowError::Busy);
            }
            state.reset_modal();
            tracing::debug!(budget_id = target.budget_id, "opening delete modal");
            state.target = Some(target);
            state.modal_open = true;
        }
        self.view.focus_confirmation();
        Ok(())
    }

    pub async fn set_confirmation(&self, text: &str) {
        let mut state = self.state.lock().await;
        if state.modal_open {
            state.confirmation = text.to_string();
        }
    }

    /// Close the modal and reset its form. Refused while a delete is in flight.
    pub async fn close(&self) -> Result<(), FlowError> {
        let mut state = self.state.lock().await;
        if state.in_flight == Some(Mutation::Delete) {
            return Err(FlowError::Busy);
        }
        state.reset_modal();
        Ok(())
    }

    /// Escape key: closes the modal only if it is open.
    pub async fn escape(&self) -> Result<(), FlowError> {
        if self.phase().await == DeletePhase::Open { self.close().await } else { Ok(()) }
    }

    /// Validate the typed phrase and, if it matches, delete the budget.
    pub async fn confirm(&self) -> Result<ConfirmOutcome, FlowError> {
        let (target, confirmation) = {
            let mut state = self.state.lock().await;
            if state.in_flight.is_some() {
                return Err(FlowError::Busy);
            }
            if !state.modal_open {
                return Err(FlowError::NotOpen);
            }
            let target = state.target.clone().ok_or(FlowError::NotOpen)?;
            if state.confirmation != self.settings.confirmation_phrase {
                state.show_error = true;
                drop(state);
                self.view.shake_input();
                return Ok(ConfirmOutcome::Rejected);
            }
            state.show_error = false;
            state.in_flight = Some(Mutation::Delete);
            (target, state.confirmation.clone())
        };

        let request = DeleteRequest {
            budget_id: target.budget_id,
            confirmation,
            audit_data: self.audit_data().await,
        };
        let result = self.api.delete_budget(&request).await;

        let mut state = self.state.lock().await;
        state.in_flight = None;

        match result {
            Ok(deleted) => {
                tracing::info!(budget_id = target.budget_id, "budget deleted");
                state.reset_modal();
                self.arm_undo(&mut state, target.name.clone(), deleted.undo_data);
                drop(state);

                self.view.show_undo_toast(&target.name);
                if !self.view.remove_row(target.budget_id) || self.view.row_count() == 0 {
                    self.view.reload();
                }
                if let Some(totals) = &deleted.updated_totals {
                    self.view.update_totals(&TotalsDisplay::from(totals));
                }
                Ok(ConfirmOutcome::Deleted)
            }
            Err(e) => {
                tracing::warn!(budget_id = target.budget_id, error = %e, "delete failed");
                let message = user_message(&e);
                let modal_open = state.modal_open;
                drop(state);
                self.surface_error(modal_open, &message);
                Ok(ConfirmOutcome::Failed(message))
            }
        }
    }

    /// Restore the last deleted budget while its undo window is open.
    pub async fn undo(&self) -> Result<UndoOutcome, FlowError> {
        let undo_data = {
            let mut state = self.state.lock().await;
            if state.in_flight.is_some() {
                return Err(FlowError::Busy);
            }
            let Some(window) = state.undo.as_ref() else {
                tracing::debug!("no undo data available");
                return Ok(UndoOutcome::Unavailable);
            };
            if Instant::now() >= window.deadline {
                state.clear_undo();
                return Ok(UndoOutcome::Unavailable);
            }
            let data = window.undo_data.clone();
            state.in_flight = Some(Mutation::Undo);
            data
        };

        let result = self.api.undo_delete(&undo_data).await;

        let mut state = self.state.lock().await;
        state.in_flight = None;
        match result {
            Ok(()) => {
                tracing::info!("budget restored");
                state.clear_undo();
                drop(state);
                self.view.hide_undo_toast();
                self.view.reload();
                Ok(UndoOutcome::Restored)
            }
            Err(e) => {
                tracing::warn!(error = %e, "undo failed");
                drop(state);
                let message = user_message(&e);
                self.view.show_error_toast(&format!("Error: {message}"));
                Ok(UndoOutcome::Failed(message))
            }
        }
    }

    /// Dismiss the undo toast early; the deletion becomes final.
    pub async fn dismiss_undo(&self) {
        let cleared = self.state.lock().await.clear_undo();
        if cleared {
            self.view.hide_undo_toast();
        }
    }

    fn surface_error(&self, modal_open: bool, message: &str) {
        let text = format!("Error: {message}");
        if modal_open { self.view.alert(&text) } else { self.view.show_error_toast(&text) }
    }

    async fn audit_data(&self) -> AuditData {
        let ip = self
            .client_ip
            .get_or_init(|| async { self.api.client_ip().await })
            .await
            .clone();
        AuditData { ip, timestamp: chrono::Utc::now().to_rfc3339(), user_agent: self.settings.user_agent.clone() }
    }

    fn arm_undo(&self, state: &mut FlowState, budget_name: String, undo_data: Value) {
        state.clear_undo();
        state.generation += 1;
        let generation = state.generation;
        let window = self.settings.undo_window;

        let shared = Arc::clone(&self.state);
        let view = Arc::clone(&self.view);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let expired = {
                let mut state = shared.lock().await;
                if state.undo.as_ref().is_some_and(|w| w.generation == generation) {
                    state.undo = None;
                    true
                } else {
                    false
                }
            };
            if expired {
                tracing::debug!("undo window expired");
                view.hide_undo_toast();
            }
        });

        state.undo = Some(UndoWindow { generation, budget_name, undo_data, deadline: Instant::now() + window, timer });
    }
}
