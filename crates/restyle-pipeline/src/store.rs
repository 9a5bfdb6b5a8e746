//! The workflow state holder.
//!
//! [`WorkflowStore`] owns the single mutable [`WorkflowState`] and
//! publishes a fresh snapshot through a [`tokio::sync::watch`] channel on
//! every change. Each update is applied atomically under the channel's
//! lock, so readers never observe a half-applied transition.
//!
//! Background stage work writes through [`apply`](WorkflowStore::apply)
//! with the [`RunId`] it was started under. Once the run has been
//! superseded by a reset or upload those writes are dropped.

use tokio::sync::watch;

use crate::state::WorkflowState;
use crate::types::{RunId, TransitionError};

/// Single-writer holder of the published workflow state.
#[derive(Debug)]
pub struct WorkflowStore {
    tx: watch::Sender<WorkflowState>,
}

impl WorkflowStore {
    /// Create a store holding an idle, empty state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WorkflowState::default());
        Self { tx }
    }

    /// Receive a snapshot after every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.tx.subscribe()
    }

    /// Clone of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowState {
        self.tx.borrow().clone()
    }

    /// The run currently accepting writes.
    #[must_use]
    pub fn current_run(&self) -> RunId {
        self.tx.borrow().run()
    }

    /// Apply a caller-initiated transition.
    ///
    /// Subscribers are notified only if the transition succeeds. A
    /// rejected transition must leave the state untouched.
    pub(crate) fn transition<T>(
        &self,
        f: impl FnOnce(&mut WorkflowState) -> Result<T, TransitionError>,
    ) -> Result<T, TransitionError> {
        let mut outcome = None;
        self.tx.send_if_modified(|state| {
            let result = f(state);
            let modified = result.is_ok();
            outcome = Some(result);
            modified
        });
        outcome.unwrap_or_else(|| unreachable!("send_if_modified always runs its closure"))
    }

    /// Apply an unconditional update, such as a reset.
    pub(crate) fn update(&self, f: impl FnOnce(&mut WorkflowState)) {
        self.tx.send_modify(f);
    }

    /// Apply a background update on behalf of `run`.
    ///
    /// Returns `false`, leaving the state untouched, if `run` is stale.
    pub(crate) fn apply(&self, run: RunId, f: impl FnOnce(&mut WorkflowState)) -> bool {
        self.tx.send_if_modified(|state| {
            if state.run() != run {
                tracing::debug!(%run, current = %state.run(), "dropping update from stale run");
                return false;
            }
            f(state);
            true
        })
    }
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::tests::tiny_png;
    use crate::stage::WorkflowStage;
    use crate::types::SourcePhoto;

    fn photo() -> SourcePhoto {
        SourcePhoto::capture(tiny_png()).unwrap()
    }

    #[test]
    fn new_store_is_idle() {
        let store = WorkflowStore::new();
        assert_eq!(store.snapshot().stage(), WorkflowStage::Idle);
    }

    #[test]
    fn rejected_transition_does_not_notify() {
        let store = WorkflowStore::new();
        let rx = store.subscribe();

        let result = store.transition(WorkflowState::begin_suggestions);
        assert_eq!(result, Err(TransitionError::NoPhoto));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn successful_transition_notifies() {
        let store = WorkflowStore::new();
        store.update(|s| s.upload(photo()));
        let mut rx = store.subscribe();

        store.transition(WorkflowState::begin_suggestions).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().stage(),
            WorkflowStage::AnalyzingAndSuggesting
        );
    }

    #[test]
    fn stale_run_writes_are_dropped() {
        let store = WorkflowStore::new();
        store.update(|s| s.upload(photo()));
        let run = store.current_run();
        store.transition(WorkflowState::begin_suggestions).unwrap();

        store.update(WorkflowState::reset);
        assert_ne!(store.current_run(), run);

        let applied = store.apply(run, |s| s.set_progress("late"));
        assert!(!applied);
        assert_eq!(store.snapshot().progress_label(), "");
        assert_eq!(store.snapshot().stage(), WorkflowStage::Idle);
    }

    #[test]
    fn current_run_writes_apply() {
        let store = WorkflowStore::new();
        store.update(|s| s.upload(photo()));
        let run = store.current_run();
        store.transition(WorkflowState::begin_suggestions).unwrap();

        assert!(store.apply(run, |s| s.set_progress("working")));
        assert_eq!(store.snapshot().progress_label(), "working");
    }
}
