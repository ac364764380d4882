//! Explicit unit-of-work capability and commit-aware notification.
//!
//! Instead of hooking an ambient transaction manager, the business layer
//! passes its active [`UnitOfWork`] (or none) into the notifier explicitly.
//! Deferred actions run strictly after `commit`, in registration order, and
//! never run when the unit of work rolls back. Action failures are logged
//! and swallowed: the state change is already durable by the time they run,
//! so a notification problem must not un-decide it.

use futures_util::future::BoxFuture;
use tracing::error;

/// Deferred work scheduled to run after commit.
///
/// The boxed closure is invoked at most once; its future reports failure via
/// `Result` so the runner can log without unwinding.
pub type DeferredAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), String>> + Send>;

/// Scope of state mutations that become durable together.
///
/// Created per business operation; `commit` consumes the unit of work and
/// fires the registered callbacks in order, `rollback` consumes it and drops
/// them. Dropping without either is equivalent to a rollback.
#[derive(Default)]
pub struct UnitOfWork {
    after_commit: Vec<DeferredAction>,
}

impl UnitOfWork {
    /// Begin an empty unit of work.
    pub fn begin() -> Self {
        Self::default()
    }

    /// Register work to run after this unit of work commits.
    pub fn on_commit(&mut self, action: DeferredAction) {
        self.after_commit.push(action);
    }

    /// Number of registered post-commit actions.
    pub fn pending_actions(&self) -> usize {
        self.after_commit.len()
    }

    /// Commit: run every deferred action in registration order.
    ///
    /// Failures are logged and do not stop later actions; the underlying
    /// state change is already durable.
    pub async fn commit(self) {
        for action in self.after_commit {
            if let Err(message) = action().await {
                error!(error = %message, "post-commit action failed");
            }
        }
    }

    /// Roll back: drop every deferred action unrun.
    pub fn rollback(self) {
        drop(self.after_commit);
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("after_commit", &self.after_commit.len())
            .finish()
    }
}

/// Defers outbound notifications until the enclosing unit of work commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitAwareNotifier;

impl CommitAwareNotifier {
    /// Create a notifier.
    pub fn new() -> Self {
        Self
    }

    /// Schedule `action` to run after `uow` commits, or run it immediately
    /// when no unit of work is active.
    ///
    /// In both modes the action's failure is logged and swallowed; it never
    /// reaches the caller and never affects the transaction outcome.
    pub async fn publish_after_commit(&self, uow: Option<&mut UnitOfWork>, action: DeferredAction) {
        match uow {
            Some(uow) => uow.on_commit(action),
            None => {
                if let Err(message) = action().await {
                    error!(error = %message, "immediate notification failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recording_action(log: Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> DeferredAction {
        Box::new(move || {
            Box::pin(async move {
                log.lock().expect("log lock").push(label);
                Ok(())
            })
        })
    }

    fn failing_action(calls: Arc<AtomicUsize>) -> DeferredAction {
        Box::new(move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("transport unavailable".to_owned())
            })
        })
    }

    #[tokio::test]
    async fn commit_runs_actions_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut uow = UnitOfWork::begin();
        uow.on_commit(recording_action(log.clone(), "first"));
        uow.on_commit(recording_action(log.clone(), "second"));
        uow.on_commit(recording_action(log.clone(), "third"));

        uow.commit().await;
        assert_eq!(*log.lock().expect("log lock"), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn rollback_never_runs_actions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut uow = UnitOfWork::begin();
        uow.on_commit(recording_action(log.clone(), "never"));

        uow.rollback();
        assert!(log.lock().expect("log lock").is_empty());
    }

    #[tokio::test]
    async fn failing_action_does_not_stop_later_ones() {
        let calls = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut uow = UnitOfWork::begin();
        uow.on_commit(failing_action(calls.clone()));
        uow.on_commit(recording_action(log.clone(), "after-failure"));

        uow.commit().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock().expect("log lock"), ["after-failure"]);
    }

    #[tokio::test]
    async fn notifier_runs_immediately_without_a_unit_of_work() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifier = CommitAwareNotifier::new();
        notifier
            .publish_after_commit(None, recording_action(log.clone(), "now"))
            .await;
        assert_eq!(*log.lock().expect("log lock"), ["now"]);
    }

    #[tokio::test]
    async fn notifier_defers_inside_a_unit_of_work() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifier = CommitAwareNotifier::new();
        let mut uow = UnitOfWork::begin();
        notifier
            .publish_after_commit(Some(&mut uow), recording_action(log.clone(), "later"))
            .await;

        assert!(log.lock().expect("log lock").is_empty(), "must not run before commit");
        uow.commit().await;
        assert_eq!(*log.lock().expect("log lock"), ["later"]);
    }

    #[tokio::test]
    async fn immediate_failures_are_swallowed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifier = CommitAwareNotifier::new();
        // Returns normally even though the action failed.
        notifier
            .publish_after_commit(None, failing_action(calls.clone()))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn each_action_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut uow = UnitOfWork::begin();
        let counter = calls.clone();
        uow.on_commit(Box::new(move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }));
        uow.commit().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
