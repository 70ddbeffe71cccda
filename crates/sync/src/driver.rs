use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::reconciler::RosterReconciler;
use crate::store::StoreRevisions;

/// Launches a reconciliation pass whenever the roster or decoration revision moves.
///
/// Passes are spawned rather than awaited in line, so a slow pass never delays the next
/// snapshot; the reconciler's ledger keeps overlapping passes from duplicating lookups.
pub struct ReconcileDriver {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconcileDriver {
    /// Must be called from within a tokio runtime. The current snapshot is reconciled
    /// immediately.
    pub fn spawn(reconciler: Arc<RosterReconciler>) -> Self {
        let cancel = CancellationToken::new();
        let revisions = reconciler.store().subscribe();
        let task = tokio::spawn(drive(reconciler, revisions, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stops listening and aborts outstanding passes. Idempotent.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("reconcile driver stopped");
        }
    }
}

impl Drop for ReconcileDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn drive(
    reconciler: Arc<RosterReconciler>,
    mut revisions: watch::Receiver<StoreRevisions>,
    cancel: CancellationToken,
) {
    let mut passes = JoinSet::new();
    let mut seen = *revisions.borrow_and_update();
    spawn_pass(&mut passes, &reconciler);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *revisions.borrow_and_update();
                if current.roster != seen.roster || current.decorations != seen.decorations {
                    spawn_pass(&mut passes, &reconciler);
                }
                seen = current;
            }
            Some(joined) = passes.join_next() => {
                if let Err(error) = joined
                    && error.is_panic()
                {
                    tracing::error!(error = %error, "reconciliation pass panicked");
                }
            }
        }
    }

    passes.abort_all();
}

fn spawn_pass(passes: &mut JoinSet<()>, reconciler: &Arc<RosterReconciler>) {
    let reconciler = reconciler.clone();
    passes.spawn(async move {
        reconciler.reconcile().await;
    });
}
