use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts live workers so a watcher can wait until every one of them has exited.
#[derive(Debug, Default)]
pub(crate) struct WorkerGroup {
    active_workers: AtomicUsize,
    notify: Notify,
}

impl WorkerGroup {
    pub(crate) fn new() -> Self {
        Self {
            active_workers: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Registers one worker. The returned guard releases the slot when dropped, including
    /// when the worker unwinds.
    pub(crate) fn enter(self: &Arc<Self>) -> WorkerGuard {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
        WorkerGuard {
            group: Arc::clone(self),
            active: true,
        }
    }

    /// Resolves once every guard handed out by [`WorkerGroup::enter`] has been dropped.
    pub(crate) async fn wait_until_idle(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active_workers.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        if self.active_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

pub(crate) struct WorkerGuard {
    group: Arc<WorkerGroup>,
    active: bool,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.active {
            self.group.release();
            self.active = false;
        }
    }
}
