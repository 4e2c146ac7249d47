use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded, closable FIFO queue shared by one producer and many consumers.
///
/// Each pushed item is handed to exactly one `pop` caller. Once closed, consumers drain the
/// remaining items and then observe `None`.
pub(crate) struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> TaskQueue<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero");
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Appends an item, waiting while the queue is full. Hands the item back if the queue
    /// has been closed.
    pub(crate) async fn push(&self, item: T) -> Result<(), T> {
        let mut pending = Some(item);
        loop {
            let notified = self.notify.notified();
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(pending.take().expect("pending item should exist until enqueued"));
            }
            if state.items.len() < self.capacity {
                let item = pending
                    .take()
                    .expect("item should only be enqueued once");
                state.items.push_back(item);
                drop(state);
                self.notify.notify_waiters();
                return Ok(());
            }
            drop(state);
            notified.await;
        }
    }

    /// Waits for the next item. Returns `None` once the queue is closed and drained.
    pub(crate) async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            let mut state = self.state.lock().await;
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.notify.notify_waiters();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            drop(state);
            notified.await;
        }
    }

    /// Marks the queue as closed and wakes every waiting consumer.
    pub(crate) async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }
}
