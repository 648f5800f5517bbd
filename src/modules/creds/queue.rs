use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{watch, Semaphore};

#[derive(Debug, thiserror::Error)]
pub enum QueueError<T> {
    /// The queue was closed; the rejected item is handed back.
    #[error("work queue is closed")]
    Closed(T),
    #[error("mark_done called more times than items were put")]
    Overacknowledged,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// FIFO work queue shared by producers and consumers.
///
/// `put` waits while the queue is full, `get` waits while it is empty and
/// open. Every put item counts as pending until a consumer calls
/// [`WorkQueue::mark_done`]; [`WorkQueue::join`] resolves once nothing is
/// pending. Closing wakes every waiter: blocked puts fail, gets drain what is
/// left and then return `None`.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    /// One permit per queued item.
    available: Semaphore,
    /// One permit per free slot; `None` when unbounded.
    slots: Option<Semaphore>,
    pending: watch::Sender<usize>,
    capacity: usize,
}

impl<T> WorkQueue<T> {
    /// `capacity == 0` makes the queue unbounded.
    pub fn new(capacity: usize) -> Self {
        let (pending, _) = watch::channel(0usize);
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Semaphore::new(0),
            slots: (capacity > 0).then(|| Semaphore::new(capacity)),
            pending,
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    pub async fn put(&self, item: T) -> Result<(), QueueError<T>> {
        if let Some(slots) = &self.slots {
            match slots.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(QueueError::Closed(item)),
            }
        }

        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(QueueError::Closed(item));
            }
            // Counted before it becomes visible so a fast consumer can never
            // acknowledge an item that is not pending yet.
            self.pending.send_modify(|n| *n += 1);
            inner.items.push_back(item);
        }
        self.available.add_permits(1);
        Ok(())
    }

    /// Next item in FIFO order, or `None` once the queue is closed and empty.
    pub async fn get(&self) -> Option<T> {
        let item = match self.available.acquire().await {
            Ok(permit) => {
                permit.forget();
                self.lock().items.pop_front()
            }
            Err(_) => self.lock().items.pop_front(),
        };
        if item.is_some() {
            if let Some(slots) = &self.slots {
                slots.add_permits(1);
            }
        }
        item
    }

    /// Acknowledge one item previously returned by [`WorkQueue::get`].
    pub fn mark_done(&self) -> Result<(), QueueError<T>> {
        let acknowledged = self.pending.send_if_modified(|n| {
            if *n == 0 {
                false
            } else {
                *n -= 1;
                true
            }
        });
        if acknowledged {
            Ok(())
        } else {
            Err(QueueError::Overacknowledged)
        }
    }

    /// Resolves once every item ever put has been acknowledged.
    pub async fn join(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.available.close();
        if let Some(slots) = &self.slots {
            slots.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Items queued and not yet taken.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items put and not yet acknowledged.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        // A poisoned lock only means another task panicked mid-push/pop; the
        // deque itself is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
