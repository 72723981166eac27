use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

type PendingTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueueState {
    pending: VecDeque<PendingTask>,
    draining: bool,
    watchdog: Option<JoinHandle<()>>,
}

struct SerializerInner {
    state: Mutex<QueueState>,
    check_interval: Duration,
}

/// Runs queued tasks strictly one at a time, in enqueue order.
///
/// Used to hold back requests that arrived during a token refresh: each
/// held-back request is boxed into a task that waits for the refresh outcome
/// and then dispatches. Draining one task to completion before starting the
/// next preserves the submission order end to end.
///
/// A watchdog ticks while the queue is live and restarts the drain loop if
/// it ever finds pending tasks with no drainer, so a lost wakeup degrades to
/// a short delay instead of a permanently stuck queue. The watchdog is torn
/// down whenever the queue empties.
#[derive(Clone)]
pub struct RequestSerializer {
    inner: Arc<SerializerInner>,
}

impl RequestSerializer {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            inner: Arc::new(SerializerInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    draining: false,
                    watchdog: None,
                }),
                check_interval,
            }),
        }
    }

    /// Appends a task and guarantees a drain loop is running. Synchronous:
    /// two calls made in sequence from the same task are enqueued in that
    /// sequence.
    pub fn enqueue<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("non-poisoned serializer lock");
        state.pending.push_back(Box::pin(task));
        let depth = state.pending.len();
        debug!(depth, "serializer.enqueued");

        if !state.draining {
            state.draining = true;
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }
        if state.watchdog.is_none() {
            state.watchdog = Some(tokio::spawn(watch(Arc::clone(&self.inner))));
        }
    }

    pub fn depth(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("non-poisoned serializer lock")
            .pending
            .len()
    }
}

async fn drain(inner: Arc<SerializerInner>) {
    loop {
        let next = {
            let mut state = inner.state.lock().expect("non-poisoned serializer lock");
            match state.pending.pop_front() {
                Some(task) => Some(task),
                None => {
                    // Emptiness check and flag clear under one lock hold, so
                    // an enqueue racing with shutdown either sees draining
                    // still set or finds it cleared and spawns a new loop.
                    state.draining = false;
                    if let Some(watchdog) = state.watchdog.take() {
                        watchdog.abort();
                    }
                    None
                }
            }
        };
        match next {
            Some(task) => task.await,
            None => return,
        }
    }
}

async fn watch(inner: Arc<SerializerInner>) {
    let mut interval = tokio::time::interval(inner.check_interval);
    interval.tick().await;
    loop {
        interval.tick().await;
        let mut state = inner.state.lock().expect("non-poisoned serializer lock");
        if !state.pending.is_empty() && !state.draining {
            warn!(depth = state.pending.len(), "serializer.drain.restarted");
            state.draining = true;
            tokio::spawn(drain(Arc::clone(&inner)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn tasks_run_in_enqueue_order() {
        let serializer = RequestSerializer::new(Duration::from_millis(100));
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();
        let mut done_tx = Some(done_tx);

        for index in 0..5 {
            let order = Arc::clone(&order);
            let done_tx = Mutex::new(if index == 4 { done_tx.take() } else { None });
            serializer.enqueue(async move {
                // Later tasks sleep less; order must still hold.
                tokio::time::sleep(Duration::from_millis(5 * (5 - index))).await;
                order.lock().expect("order lock").push(index);
                if let Some(done) = done_tx.lock().expect("done lock").take() {
                    let _ = done.send(());
                }
            });
        }

        done_rx.await.expect("final task completes");
        assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2, 3, 4]);
        assert_eq!(serializer.depth(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tasks_never_overlap() {
        let serializer = RequestSerializer::new(Duration::from_millis(100));
        let running = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Arc::new(Mutex::new(Some(done_tx)));
        let remaining = Arc::new(AtomicUsize::new(8));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let overlaps = Arc::clone(&overlaps);
            let done_tx = Arc::clone(&done_tx);
            let remaining = Arc::clone(&remaining);
            serializer.enqueue(async move {
                if running.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                    if let Some(done) = done_tx.lock().expect("done lock").take() {
                        let _ = done.send(());
                    }
                }
            });
        }

        done_rx.await.expect("all tasks complete");
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn queue_restarts_after_going_idle() {
        let serializer = RequestSerializer::new(Duration::from_millis(100));

        for _round in 0..2 {
            let (done_tx, done_rx) = oneshot::channel();
            let done_tx = Mutex::new(Some(done_tx));
            serializer.enqueue(async move {
                if let Some(done) = done_tx.lock().expect("done lock").take() {
                    let _ = done.send(());
                }
            });
            done_rx.await.expect("task completes");
        }

        assert_eq!(serializer.depth(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watchdog_restarts_a_stalled_queue() {
        let serializer = RequestSerializer::new(Duration::from_millis(20));
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Mutex::new(Some(done_tx));

        // Simulate a lost wakeup: a task is pending but no drain is running.
        {
            let mut state = serializer
                .inner
                .state
                .lock()
                .expect("non-poisoned serializer lock");
            state.pending.push_back(Box::pin(async move {
                if let Some(done) = done_tx.lock().expect("done lock").take() {
                    let _ = done.send(());
                }
            }));
            state.watchdog = Some(tokio::spawn(watch(Arc::clone(&serializer.inner))));
        }

        tokio::time::timeout(Duration::from_secs(2), done_rx)
            .await
            .expect("watchdog restarts the drain")
            .expect("task completes");
    }
}
