//! Fixed-size worker pool shared by the renderer and the preloaders.
//!
//! Jobs run in FIFO order on a fixed set of OS threads; there is no job
//! cancellation (a submitted job always runs to completion). Long-running
//! producers like the preloader instead poll a [`CancelToken`] at their own
//! safe points and submit nothing further once it is raised.
//!
//! The queue is an unbounded crossbeam channel: producers never block, and
//! `wait_all` provides the drain barrier callers need before tearing state
//! down (mode switch, list reset).

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, trace};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared flag raised to stop cooperative producers. Checked at image
/// boundaries by the preloader; the renderer ignores it (renders run to
/// completion).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the flag again after the pool has been drained.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct PoolState {
    pending: Mutex<usize>,
    drained: Condvar,
}

/// Fixed-size FIFO worker pool.
pub struct ThreadPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    state: Arc<PoolState>,
}

impl ThreadPool {
    /// Default worker count: one thread per core, minus the main thread.
    pub fn default_threads() -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.saturating_sub(1).max(1)
    }

    /// Spawn `threads` workers (at least one).
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (tx, rx) = unbounded::<Job>();
        let state = Arc::new(PoolState {
            pending: Mutex::new(0),
            drained: Condvar::new(),
        });
        let workers = (0..threads)
            .map(|id| {
                let rx: Receiver<Job> = rx.clone();
                let state = Arc::clone(&state);
                std::thread::Builder::new()
                    .name(format!("pool-{id}"))
                    .spawn(move || worker_loop(id, rx, state))
                    .expect("spawn pool worker")
            })
            .collect();
        debug!(target: "pool", threads, "pool started");
        Self {
            tx: Some(tx),
            workers,
            state,
        }
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a job. Jobs start in submission order.
    pub fn add<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut pending = self.state.pending.lock().expect("pool lock");
            *pending += 1;
        }
        if let Some(tx) = &self.tx {
            // Unbounded channel: send can only fail once workers are gone,
            // which cannot happen while `self` is alive.
            tx.send(Box::new(job)).expect("pool queue closed");
        }
    }

    /// Block until every submitted job has finished.
    pub fn wait_all(&self) {
        let mut pending = self.state.pending.lock().expect("pool lock");
        while *pending > 0 {
            pending = self.state.drained.wait(pending).expect("pool lock");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop once the queue drains.
        self.tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!(target: "pool", "pool stopped");
    }
}

fn worker_loop(id: usize, rx: Receiver<Job>, state: Arc<PoolState>) {
    for job in rx.iter() {
        trace!(target: "pool", worker = id, "job start");
        job();
        let mut pending = state.pending.lock().expect("pool lock");
        *pending -= 1;
        if *pending == 0 {
            state.drained.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn runs_jobs_and_waits() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..64 {
            let counter = Arc::clone(&counter);
            pool.add(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn single_worker_preserves_fifo_order() {
        let pool = ThreadPool::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let order = Arc::clone(&order);
            pool.add(move || {
                order.lock().unwrap().push(i);
            });
        }
        pool.wait_all();
        assert_eq!(*order.lock().unwrap(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn wait_all_on_idle_pool_returns() {
        let pool = ThreadPool::new(2);
        pool.wait_all();
        assert_eq!(pool.threads(), 2);
    }

    #[test]
    fn cancel_token_round_trip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }

    #[test]
    fn drop_joins_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2);
            for _ in 0..8 {
                let counter = Arc::clone(&counter);
                pool.add(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            // Dropped before wait_all: workers must still drain the queue.
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }
}
