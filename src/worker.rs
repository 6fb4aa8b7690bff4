//! Single-worker background executor with last-call-wins semantics.
//!
//! Work is submitted as a closure that receives a `CancelToken`. Submitting new work cancels
//! the outstanding job and resets the published value to its default. A job's result is only
//! published if no newer submission (or explicit cancellation) happened while it was running,
//! so a job that ignores its token can never overwrite newer state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use log::debug;
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Cooperative cancellation flag shared between a submitter and a running job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
struct WorkerState<T> {
    busy: bool,
    generation: u64,
    token: Option<CancelToken>,
    value: T,
}

struct Shared<T> {
    state: Mutex<WorkerState<T>>,
    idle: Condvar,
}

impl<T> Shared<T> {
    /// Publish the outcome of job `generation` unless it has been superseded.
    fn complete(&self, generation: u64, outcome: Option<T>) {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Discarding result of superseded job {}.", generation);
            return;
        }

        if let Some(value) = outcome {
            state.value = value;
        }
        state.busy = false;
        state.token = None;
        self.idle.notify_all();
    }
}

pub struct Worker<T> {
    pool: ThreadPool,
    shared: Arc<Shared<T>>,
}

impl<T> Worker<T>
where
    T: Clone + Default + Send + 'static,
{
    pub fn new(name: &str) -> Result<Self> {
        let name = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(move |idx| format!("{}-{}", name, idx))
            .build()?;

        Ok(Worker {
            pool,
            shared: Arc::new(Shared {
                state: Mutex::new(WorkerState::default()),
                idle: Condvar::new(),
            }),
        })
    }

    /// Cancel any outstanding job and schedule `job` in its place.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce(&CancelToken) -> Option<T> + Send + 'static,
    {
        let token = CancelToken::new();
        let generation = {
            let mut state = self.shared.state.lock();
            if let Some(previous) = state.token.replace(token.clone()) {
                previous.cancel();
            }
            state.generation += 1;
            state.busy = true;
            state.value = T::default();
            state.generation
        };

        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let outcome = if token.is_cancelled() {
                None
            } else {
                job(&token)
            };
            shared.complete(generation, outcome);
        });
    }

    /// Cancel the outstanding job, if any. Its result will be discarded even if it completes.
    pub fn cancel(&self) {
        self.abort(false);
    }

    /// Cancel the outstanding job, if any, and publish the default value.
    pub fn reset(&self) {
        self.abort(true);
    }

    fn abort(&self, clear: bool) {
        let mut state = self.shared.state.lock();
        if let Some(token) = state.token.take() {
            token.cancel();
        }
        state.generation += 1;
        state.busy = false;
        if clear {
            state.value = T::default();
        }
        self.shared.idle.notify_all();
    }

    /// Occupy the pool until the returned sender is used or dropped.
    #[cfg(test)]
    pub(crate) fn hold(&self) -> std::sync::mpsc::Sender<()> {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        self.pool.spawn(move || {
            let _ = release_rx.recv();
        });
        release_tx
    }

    /// Block until every job already queued on the pool has run.
    #[cfg(test)]
    pub(crate) fn drain(&self) {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        self.pool.spawn(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.recv();
    }

    pub fn is_busy(&self) -> bool {
        self.shared.state.lock().busy
    }

    /// Most recently published value.
    pub fn latest(&self) -> T {
        self.shared.state.lock().value.clone()
    }

    /// Block until no job is outstanding and return the published value.
    pub fn wait(&self) -> T {
        let mut state = self.shared.state.lock();
        while state.busy {
            self.shared.idle.wait(&mut state);
        }
        state.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_single_job() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        assert!(!worker.is_busy());

        worker.submit(|_| Some(7));
        assert_eq!(worker.wait(), 7);
        assert!(!worker.is_busy());
        assert_eq!(worker.latest(), 7);

        Ok(())
    }

    #[test]
    fn test_last_call_wins() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        let (started_tx, started_rx) = mpsc::channel();

        // first job ignores its result being stale and returns anyway once cancelled
        worker.submit(move |token| {
            started_tx.send(()).unwrap();
            while !token.is_cancelled() {
                thread::yield_now();
            }
            Some(1)
        });
        started_rx.recv().unwrap();

        worker.submit(|_| Some(2));
        assert_eq!(worker.wait(), 2);

        Ok(())
    }

    #[test]
    fn test_submit_resets_value() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        worker.submit(|_| Some(3));
        assert_eq!(worker.wait(), 3);

        let (release_tx, release_rx) = mpsc::channel::<()>();
        worker.submit(move |_| {
            release_rx.recv().unwrap();
            Some(4)
        });
        assert!(worker.is_busy());
        assert_eq!(worker.latest(), 0);

        release_tx.send(()).unwrap();
        assert_eq!(worker.wait(), 4);

        Ok(())
    }

    #[test]
    fn test_cancel_discards_late_result() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        let (release_tx, release_rx) = mpsc::channel::<()>();

        worker.submit(move |_| {
            release_rx.recv().unwrap();
            Some(5)
        });
        worker.cancel();
        assert!(!worker.is_busy());

        release_tx.send(()).unwrap();
        worker.drain();

        assert!(!worker.is_busy());
        assert_eq!(worker.latest(), 0);

        Ok(())
    }

    #[test]
    fn test_reset_publishes_default() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        worker.submit(|_| Some(6));
        assert_eq!(worker.wait(), 6);

        let (release_tx, release_rx) = mpsc::channel::<()>();
        worker.submit(move |_| {
            release_rx.recv().unwrap();
            Some(7)
        });
        worker.reset();
        assert!(!worker.is_busy());
        assert_eq!(worker.latest(), 0);

        release_tx.send(()).unwrap();
        worker.drain();
        assert_eq!(worker.latest(), 0);

        Ok(())
    }

    #[test]
    fn test_cancelled_job_is_not_published() -> Result<()> {
        let worker = Worker::<u32>::new("test")?;
        let (started_tx, started_rx) = mpsc::channel();

        worker.submit(move |token| {
            started_tx.send(()).unwrap();
            while !token.is_cancelled() {
                thread::yield_now();
            }
            None
        });
        started_rx.recv().unwrap();

        worker.cancel();
        assert_eq!(worker.wait(), 0);

        Ok(())
    }
}
