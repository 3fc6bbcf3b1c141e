//! Fixed-size worker pool fed by one unbounded FIFO channel.
//!
//! `submit` never blocks and the queue has no bound: a producer that outruns
//! the workers grows it without limit.  Shutdown closes the channel, so every
//! already-queued job still runs before the workers exit.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use log::trace;

use crate::codec::{CodecError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pending result of a submitted task.
#[must_use = "a task's result is only observed through its handle"]
pub struct TaskHandle<T> {
    rx: Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes.  A task that panicked resolves to
    /// [`CodecError::TaskAborted`].
    pub fn wait(self) -> Result<T> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) | Err(_) => Err(CodecError::TaskAborted),
        }
    }
}

pub struct ThreadPool {
    sender:  Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size:    usize,
}

impl ThreadPool {
    /// Start `threads` workers; `0` means one per available core.
    pub fn new(threads: usize) -> Result<Self> {
        let size = if threads == 0 { num_cpus::get().max(1) } else { threads };
        let (tx, rx) = channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("blockpress-worker-{i}"))
                .spawn(move || run_worker(i, rx))?;
            workers.push(handle);
        }

        Ok(Self {
            sender:  Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `f` and return a handle to its result.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = channel::bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // The handle may already be gone; nobody wants the result then.
            let _ = result_tx.send(outcome);
        });

        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(CodecError::PoolShutdown)?;
        sender.send(job).map_err(|_| CodecError::PoolShutdown)?;
        Ok(TaskHandle { rx: result_rx })
    }

    /// Stop accepting work, let the workers drain the queue, and join them.
    /// Calling it again is a no-op.  Must not be called from a worker.
    pub fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            // Jobs run under catch_unwind, so a worker thread never panics itself.
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(index: usize, rx: Receiver<Job>) {
    trace!("worker {index} started");
    while let Ok(job) = rx.recv() {
        job();
    }
    trace!("worker {index} stopped");
}
