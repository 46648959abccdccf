// crates/dsp-tck-system/src/mock/executor.rs
// ============================================================================
// Module: Action Executor
// Description: Fixed pool of worker threads running mock actions.
// Purpose: Run counter-party actions off the thread that fired the event.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! Mock actions usually post a protocol message back to the TCK, which is
//! still handling the request that triggered them. Running actions on a
//! separate pool lets that request complete first.
//! Invariants:
//! - Jobs are taken in submission order by the first idle worker.
//! - After [`ActionExecutor::shutdown`] no job is accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc;
use std::thread;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Unit of work run by a worker.
pub type Job = Box<dyn FnOnce() + Send>;

/// Fixed-size worker pool.
pub struct ActionExecutor {
    /// Job queue sender; `None` after shutdown.
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    /// Worker threads awaiting join.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ActionExecutor {
    /// Starts `size` workers; a size of zero starts one.
    ///
    /// # Errors
    /// Returns [`io::Error`] when a worker thread cannot be spawned.
    pub fn new(size: usize) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(size.max(1));
        for index in 0 .. size.max(1) {
            let receiver = Arc::clone(&receiver);
            let worker = thread::Builder::new()
                .name(format!("dsp-tck-action-{index}"))
                .spawn(move || worker_loop(&receiver))?;
            workers.push(worker);
        }
        debug!(workers = workers.len(), "started action executor");
        Ok(Self { sender: Mutex::new(Some(sender)), workers: Mutex::new(workers) })
    }

    /// Queues a job; returns false once the pool is shut down.
    pub fn submit(&self, job: Job) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => {
                warn!("action submitted after executor shutdown");
                false
            }
        }
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());
        let workers: Vec<JoinHandle<()>> =
            self.workers.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        for worker in workers {
            if worker.join().is_err() {
                warn!("action worker panicked");
            }
        }
    }
}

/// Runs jobs until the queue sender is dropped.
fn worker_loop(receiver: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        let job = receiver.lock().unwrap_or_else(PoisonError::into_inner).recv();
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}
