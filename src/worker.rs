//! One background thread per user-triggered action.
//!
//! A runner owns an "in progress" flag; starting a second action while one
//! runs is refused with [`Error::Busy`]. There is no queue and no
//! cancellation: a running action blocks its thread until it returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::core::{Error, Result};

/// Clears the busy flag when the worker finishes, even by panicking.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ActionRunner {
    name: String,
    busy: Arc<AtomicBool>,
}

impl ActionRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `action` on a new thread and hand its result to `on_done` there.
    pub fn spawn<T, F, C>(&self, action: F, on_done: C) -> Result<JoinHandle<()>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
        C: FnOnce(Result<T>) + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::info!("{} already in progress", self.name);
            return Err(Error::Busy(self.name.clone()));
        }

        let guard = BusyGuard(self.busy.clone());
        let name = self.name.clone();
        let handle = thread::Builder::new().name(self.name.clone()).spawn(move || {
            let _guard = guard;
            log::debug!("{} started", name);
            let result = action();
            if let Err(e) = &result {
                log::error!("{} failed: {}", name, e);
            }
            on_done(result);
        })?;
        Ok(handle)
    }

    /// Run `action` in the background and wait for its result.
    pub fn run<T, F>(&self, action: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = self.spawn(action, move |result| {
            // the receiver only goes away if the caller is gone too
            let _ = tx.send(result);
        })?;
        let result = rx.recv();
        if handle.join().is_err() {
            return Err(Error::Io(std::io::Error::other(format!("{} panicked", self.name))));
        }
        result.map_err(|_| Error::Io(std::io::Error::other(format!("{} ended without a result", self.name))))?
    }
}
