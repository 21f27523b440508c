use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

/// Run-once gate for a route table's first hooks.
///
/// The fast path is a single atomic load. Callers that find the gate open
/// take the mutex, re-check, and only then run the hooks, so concurrent first
/// requests wait for the winner instead of racing past it. A failed run leaves
/// the gate open for the next caller.
#[derive(Debug, Default)]
pub(crate) struct FirstRunGate {
    done: AtomicBool,
    lock: Mutex<()>,
}

impl FirstRunGate {
    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn run_once<E>(&self, run: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        if self.is_done() {
            return Ok(());
        }

        // A panic inside `run` poisons the lock but leaves `done` unset, so the
        // next caller simply retries.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_done() {
            return Ok(());
        }

        run()?;
        self.done.store(true, Ordering::Release);
        Ok(())
    }
}

/// Copies carry the current state but get their own lock.
impl Clone for FirstRunGate {
    fn clone(&self) -> Self {
        Self {
            done: AtomicBool::new(self.is_done()),
            lock: Mutex::new(()),
        }
    }
}
