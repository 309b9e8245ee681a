//! Serial execution authority.
//!
//! Every mutation of SDK state goes through one [`SerialExecutor`]: units of
//! work execute strictly one at a time, in submission order, on a single
//! spawned task draining an unbounded channel. Units never block on I/O —
//! work that needs a network result spawns the request as an independent
//! task and schedules its continuation back into the executor when the
//! response arrives. A unit submitting another unit (reentrant submission)
//! lands at the back of the queue, never runs inline; ordering stays
//! predictable and stack depth stays bounded.

use tokio::sync::mpsc;

type Unit<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Submission handle. Keeps the drain loop alive; when every strong handle
/// is dropped the loop finishes the queued units and exits.
pub struct SerialExecutor<S> {
    tx: mpsc::UnboundedSender<Unit<S>>,
}

impl<S> Clone for SerialExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> SerialExecutor<S> {
    /// Spawn the drain loop around `state`.
    ///
    /// `make_state` receives a [`WeakSerialExecutor`] the state can hold for
    /// scheduling continuations; the weak handle does not keep the loop
    /// alive, so dropping the last strong handle still shuts the loop down.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn<F>(make_state: F) -> Self
    where
        F: FnOnce(WeakSerialExecutor<S>) -> S,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Unit<S>>();
        let weak = WeakSerialExecutor { tx: tx.downgrade() };
        let mut state = make_state(weak);
        tokio::spawn(async move {
            while let Some(unit) = rx.recv().await {
                unit(&mut state);
            }
        });
        Self { tx }
    }

    /// Enqueue a unit. Returns `false` when the loop has already exited —
    /// a silent no-op by contract, never an error surfaced to callers.
    pub fn submit<F>(&self, unit: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx.send(Box::new(unit)).is_ok()
    }

    pub fn downgrade(&self) -> WeakSerialExecutor<S> {
        WeakSerialExecutor {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning submission handle for continuations scheduled from inside the
/// state or from in-flight network tasks.
pub struct WeakSerialExecutor<S> {
    tx: mpsc::WeakUnboundedSender<Unit<S>>,
}

impl<S> Clone for WeakSerialExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> WeakSerialExecutor<S> {
    /// Enqueue a unit if the loop is still alive.
    pub fn submit<F>(&self, unit: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        match self.tx.upgrade() {
            Some(tx) => tx.send(Box::new(unit)).is_ok(),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
