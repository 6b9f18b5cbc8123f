#![forbid(unsafe_code)]

//! Batched notification: guarded mutation scopes.
//!
//! # Design
//!
//! A thread-local batch context holds two deferred queues:
//!
//! - **notifications**: one entry per [`Observable`](crate::Observable) that
//!   changed, keyed by the observable's address so each source is delivered at
//!   most once per flush;
//! - **reactions**: one entry per [`Computed`](crate::Computed) that must
//!   re-evaluate because a source changed, also keyed by address. The entry
//!   is queued by the write itself, when the computed value is marked stale.
//!
//! [`BatchScope`] increments the depth on creation and decrements it on drop.
//! When the outermost scope exits the queues are flushed: all pending
//! notifications first, then all pending reactions, repeating until both
//! queues are empty. Running every notification before any reaction means a
//! computed value that depends on several sources written in the same batch
//! re-evaluates once.
//!
//! # Invariants
//!
//! 1. Values are updated immediately; only notifications are deferred.
//! 2. Nested scopes are supported; only the outermost scope flushes.
//! 3. A key is queued at most once per queue until that queue is drained.
//! 4. Writes made by subscribers during a flush are delivered by the same
//!    flush, never lost.
//!
//! # Failure Modes
//!
//! - **Subscriber panics during flush**: the flushing flag is reset by a drop
//!   guard. The rest of the queue being drained at that moment is dropped;
//!   anything still queued is delivered by the next flush.

use std::cell::RefCell;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::config;

#[derive(Default)]
struct Queue {
    entries: Vec<Box<dyn FnOnce()>>,
    keys: HashSet<usize>,
}

impl Queue {
    fn push(&mut self, key: usize, run: Box<dyn FnOnce()>) {
        if self.keys.insert(key) {
            self.entries.push(run);
        }
    }

    fn take(&mut self) -> Vec<Box<dyn FnOnce()>> {
        self.keys.clear();
        std::mem::take(&mut self.entries)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct BatchState {
    depth: u32,
    flushing: bool,
    notifications: Queue,
    reactions: Queue,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// RAII guard that defers all notifications until the outermost scope exits.
///
/// `BatchScope` is the substrate's guarded mutation scope: every write made
/// while at least one scope is alive is visible immediately to direct reads,
/// but subscribers and computed values are only told about it once, when the
/// last scope drops.
///
/// The guard is `!Send`: it belongs to the thread whose batch it opened.
#[must_use = "notifications are flushed when the scope is dropped"]
pub struct BatchScope {
    _not_send: PhantomData<Rc<()>>,
}

impl BatchScope {
    /// Open a batch scope on the current thread.
    pub fn new() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &batch_depth())
            .finish()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let should_flush = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            state.depth == 0 && !state.flushing
        });
        if should_flush {
            flush();
        }
    }
}

/// Run `f` as an action: inside a [`BatchScope`], so that every write it
/// makes is delivered to observers as a single notification cycle.
pub fn action<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}

/// Whether the current thread is inside an action.
#[must_use]
pub fn is_batching() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

/// Current nesting depth of batch scopes on this thread.
#[must_use]
pub fn batch_depth() -> u32 {
    BATCH.with(|b| b.borrow().depth)
}

/// Queue a notification for delivery at the end of the current batch.
pub(crate) fn defer_notification(key: usize, run: Box<dyn FnOnce()>) {
    BATCH.with(|b| b.borrow_mut().notifications.push(key, run));
}

/// Run a reaction now, or queue it if a batch is open or flushing.
pub(crate) fn schedule_reaction(key: usize, run: Box<dyn FnOnce()>) {
    let run_now = BATCH.with(|b| {
        let mut state = b.borrow_mut();
        if state.depth > 0 || state.flushing {
            state.reactions.push(key, run);
            None
        } else {
            Some(run)
        }
    });
    if let Some(run) = run_now {
        run();
    }
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        BATCH.with(|b| b.borrow_mut().flushing = false);
    }
}

fn flush() {
    BATCH.with(|b| b.borrow_mut().flushing = true);
    let _guard = FlushGuard;
    let mut delivered = 0usize;

    loop {
        let next = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            if !state.notifications.is_empty() {
                Some(state.notifications.take())
            } else if !state.reactions.is_empty() {
                Some(state.reactions.take())
            } else {
                None
            }
        });
        let Some(entries) = next else { break };
        for run in entries {
            run();
            delivered += 1;
        }
    }

    if config::trace_notifications() {
        tracing::trace!(message = "reactive.batch.flush", delivered);
    }
}
