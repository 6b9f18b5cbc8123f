#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in `Rc<RefCell<..>>`. Subscribers are
//! stored as `Weak` callbacks; the strong side lives in the [`Subscription`]
//! returned by [`subscribe()`](Observable::subscribe), so dropping the guard
//! is enough to unsubscribe. Dead entries are pruned lazily on the next
//! notification.
//!
//! Dependent [`Computed`](crate::Computed) values register invalidators,
//! which run synchronously inside [`set()`](Observable::set) and only mark the
//! dependent stale. A read inside an action therefore sees every write made
//! so far.
//!
//! Subscriber callbacks are delivered through the batch queue (see
//! [`crate::batch`]): a write outside any action opens an implicit one-write
//! batch, a write inside an action is delivered when the outermost scope
//! exits. Subscribers always receive the value current at delivery time.
//!
//! # Invariants
//!
//! 1. `version` increments exactly once per write that changes the value.
//! 2. Writing a value equal to the current one is a no-op: no version bump,
//!    no notification.
//! 3. Subscribers are notified in registration order.
//! 4. A subscriber whose [`Subscription`] was dropped is never called again.
//! 5. Invalidators have run before `set()` returns.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::batch::{self, BatchScope};
use crate::config;

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    invalidators: Vec<Weak<dyn Fn()>>,
}

impl<T> ObservableInner<T> {
    /// Live subscribers plus live dependent computed values.
    fn live_observers(&self) -> usize {
        let subscribers = self
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count();
        let dependents = self
            .invalidators
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count();
        subscribers + dependents
    }
}

/// A shared, observable value.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("observers", &inner.live_observers())
            .finish()
    }
}

/// RAII guard for a subscriber callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn new<C: Any>(callback: C) -> Self {
        Self {
            _callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                invalidators: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference.
    ///
    /// # Panics
    ///
    /// Panics if the closure writes this same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Returns whether the value changed.
    ///
    /// # Panics
    ///
    /// Panics when called outside an action while the thread's
    /// [`EnforceActions`](crate::EnforceActions) policy rejects the write.
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            let subscribers = inner.live_observers();
            let policy = config::enforce_actions();
            if !batch::is_batching() && policy.rejects(subscribers) {
                drop(inner);
                tracing::error!(
                    message = "reactive.strict.violation",
                    policy = ?policy,
                    subscribers
                );
                panic!(
                    "strict mode ({policy:?}) forbids changing observed values outside an action"
                );
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
        true
    }

    /// Modify the value in place through a clone, then [`set`](Self::set) it.
    ///
    /// Returns whether the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register `callback` to run after every change.
    ///
    /// The callback is not invoked for the current value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Number of changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live observers: subscribers whose guard is still alive
    /// plus computed values that depend on this one.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().live_observers()
    }

    /// Whether two handles refer to the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a callback that runs synchronously on every change, before
    /// any subscriber is notified.
    pub(crate) fn on_invalidate(&self, invalidate: impl Fn() + 'static) -> Subscription {
        let strong: Rc<dyn Fn()> = Rc::new(invalidate);
        let mut inner = self.inner.borrow_mut();
        inner.invalidators.retain(|w| w.strong_count() > 0);
        inner.invalidators.push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    fn notify(&self) {
        let _scope = BatchScope::new();
        let invalidators = {
            let mut inner = self.inner.borrow_mut();
            inner.invalidators.retain(|w| w.strong_count() > 0);
            inner
                .invalidators
                .iter()
                .filter_map(Weak::upgrade)
                .collect::<Vec<_>>()
        };
        for invalidate in invalidators {
            invalidate();
        }
        let key = Rc::as_ptr(&self.inner) as *const () as usize;
        let weak = Rc::downgrade(&self.inner);
        batch::defer_notification(
            key,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    deliver(&inner);
                }
            }),
        );
    }
}

fn deliver<T: Clone>(inner: &RefCell<ObservableInner<T>>) {
    let (value, callbacks) = {
        let mut inner = inner.borrow_mut();
        inner.subscribers.retain(|w| w.strong_count() > 0);
        let callbacks: Vec<Rc<Callback<T>>> =
            inner.subscribers.iter().filter_map(Weak::upgrade).collect();
        (inner.value.clone(), callbacks)
    };
    for callback in callbacks {
        callback(&value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
