#![forbid(unsafe_code)]

//! Reactive substrate for loadable properties.
//!
//! This crate provides the change-tracking primitives the loadable core is
//! built on:
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`Computed`]: A lazily-evaluated, memoized value derived from one or
//!   more `Observable` dependencies, itself subscribable.
//! - [`BatchScope`] / [`action`]: guarded mutation scope that defers all
//!   notifications until the outermost scope exits.
//! - [`ReactiveConfig`]: per-thread strict-mode policy.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers and cleaned up lazily
//! during notification.
//!
//! `Computed<T>` registers an invalidator on each source, which marks it
//! stale synchronously on change, even inside a batch. Recomputation is
//! deferred until `get()`, unless the computed value has subscribers of its
//! own.
//!
//! `BatchScope` uses a thread-local context to defer notifications. Nested
//! scopes are supported; only the outermost scope triggers flush.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. `Computed::get()` never returns a stale value.
//! 6. Within a `BatchScope`, values are updated immediately but notifications
//!    are deferred until the outermost scope exits.

pub mod batch;
pub mod computed;
pub mod config;
pub mod observable;

pub use batch::{BatchScope, action, is_batching};
pub use computed::Computed;
pub use config::{EnforceActions, ReactiveConfig, configure, current_config};
pub use observable::{Observable, Subscription};
