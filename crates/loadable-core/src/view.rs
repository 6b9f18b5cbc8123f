#![forbid(unsafe_code)]

//! What a read of a loadable field returns.
//!
//! [`Loadable<T>`] is either `Ready(value)` or `Loading(view)`. Both arms
//! dereference to the same `T`, so code that does not care about loading state
//! uses the result exactly like the value itself (`persons.len()`,
//! `boss.name`, `format!("{moto}")`). Code that does care asks
//! [`is_loading`](crate::is_loading).
//!
//! [`LoadingView<T>`] is the marker-carrying wrapper: a read-only view of the
//! last known value. It implements `Deref` but never `DerefMut`, and there is
//! no way to reach the value mutably through it.
//!
//! Helpers are associated functions and neither type implements `AsRef`, so
//! apart from the derived std traits a method called on a read result
//! resolves to `T`'s method of that name.

use std::fmt;
use std::ops::Deref;

use crate::marker::MaybeLoading;

/// Read-only view of the last known value while a refresh is in flight.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadingView<T> {
    value: T,
}

impl<T> LoadingView<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Unwrap the stale value.
    #[must_use]
    pub fn into_inner(this: Self) -> T {
        this.value
    }
}

impl<T> Deref for LoadingView<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for LoadingView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadingView").field(&self.value).finish()
    }
}

impl<T: fmt::Display> fmt::Display for LoadingView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T> MaybeLoading for LoadingView<T> {
    fn loading_marker(&self) -> bool {
        true
    }
}

/// The read surface of a loadable field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Loadable<T> {
    /// No refresh in flight.
    Ready(T),
    /// A refresh is in flight; the view holds the last known value.
    Loading(LoadingView<T>),
}

// Like `Rc`, the helpers below are associated functions rather than methods,
// so they never shadow a method of `T` reached through `Deref`.
impl<T> Loadable<T> {
    /// Build the read result for `value` with the given loading flag.
    #[must_use]
    pub fn new(value: T, loading: bool) -> Self {
        if loading {
            Self::loading(value)
        } else {
            Self::Ready(value)
        }
    }

    #[must_use]
    pub const fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    #[must_use]
    pub const fn loading(value: T) -> Self {
        Self::Loading(LoadingView::new(value))
    }

    #[must_use]
    pub const fn is_loading(this: &Self) -> bool {
        matches!(this, Self::Loading(_))
    }

    /// The value, whichever the state.
    #[must_use]
    pub fn value(this: &Self) -> &T {
        match this {
            Self::Ready(value) => value,
            Self::Loading(view) => &view.value,
        }
    }

    #[must_use]
    pub fn into_inner(this: Self) -> T {
        match this {
            Self::Ready(value) => value,
            Self::Loading(view) => view.value,
        }
    }

    /// `Some(value)` when ready, `None` while loading.
    #[must_use]
    pub fn ready_value(this: &Self) -> Option<&T> {
        match this {
            Self::Ready(value) => Some(value),
            Self::Loading(_) => None,
        }
    }

    /// Transform the value, keeping the loading state.
    #[must_use]
    pub fn map<U>(this: Self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        let loading = Self::is_loading(&this);
        Loadable::new(f(Self::into_inner(this)), loading)
    }

    /// Borrow the value, keeping the loading state.
    #[must_use]
    pub fn borrowed(this: &Self) -> Loadable<&T> {
        Loadable::new(Self::value(this), Self::is_loading(this))
    }
}

impl<T> Deref for Loadable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        Self::value(self)
    }
}

impl<T: fmt::Display> fmt::Display for Loadable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::value(self).fmt(f)
    }
}

impl<T: Default> Default for Loadable<T> {
    fn default() -> Self {
        Self::Ready(T::default())
    }
}

impl<T> From<T> for Loadable<T> {
    fn from(value: T) -> Self {
        Self::Ready(value)
    }
}

impl<T> MaybeLoading for Loadable<T> {
    fn loading_marker(&self) -> bool {
        Self::is_loading(self)
    }
}
