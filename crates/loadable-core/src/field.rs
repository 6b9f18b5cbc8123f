#![forbid(unsafe_code)]

//! Host-side accessor for a declared loadable field.

use std::fmt;
use std::rc::Rc;

use loadable_reactive::{Computed, Subscription};

use crate::property::LoadableProperty;
use crate::view::Loadable;

/// Returned by [`LoadableRegistry::declare`](crate::LoadableRegistry::declare)
/// and stored by the host in place of the plain field.
///
/// Reads go through [`get`](Self::get), which yields the value or its loading
/// view. Writes go through [`set`](Self::set). The loading flag itself is
/// driven by a [`LoadingToggle`](crate::LoadingToggle) and cleared by the host
/// once the refresh completes.
pub struct LoadableField<T> {
    property: Rc<LoadableProperty<T>>,
}

impl<T: Clone + PartialEq + 'static> LoadableField<T> {
    pub(crate) fn new(property: Rc<LoadableProperty<T>>) -> Self {
        Self { property }
    }

    #[must_use]
    pub fn get(&self) -> Loadable<T> {
        self.property.read()
    }

    /// Borrow the current read. The closure may write this field.
    pub fn with<R>(&self, f: impl FnOnce(&Loadable<T>) -> R) -> R {
        self.property.with(f)
    }

    pub fn set(&self, value: T) {
        self.property.set_value(value);
    }

    /// Clear or raise the loading flag directly, e.g. when a refresh
    /// completes.
    pub fn set_loading(&self, loading: bool) {
        self.property.set_loading(loading);
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.property.is_loading()
    }

    pub fn subscribe(&self, callback: impl Fn(&Loadable<T>) + 'static) -> Subscription {
        self.property.subscribe(callback)
    }

    /// Memoized getter over this field; see [`LoadableProperty::derive`].
    pub fn derive<U: Clone + PartialEq + 'static>(
        &self,
        map: impl Fn(&Loadable<T>) -> U + 'static,
    ) -> Computed<U> {
        self.property.derive(map)
    }

    #[must_use]
    pub fn field(&self) -> &str {
        self.property.field()
    }

    #[must_use]
    pub fn read_version(&self) -> u64 {
        self.property.read_version()
    }
}

impl<T: fmt::Debug> fmt::Debug for LoadableField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadableField").field(&self.property).finish()
    }
}
