#![forbid(unsafe_code)]

//! The loadable property: a reactive value plus a reactive loading flag.
//!
//! # Design
//!
//! Two [`Observable`]s hold the state and a [`Computed`] over both produces
//! the read result, so reads between changes are served from cache and
//! dependents are told about a change once per action.
//!
//! # Invariants
//!
//! 1. `value` and `loading` are independent; turning loading on never clears
//!    the value.
//! 2. `is_loading(&read())` equals the last flag written, also when read
//!    inside the action that wrote it.
//! 3. The read result's content equals the last value written, in both states.
//! 4. Every write runs inside an action, so it satisfies strict mode and
//!    subscribers see the post-write state.

use std::rc::Rc;

use loadable_reactive::{Computed, Observable, Subscription, action};

use crate::view::Loadable;

/// A value that may be refreshing.
///
/// One property backs one loadable field of one host instance. It is not
/// `Clone`: the host owns it, and everything else reaches it through the
/// host's accessors.
pub struct LoadableProperty<T> {
    field: Rc<str>,
    value: Observable<T>,
    loading: Observable<bool>,
    read: Computed<Loadable<T>>,
}

impl<T: Clone + PartialEq + 'static> LoadableProperty<T> {
    /// Create a property for `field`, initially holding `initial` and not
    /// loading.
    pub fn new(field: impl Into<Rc<str>>, initial: T) -> Self {
        let value = Observable::new(initial);
        let loading = Observable::new(false);
        let read = Computed::from2(&value, &loading, |value: &T, loading: &bool| {
            Loadable::new(value.clone(), *loading)
        });
        Self {
            field: field.into(),
            value,
            loading,
            read,
        }
    }

    /// Name of the field this property backs.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The value, wrapped in the loading view while a refresh is in flight.
    #[must_use]
    pub fn read(&self) -> Loadable<T> {
        self.read.get()
    }

    /// Borrow the read result without cloning it.
    ///
    /// The closure sees the result current at the call and may write this
    /// property; later reads observe the write.
    pub fn with<R>(&self, f: impl FnOnce(&Loadable<T>) -> R) -> R {
        self.read.with(f)
    }

    /// Replace the value.
    pub fn set_value(&self, value: T) {
        let changed = action(|| self.value.set(value));
        tracing::trace!(
            message = "loadable.property.set_value",
            field = %self.field,
            changed
        );
    }

    /// Turn the loading flag on or off.
    pub fn set_loading(&self, loading: bool) {
        let changed = action(|| self.loading.set(loading));
        tracing::trace!(
            message = "loadable.property.set_loading",
            field = %self.field,
            loading,
            changed
        );
    }

    /// Current state of the loading flag.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Run `callback` after every change of the read result.
    ///
    /// Writes made in one action produce a single call.
    pub fn subscribe(&self, callback: impl Fn(&Loadable<T>) + 'static) -> Subscription {
        self.read.subscribe(callback)
    }

    /// A memoized read derived from this property. It recomputes only when
    /// the read result changes.
    pub fn derive<U: Clone + PartialEq + 'static>(
        &self,
        map: impl Fn(&Loadable<T>) -> U + 'static,
    ) -> Computed<U> {
        self.read.map(map)
    }

    /// Number of times the read result has been recomputed.
    #[must_use]
    pub fn read_version(&self) -> u64 {
        self.read.version()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoadableProperty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadableProperty")
            .field("field", &self.field)
            .field("value", &self.value)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

/// Type-erased view used by the registry and by loading toggles, which only
/// ever flip the flag.
pub(crate) trait ErasedProperty {
    fn field(&self) -> &str;
    fn set_loading(&self, loading: bool);
    fn is_loading(&self) -> bool;
}

impl<T: Clone + PartialEq + 'static> ErasedProperty for LoadableProperty<T> {
    fn field(&self) -> &str {
        LoadableProperty::field(self)
    }

    fn set_loading(&self, loading: bool) {
        LoadableProperty::set_loading(self, loading);
    }

    fn is_loading(&self) -> bool {
        LoadableProperty::is_loading(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::is_loading;
    use loadable_reactive::{EnforceActions, ReactiveConfig, configure};
    use std::cell::{Cell, RefCell};

    #[test]
    fn starts_ready_with_initial_value() {
        let prop = LoadableProperty::new("persons", vec!["Ada"]);
        let read = prop.read();
        assert!(!is_loading(&read));
        assert_eq!(*read, vec!["Ada"]);
        assert_eq!(prop.field(), "persons");
    }

    #[test]
    fn loading_keeps_last_value() {
        let prop = LoadableProperty::new("boss", "Gandhi".to_string());
        prop.set_loading(true);

        let read = prop.read();
        assert!(is_loading(&read));
        assert_eq!(read.as_str(), "Gandhi");

        prop.set_value("Mandela".to_string());
        prop.set_loading(false);
        let read = prop.read();
        assert!(!is_loading(&read));
        assert_eq!(read.as_str(), "Mandela");
    }

    #[test]
    fn value_written_while_loading_is_visible() {
        let prop = LoadableProperty::new("count", 1);
        prop.set_loading(true);
        prop.set_value(2);
        assert_eq!(prop.read(), Loadable::loading(2));
    }

    #[test]
    fn reads_are_memoized() {
        let prop = LoadableProperty::new("n", 0);
        let _ = prop.read();
        let _ = prop.read();
        prop.with(|r| assert_eq!(**r, 0));
        assert_eq!(prop.read_version(), 1);

        prop.set_loading(true);
        let _ = prop.read();
        let _ = prop.read();
        assert_eq!(prop.read_version(), 2);
    }

    #[test]
    fn one_notification_per_flip() {
        let prop = LoadableProperty::new("n", 0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = prop.subscribe(move |r| s.borrow_mut().push(r.clone()));

        prop.set_loading(true);
        prop.set_loading(true);
        prop.set_value(5);
        prop.set_value(5);
        prop.set_loading(false);

        assert_eq!(
            *seen.borrow(),
            vec![Loadable::loading(0), Loadable::loading(5), Loadable::ready(5)]
        );
    }

    #[test]
    fn action_coalesces_value_and_flag() {
        let prop = LoadableProperty::new("n", 0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = prop.subscribe(move |_| h.set(h.get() + 1));

        prop.set_loading(true);
        action(|| {
            prop.set_value(1);
            prop.set_loading(false);
        });
        assert_eq!(hits.get(), 2);
        assert_eq!(prop.read(), Loadable::ready(1));
    }

    #[test]
    fn derive_recomputes_per_transition() {
        let prop = LoadableProperty::new("moto", None::<String>);
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        let label = prop.derive(move |moto| {
            r.set(r.get() + 1);
            Loadable::map(moto.clone(), |m| m.map(|text| text.len()))
        });
        let _sub = label.subscribe(|_| {});
        assert_eq!(runs.get(), 1);

        prop.set_value(None);
        let _ = label.get();
        assert_eq!(runs.get(), 1);

        prop.set_loading(true);
        let _ = label.get();
        let _ = label.get();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn read_inside_action_sees_latest_flag() {
        let prop = LoadableProperty::new("persons", Vec::<u8>::new());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = prop.subscribe(move |_| h.set(h.get() + 1));

        action(|| {
            prop.set_loading(true);
            assert!(is_loading(&prop.read()));
            prop.set_value(vec![1, 2]);
            let read = prop.read();
            assert!(is_loading(&read));
            assert_eq!(*read, vec![1, 2]);
            prop.set_loading(false);
            assert_eq!(prop.read(), Loadable::ready(vec![1, 2]));
            assert_eq!(hits.get(), 0);
        });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn write_inside_with_on_observed_property() {
        let prop = LoadableProperty::new("persons", Vec::<u8>::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = prop.subscribe(move |r| s.borrow_mut().push(r.clone()));

        prop.with(|read| {
            if read.is_empty() {
                prop.set_value(vec![1]);
            }
        });
        assert_eq!(prop.read(), Loadable::ready(vec![1]));
        assert_eq!(*seen.borrow(), vec![Loadable::ready(vec![1])]);
    }

    #[test]
    fn writes_satisfy_strict_mode() {
        configure(ReactiveConfig::default().with_enforce_actions(EnforceActions::Always));
        let prop = LoadableProperty::new("n", 0);
        let _sub = prop.subscribe(|_| {});
        prop.set_loading(true);
        prop.set_value(3);
        assert_eq!(prop.read(), Loadable::loading(3));
        configure(ReactiveConfig::default());
    }

    #[test]
    fn erased_view_flips_flag() {
        let prop = LoadableProperty::new("n", 0);
        let erased: &dyn ErasedProperty = &prop;
        erased.set_loading(true);
        assert!(erased.is_loading());
        assert_eq!(erased.field(), "n");
        assert!(is_loading(&prop.read()));
    }
}
