#![forbid(unsafe_code)]

//! The loading marker and its predicate.
//!
//! Any value can be asked "are you a loading placeholder?" through
//! [`is_loading`]. Only [`Loadable::Loading`](crate::Loadable) and
//! [`LoadingView`](crate::LoadingView) answer yes; everything else, including
//! `None`, answers no. The query goes through the [`MaybeLoading`] trait,
//! which is implemented for the std types a loadable field usually holds.
//! Host types opt in with an empty impl or [`not_loading!`](crate::not_loading).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// A value that may carry the loading marker.
pub trait MaybeLoading {
    /// Whether this value is a placeholder for an in-flight refresh.
    fn loading_marker(&self) -> bool {
        false
    }
}

/// Whether `value` currently carries the loading marker.
///
/// Total and pure: `false` for every ordinary value, `None` included.
#[must_use]
pub fn is_loading<V: MaybeLoading + ?Sized>(value: &V) -> bool {
    value.loading_marker()
}

/// Implement [`MaybeLoading`] for types that never carry the marker.
///
/// ```
/// use loadable_core::{is_loading, not_loading};
///
/// #[derive(Clone, PartialEq)]
/// struct Person {
///     name: String,
/// }
/// not_loading!(Person);
///
/// assert!(!is_loading(&Person { name: "Ada".into() }));
/// ```
#[macro_export]
macro_rules! not_loading {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::MaybeLoading for $ty {})+
    };
}

not_loading!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    str,
    String,
);

impl<T: MaybeLoading> MaybeLoading for Option<T> {
    fn loading_marker(&self) -> bool {
        self.as_ref().is_some_and(MaybeLoading::loading_marker)
    }
}

impl<T: MaybeLoading + ?Sized> MaybeLoading for &T {
    fn loading_marker(&self) -> bool {
        (**self).loading_marker()
    }
}

impl<T: MaybeLoading + ?Sized> MaybeLoading for Box<T> {
    fn loading_marker(&self) -> bool {
        (**self).loading_marker()
    }
}

impl<T: MaybeLoading + ?Sized> MaybeLoading for Rc<T> {
    fn loading_marker(&self) -> bool {
        (**self).loading_marker()
    }
}

impl<T: MaybeLoading + ?Sized> MaybeLoading for Arc<T> {
    fn loading_marker(&self) -> bool {
        (**self).loading_marker()
    }
}

// Collections of values are never placeholders themselves.
impl<T> MaybeLoading for [T] {}
impl<T, const N: usize> MaybeLoading for [T; N] {}
impl<T> MaybeLoading for Vec<T> {}
impl<T> MaybeLoading for VecDeque<T> {}
impl<T> MaybeLoading for BTreeSet<T> {}
impl<K, V> MaybeLoading for BTreeMap<K, V> {}
impl<T, S> MaybeLoading for HashSet<T, S> {}
impl<K, V, S> MaybeLoading for HashMap<K, V, S> {}
