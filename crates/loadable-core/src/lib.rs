#![forbid(unsafe_code)]

//! Loadable properties: observable fields that keep their last known value
//! while a refresh is in flight.
//!
//! # Overview
//!
//! - [`LoadableRegistry`]: declares a host's loadable fields and binds
//!   loading toggles to them.
//! - [`LoadableField`] / [`LoadableProperty`]: the value plus its loading flag,
//!   read as a memoized [`Loadable<T>`].
//! - [`Loadable`] / [`LoadingView`]: the read result. Both dereference to the
//!   value, so consumers that ignore loading state use it unchanged.
//! - [`is_loading`] / [`MaybeLoading`]: the marker query, total over every
//!   type that implements the trait.
//! - [`StatusRule`] / [`LoadingToggle`]: derive the loading flag from a
//!   method's arguments and set it before the method body runs.
//!
//! # Example
//!
//! ```
//! use loadable_core::{LoadableRegistry, is_loading};
//!
//! let mut registry = LoadableRegistry::new("Feed");
//! let items = registry.declare("items", vec![1, 2])?;
//! let refresh = registry.toggle::<()>("items", true)?;
//!
//! refresh.apply((), |()| ());
//! let read = items.get();
//! assert!(is_loading(&read));
//! assert_eq!(read.len(), 2);
//!
//! items.set(vec![3]);
//! items.set_loading(false);
//! assert!(!is_loading(&items.get()));
//! # Ok::<(), loadable_core::ConfigurationError>(())
//! ```

pub mod error;
pub mod field;
pub mod marker;
pub mod property;
pub mod registry;
pub mod toggle;
pub mod view;

pub use error::{ConfigurationError, Result};
pub use field::LoadableField;
pub use marker::{MaybeLoading, is_loading};
pub use property::LoadableProperty;
pub use registry::LoadableRegistry;
pub use toggle::{LeadingFlag, LoadingToggle, StatusRule};
pub use view::{Loadable, LoadingView};
