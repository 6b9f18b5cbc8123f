#![forbid(unsafe_code)]

//! Loadable public facade crate.
//!
//! Re-exports the loadable core and the reactive substrate it runs on. Hosts
//! normally only need the prelude:
//!
//! ```
//! use loadable::prelude::*;
//!
//! struct Profile {
//!     name: LoadableField<Option<String>>,
//!     fetch: LoadingToggle<()>,
//! }
//!
//! impl Profile {
//!     fn new() -> loadable::Result<Self> {
//!         let mut registry = LoadableRegistry::new("Profile");
//!         let name = registry.declare("name", None)?;
//!         let fetch = registry.toggle("name", true)?;
//!         Ok(Self { name, fetch })
//!     }
//!
//!     fn fetch(&self) {
//!         self.fetch.apply((), |()| ());
//!     }
//!
//!     fn resolve(&self, name: &str) {
//!         action(|| {
//!             self.name.set(Some(name.to_owned()));
//!             self.name.set_loading(false);
//!         });
//!     }
//! }
//!
//! let profile = Profile::new()?;
//! profile.fetch();
//! assert!(is_loading(&profile.name.get()));
//! assert!(profile.name.get().is_none());
//!
//! profile.resolve("Ada");
//! assert!(!is_loading(&profile.name.get()));
//! assert_eq!(profile.name.get().as_deref(), Some("Ada"));
//! # Ok::<(), loadable::ConfigurationError>(())
//! ```

pub use loadable_core as core;
pub use loadable_reactive as reactive;

pub use loadable_core::{
    ConfigurationError, LeadingFlag, Loadable, LoadableField, LoadableProperty,
    LoadableRegistry, LoadingToggle, LoadingView, MaybeLoading, Result, StatusRule, is_loading,
    not_loading,
};

pub mod prelude {
    pub use loadable_core::{
        Loadable, LoadableField, LoadableRegistry, LoadingToggle, MaybeLoading, StatusRule,
        is_loading, not_loading,
    };
    pub use loadable_reactive::{BatchScope, Computed, Subscription, action};
}
