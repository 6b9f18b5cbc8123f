#![forbid(unsafe_code)]

//! Per-instance registry of loadable fields.
//!
//! A host builds one [`LoadableRegistry`] in its constructor, declares its
//! loadable fields on it, then binds its loading toggles. Any failure is a
//! [`ConfigurationError`] the constructor returns with `?`, so a host with a
//! bad declaration never comes into existence.
//!
//! ```
//! use loadable_core::{LoadableRegistry, StatusRule};
//!
//! let mut registry = LoadableRegistry::new("Directory");
//! let persons = registry.declare("persons", Vec::<String>::new())?;
//! let load = registry.toggle::<()>("persons", true)?;
//!
//! load.apply((), |()| ());
//! assert!(persons.is_loading());
//!
//! assert!(registry.toggle::<(bool,)>("counter", StatusRule::default()).is_err());
//! # Ok::<(), loadable_core::ConfigurationError>(())
//! ```
//!
//! # Invariants
//!
//! 1. A field is declared at most once per registry.
//! 2. A sealed field, or any field once the registry is frozen, cannot be
//!    declared. A rejected declaration leaves the registry unchanged.
//! 3. A toggle can only be bound to a field already declared on the same
//!    registry; the check happens once, at binding time.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ConfigurationError, Result};
use crate::field::LoadableField;
use crate::property::{ErasedProperty, LoadableProperty};
use crate::toggle::{LoadingToggle, StatusRule};

#[derive(Default)]
struct Slot {
    sealed: bool,
    property: Option<Rc<dyn ErasedProperty>>,
}

/// Loadable fields of one host instance.
pub struct LoadableRegistry {
    host: String,
    slots: BTreeMap<String, Slot>,
    frozen: bool,
}

impl LoadableRegistry {
    /// Empty registry for an instance of `host`. The name only appears in
    /// errors and logs.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            slots: BTreeMap::new(),
            frozen: false,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Mark `field` as fixed storage that can never become loadable.
    pub fn seal(&mut self, field: impl Into<String>) -> &mut Self {
        self.slots.entry(field.into()).or_default().sealed = true;
        self
    }

    /// Refuse every further declaration.
    pub fn freeze(&mut self) -> &mut Self {
        self.frozen = true;
        self
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn is_sealed(&self, field: &str) -> bool {
        self.slots.get(field).is_some_and(|slot| slot.sealed)
    }

    #[must_use]
    pub fn is_loadable(&self, field: &str) -> bool {
        self.slots
            .get(field)
            .is_some_and(|slot| slot.property.is_some())
    }

    /// Names of the declared loadable fields, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.property.is_some())
            .map(|(name, _)| name.as_str())
    }

    /// Declare `field` loadable, seeded with its current value.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::AlreadyLoadable`] if `field` was declared before,
    /// [`ConfigurationError::NotReconfigurable`] if it is sealed or the
    /// registry is frozen.
    pub fn declare<T>(&mut self, field: &str, initial: T) -> Result<LoadableField<T>>
    where
        T: Clone + PartialEq + 'static,
    {
        let slot = self.slots.get(field);
        let rejection = if slot.is_some_and(|slot| slot.property.is_some()) {
            Some(ConfigurationError::already_loadable(&self.host, field))
        } else if self.frozen || slot.is_some_and(|slot| slot.sealed) {
            Some(ConfigurationError::not_reconfigurable(&self.host, field))
        } else {
            None
        };
        if let Some(err) = rejection {
            tracing::warn!(
                message = "loadable.declare.rejected",
                host = %self.host,
                field,
                reason = err.reason()
            );
            return Err(err);
        }

        let property = Rc::new(LoadableProperty::new(field, initial));
        let erased: Rc<dyn ErasedProperty> = property.clone();
        self.slots.entry(field.to_owned()).or_default().property = Some(erased);
        tracing::debug!(message = "loadable.declare", host = %self.host, field);
        Ok(LoadableField::new(property))
    }

    /// Bind a loading toggle for `field` using `rule`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::NotLoadable`] if `field` has not been declared on
    /// this registry.
    pub fn toggle<A: 'static>(
        &self,
        field: &str,
        rule: impl Into<StatusRule<A>>,
    ) -> Result<LoadingToggle<A>> {
        let Some(property) = self.slots.get(field).and_then(|slot| slot.property.clone()) else {
            let err = ConfigurationError::not_loadable(&self.host, field);
            tracing::warn!(
                message = "loadable.toggle.rejected",
                host = %self.host,
                field,
                reason = err.reason()
            );
            return Err(err);
        };
        let rule = rule.into();
        tracing::debug!(
            message = "loadable.toggle.bind",
            host = %self.host,
            field,
            rule = rule.kind()
        );
        Ok(LoadingToggle::new(property, rule))
    }
}

impl fmt::Debug for LoadableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadableRegistry")
            .field("host", &self.host)
            .field("fields", &self.fields().collect::<Vec<_>>())
            .field("frozen", &self.frozen)
            .finish()
    }
}
