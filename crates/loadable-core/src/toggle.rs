#![forbid(unsafe_code)]

//! Loading toggles: set a field's loading flag from a method's arguments, then
//! run the method.
//!
//! # Design
//!
//! A host method is described by its argument tuple `A`. A [`StatusRule<A>`]
//! turns those arguments into the new loading flag; it is normalized into a
//! single `Rc<dyn Fn(&A) -> bool>` when built, whichever form it came from:
//!
//! | form | flag |
//! |------|------|
//! | [`StatusRule::first_argument`] (default) | the leading `bool` argument |
//! | [`StatusRule::constant`] / `From<bool>` | always the given value |
//! | [`StatusRule::extract`] | `f(&args)` |
//!
//! The first-argument form only exists for argument tuples that start with a
//! `bool` ([`LeadingFlag`]), so a rule that would read a missing or non-`bool`
//! argument is rejected by the compiler.
//!
//! # Invariants
//!
//! 1. [`LoadingToggle::apply`] writes the flag exactly once, before the body
//!    starts. For a body that returns a future, that is before the first poll.
//! 2. The body's return value, `Result` or panic passes through unchanged.
//! 3. A toggle never clears the flag on its own.

use std::fmt;
use std::rc::Rc;

use crate::property::ErasedProperty;

/// Argument tuples whose first element is the loading flag.
pub trait LeadingFlag {
    fn leading_flag(&self) -> bool;
}

impl LeadingFlag for bool {
    fn leading_flag(&self) -> bool {
        *self
    }
}

impl LeadingFlag for (bool,) {
    fn leading_flag(&self) -> bool {
        self.0
    }
}

impl<B> LeadingFlag for (bool, B) {
    fn leading_flag(&self) -> bool {
        self.0
    }
}

impl<B, C> LeadingFlag for (bool, B, C) {
    fn leading_flag(&self) -> bool {
        self.0
    }
}

impl<B, C, D> LeadingFlag for (bool, B, C, D) {
    fn leading_flag(&self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    FirstArgument,
    Constant(bool),
    Extract,
}

impl RuleKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::FirstArgument => "first_argument",
            Self::Constant(_) => "constant",
            Self::Extract => "extract",
        }
    }
}

/// How a wrapped method's arguments determine the new loading flag.
pub struct StatusRule<A> {
    kind: RuleKind,
    eval: Rc<dyn Fn(&A) -> bool>,
}

impl<A: 'static> StatusRule<A> {
    /// Use the method's leading `bool` argument.
    #[must_use]
    pub fn first_argument() -> Self
    where
        A: LeadingFlag,
    {
        Self {
            kind: RuleKind::FirstArgument,
            eval: Rc::new(A::leading_flag),
        }
    }

    /// Ignore the arguments and always use `loading`.
    #[must_use]
    pub fn constant(loading: bool) -> Self {
        Self {
            kind: RuleKind::Constant(loading),
            eval: Rc::new(move |_: &A| loading),
        }
    }

    /// Compute the flag from the arguments.
    #[must_use]
    pub fn extract(f: impl Fn(&A) -> bool + 'static) -> Self {
        Self {
            kind: RuleKind::Extract,
            eval: Rc::new(f),
        }
    }
}

impl<A> StatusRule<A> {
    /// Evaluate the rule against `args`.
    #[must_use]
    pub fn status(&self, args: &A) -> bool {
        (self.eval)(args)
    }

    /// Name of the form this rule was built from, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl<A: LeadingFlag + 'static> Default for StatusRule<A> {
    fn default() -> Self {
        Self::first_argument()
    }
}

impl<A: 'static> From<bool> for StatusRule<A> {
    fn from(loading: bool) -> Self {
        Self::constant(loading)
    }
}

impl<A> Clone for StatusRule<A> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<A> fmt::Debug for StatusRule<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RuleKind::FirstArgument => f.write_str("StatusRule::FirstArgument"),
            RuleKind::Constant(loading) => {
                f.debug_tuple("StatusRule::Constant").field(&loading).finish()
            }
            RuleKind::Extract => f.write_str("StatusRule::Extract"),
        }
    }
}

/// A status rule bound to one loadable field.
///
/// Obtained from [`LoadableRegistry::toggle`](crate::LoadableRegistry::toggle),
/// which has already checked that the field is loadable.
pub struct LoadingToggle<A> {
    property: Rc<dyn ErasedProperty>,
    rule: StatusRule<A>,
}

impl<A> LoadingToggle<A> {
    pub(crate) fn new(property: Rc<dyn ErasedProperty>, rule: StatusRule<A>) -> Self {
        Self { property, rule }
    }

    /// Set the loading flag from `args`, then run `body(args)` and return its
    /// result.
    pub fn apply<R>(&self, args: A, body: impl FnOnce(A) -> R) -> R {
        let loading = self.rule.status(&args);
        tracing::trace!(
            message = "loadable.toggle",
            field = self.property.field(),
            loading
        );
        self.property.set_loading(loading);
        body(args)
    }

    /// Turn `body` into a function that toggles before each call.
    pub fn wrap<R>(self, body: impl Fn(A) -> R) -> impl Fn(A) -> R {
        move |args| self.apply(args, &body)
    }

    /// Name of the field this toggle drives.
    #[must_use]
    pub fn field(&self) -> &str {
        self.property.field()
    }

    #[must_use]
    pub fn rule(&self) -> &StatusRule<A> {
        &self.rule
    }
}

impl<A> Clone for LoadingToggle<A> {
    fn clone(&self) -> Self {
        Self {
            property: Rc::clone(&self.property),
            rule: self.rule.clone(),
        }
    }
}

impl<A> fmt::Debug for LoadingToggle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingToggle")
            .field("field", &self.property.field())
            .field("rule", &self.rule)
            .finish()
    }
}
