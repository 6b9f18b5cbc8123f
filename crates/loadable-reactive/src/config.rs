#![forbid(unsafe_code)]

//! Per-thread configuration of the reactive substrate.
//!
//! The only policy currently exposed is *strict mode*: whether writes to an
//! [`Observable`](crate::Observable) must happen inside an action
//! ([`BatchScope`](crate::BatchScope) or [`action`](crate::action)).
//!
//! Configuration is thread-local because every reactive value is `Rc`-based
//! and lives on exactly one thread.
//!
//! # Environment
//!
//! [`ReactiveConfig::from_env`] honours:
//!
//! - `LOADABLE_ENFORCE_ACTIONS` = `never` | `observed` | `always`
//! - `LOADABLE_TRACE_NOTIFICATIONS` = `1` | `true` | `yes` | `on`, or
//!   `0` | `false` | `no` | `off`
//!
//! Values are trimmed and case-insensitive. Anything else keeps the default
//! and logs a `reactive.config.invalid` warning.

use std::cell::RefCell;
use std::env;

/// When writes outside an action are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnforceActions {
    /// Writes are accepted anywhere.
    #[default]
    Never,
    /// Writes to observables that currently have live subscribers must run
    /// inside an action.
    Observed,
    /// Every write must run inside an action.
    Always,
}

impl EnforceActions {
    /// Parse the textual form used by `LOADABLE_ENFORCE_ACTIONS`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" | "false" | "0" => Some(Self::Never),
            "observed" | "true" | "1" => Some(Self::Observed),
            "always" => Some(Self::Always),
            _ => None,
        }
    }

    /// Whether a write to an observable with `subscribers` live subscribers,
    /// issued outside any action, violates this policy.
    #[must_use]
    pub const fn rejects(self, subscribers: usize) -> bool {
        match self {
            Self::Never => false,
            Self::Observed => subscribers > 0,
            Self::Always => true,
        }
    }
}

/// Configuration for the reactive substrate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReactiveConfig {
    /// Strict-mode policy for writes outside actions.
    /// Default: [`EnforceActions::Never`].
    pub enforce_actions: EnforceActions,

    /// Emit a `TRACE` event for every batch flush.
    /// Default: false.
    pub trace_notifications: bool,
}

impl ReactiveConfig {
    /// Set the strict-mode policy.
    #[must_use]
    pub fn with_enforce_actions(mut self, enforce_actions: EnforceActions) -> Self {
        self.enforce_actions = enforce_actions;
        self
    }

    /// Enable or disable per-flush trace events.
    #[must_use]
    pub fn with_trace_notifications(mut self, enabled: bool) -> Self {
        self.trace_notifications = enabled;
        self
    }

    /// Build a configuration from the defaults overridden by environment
    /// variables. Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup(ENFORCE_ACTIONS_VAR) {
            match EnforceActions::parse(&val) {
                Some(policy) => config.enforce_actions = policy,
                None => warn_invalid(ENFORCE_ACTIONS_VAR, &val),
            }
        }
        if let Some(val) = lookup(TRACE_NOTIFICATIONS_VAR) {
            match parse_flag(&val) {
                Some(enabled) => config.trace_notifications = enabled,
                None => warn_invalid(TRACE_NOTIFICATIONS_VAR, &val),
            }
        }
        config
    }
}

const ENFORCE_ACTIONS_VAR: &str = "LOADABLE_ENFORCE_ACTIONS";
const TRACE_NOTIFICATIONS_VAR: &str = "LOADABLE_TRACE_NOTIFICATIONS";

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_invalid(variable: &str, value: &str) {
    tracing::warn!(
        message = "reactive.config.invalid",
        variable,
        value = %value
    );
}

thread_local! {
    static CONFIG: RefCell<ReactiveConfig> = RefCell::new(ReactiveConfig::default());
}

/// Install `config` for the current thread, returning the previous one.
pub fn configure(config: ReactiveConfig) -> ReactiveConfig {
    tracing::debug!(
        message = "reactive.configure",
        enforce_actions = ?config.enforce_actions,
        trace_notifications = config.trace_notifications
    );
    CONFIG.with(|c| std::mem::replace(&mut *c.borrow_mut(), config))
}

/// The configuration active on the current thread.
#[must_use]
pub fn current_config() -> ReactiveConfig {
    CONFIG.with(|c| c.borrow().clone())
}

pub(crate) fn enforce_actions() -> EnforceActions {
    CONFIG.with(|c| c.borrow().enforce_actions)
}

pub(crate) fn trace_notifications() -> bool {
    CONFIG.with(|c| c.borrow().trace_notifications)
}
