#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Setup-time failure while declaring loadable fields or binding toggles.
///
/// These are never produced by reads or writes; a host propagates them out of
/// its constructor so a misconfigured host is never built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("cannot convert {field} to loadable: {host}.{field} is not reconfigurable")]
    NotReconfigurable { host: String, field: String },

    #[error("{field} is not a loadable field of {host}")]
    NotLoadable { host: String, field: String },

    #[error("{field} is already a loadable field of {host}")]
    AlreadyLoadable { host: String, field: String },
}

impl ConfigurationError {
    #[must_use]
    pub fn not_reconfigurable(host: impl Into<String>, field: impl Into<String>) -> Self {
        Self::NotReconfigurable {
            host: host.into(),
            field: field.into(),
        }
    }

    #[must_use]
    pub fn not_loadable(host: impl Into<String>, field: impl Into<String>) -> Self {
        Self::NotLoadable {
            host: host.into(),
            field: field.into(),
        }
    }

    #[must_use]
    pub fn already_loadable(host: impl Into<String>, field: impl Into<String>) -> Self {
        Self::AlreadyLoadable {
            host: host.into(),
            field: field.into(),
        }
    }

    /// The field the failed declaration or binding named.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::NotReconfigurable { field, .. }
            | Self::NotLoadable { field, .. }
            | Self::AlreadyLoadable { field, .. } => field,
        }
    }

    /// The host the field belongs to.
    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            Self::NotReconfigurable { host, .. }
            | Self::NotLoadable { host, .. }
            | Self::AlreadyLoadable { host, .. } => host,
        }
    }

    /// Short machine-readable reason, used as a log field.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotReconfigurable { .. } => "not_reconfigurable",
            Self::NotLoadable { .. } => "not_loadable",
            Self::AlreadyLoadable { .. } => "already_loadable",
        }
    }
}
