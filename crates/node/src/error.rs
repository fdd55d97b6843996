use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while configuring an ensemble node.
#[derive(Debug, Error)]
pub enum Error {
    /// Resolving the bind address failed.
    #[error(transparent)]
    BindAddress(#[from] ensemble_bind_address::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {path}: {1}", path = .0.display())]
    ConfigParse(PathBuf, #[source] toml::de::Error),

    /// The identity marker does not hold a member id.
    #[error("identity marker {path} is corrupt", path = .0.display())]
    CorruptMarker(PathBuf),

    /// A member reference is not `<id>=<address>`.
    #[error("invalid member assignment '{0}': expected <unit-or-id>=<address>")]
    InvalidAssignment(String),

    /// The unit name is not `<cluster-name>/<ordinal>`.
    #[error("invalid unit name '{0}': expected <cluster-name>/<ordinal>")]
    InvalidUnitName(String),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// An operation needs a setting that was not configured.
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),

    /// Editing the roster failed.
    #[error(transparent)]
    Roster(#[from] ensemble_roster::Error),
}
