use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while resolving a bind address.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system would not list its network interfaces.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[source] std::io::Error),

    /// The spec is neither a local interface, a wildcard, nor a CIDR range.
    #[error("this machine does not have an interface '{0}'")]
    InvalidSpec(String),

    /// The spec is a CIDR range but no local address falls inside it.
    #[error("this machine has no interfaces in CIDR range {0}")]
    NoMatchingInterface(String),
}
