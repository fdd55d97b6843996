use thiserror::Error;

use crate::MemberId;

/// Convenience alias for results returned by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while editing the roster.
#[derive(Debug, Error)]
pub enum Error {
    /// A pair in a batch edit failed. Pairs before `index` were applied.
    #[error("batch edit failed at pair {index} (member {id}): {source}")]
    Batch {
        /// Position of the failing pair in the batch.
        index: usize,

        /// Member the failing pair referred to.
        id: MemberId,

        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The member address cannot be written into a roster line.
    #[error("invalid member address '{0}'")]
    InvalidAddress(String),

    /// A directive cannot be written as a single `key=value` line.
    #[error("invalid setting '{0}'")]
    InvalidSetting(String),

    /// The text is not a positive member id.
    #[error("invalid member id '{0}': expected a positive integer")]
    InvalidMemberId(String),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// A member line could not be parsed.
    #[error("malformed member line {line}: '{content}'")]
    MalformedLine {
        /// One-based line number.
        line: usize,

        /// Raw line content.
        content: String,
    },
}
