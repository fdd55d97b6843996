use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Port the ensemble uses for follower-to-leader traffic.
pub const PEER_PORT: u16 = 2888;

/// Port the ensemble uses for leader election.
pub const ELECTION_PORT: u16 = 3888;

/// Key prefix shared by every member line.
pub(crate) const MEMBER_KEY_PREFIX: &str = "server.";

/// Stable identifier of one ensemble member.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemberId(NonZeroU32);

impl MemberId {
    /// Creates a member id from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is zero.
    pub fn new(id: u32) -> Result<Self> {
        NonZeroU32::new(id)
            .map(Self)
            .ok_or_else(|| Error::InvalidMemberId(id.to_string()))
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the roster key for this member, e.g. `server.3`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{MEMBER_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // u32::from_str also accepts a leading '+'
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidMemberId(s.to_string()));
        }

        let id = s
            .parse::<u32>()
            .map_err(|_| Error::InvalidMemberId(s.to_string()))?;

        NonZeroU32::new(id)
            .map(Self)
            .ok_or_else(|| Error::InvalidMemberId(s.to_string()))
    }
}

impl TryFrom<u32> for MemberId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        Self::new(id)
    }
}

/// One roster entry: a member id and the address peers reach it on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    address: String,
    id: MemberId,
}

impl Member {
    /// Creates a member entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty or contains whitespace,
    /// control characters, `=` or `#`.
    pub fn new(id: MemberId, address: impl Into<String>) -> Result<Self> {
        let address = address.into();

        if !is_writable_address(&address) {
            return Err(Error::InvalidAddress(address));
        }

        Ok(Self { address, id })
    }

    /// Returns the member id.
    #[must_use]
    pub const fn id(&self) -> MemberId {
        self.id
    }

    /// Returns the hostname or IP literal of the member.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Renders the roster line for this member, without a line terminator.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}={}:{PEER_PORT}:{ELECTION_PORT}",
            self.id.key(),
            self.address
        )
    }

    /// Parses a member line of the form `server.<id>=<address>:<peer>:<election>`.
    ///
    /// Returns `None` if the line is not a well-formed member line.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let (key, value) = line.split_once('=')?;
        let id = key.trim().strip_prefix(MEMBER_KEY_PREFIX)?.parse().ok()?;

        // the address itself may be an IPv6 literal, so split from the right
        let mut parts = value.trim().rsplitn(3, ':');
        let _election: u16 = parts.next()?.parse().ok()?;
        let _peer: u16 = parts.next()?.parse().ok()?;
        let address = parts.next()?;

        Self::new(id, address).ok()
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

fn is_writable_address(address: &str) -> bool {
    !address.is_empty()
        && !address
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '=' || c == '#')
}
