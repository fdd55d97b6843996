//! Keeps the membership roster of a ZooKeeper-style ensemble node.
//!
//! The roster is the node's `zoo.cfg`: one `server.<id>=<address>:2888:3888`
//! line per member, mixed with other directives that edits leave alone.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod member;
mod persist;
mod roster;

pub use error::{Error, Result};
pub use member::{ELECTION_PORT, Member, MemberId, PEER_PORT};
#[cfg(unix)]
pub use persist::NEW_FILE_MODE;
pub use persist::write_atomic;
pub use roster::{Edit, Roster};
