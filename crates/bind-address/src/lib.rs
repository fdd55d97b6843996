//! Resolves the local address an ensemble node binds its client port to.
//!
//! Administrators describe the address either as an interface name, which
//! is simple but differs between hosts, or as a CIDR range, which is
//! portable and resolved per host. Wildcards pass straight through.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod interfaces;
mod resolver;

pub use error::{Error, Result};
pub use interfaces::{InterfaceSource, LocalInterface, StaticInterfaces, SystemInterfaces};
pub use resolver::AddressResolver;
