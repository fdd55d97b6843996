//! Lifecycle configuration for a ZooKeeper-style ensemble node.
//!
//! Ties the membership roster and bind-address resolution to the events an
//! orchestrator drives: first start, scale-up and scale-down.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod config;
mod error;
mod identity;
mod node;

pub use config::{NodeConfig, ROSTER_FILE, TEMPLATE_FILE};
pub use error::{Error, Result};
pub use identity::{
    MARKER_FILE, MemberAssignment, UnitName, member_id_of, read_identity_marker,
    write_identity_marker,
};
pub use node::{BIND_ADDRESS_KEY, DATA_DIR_KEY, EnsembleNode, NodeStatus};

pub use ensemble_bind_address::{InterfaceSource, LocalInterface, StaticInterfaces};
pub use ensemble_roster::{Edit, Member, MemberId};
