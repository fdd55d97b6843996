//! CLI binary to configure an ensemble node's roster and bind address.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ensemble_node::{EnsembleNode, MemberAssignment, MemberId, NodeConfig, UnitName, member_id_of};
use tracing::{debug, info};

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node library error
    #[error(transparent)]
    Node(#[from] ensemble_node::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address peers reach this node on
    #[arg(long, global = true, env = "ENSEMBLE_ADDRESS")]
    address: Option<String>,

    /// Optional TOML file with node settings; flags override it
    #[arg(long, global = true, env = "ENSEMBLE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding zoo.cfg
    #[arg(long, global = true, env = "ENSEMBLE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Directory holding the myid marker
    #[arg(long, global = true, env = "ENSEMBLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "ENSEMBLE_DEBUG")]
    debug: bool,

    /// Interface name, CIDR range or 0.0.0.0 for the client port
    #[arg(long, global = true, env = "ENSEMBLE_NETWORK_INTERFACE")]
    network_interface: Option<String>,

    /// Orchestrator-assigned name of this node, e.g. zookeeper/1
    #[arg(long, global = true, env = "ENSEMBLE_UNIT_NAME")]
    unit_name: Option<UnitName>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Prepare the roster, write the identity marker and list this node
    Init,

    /// Add or update members, given as <unit-or-id>=<address>
    Add {
        #[arg(required = true)]
        members: Vec<MemberAssignment>,
    },

    /// Remove members, given as unit names or ids
    Remove {
        #[arg(required = true, value_parser = parse_member_id)]
        ids: Vec<MemberId>,
    },

    /// Print the number of members in the roster
    Count,

    /// Print the member lines of the roster
    Members,

    /// Resolve an interface spec to a local address without writing it
    Resolve {
        /// Interface name, CIDR range or wildcard
        spec: String,
    },

    /// Resolve the configured interface spec and write clientPortAddress
    BindAddress,

    /// Print the identity, bind address and members on disk
    Status,
}

fn parse_member_id(s: &str) -> Result<MemberId, ensemble_node::Error> {
    member_id_of(s)
}

fn load_config(args: &Args) -> Result<NodeConfig, Error> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("loading settings from {}", path.display());
            NodeConfig::from_file(path)?
        }
        None => NodeConfig::default(),
    };

    if let Some(address) = &args.address {
        config.address = Some(address.clone());
    }
    if let Some(config_dir) = &args.config_dir {
        config.config_dir.clone_from(config_dir);
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    if let Some(network_interface) = &args.network_interface {
        config.network_interface = Some(network_interface.clone());
    }
    if let Some(unit_name) = &args.unit_name {
        config.unit_name = Some(unit_name.clone());
    }

    Ok(config)
}

fn run(args: Args) -> Result<(), Error> {
    let node = EnsembleNode::new(load_config(&args)?);

    match args.command {
        Command::Init => {
            node.prepare_config()?;
            let id = node.initialize()?;
            println!("{id}");
        }
        Command::Add { members } => {
            node.increase_quorum(&members)?;
        }
        Command::Remove { ids } => {
            node.decrease_quorum(&ids)?;
        }
        Command::Count => {
            println!("{}", node.quorum_size()?);
        }
        Command::Members => {
            for member in node.members()? {
                println!("{member}");
            }
        }
        Command::Resolve { spec } => {
            println!("{}", node.resolve(&spec)?);
        }
        Command::BindAddress => match node.update_bind_address()? {
            Some(address) => println!("{address}"),
            None => info!("no network interface configured"),
        },
        Command::Status => {
            let status = node.status()?;
            match status.id {
                Some(id) => println!("id: {id}"),
                None => println!("id: (not initialized)"),
            }
            println!(
                "bind address: {}",
                status.bind_address.as_deref().unwrap_or("(default)")
            );
            println!("members: {}", status.members.len());
            for member in status.members {
                println!("  {member}");
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    run(args)
}
