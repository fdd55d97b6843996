use std::fs;

use ensemble_bind_address::{AddressResolver, InterfaceSource, SystemInterfaces};
use ensemble_roster::{Edit, Member, MemberId, Roster};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::identity::{MemberAssignment, read_identity_marker, write_identity_marker};

/// Roster key the resolved bind address is written under.
pub const BIND_ADDRESS_KEY: &str = "clientPortAddress";

/// Roster key pointing the ensemble at its data directory.
pub const DATA_DIR_KEY: &str = "dataDir";

/// Snapshot of what this node has on disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeStatus {
    /// Configured client bind address, if any.
    pub bind_address: Option<String>,

    /// Id from the identity marker, if it has been written.
    pub id: Option<MemberId>,

    /// Members listed in the roster, in file order.
    pub members: Vec<Member>,
}

/// Configuration side of one ensemble node.
///
/// Owns the node's roster and bind-address resolution and runs them for the
/// lifecycle events the orchestrator delivers: initial setup, scale-up and
/// scale-down. Events must be delivered one at a time per node.
pub struct EnsembleNode<S = SystemInterfaces> {
    config: NodeConfig,
    resolver: AddressResolver<S>,
    roster: Roster,
}

impl EnsembleNode<SystemInterfaces> {
    /// Creates a node that resolves bind addresses against the host's
    /// interfaces.
    #[must_use]
    pub fn new(config: NodeConfig) -> Self {
        Self::with_interfaces(config, SystemInterfaces)
    }
}

impl<S> EnsembleNode<S>
where
    S: InterfaceSource,
{
    /// Creates a node that resolves bind addresses against `interfaces`.
    pub fn with_interfaces(config: NodeConfig, interfaces: S) -> Self {
        let roster = Roster::new(config.roster_path());

        Self {
            config,
            resolver: AddressResolver::new(interfaces),
            roster,
        }
    }

    /// Returns the node's configuration.
    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Returns the node's roster.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Prepares the config and data directories and the roster file.
    ///
    /// A missing roster is seeded from the template next to it, or created
    /// empty if there is no template. The roster is then pointed at the
    /// data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the roster cannot be written.
    pub fn prepare_config(&self) -> Result<()> {
        fs::create_dir_all(&self.config.config_dir)
            .map_err(|e| Error::Io("failed to create config directory", e))?;
        fs::create_dir_all(&self.config.data_dir)
            .map_err(|e| Error::Io("failed to create data directory", e))?;

        let roster_path = self.roster.path();
        if !roster_path.exists() {
            let template = self.config.template_path();

            if template.exists() {
                fs::copy(&template, roster_path)
                    .map_err(|e| Error::Io("failed to copy roster template", e))?;
                info!("seeded {} from {}", roster_path.display(), template.display());
            } else {
                fs::write(roster_path, "").map_err(|e| Error::Io("failed to create roster", e))?;
                info!("created empty roster {}", roster_path.display());
            }
        }

        self.roster
            .set_key(DATA_DIR_KEY, &self.config.data_dir.to_string_lossy())?;

        Ok(())
    }

    /// Performs the initial configuration of this node.
    ///
    /// Writes the identity marker, lists this node in the roster under its
    /// own address and applies the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit name or address is not configured, a
    /// file cannot be written, or the bind address cannot be resolved.
    pub fn initialize(&self) -> Result<MemberId> {
        let id = self
            .config
            .unit_name
            .as_ref()
            .ok_or(Error::MissingSetting("unit-name"))?
            .member_id();
        let address = self
            .config
            .address
            .as_deref()
            .ok_or(Error::MissingSetting("address"))?;

        write_identity_marker(&self.config.data_dir, id)?;
        self.roster.upsert(id, address)?;
        self.update_bind_address()?;

        info!("initialized member {id}");

        Ok(id)
    }

    /// Resolves the configured interface spec and writes it to the roster.
    ///
    /// Does nothing if no spec is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be resolved or the roster cannot
    /// be written.
    pub fn update_bind_address(&self) -> Result<Option<String>> {
        let Some(spec) = self
            .config
            .network_interface
            .as_deref()
            .filter(|spec| !spec.is_empty())
        else {
            debug!("no network interface configured, keeping default bind address");
            return Ok(None);
        };

        let address = self.resolver.resolve(spec)?;
        self.roster.set_key(BIND_ADDRESS_KEY, &address)?;

        Ok(Some(address))
    }

    /// Resolves an interface spec without touching the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be resolved.
    pub fn resolve(&self, spec: &str) -> Result<String> {
        Ok(self.resolver.resolve(spec)?)
    }

    /// Adds or updates members joining the ensemble.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first assignment that could not be
    /// applied; earlier assignments stay applied.
    pub fn increase_quorum(&self, members: &[MemberAssignment]) -> Result<Vec<Edit>> {
        let edits = self
            .roster
            .upsert_many(members.iter().map(|m| (m.id, m.address.as_str())))?;

        info!("quorum now has {} members", self.roster.count()?);

        Ok(edits)
    }

    /// Removes members leaving the ensemble.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first id that could not be removed;
    /// earlier ids stay removed.
    pub fn decrease_quorum(&self, ids: &[MemberId]) -> Result<Vec<Edit>> {
        let edits = self.roster.remove_many(ids.iter().copied())?;

        info!("quorum now has {} members", self.roster.count()?);

        Ok(edits)
    }

    /// Number of members listed in the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read.
    pub fn quorum_size(&self) -> Result<usize> {
        Ok(self.roster.count()?)
    }

    /// Members listed in the roster, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read or holds a malformed
    /// member line.
    pub fn members(&self) -> Result<Vec<Member>> {
        Ok(self.roster.members()?)
    }

    /// Reports the identity, bind address and members on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker or roster cannot be read.
    pub fn status(&self) -> Result<NodeStatus> {
        Ok(NodeStatus {
            bind_address: self.roster.get_key(BIND_ADDRESS_KEY)?,
            id: read_identity_marker(&self.config.data_dir)?,
            members: self.roster.members()?,
        })
    }
}
