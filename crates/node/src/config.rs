use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::identity::UnitName;

/// Roster file name inside the config directory.
pub const ROSTER_FILE: &str = "zoo.cfg";

/// Template the roster is seeded from when it does not exist yet.
pub const TEMPLATE_FILE: &str = "zoo_sample.cfg";

const DEFAULT_CONFIG_DIR: &str = "/etc/zookeeper/conf";
const DEFAULT_DATA_DIR: &str = "/var/lib/zookeeper";

/// Settings for an ensemble node.
///
/// Loaded from a TOML file with kebab-case keys; every key is optional:
///
/// ```toml
/// config-dir = "/etc/zookeeper/conf"
/// data-dir = "/var/lib/zookeeper"
/// unit-name = "zookeeper/1"
/// address = "10.0.0.1"
/// network-interface = "10.0.0.0/24"
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct NodeConfig {
    /// Address peers reach this node on.
    pub address: Option<String>,

    /// Directory holding the roster file.
    pub config_dir: PathBuf,

    /// Directory holding the identity marker and ensemble data.
    pub data_dir: PathBuf,

    /// Interface name, CIDR range or wildcard for the client port.
    pub network_interface: Option<String>,

    /// Orchestrator-assigned name of this node.
    pub unit_name: Option<UnitName>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: None,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            network_interface: None,
            unit_name: None,
        }
    }
}

impl NodeConfig {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| Error::Io("failed to read config file", e))?;

        toml::from_str(&contents).map_err(|e| Error::ConfigParse(path.to_path_buf(), e))
    }

    /// Path of the roster file.
    #[must_use]
    pub fn roster_path(&self) -> PathBuf {
        self.config_dir.join(ROSTER_FILE)
    }

    /// Path of the roster template.
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        self.config_dir.join(TEMPLATE_FILE)
    }
}
