use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ensemble_roster::{MemberId, write_atomic};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// File in the data directory the ensemble reads its own id from.
pub const MARKER_FILE: &str = "myid";

/// Name the orchestrator assigns to a node, `<cluster-name>/<ordinal>`.
///
/// The ordinal doubles as the node's member id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "String")]
pub struct UnitName {
    cluster: String,
    id: MemberId,
}

impl UnitName {
    /// Returns the cluster part of the name.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Returns the member id derived from the ordinal.
    #[must_use]
    pub const fn member_id(&self) -> MemberId {
        self.id
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.id)
    }
}

impl FromStr for UnitName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (cluster, ordinal) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidUnitName(s.to_string()))?;

        if cluster.is_empty() {
            return Err(Error::InvalidUnitName(s.to_string()));
        }

        let id = ordinal
            .parse()
            .map_err(|_| Error::InvalidUnitName(s.to_string()))?;

        Ok(Self {
            cluster: cluster.to_string(),
            id,
        })
    }
}

impl TryFrom<String> for UnitName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Parses either a unit name (`zookeeper/3`) or a bare member id (`3`).
///
/// # Errors
///
/// Returns an error if the text is neither.
pub fn member_id_of(unit_or_id: &str) -> Result<MemberId> {
    if unit_or_id.contains('/') {
        Ok(unit_or_id.parse::<UnitName>()?.member_id())
    } else {
        Ok(unit_or_id.parse::<MemberId>()?)
    }
}

/// A member id paired with the address it should be listed under.
///
/// Parsed from `<unit-or-id>=<address>`, the form the orchestrator hands
/// over on scale-up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberAssignment {
    /// Hostname or IP literal of the member.
    pub address: String,

    /// Member id.
    pub id: MemberId,
}

impl FromStr for MemberAssignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (unit, address) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidAssignment(s.to_string()))?;

        if address.is_empty() {
            return Err(Error::InvalidAssignment(s.to_string()));
        }

        Ok(Self {
            address: address.to_string(),
            id: member_id_of(unit)?,
        })
    }
}

/// Writes the identity marker for `id` into `data_dir`.
///
/// The marker holds the id as ASCII digits and nothing else.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file written.
pub fn write_identity_marker(data_dir: &Path, id: MemberId) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).map_err(|e| Error::Io("failed to create data directory", e))?;

    let path = data_dir.join(MARKER_FILE);
    write_atomic(&path, &id.to_string())?;

    info!("wrote identity marker {} for member {id}", path.display());

    Ok(path)
}

/// Reads the identity marker from `data_dir`, if one was written.
///
/// # Errors
///
/// Returns an error if the marker exists but cannot be read or does not
/// hold a member id.
pub fn read_identity_marker(data_dir: &Path) -> Result<Option<MemberId>> {
    let path = data_dir.join(MARKER_FILE);

    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io("failed to read identity marker", e)),
    };

    contents
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| Error::CorruptMarker(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_unit_name() {
        let unit: UnitName = "zookeeper/3".parse().unwrap();
        assert_eq!(unit.cluster(), "zookeeper");
        assert_eq!(unit.member_id().get(), 3);
        assert_eq!(unit.to_string(), "zookeeper/3");
    }

    #[test]
    fn test_unit_name_rejects_bad_input() {
        for name in ["zookeeper", "/3", "zookeeper/", "zookeeper/x", "zookeeper/0", "a/b/3"] {
            assert_matches!(name.parse::<UnitName>(), Err(Error::InvalidUnitName(_)), "{name}");
        }
    }

    #[test]
    fn test_member_id_of() {
        assert_eq!(member_id_of("zookeeper/7").unwrap().get(), 7);
        assert_eq!(member_id_of("7").unwrap().get(), 7);
        assert_matches!(member_id_of("seven"), Err(Error::Roster(_)));
    }

    #[test]
    fn test_member_assignment() {
        let assignment: MemberAssignment = "zookeeper/2=10.0.0.2".parse().unwrap();
        assert_eq!(assignment.id.get(), 2);
        assert_eq!(assignment.address, "10.0.0.2");

        let assignment: MemberAssignment = "5=zk-5.internal".parse().unwrap();
        assert_eq!(assignment.id.get(), 5);

        assert_matches!(
            "zookeeper/2".parse::<MemberAssignment>(),
            Err(Error::InvalidAssignment(_))
        );
        assert_matches!(
            "zookeeper/2=".parse::<MemberAssignment>(),
            Err(Error::InvalidAssignment(_))
        );
    }

    #[test]
    fn test_identity_marker_roundtrip() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");

        assert_eq!(read_identity_marker(&data_dir).unwrap(), None);

        let path = write_identity_marker(&data_dir, MemberId::new(3).unwrap()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "3");
        assert_eq!(read_identity_marker(&data_dir).unwrap(), MemberId::new(3).ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_identity_marker_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = write_identity_marker(dir.path(), MemberId::new(1).unwrap()).unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o044, 0o044);
    }

    #[test]
    fn test_corrupt_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MARKER_FILE), "three\n").unwrap();

        let err = read_identity_marker(dir.path()).unwrap_err();
        assert_matches!(err, Error::CorruptMarker(_));
        assert!(err.to_string().contains("myid"));
    }
}
