use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::member::{MEMBER_KEY_PREFIX, Member, MemberId};
use crate::persist::write_atomic;

/// Outcome of a single roster edit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Edit {
    /// A new line was added at the end of the roster.
    Appended,

    /// An existing line was deleted.
    Removed,

    /// An existing line was rewritten in place.
    Replaced,

    /// The roster already had the requested content; nothing was written.
    Unchanged,
}

impl Edit {
    /// Whether the edit rewrote the roster file.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// The on-disk membership roster of an ensemble node.
///
/// Every operation re-reads the whole file, edits it in memory and replaces
/// it atomically. Lines that are not touched by an edit keep their content
/// and position.
///
/// There is no internal locking: callers must make sure only one actor edits
/// a given roster file at a time.
#[derive(Clone, Debug)]
pub struct Roster {
    path: PathBuf,
}

impl Roster {
    /// Creates a roster backed by the file at `path`.
    ///
    /// The file is not touched until the first operation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the roster file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or replaces the line for member `id`.
    ///
    /// An existing `server.<id>` line is rewritten in place; otherwise a new
    /// line is appended at the end of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be written into a roster line
    /// or the roster file cannot be read or replaced.
    pub fn upsert(&self, id: MemberId, address: &str) -> Result<Edit> {
        let member = Member::new(id, address)?;
        let edit = self.replace_or_append(&id.key(), member.to_line())?;

        if edit == Edit::Appended {
            info!("added member {id} at {address}");
        } else if edit.is_changed() {
            info!("updated member {id} to {address}");
        } else {
            debug!("member {id} already at {address}");
        }

        Ok(edit)
    }

    /// Applies [`Roster::upsert`] to each pair in order.
    ///
    /// Each pair is a separate read-modify-write cycle. If one fails, the
    /// pairs before it stay applied and the error reports the failing index
    /// so the caller can retry the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Batch`] wrapping the first failure.
    pub fn upsert_many<'a, I>(&self, members: I) -> Result<Vec<Edit>>
    where
        I: IntoIterator<Item = (MemberId, &'a str)>,
    {
        members
            .into_iter()
            .enumerate()
            .map(|(index, (id, address))| {
                self.upsert(id, address).map_err(|source| Error::Batch {
                    index,
                    id,
                    source: Box::new(source),
                })
            })
            .collect()
    }

    /// Deletes the line for member `id`, if present.
    ///
    /// Removing an absent member is not an error and leaves the file
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster file cannot be read or replaced.
    pub fn remove(&self, id: MemberId) -> Result<Edit> {
        let mut lines = self.load()?;
        let key = id.key();

        let Some(position) = lines
            .iter()
            .position(|line| key_of(line) == Some(key.as_str()))
        else {
            debug!("member {id} not in roster");
            return Ok(Edit::Unchanged);
        };

        lines.remove(position);
        self.store(&lines)?;

        info!("removed member {id}");

        Ok(Edit::Removed)
    }

    /// Applies [`Roster::remove`] to each id in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Batch`] wrapping the first failure.
    pub fn remove_many<I>(&self, ids: I) -> Result<Vec<Edit>>
    where
        I: IntoIterator<Item = MemberId>,
    {
        ids.into_iter()
            .enumerate()
            .map(|(index, id)| {
                self.remove(id).map_err(|source| Error::Batch {
                    index,
                    id,
                    source: Box::new(source),
                })
            })
            .collect()
    }

    /// Counts the member lines in the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read, so that a read failure
    /// is never mistaken for an empty ensemble.
    pub fn count(&self) -> Result<usize> {
        Ok(self
            .load()?
            .iter()
            .filter(|line| is_member_line(line))
            .count())
    }

    /// Returns the members listed in the roster, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read or a member line is
    /// malformed.
    pub fn members(&self) -> Result<Vec<Member>> {
        self.load()?
            .iter()
            .enumerate()
            .filter(|(_, line)| is_member_line(line))
            .map(|(index, line)| {
                Member::parse_line(line).ok_or_else(|| Error::MalformedLine {
                    line: index + 1,
                    content: line.clone(),
                })
            })
            .collect()
    }

    /// Returns the value of the first `key=value` line with the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read.
    pub fn get_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.iter().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().to_string())
        }))
    }

    /// Sets a non-member directive such as `clientPortAddress` or `dataDir`.
    ///
    /// Follows the same replace-or-append rule as member lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is a member key, either part would break
    /// the line format, or the roster cannot be read or replaced.
    pub fn set_key(&self, key: &str, value: &str) -> Result<Edit> {
        if key.is_empty()
            || key.contains(['=', '\n', '\r'])
            || key.trim() != key
            || is_member_line(key)
            || value.contains(['\n', '\r'])
        {
            return Err(Error::InvalidSetting(format!("{key}={value}")));
        }

        let edit = self.replace_or_append(key, format!("{key}={value}"))?;

        if edit.is_changed() {
            info!("set {key}={value}");
        }

        Ok(edit)
    }

    fn replace_or_append(&self, key: &str, replacement: String) -> Result<Edit> {
        let lines = self.load()?;
        let mut edit = None;
        let mut updated = Vec::with_capacity(lines.len() + 1);

        for line in lines {
            if key_of(&line) != Some(key) {
                updated.push(line);
                continue;
            }

            match edit {
                None if line == replacement => edit = Some(Edit::Unchanged),
                None => edit = Some(Edit::Replaced),
                // duplicate key, drop it
                Some(_) => {
                    edit = Some(Edit::Replaced);
                    continue;
                }
            }

            updated.push(replacement.clone());
        }

        let edit = match edit {
            Some(edit) => edit,
            None => {
                updated.push(replacement);
                Edit::Appended
            }
        };

        if edit.is_changed() {
            self.store(&updated)?;
        }

        Ok(edit)
    }

    fn load(&self) -> Result<Vec<String>> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| Error::Io("failed to read roster", e))?;

        Ok(contents
            .split_inclusive('\n')
            .map(|line| line.strip_suffix('\n').unwrap_or(line).to_string())
            .collect())
    }

    fn store(&self, lines: &[String]) -> Result<()> {
        let contents = lines.iter().fold(String::new(), |mut acc, line| {
            acc.push_str(line);
            acc.push('\n');
            acc
        });

        write_atomic(&self.path, &contents)
    }
}

fn key_of(line: &str) -> Option<&str> {
    line.split_once('=').map(|(key, _)| key.trim())
}

/// Matches `^\s*server\.[0-9]`, the same keys [`key_of`] finds.
fn is_member_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix(MEMBER_KEY_PREFIX)
        .and_then(|rest| rest.bytes().next())
        .is_some_and(|b| b.is_ascii_digit())
}
