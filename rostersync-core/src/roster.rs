//! Roster file loading.
//!
//! The roster is a JSON array of agent records owned by an external process.
//! This crate only ever reads it. Elements are decoded one at a time: a bad
//! record is set aside in [`Roster::rejected`] and the rest stay usable.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;

use crate::error::RosterError;
use crate::types::RosterEntry;

/// A roster element that could not be turned into a [`RosterEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Position in the roster array.
    pub index: usize,
    /// The element's `name`, when it carried a string one.
    pub name: Option<String>,
    pub reason: String,
}

impl RejectedEntry {
    /// The name, or `#<index>` for nameless elements.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.index),
        }
    }
}

/// Parsed roster: usable entries in file order, plus rejected elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
    pub rejected: Vec<RejectedEntry>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.entries.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load and parse the roster at `path`.
///
/// Returns `RosterError::NotFound` if absent and `RosterError::Parse` (with
/// path and line context) if the file is not a JSON array.
pub fn load_at(path: &Path) -> Result<Roster, RosterError> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(RosterError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(RosterError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(path, &contents)
}

/// Parse roster bytes already read from `path`.
pub fn parse(path: &Path, contents: &[u8]) -> Result<Roster, RosterError> {
    let elements: Vec<Value> =
        serde_json::from_slice(contents).map_err(|source| RosterError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut roster = Roster::default();
    for (index, element) in elements.into_iter().enumerate() {
        let name = element
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        match serde_json::from_value::<RosterEntry>(element) {
            Ok(entry) => roster.entries.push(entry),
            Err(err) => roster.rejected.push(RejectedEntry {
                index,
                name,
                reason: err.to_string(),
            }),
        }
    }
    Ok(roster)
}
