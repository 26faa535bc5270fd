//! Move request types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Identity of a configured directory server (its configured name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Options controlling a move or copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MoveFlags(u8);

impl MoveFlags {
    pub const NONE: MoveFlags = MoveFlags(0);
    /// Descend into the children of the source entry.
    pub const RECURSIVE: MoveFlags = MoveFlags(0x01);
    /// Allow source and target to live on different servers.
    pub const CROSS_SERVER: MoveFlags = MoveFlags(0x02);
    /// Delete the source after a successful copy, making the copy a move.
    pub const DELETE_MOVED: MoveFlags = MoveFlags(0x04);

    pub fn contains(self, other: MoveFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_recursive(self) -> bool {
        self.contains(Self::RECURSIVE)
    }

    pub fn allows_cross_server(self) -> bool {
        self.contains(Self::CROSS_SERVER)
    }

    pub fn deletes_moved(self) -> bool {
        self.contains(Self::DELETE_MOVED)
    }
}

impl BitOr for MoveFlags {
    type Output = MoveFlags;

    fn bitor(self, rhs: MoveFlags) -> MoveFlags {
        MoveFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for MoveFlags {
    fn bitor_assign(&mut self, rhs: MoveFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MoveFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_recursive() {
            names.push("recursive");
        }
        if self.allows_cross_server() {
            names.push("cross-server");
        }
        if self.deletes_moved() {
            names.push("delete-moved");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// A single move/copy invocation. Built per call, never persisted.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// Entry to relocate
    pub source_dn: String,
    pub source_server: ServerId,
    /// Existing entry that receives the copy as a direct child
    pub target_parent_dn: String,
    pub target_server: ServerId,
    pub flags: MoveFlags,
}

impl MoveRequest {
    pub fn new(
        source_dn: impl Into<String>,
        source_server: impl Into<ServerId>,
        target_parent_dn: impl Into<String>,
        target_server: impl Into<ServerId>,
        flags: MoveFlags,
    ) -> Self {
        Self {
            source_dn: source_dn.into(),
            source_server: source_server.into(),
            target_parent_dn: target_parent_dn.into(),
            target_server: target_server.into(),
            flags,
        }
    }

    pub fn is_cross_server(&self) -> bool {
        self.source_server != self.target_server
    }
}
