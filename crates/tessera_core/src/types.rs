//! Core type definitions for Tessera.

use serde::Serialize;
use std::fmt;

/// Identifier of a connection inside its database.
///
/// Connection IDs are assigned in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    /// Creates a new connection ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Identifier of a statement inside its database.
///
/// Statement IDs key the per-connection preparation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementId(pub u32);

impl StatementId {
    /// Creates a new statement ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt:{}", self.0)
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// Not opened yet, or closed.
    Closed,
    /// Open and usable.
    Open,
    /// A lost link was detected and recovery is in progress.
    Broken,
    /// Recovery failed or was declined; guards are refused.
    Unavailable,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Open => "open",
            ConnectionState::Broken => "broken",
            ConnectionState::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// What a failed execution does to the work pending on its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ActionOnError {
    /// Roll back everything pending since the last commit.
    #[default]
    Rollback,
    /// Leave pending work alone; it commits at the next boundary.
    Ignore,
}

/// Reload policy of a [`crate::Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AccessMode {
    /// Cached objects are always trusted; writes are refused.
    ReadOnly,
    /// Cached objects are trusted unless the loader asks for a refresh.
    #[default]
    ReadWrite,
    /// Every load goes to the backend.
    ReadEver,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::ReadWrite => "read-write",
            AccessMode::ReadEver => "read-ever",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display() {
        assert_eq!(ConnectionId::new(3).to_string(), "conn:3");
        assert_eq!(StatementId::new(7).to_string(), "stmt:7");
    }

    #[test]
    fn defaults() {
        assert_eq!(ActionOnError::default(), ActionOnError::Rollback);
        assert_eq!(AccessMode::default(), AccessMode::ReadWrite);
    }

    #[test]
    fn state_display() {
        assert_eq!(ConnectionState::Unavailable.to_string(), "unavailable");
        assert_eq!(AccessMode::ReadEver.to_string(), "read-ever");
    }
}
