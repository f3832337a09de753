//! Role state machine
//!
//! Two roles, every pair reachable. What differs is which observation drives
//! the move: probes promote or demote, heartbeats can only keep or demote.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of this process with respect to singleton responsibilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// Dormant, probing for an expired or free lease
    #[default]
    Candidate,
    /// Holds the lease and drives the shared channels
    Master,
}

impl Role {
    /// Role corresponding to a master flag
    #[inline]
    #[must_use]
    pub fn from_master(master: bool) -> Self {
        if master {
            Self::Master
        } else {
            Self::Candidate
        }
    }

    /// Whether this is the master role
    #[inline]
    #[must_use]
    pub fn is_master(self) -> bool {
        matches!(self, Self::Master)
    }

    /// Role after a probe that did (`claimed`) or did not win the lease
    #[inline]
    #[must_use]
    pub fn after_probe(self, claimed: bool) -> Self {
        Self::from_master(claimed)
    }

    /// Role after a heartbeat that did (`renewed`) or did not refresh the lease.
    ///
    /// Candidates do not heartbeat, so they stay put.
    #[inline]
    #[must_use]
    pub fn after_heartbeat(self, renewed: bool) -> Self {
        match self {
            Self::Master if renewed => Self::Master,
            _ => Self::Candidate,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate => write!(f, "candidate"),
            Self::Master => write!(f, "master"),
        }
    }
}

/// A change of role, reported when the coordinator flips gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    /// Role before
    pub from: Role,
    /// Role after
    pub to: Role,
}

impl RoleChange {
    /// Change from `from` to `to`, or `None` for a self-loop
    #[inline]
    #[must_use]
    pub fn between(from: Role, to: Role) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    /// Whether this change promotes to master
    #[inline]
    #[must_use]
    pub fn is_promotion(&self) -> bool {
        self.to.is_master()
    }
}
