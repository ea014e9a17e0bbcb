use std::fmt;

use serde::{Deserialize, Serialize};

/// Level of access a user holds on a sample or omic sequence step.
///
/// Variants are ordered so that `max` picks the most permissive mode when
/// several sharings apply to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    #[serde(rename = "readwrite")]
    ReadWrite,
}

impl AccessMode {
    /// Maps the `readwrite` flag of sharing requests to an access mode.
    #[must_use]
    pub const fn from_readwrite(readwrite: bool) -> Self {
        if readwrite {
            AccessMode::ReadWrite
        } else {
            AccessMode::Read
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::ReadWrite => "readwrite",
        }
    }

    pub fn parse(s: &str) -> Option<AccessMode> {
        match s {
            "read" => Some(AccessMode::Read),
            "readwrite" => Some(AccessMode::ReadWrite),
            _ => None,
        }
    }

    /// Returns true if this mode satisfies the required one.
    #[must_use]
    pub fn allows(self, required: AccessMode) -> bool {
        self >= required
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation between a user and a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRelation {
    Owner,
    Member,
    Invited,
}

impl GroupRelation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GroupRelation::Owner => "owner",
            GroupRelation::Member => "member",
            GroupRelation::Invited => "invited",
        }
    }

    pub fn parse(s: &str) -> Option<GroupRelation> {
        match s {
            "owner" => Some(GroupRelation::Owner),
            "member" => Some(GroupRelation::Member),
            "invited" => Some(GroupRelation::Invited),
            _ => None,
        }
    }

    /// Pending invitations do not confer the group's sharings.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, GroupRelation::Invited)
    }
}

impl fmt::Display for GroupRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
