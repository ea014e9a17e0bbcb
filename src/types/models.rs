use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AccessMode, GroupRelation, OmicSequence, StepTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// External identity of the user, used to address them in sharings.
    pub uid: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's relation to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i64,
    pub group_id: i64,
    pub relation: GroupRelation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupWithRelation {
    #[serde(flatten)]
    pub group: Group,
    pub relation: GroupRelation,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    pub uid: String,
    pub name: String,
    pub surname: String,
    pub relation: GroupRelation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addition_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of any step table. Samples use `project_id`; every other table
/// uses `sequence` and `source_id`.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub id: i64,
    #[serde(skip)]
    pub table: StepTable,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub is_public: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StepRecord {
    /// Id of the row this record hangs from: the project for samples, the
    /// parent step row otherwise.
    #[must_use]
    pub fn parent_id(&self) -> Option<i64> {
        if self.table.is_sample() {
            self.project_id
        } else {
            self.source_id
        }
    }
}

/// Values of a step row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub table: StepTable,
    pub user_id: i64,
    pub sequence: Option<OmicSequence>,
    pub source_id: Option<i64>,
    pub project_id: Option<i64>,
    pub fields: Map<String, Value>,
    pub created: DateTime<Utc>,
}

/// A group sharing of a record, seen from one user's membership.
#[derive(Debug, Clone)]
pub struct MemberGroupSharing {
    pub group_id: i64,
    pub group_name: String,
    pub relation: GroupRelation,
    pub access_mode: AccessMode,
}

/// How a listed record became available to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub public: bool,
    pub owned: bool,
    pub shared_by_group: bool,
    pub shared_by_others: bool,
    pub access_mode: AccessMode,
    pub group_relation: Option<GroupRelation>,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            public: true,
            owned: false,
            shared_by_group: false,
            shared_by_others: false,
            access_mode: AccessMode::Read,
            group_relation: None,
            group_id: None,
            group_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSharing {
    pub user_uid: String,
    pub access_mode: AccessMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSharing {
    pub group_id: i64,
    pub group_name: String,
    pub access_mode: AccessMode,
}

/// Row of a value range reference table (temperature, ph, salinity).
#[derive(Debug, Clone, Serialize)]
pub struct RangeEntry {
    pub id: i64,
    pub description: String,
    pub vmin: f64,
    pub vmax: f64,
}

/// Row of an id to description reference table.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEntry {
    pub id: i64,
    pub description: String,
}
