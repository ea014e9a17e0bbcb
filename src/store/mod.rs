mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, uid: &str, email: &str, name: &str, surname: &str) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_uid(&self, uid: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: i64, limit: i32) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: i64) -> Result<bool>;
    /// Rows owned by the user across every step table.
    fn count_user_records(&self, user_id: i64) -> Result<i64>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Group operations
    /// Creates the group with `owner_id` as its owner.
    fn create_group(&self, name: &str, description: Option<&str>, owner_id: i64) -> Result<Group>;
    fn get_group(&self, id: i64) -> Result<Option<Group>>;
    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>>;
    fn update_group(&self, group: &Group) -> Result<()>;
    fn delete_group(&self, id: i64) -> Result<bool>;
    fn get_membership(&self, user_id: i64, group_id: i64) -> Result<Option<Membership>>;
    fn upsert_membership(&self, membership: &Membership) -> Result<()>;
    fn delete_membership(&self, user_id: i64, group_id: i64) -> Result<bool>;
    fn list_user_groups(&self, user_id: i64) -> Result<Vec<GroupWithRelation>>;
    fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>>;

    // Project operations
    /// Creates the project linked to `user_id`.
    fn create_project(&self, name: &str, description: Option<&str>, user_id: i64) -> Result<Project>;
    fn get_project(&self, id: i64) -> Result<Option<Project>>;
    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn list_user_projects(&self, user_id: i64) -> Result<Vec<Project>>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn delete_project(&self, id: i64) -> Result<bool>;
    fn is_project_member(&self, user_id: i64, project_id: i64) -> Result<bool>;
    fn count_project_samples(&self, project_id: i64) -> Result<i64>;

    // Step record operations
    fn create_record(&self, record: &NewRecord) -> Result<StepRecord>;
    fn get_record(&self, table: StepTable, id: i64) -> Result<Option<StepRecord>>;
    /// Merges `fields` into the stored fields of a record in one
    /// transaction and returns the updated record.
    fn merge_record_fields(
        &self,
        table: StepTable,
        id: i64,
        fields: &Map<String, Value>,
        updated: DateTime<Utc>,
    ) -> Result<StepRecord>;
    fn set_record_public(&self, table: StepTable, id: i64, is_public: bool) -> Result<()>;
    fn delete_record(&self, table: StepTable, id: i64) -> Result<bool>;
    /// Rows of child tables hanging from this record.
    fn count_child_records(&self, table: StepTable, id: i64) -> Result<i64>;
    /// Public rows plus, for a user, rows they own or that are shared with
    /// them directly or through any of their groups.
    fn list_visible_records(&self, table: StepTable, user_id: Option<i64>) -> Result<Vec<StepRecord>>;

    // Sharing operations
    fn upsert_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64, mode: AccessMode) -> Result<()>;
    fn delete_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64) -> Result<bool>;
    fn get_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64) -> Result<Option<AccessMode>>;
    fn list_user_sharings(&self, table: StepTable, record_id: i64) -> Result<Vec<UserSharing>>;
    fn upsert_group_sharing(&self, table: StepTable, record_id: i64, group_id: i64, mode: AccessMode) -> Result<()>;
    fn delete_group_sharing(&self, table: StepTable, record_id: i64, group_id: i64) -> Result<bool>;
    fn list_group_sharings(&self, table: StepTable, record_id: i64) -> Result<Vec<GroupSharing>>;
    /// Group sharings of a record for every group the user has a relation
    /// with, invitations included.
    fn list_member_group_sharings(
        &self,
        table: StepTable,
        record_id: i64,
        user_id: i64,
    ) -> Result<Vec<MemberGroupSharing>>;

    // Reference table operations
    fn list_range_entries(&self, table: RangeTable) -> Result<Vec<RangeEntry>>;
    fn list_reference_entries(&self, table: ReferenceTable) -> Result<Vec<ReferenceEntry>>;
    fn get_reference_description(&self, table: ReferenceTable, id: i64) -> Result<Option<String>>;
    fn create_reference_entry(&self, table: ReferenceTable, description: &str) -> Result<ReferenceEntry>;
}
