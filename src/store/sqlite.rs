use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::{Map, Value};

use super::Store;
use super::schema::{SCHEMA, generated_schema};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps unique constraint violations to `AlreadyExists`.
fn unique_violation(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::AlreadyExists
        }
        e => Error::from(e),
    }
}

fn invalid_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, value.to_string(), Type::Text)
}

fn access_mode_at(row: &Row, idx: usize) -> rusqlite::Result<AccessMode> {
    let value: String = row.get(idx)?;
    AccessMode::parse(&value).ok_or_else(|| invalid_column(idx, &value))
}

fn relation_at(row: &Row, idx: usize) -> rusqlite::Result<GroupRelation> {
    let value: String = row.get(idx)?;
    GroupRelation::parse(&value).ok_or_else(|| invalid_column(idx, &value))
}

const USER_COLUMNS: &str = "id, uid, email, name, surname, created_at, updated_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        uid: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        surname: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

/// Selects the common record shape from a step table aliased as `r`.
fn record_columns(table: StepTable) -> &'static str {
    if table.is_sample() {
        "r.id, r.user_id, NULL, NULL, r.project_id, r.is_public, r.fields, r.created, r.updated"
    } else {
        "r.id, r.user_id, r.sequence, r.source_id, NULL, r.is_public, r.fields, r.created, r.updated"
    }
}

fn record_from_row(table: StepTable, row: &Row) -> rusqlite::Result<StepRecord> {
    let raw_fields: String = row.get(6)?;
    let fields: Map<String, Value> = serde_json::from_str(&raw_fields)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(StepRecord {
        id: row.get(0)?,
        table,
        user_id: row.get(1)?,
        sequence: row.get(2)?,
        source_id: row.get(3)?,
        project_id: row.get(4)?,
        is_public: row.get(5)?,
        fields,
        created: parse_datetime(&row.get::<_, String>(7)?),
        updated: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn query_record(conn: &Connection, table: StepTable, id: i64) -> Result<Option<StepRecord>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} r WHERE r.id = ?1",
            record_columns(table),
            table.name()
        ),
        params![id],
        |row| record_from_row(table, row),
    )
    .optional()
    .map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(&generated_schema())?;
        Ok(())
    }

    // User operations

    fn create_user(&self, uid: &str, email: &str, name: &str, surname: &str) -> Result<User> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (uid, email, name, surname, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![uid, email, name, surname, format_datetime(&now)],
        )
        .map_err(unique_violation)?;

        Ok(User {
            id: conn.last_insert_rowid(),
            uid: uid.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            surname: surname.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_uid(&self, uid: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE uid = ?1"),
            params![uid],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: i64, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE users SET email = ?1, name = ?2, surname = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    user.email,
                    user.name,
                    user.surname,
                    format_datetime(&user.updated_at),
                    user.id
                ],
            )
            .map_err(unique_violation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn count_user_records(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn();
        let mut total = 0;
        for table in StepTable::ALL {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE user_id = ?1", table.name()),
                params![user_id],
                |row| row.get(0),
            )?;
            total += count;
        }
        Ok(total)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Group operations

    fn create_group(&self, name: &str, description: Option<&str>, owner_id: i64) -> Result<Group> {
        let now = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO research_groups (name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, description, format_datetime(&now)],
        )
        .map_err(unique_violation)?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO user_has_group (user_id, group_id, relation, addition_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                owner_id,
                id,
                GroupRelation::Owner.as_str(),
                format_datetime(&now)
            ],
        )?;

        tx.commit()?;

        Ok(Group {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description, created_at, updated_at FROM research_groups WHERE id = ?1",
            params![id],
            group_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description, created_at, updated_at FROM research_groups WHERE name = ?1",
            params![name],
            group_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_group(&self, group: &Group) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE research_groups SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    group.name,
                    group.description,
                    format_datetime(&group.updated_at),
                    group.id
                ],
            )
            .map_err(unique_violation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_group(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM research_groups WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_membership(&self, user_id: i64, group_id: i64) -> Result<Option<Membership>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, group_id, relation, addition_date
             FROM user_has_group WHERE user_id = ?1 AND group_id = ?2",
            params![user_id, group_id],
            |row| {
                Ok(Membership {
                    user_id: row.get(0)?,
                    group_id: row.get(1)?,
                    relation: relation_at(row, 2)?,
                    addition_date: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_membership(&self, membership: &Membership) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_has_group (user_id, group_id, relation, addition_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, group_id) DO UPDATE SET
                relation = excluded.relation,
                addition_date = excluded.addition_date",
            params![
                membership.user_id,
                membership.group_id,
                membership.relation.as_str(),
                membership.addition_date.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn delete_membership(&self, user_id: i64, group_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM user_has_group WHERE user_id = ?1 AND group_id = ?2",
            params![user_id, group_id],
        )?;
        Ok(rows > 0)
    }

    fn list_user_groups(&self, user_id: i64) -> Result<Vec<GroupWithRelation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT g.id, g.name, g.description, g.created_at, g.updated_at, m.relation
             FROM research_groups g
             JOIN user_has_group m ON m.group_id = g.id
             WHERE m.user_id = ?1
             ORDER BY g.name",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(GroupWithRelation {
                group: group_from_row(row)?,
                relation: relation_at(row, 5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.uid, u.name, u.surname, m.relation, m.addition_date
             FROM user_has_group m
             JOIN users u ON u.id = m.user_id
             WHERE m.group_id = ?1
             ORDER BY u.uid",
        )?;

        let rows = stmt.query_map(params![group_id], |row| {
            Ok(GroupMember {
                uid: row.get(0)?,
                name: row.get(1)?,
                surname: row.get(2)?,
                relation: relation_at(row, 3)?,
                addition_date: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Project operations

    fn create_project(&self, name: &str, description: Option<&str>, user_id: i64) -> Result<Project> {
        let now = Utc::now();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO projects (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name, description, format_datetime(&now)],
        )
        .map_err(unique_violation)?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO user_project (user_id, project_id) VALUES (?1, ?2)",
            params![user_id, id],
        )?;

        tx.commit()?;

        Ok(Project {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description, created_at, updated_at FROM projects WHERE id = ?1",
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description, created_at, updated_at FROM projects WHERE name = ?1",
            params![name],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at FROM projects ORDER BY name",
        )?;

        let rows = stmt.query_map([], project_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_projects(&self, user_id: i64) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.description, p.created_at, p.updated_at
             FROM projects p
             JOIN user_project up ON up.project_id = p.id
             WHERE up.user_id = ?1
             ORDER BY p.name",
        )?;

        let rows = stmt.query_map(params![user_id], project_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE projects SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    project.name,
                    project.description,
                    format_datetime(&project.updated_at),
                    project.id
                ],
            )
            .map_err(unique_violation)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn is_project_member(&self, user_id: i64, project_id: i64) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM user_project WHERE user_id = ?1 AND project_id = ?2",
            params![user_id, project_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_project_samples(&self, project_id: i64) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sample WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Step record operations

    fn create_record(&self, record: &NewRecord) -> Result<StepRecord> {
        let table = record.table;
        let fields = serde_json::to_string(&record.fields)?;
        let created = format_datetime(&record.created);
        let conn = self.conn();

        if table.is_sample() {
            conn.execute(
                "INSERT INTO sample (user_id, project_id, is_public, fields, created, updated)
                 VALUES (?1, ?2, 0, ?3, ?4, ?4)",
                params![record.user_id, record.project_id, fields, created],
            )?;
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} (user_id, sequence, source_id, is_public, fields, created, updated)
                     VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
                    table.name()
                ),
                params![
                    record.user_id,
                    record.sequence.map(OmicSequence::name),
                    record.source_id,
                    fields,
                    created
                ],
            )?;
        }

        let id = conn.last_insert_rowid();
        query_record(&conn, table, id)?.ok_or(Error::NotFound)
    }

    fn get_record(&self, table: StepTable, id: i64) -> Result<Option<StepRecord>> {
        let conn = self.conn();
        query_record(&conn, table, id)
    }

    fn merge_record_fields(
        &self,
        table: StepTable,
        id: i64,
        fields: &Map<String, Value>,
        updated: DateTime<Utc>,
    ) -> Result<StepRecord> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut record = query_record(&tx, table, id)?.ok_or(Error::NotFound)?;
        record
            .fields
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        tx.execute(
            &format!(
                "UPDATE {} SET fields = ?1, updated = ?2 WHERE id = ?3",
                table.name()
            ),
            params![
                serde_json::to_string(&record.fields)?,
                format_datetime(&updated),
                id
            ],
        )?;

        tx.commit()?;
        record.updated = updated;
        Ok(record)
    }

    fn set_record_public(&self, table: StepTable, id: i64, is_public: bool) -> Result<()> {
        let rows = self.conn().execute(
            &format!(
                "UPDATE {} SET is_public = ?1, updated = ?2 WHERE id = ?3",
                table.name()
            ),
            params![is_public, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_record(&self, table: StepTable, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.name()),
            params![id],
        )?;
        Ok(rows > 0)
    }

    fn count_child_records(&self, table: StepTable, id: i64) -> Result<i64> {
        let conn = self.conn();
        let mut total = 0;
        for (child, sequences) in table.child_links() {
            let names = sequences
                .iter()
                .map(|s| format!("'{}'", s.name()))
                .collect::<Vec<_>>()
                .join(", ");
            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE source_id = ?1 AND sequence IN ({names})",
                    child.name()
                ),
                params![id],
                |row| row.get(0),
            )?;
            total += count;
        }
        Ok(total)
    }

    fn list_visible_records(&self, table: StepTable, user_id: Option<i64>) -> Result<Vec<StepRecord>> {
        let conn = self.conn();
        let name = table.name();
        let columns = record_columns(table);

        let Some(user_id) = user_id else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {columns} FROM {name} r WHERE r.is_public = 1 ORDER BY r.id"
            ))?;
            let rows = stmt.query_map([], |row| record_from_row(table, row))?;
            return rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from);
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT {columns} FROM {name} r
             WHERE r.is_public = 1
                OR r.user_id = ?1
                OR EXISTS (SELECT 1 FROM {us} s WHERE s.{name}_id = r.id AND s.user_id = ?1)
                OR EXISTS (
                    SELECT 1 FROM {gs} g
                    JOIN user_has_group m ON m.group_id = g.group_id
                    WHERE g.{name}_id = r.id AND m.user_id = ?1 AND m.relation IN ('owner', 'member')
                )
             ORDER BY r.id",
            us = table.user_sharing_table(),
            gs = table.group_sharing_table(),
        ))?;

        let rows = stmt.query_map(params![user_id], |row| record_from_row(table, row))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Sharing operations

    fn upsert_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64, mode: AccessMode) -> Result<()> {
        let name = table.name();
        self.conn().execute(
            &format!(
                "INSERT INTO {us} (user_id, {name}_id, access_mode) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, {name}_id) DO UPDATE SET access_mode = excluded.access_mode",
                us = table.user_sharing_table()
            ),
            params![user_id, record_id, mode.as_str()],
        )?;
        Ok(())
    }

    fn delete_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND {}_id = ?2",
                table.user_sharing_table(),
                table.name()
            ),
            params![user_id, record_id],
        )?;
        Ok(rows > 0)
    }

    fn get_user_sharing(&self, table: StepTable, record_id: i64, user_id: i64) -> Result<Option<AccessMode>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT access_mode FROM {} WHERE user_id = ?1 AND {}_id = ?2",
                table.user_sharing_table(),
                table.name()
            ),
            params![user_id, record_id],
            |row| access_mode_at(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_sharings(&self, table: StepTable, record_id: i64) -> Result<Vec<UserSharing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT u.uid, s.access_mode FROM {} s
             JOIN users u ON u.id = s.user_id
             WHERE s.{}_id = ?1
             ORDER BY u.uid",
            table.user_sharing_table(),
            table.name()
        ))?;

        let rows = stmt.query_map(params![record_id], |row| {
            Ok(UserSharing {
                user_uid: row.get(0)?,
                access_mode: access_mode_at(row, 1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn upsert_group_sharing(&self, table: StepTable, record_id: i64, group_id: i64, mode: AccessMode) -> Result<()> {
        let name = table.name();
        self.conn().execute(
            &format!(
                "INSERT INTO {gs} (group_id, {name}_id, access_mode) VALUES (?1, ?2, ?3)
                 ON CONFLICT (group_id, {name}_id) DO UPDATE SET access_mode = excluded.access_mode",
                gs = table.group_sharing_table()
            ),
            params![group_id, record_id, mode.as_str()],
        )?;
        Ok(())
    }

    fn delete_group_sharing(&self, table: StepTable, record_id: i64, group_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            &format!(
                "DELETE FROM {} WHERE group_id = ?1 AND {}_id = ?2",
                table.group_sharing_table(),
                table.name()
            ),
            params![group_id, record_id],
        )?;
        Ok(rows > 0)
    }

    fn list_group_sharings(&self, table: StepTable, record_id: i64) -> Result<Vec<GroupSharing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT g.id, g.name, s.access_mode FROM {} s
             JOIN research_groups g ON g.id = s.group_id
             WHERE s.{}_id = ?1
             ORDER BY g.name",
            table.group_sharing_table(),
            table.name()
        ))?;

        let rows = stmt.query_map(params![record_id], |row| {
            Ok(GroupSharing {
                group_id: row.get(0)?,
                group_name: row.get(1)?,
                access_mode: access_mode_at(row, 2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_member_group_sharings(
        &self,
        table: StepTable,
        record_id: i64,
        user_id: i64,
    ) -> Result<Vec<MemberGroupSharing>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT g.id, g.name, m.relation, s.access_mode FROM {} s
             JOIN research_groups g ON g.id = s.group_id
             JOIN user_has_group m ON m.group_id = s.group_id
             WHERE s.{}_id = ?1 AND m.user_id = ?2
             ORDER BY g.id",
            table.group_sharing_table(),
            table.name()
        ))?;

        let rows = stmt.query_map(params![record_id, user_id], |row| {
            Ok(MemberGroupSharing {
                group_id: row.get(0)?,
                group_name: row.get(1)?,
                relation: relation_at(row, 2)?,
                access_mode: access_mode_at(row, 3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Reference table operations

    fn list_range_entries(&self, table: RangeTable) -> Result<Vec<RangeEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, description, vmin, vmax FROM {} ORDER BY vmin",
            table.name()
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(RangeEntry {
                id: row.get(0)?,
                description: row.get(1)?,
                vmin: row.get(2)?,
                vmax: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_reference_entries(&self, table: ReferenceTable) -> Result<Vec<ReferenceEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, description FROM {} ORDER BY id",
            table.name()
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(ReferenceEntry {
                id: row.get(0)?,
                description: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_reference_description(&self, table: ReferenceTable, id: i64) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT description FROM {} WHERE id = ?1", table.name()),
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn create_reference_entry(&self, table: ReferenceTable, description: &str) -> Result<ReferenceEntry> {
        let conn = self.conn();
        conn.execute(
            &format!("INSERT INTO {} (description) VALUES (?1)", table.name()),
            params![description],
        )
        .map_err(unique_violation)?;

        Ok(ReferenceEntry {
            id: conn.last_insert_rowid(),
            description: description.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn new_sample(user_id: i64, project_id: Option<i64>) -> NewRecord {
        NewRecord {
            table: StepTable::Sample,
            user_id,
            sequence: None,
            source_id: None,
            project_id,
            fields: fields(json!({"name": "soil"})),
            created: Utc::now(),
        }
    }

    fn new_step(table: StepTable, user_id: i64, sequence: OmicSequence, source_id: i64) -> NewRecord {
        NewRecord {
            table,
            user_id,
            sequence: Some(sequence),
            source_id: Some(source_id),
            project_id: None,
            fields: Map::new(),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "users",
            "tokens",
            "research_groups",
            "user_has_group",
            "projects",
            "user_project",
            "sample",
            "experiment",
            "contigs_virus",
            "user_shared_single_cell",
            "group_shared_plasmid",
            "temperature",
            "hkgenes",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_temp, store) = test_store();
        store.initialize().unwrap();

        let ranges = store.list_range_entries(RangeTable::Ph).unwrap();
        assert_eq!(ranges.len(), 3);
    }

    #[test]
    fn test_user_crud_and_uniqueness() {
        let (_temp, store) = test_store();

        let user = store.create_user("uid-1", "a@example.org", "Ada", "Lovelace").unwrap();
        assert_eq!(store.get_user_by_uid("uid-1").unwrap().unwrap().id, user.id);
        assert_eq!(
            store.get_user_by_email("a@example.org").unwrap().unwrap().uid,
            "uid-1"
        );

        let dup_uid = store.create_user("uid-1", "b@example.org", "B", "B");
        assert!(matches!(dup_uid, Err(Error::AlreadyExists)));
        let dup_email = store.create_user("uid-2", "a@example.org", "B", "B");
        assert!(matches!(dup_email, Err(Error::AlreadyExists)));

        let mut updated = user.clone();
        updated.surname = "King".to_string();
        store.update_user(&updated).unwrap();
        assert_eq!(store.get_user(user.id).unwrap().unwrap().surname, "King");

        assert!(store.delete_user(user.id).unwrap());
        assert!(store.get_user(user.id).unwrap().is_none());
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup123".to_string(),
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup123".to_string(), // Same lookup
            ..token1.clone()
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
        assert!(store.has_admin_token().unwrap());
    }

    #[test]
    fn test_group_creation_makes_owner() {
        let (_temp, store) = test_store();
        let owner = store.create_user("owner", "o@example.org", "O", "O").unwrap();

        let group = store.create_group("lab", Some("wet lab"), owner.id).unwrap();
        let membership = store.get_membership(owner.id, group.id).unwrap().unwrap();
        assert_eq!(membership.relation, GroupRelation::Owner);

        let dup = store.create_group("lab", None, owner.id);
        assert!(matches!(dup, Err(Error::AlreadyExists)));

        let groups = store.list_user_groups(owner.id).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].relation, GroupRelation::Owner);

        assert!(store.delete_group(group.id).unwrap());
        assert!(store.get_membership(owner.id, group.id).unwrap().is_none());
    }

    #[test]
    fn test_project_links_creator() {
        let (_temp, store) = test_store();
        let user = store.create_user("u", "u@example.org", "U", "U").unwrap();

        let project = store.create_project("tara", None, user.id).unwrap();
        assert!(store.is_project_member(user.id, project.id).unwrap());
        assert_eq!(store.list_user_projects(user.id).unwrap().len(), 1);

        store.create_record(&new_sample(user.id, Some(project.id))).unwrap();
        assert_eq!(store.count_project_samples(project.id).unwrap(), 1);
    }

    #[test]
    fn test_record_roundtrip_and_update() {
        let (_temp, store) = test_store();
        let user = store.create_user("u", "u@example.org", "U", "U").unwrap();

        let sample = store.create_record(&new_sample(user.id, None)).unwrap();
        assert_eq!(sample.fields["name"], json!("soil"));
        assert!(!sample.is_public);

        let reads = store
            .create_record(&new_step(StepTable::Experiment, user.id, OmicSequence::Metagenome, sample.id))
            .unwrap();
        assert_eq!(reads.sequence.as_deref(), Some("METAGENOME"));
        assert_eq!(reads.parent_id(), Some(sample.id));

        store
            .merge_record_fields(StepTable::Experiment, reads.id, &fields(json!({"name": "reads"})), Utc::now())
            .unwrap();
        let merged = store
            .merge_record_fields(StepTable::Experiment, reads.id, &fields(json!({"seqt": 1})), Utc::now())
            .unwrap();
        assert_eq!(merged.fields["seqt"], json!(1));
        assert_eq!(merged.fields["name"], json!("reads"));
        assert!(matches!(
            store.merge_record_fields(StepTable::Experiment, 999, &fields(json!({})), Utc::now()),
            Err(Error::NotFound)
        ));
        let fetched = store.get_record(StepTable::Experiment, reads.id).unwrap().unwrap();
        assert_eq!(fetched.fields["seqt"], json!(1));

        store.set_record_public(StepTable::Experiment, reads.id, true).unwrap();
        let public = store.list_visible_records(StepTable::Experiment, None).unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, reads.id);
    }

    #[test]
    fn test_count_child_records_follows_sequence() {
        let (_temp, store) = test_store();
        let user = store.create_user("u", "u@example.org", "U", "U").unwrap();

        // A contigs row and a genome row sharing the same id.
        let contigs = store
            .create_record(&new_step(StepTable::Contigs, user.id, OmicSequence::Metagenome, 1))
            .unwrap();
        let genome = store
            .create_record(&new_step(StepTable::Genome, user.id, OmicSequence::GenomeVirus, 1))
            .unwrap();
        assert_eq!(contigs.id, genome.id);

        store
            .create_record(&new_step(
                StepTable::PredictedGenes,
                user.id,
                OmicSequence::GenomeVirus,
                genome.id,
            ))
            .unwrap();

        assert_eq!(store.count_child_records(StepTable::Genome, genome.id).unwrap(), 1);
        assert_eq!(store.count_child_records(StepTable::Contigs, contigs.id).unwrap(), 0);
        assert_eq!(store.count_user_records(user.id).unwrap(), 3);
    }

    #[test]
    fn test_visible_records_skip_invitations() {
        let (_temp, store) = test_store();
        let owner = store.create_user("owner", "o@example.org", "O", "O").unwrap();
        let guest = store.create_user("guest", "g@example.org", "G", "G").unwrap();

        let sample = store.create_record(&new_sample(owner.id, None)).unwrap();
        let group = store.create_group("lab", None, owner.id).unwrap();
        store
            .upsert_group_sharing(StepTable::Sample, sample.id, group.id, AccessMode::Read)
            .unwrap();

        store
            .upsert_membership(&Membership {
                user_id: guest.id,
                group_id: group.id,
                relation: GroupRelation::Invited,
                addition_date: None,
            })
            .unwrap();
        assert!(store.list_visible_records(StepTable::Sample, Some(guest.id)).unwrap().is_empty());

        store
            .upsert_membership(&Membership {
                user_id: guest.id,
                group_id: group.id,
                relation: GroupRelation::Member,
                addition_date: Some(Utc::now()),
            })
            .unwrap();
        assert_eq!(
            store.list_visible_records(StepTable::Sample, Some(guest.id)).unwrap().len(),
            1
        );
        assert!(store.list_visible_records(StepTable::Sample, None).unwrap().is_empty());
    }

    #[test]
    fn test_sharing_upsert_replaces_mode() {
        let (_temp, store) = test_store();
        let owner = store.create_user("owner", "o@example.org", "O", "O").unwrap();
        let guest = store.create_user("guest", "g@example.org", "G", "G").unwrap();
        let sample = store.create_record(&new_sample(owner.id, None)).unwrap();

        store
            .upsert_user_sharing(StepTable::Sample, sample.id, guest.id, AccessMode::Read)
            .unwrap();
        store
            .upsert_user_sharing(StepTable::Sample, sample.id, guest.id, AccessMode::ReadWrite)
            .unwrap();

        let sharings = store.list_user_sharings(StepTable::Sample, sample.id).unwrap();
        assert_eq!(sharings.len(), 1);
        assert_eq!(sharings[0].user_uid, "guest");
        assert_eq!(sharings[0].access_mode, AccessMode::ReadWrite);

        assert!(store.delete_user_sharing(StepTable::Sample, sample.id, guest.id).unwrap());
        assert!(store
            .get_user_sharing(StepTable::Sample, sample.id, guest.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reference_entries() {
        let (_temp, store) = test_store();

        let created = store
            .create_reference_entry(ReferenceTable::Keywords, "permafrost")
            .unwrap();
        assert_eq!(
            store
                .get_reference_description(ReferenceTable::Keywords, created.id)
                .unwrap()
                .as_deref(),
            Some("permafrost")
        );
        let dup = store.create_reference_entry(ReferenceTable::Keywords, "permafrost");
        assert!(matches!(dup, Err(Error::AlreadyExists)));

        assert!(!store.list_reference_entries(ReferenceTable::Sequencing).unwrap().is_empty());
    }
}
