//! Access-mode resolution for samples and omic sequence step rows.
//!
//! A user's mode on a row is, in order: `readwrite` when they own it, the
//! most permissive of their direct sharing and the sharings of groups they
//! actively belong to, `read` when the row is public, otherwise nothing.
//! Invitations never confer a group's sharings.

use crate::error::Result;
use crate::store::Store;
use crate::types::{AccessMode, Availability, SequenceStep, StepRecord, StepTable};

/// Resolves the access mode of `user_id` on `record`. `None` is an
/// anonymous caller.
pub fn get_access_mode(
    store: &dyn Store,
    record: &StepRecord,
    user_id: Option<i64>,
) -> Result<Option<AccessMode>> {
    Ok(availability(store, record, user_id)?.map(|a| a.access_mode))
}

/// Resolves the access mode of `user_id` on row `step_id` of `step`'s table.
/// A missing row or a step without a table gives no access.
pub fn get_step_access_mode(
    store: &dyn Store,
    step: SequenceStep,
    user_id: Option<i64>,
    step_id: i64,
) -> Result<Option<AccessMode>> {
    let Some(table) = step.table() else {
        return Ok(None);
    };
    get_table_access_mode(store, table, user_id, step_id)
}

pub fn get_table_access_mode(
    store: &dyn Store,
    table: StepTable,
    user_id: Option<i64>,
    row_id: i64,
) -> Result<Option<AccessMode>> {
    match store.get_record(table, row_id)? {
        Some(record) => get_access_mode(store, &record, user_id),
        None => Ok(None),
    }
}

/// Describes how `record` is available to the caller, or `None` when it is
/// not available at all.
pub fn availability(
    store: &dyn Store,
    record: &StepRecord,
    user_id: Option<i64>,
) -> Result<Option<Availability>> {
    let public = record.is_public;

    let Some(user_id) = user_id else {
        return Ok(public.then(Availability::default));
    };

    if record.user_id == user_id {
        return Ok(Some(Availability {
            public,
            owned: true,
            access_mode: AccessMode::ReadWrite,
            ..Availability::default()
        }));
    }

    let direct = store.get_user_sharing(record.table, record.id, user_id)?;
    let best_group = store
        .list_member_group_sharings(record.table, record.id, user_id)?
        .into_iter()
        .filter(|s| s.relation.is_active())
        .max_by_key(|s| s.access_mode);

    let mode = match (direct, &best_group) {
        (Some(d), Some(g)) => Some(d.max(g.access_mode)),
        (Some(d), None) => Some(d),
        (None, Some(g)) => Some(g.access_mode),
        (None, None) => None,
    };

    let Some(access_mode) = mode else {
        return Ok(public.then(Availability::default));
    };

    let mut result = Availability {
        public,
        shared_by_others: direct.is_some(),
        access_mode,
        ..Availability::default()
    };
    if let Some(group) = best_group {
        result.shared_by_group = true;
        result.group_relation = Some(group.relation);
        result.group_id = Some(group.group_id);
        result.group_name = Some(group.group_name);
    }
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{GroupRelation, Membership, NewRecord, OmicSequence};
    use chrono::Utc;
    use serde_json::Map;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        store: SqliteStore,
        owner: i64,
        guest: i64,
        sample: StepRecord,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let owner = store.create_user("owner", "o@example.org", "O", "O").unwrap().id;
        let guest = store.create_user("guest", "g@example.org", "G", "G").unwrap().id;
        let sample = store
            .create_record(&NewRecord {
                table: StepTable::Sample,
                user_id: owner,
                sequence: None,
                source_id: None,
                project_id: None,
                fields: Map::new(),
                created: Utc::now(),
            })
            .unwrap();

        Fixture {
            _temp: temp,
            store,
            owner,
            guest,
            sample,
        }
    }

    fn mode(f: &Fixture, user: Option<i64>) -> Option<AccessMode> {
        let record = f.store.get_record(StepTable::Sample, f.sample.id).unwrap().unwrap();
        get_access_mode(&f.store, &record, user).unwrap()
    }

    #[test]
    fn test_owner_has_readwrite() {
        let f = fixture();
        assert_eq!(mode(&f, Some(f.owner)), Some(AccessMode::ReadWrite));
    }

    #[test]
    fn test_private_row_is_hidden() {
        let f = fixture();
        assert_eq!(mode(&f, Some(f.guest)), None);
        assert_eq!(mode(&f, None), None);
    }

    #[test]
    fn test_public_row_is_readable() {
        let f = fixture();
        f.store.set_record_public(StepTable::Sample, f.sample.id, true).unwrap();

        assert_eq!(mode(&f, Some(f.guest)), Some(AccessMode::Read));
        assert_eq!(mode(&f, None), Some(AccessMode::Read));
        assert_eq!(mode(&f, Some(f.owner)), Some(AccessMode::ReadWrite));
    }

    #[test]
    fn test_best_sharing_wins() {
        let f = fixture();
        f.store
            .upsert_user_sharing(StepTable::Sample, f.sample.id, f.guest, AccessMode::Read)
            .unwrap();
        assert_eq!(mode(&f, Some(f.guest)), Some(AccessMode::Read));

        let group = f.store.create_group("lab", None, f.owner).unwrap();
        f.store
            .upsert_membership(&Membership {
                user_id: f.guest,
                group_id: group.id,
                relation: GroupRelation::Member,
                addition_date: Some(Utc::now()),
            })
            .unwrap();
        f.store
            .upsert_group_sharing(StepTable::Sample, f.sample.id, group.id, AccessMode::ReadWrite)
            .unwrap();

        assert_eq!(mode(&f, Some(f.guest)), Some(AccessMode::ReadWrite));
    }

    #[test]
    fn test_invitation_grants_nothing() {
        let f = fixture();
        let group = f.store.create_group("lab", None, f.owner).unwrap();
        f.store
            .upsert_membership(&Membership {
                user_id: f.guest,
                group_id: group.id,
                relation: GroupRelation::Invited,
                addition_date: None,
            })
            .unwrap();
        f.store
            .upsert_group_sharing(StepTable::Sample, f.sample.id, group.id, AccessMode::ReadWrite)
            .unwrap();

        assert_eq!(mode(&f, Some(f.guest)), None);
    }

    #[test]
    fn test_availability_reports_group() {
        let f = fixture();
        let group = f.store.create_group("lab", None, f.owner).unwrap();
        f.store
            .upsert_membership(&Membership {
                user_id: f.guest,
                group_id: group.id,
                relation: GroupRelation::Member,
                addition_date: Some(Utc::now()),
            })
            .unwrap();
        f.store
            .upsert_group_sharing(StepTable::Sample, f.sample.id, group.id, AccessMode::Read)
            .unwrap();

        let record = f.store.get_record(StepTable::Sample, f.sample.id).unwrap().unwrap();
        let found = availability(&f.store, &record, Some(f.guest)).unwrap().unwrap();
        assert!(found.shared_by_group);
        assert!(!found.shared_by_others);
        assert!(!found.owned);
        assert!(!found.public);
        assert_eq!(found.group_name.as_deref(), Some("lab"));
        assert_eq!(found.group_relation, Some(GroupRelation::Member));
    }

    #[test]
    fn test_step_access_mode_by_id() {
        let f = fixture();
        assert_eq!(
            get_step_access_mode(&f.store, SequenceStep::Sample, Some(f.owner), f.sample.id).unwrap(),
            Some(AccessMode::ReadWrite)
        );
        assert_eq!(
            get_step_access_mode(&f.store, SequenceStep::Project, Some(f.owner), f.sample.id).unwrap(),
            None
        );
        assert_eq!(
            get_step_access_mode(&f.store, SequenceStep::Sample, Some(f.owner), 999).unwrap(),
            None
        );

        let reads = f
            .store
            .create_record(&NewRecord {
                table: StepTable::Experiment,
                user_id: f.guest,
                sequence: Some(OmicSequence::Metagenome),
                source_id: Some(f.sample.id),
                project_id: None,
                fields: Map::new(),
                created: Utc::now(),
            })
            .unwrap();
        // No inheritance from the parent sample.
        assert_eq!(
            get_step_access_mode(&f.store, SequenceStep::RawReads, Some(f.owner), reads.id).unwrap(),
            None
        );
    }
}
