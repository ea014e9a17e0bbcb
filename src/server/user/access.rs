use serde_json::Value;

use crate::access;
use crate::fields::{self, Fields, Prepared};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{
    AccessMode, OmicSequence, SequenceStep, StepRecord, StepTable, User, are_valid_sequence_step,
};

/// Resolves a URL step segment to the step and its storage table.
pub fn resolve_step(name: &str) -> Result<(SequenceStep, StepTable), ApiError> {
    let step = SequenceStep::parse(name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown step '{name}'")))?;
    let table = step
        .table()
        .ok_or_else(|| ApiError::not_found(format!("Step '{name}' has no records")))?;
    Ok((step, table))
}

pub fn load_record(store: &dyn Store, table: StepTable, id: i64) -> Result<StepRecord, ApiError> {
    store
        .get_record(table, id)
        .api_err("Failed to get record")?
        .or_not_found("Record not found")
}

/// RAW READS and PEPTIDES share a table; rows are told apart by sequence.
pub fn record_matches_step(record: &StepRecord, step: SequenceStep) -> bool {
    match record.sequence.as_deref() {
        Some(name) => are_valid_sequence_step(name, step.name()),
        None => true,
    }
}

/// Loads row `id` of `step`. A row of the same table stored for another
/// step is not found.
pub fn load_step_record(
    store: &dyn Store,
    step: SequenceStep,
    table: StepTable,
    id: i64,
) -> Result<StepRecord, ApiError> {
    let record = load_record(store, table, id)?;
    if !record_matches_step(&record, step) {
        return Err(ApiError::not_found("Record not found"));
    }
    Ok(record)
}

/// Returns the caller's access mode on `record` as a row of `step`,
/// failing unless it satisfies `required`.
pub fn require_access(
    store: &dyn Store,
    step: SequenceStep,
    record: &StepRecord,
    user_id: Option<i64>,
    required: AccessMode,
) -> Result<AccessMode, ApiError> {
    let mode = access::get_step_access_mode(store, step, user_id, record.id)
        .api_err("Failed to resolve access")?;

    match mode {
        Some(mode) if mode.allows(required) => Ok(mode),
        Some(_) => Err(ApiError::forbidden("Read-write access required")),
        None if user_id.is_none() => Err(ApiError::not_found("Record not found")),
        None => Err(ApiError::forbidden("Access denied")),
    }
}

/// Fails unless `step` belongs to `sequence`.
pub fn require_sequence_step(sequence: OmicSequence, step: SequenceStep) -> Result<(), ApiError> {
    if !are_valid_sequence_step(sequence.name(), step.name()) {
        return Err(ApiError::bad_request(format!(
            "{step} is not a step of {sequence}"
        )));
    }
    Ok(())
}

/// Visibility and sharings of a record can only be changed by its owner.
pub fn require_owner(user: &User, record: &StepRecord) -> Result<(), ApiError> {
    if record.user_id != user.id {
        return Err(ApiError::forbidden("Only the owner can do this"));
    }
    Ok(())
}

/// Removes and parses the `sequence` key of a request body.
pub fn take_sequence(params: &mut Fields) -> Result<Option<OmicSequence>, ApiError> {
    match params.remove("sequence") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => OmicSequence::parse(&name)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown sequence '{name}'"))),
        Some(_) => Err(ApiError::bad_request("sequence must be a string")),
    }
}

/// Removes and parses an integer id key of a request body.
pub fn take_id(params: &mut Fields, key: &str) -> Result<Option<i64>, ApiError> {
    match params.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("{key} must be an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{key} must be an integer"))),
        Some(_) => Err(ApiError::bad_request(format!("{key} must be an integer"))),
    }
}

/// Runs request parameters through the field rules.
pub fn ready_fields(
    params: Fields,
    target: Option<(OmicSequence, SequenceStep)>,
) -> Result<Fields, ApiError> {
    match fields::prepare_fields(params, target)? {
        Prepared::Ready(fields) => Ok(fields),
        Prepared::WrongFieldNames(wrong) => Err(ApiError::wrong_fields(wrong)),
    }
}

/// Serializes a record with its reference ids described.
pub fn render_record(store: &dyn Store, record: &StepRecord) -> Result<Fields, ApiError> {
    let Value::Object(mut rendered) = serde_json::to_value(record)
        .map_err(|_| ApiError::internal("Failed to encode record"))?
    else {
        return Err(ApiError::internal("Failed to encode record"));
    };
    fields::describe(store, &mut rendered).api_err("Failed to describe record")?;
    Ok(rendered)
}
