use serde_json::Value;

use super::Fields;
use crate::error::Result;
use crate::store::Store;
use crate::types::{RangeEntry, RangeTable, ReferenceTable};

/// Fields holding one id into a reference table.
const COMPLEMENTARIES: &[(&str, ReferenceTable)] = &[
    ("method_id", ReferenceTable::Method),
    ("dnae", ReferenceTable::Extraction),
    ("asem", ReferenceTable::Assembly),
    ("seqt", ReferenceTable::Sequencing),
    ("bins", ReferenceTable::Binning),
    ("orel", ReferenceTable::Oxygen),
    ("sfrac", ReferenceTable::Fraction),
    ("target_id", ReferenceTable::Target),
];

/// Fields derived from a measured value: (derived, measured, range table).
const SUPPLEMENTARIES: &[(&str, &str, RangeTable)] = &[
    ("temc", "temo", RangeTable::Temperature),
    ("phca", "phop", RangeTable::Ph),
    ("salc", "salo", RangeTable::Salinity),
];

/// Fields holding several ids into a reference table.
const MULTI_COMPLEMENTARIES: &[(&str, ReferenceTable)] = &[
    ("keywords_id", ReferenceTable::Keywords),
    ("publication_id", ReferenceTable::Publication),
    ("hkgn", ReferenceTable::Hkgenes),
];

/// Describes `value` with the range `vmin < value <= vmax` containing it.
///
/// Values outside every range are reported against the overall bounds.
/// Values falling in a gap between ranges have no description.
#[must_use]
pub fn classify(entries: &[RangeEntry], value: f64) -> Option<String> {
    if let Some(entry) = entries.iter().find(|e| e.vmin < value && value <= e.vmax) {
        return Some(entry.description.clone());
    }

    let min = entries.iter().map(|e| e.vmin).reduce(f64::min)?;
    let max = entries.iter().map(|e| e.vmax).reduce(f64::max)?;

    if value <= min {
        Some(format!("Less than minimum ({min:?})"))
    } else if value > max {
        Some(format!("More than maximum ({max:?})"))
    } else {
        None
    }
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn multi_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_id).collect(),
        Value::String(s) => s.split(',').filter_map(|p| p.trim().parse().ok()).collect(),
        other => as_id(other).into_iter().collect(),
    }
}

/// Replaces reference ids in `fields` with their descriptions and adds the
/// range classification of measured values. Ids without a matching
/// reference row are left as they are.
pub fn describe(store: &dyn Store, fields: &mut Fields) -> Result<()> {
    for (field, table) in COMPLEMENTARIES {
        let Some(id) = fields.get(*field).and_then(as_id) else {
            continue;
        };
        if let Some(description) = store.get_reference_description(*table, id)? {
            fields.insert((*field).to_string(), Value::String(description));
        }
    }

    for (derived, measured, table) in SUPPLEMENTARIES {
        let Some(value) = fields.get(*measured).and_then(as_f64) else {
            continue;
        };
        let entries = store.list_range_entries(*table)?;
        if let Some(description) = classify(&entries, value) {
            fields.insert((*derived).to_string(), Value::String(description));
        }
    }

    for (field, table) in MULTI_COMPLEMENTARIES {
        let ids = match fields.get(*field) {
            Some(value) => multi_ids(value),
            None => continue,
        };
        if ids.is_empty() {
            continue;
        }
        let mut described = Vec::with_capacity(ids.len());
        for id in ids {
            described.push(match store.get_reference_description(*table, id)? {
                Some(description) => Value::String(description),
                None => Value::from(id),
            });
        }
        fields.insert((*field).to_string(), Value::Array(described));
    }

    Ok(())
}
