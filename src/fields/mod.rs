//! Rules applied to the free-form metadata of samples and omic sequence
//! steps before it is stored, and the description lookups applied before it
//! is returned.

mod describe;

pub use describe::{classify, describe};

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::types::{Availability, OmicSequence, SequenceStep};

pub type Fields = Map<String, Value>;

const MAX_FIELD_NAME_LEN: usize = 64;

/// Columns managed by the server, never taken from a request.
pub const FORBIDDEN_FIELDS: &[&str] = &[
    "created",
    "updated",
    "id",
    "is_public",
    "source_id",
    "project_id",
    "user_id",
];

pub const DATE_FIELDS: &[&str] = &["dats", "dati"];
pub const TIME_FIELDS: &[&str] = &["hocs"];
pub const COORD_FIELDS: &[&str] = &["lati", "long"];
pub const FLOAT_FIELDS: &[&str] = &[
    "ssize",
    "seqdepth",
    "completeness",
    "contamination",
    "ggcm",
    "alti",
    "dept",
    "tems",
    "phsa",
    "sals",
    "temo",
    "teml",
    "temh",
    "phop",
    "phlo",
    "phhi",
    "salo",
    "sall",
    "salh",
    "coverage",
];

/// File fields and the columns holding their stored file names.
const FILE_FIELDS: &[(&str, &str)] = &[
    ("rreads", "rrname"),
    ("rreads2", "rrname2"),
    ("treads", "trname"),
    ("assembled", "assname"),
    ("pgenes", "pgenesname"),
];

const ENVIRONMENT_FIELDS: &[&str] = &[
    "txnr",
    "sixteensr",
    "seqdepth",
    "twentythreesr",
    "dnae",
    "tems",
    "phsa",
    "sals",
    "emet",
    "orel",
    "elac",
    "temo",
    "teml",
    "temh",
    "phop",
    "phlo",
    "phhi",
    "salo",
    "sall",
    "salh",
    "salw",
    "path",
    "extr",
];

/// Fields that do not apply to `step` when it runs inside `sequence`.
#[must_use]
pub fn excluded_fields(sequence: OmicSequence, step: SequenceStep) -> &'static [&'static str] {
    use OmicSequence as Seq;
    use SequenceStep as Step;
    match (sequence, step) {
        (Seq::Metatranscriptome, Step::RawReads) => &["gsiz", "sfrac"],
        (Seq::Metatranscriptome, Step::TrimmedReads) => &["coverage"],
        (Seq::Metavirome, Step::RawReads) => &["gsiz", "sfrac"],
        (Seq::GenomeProcariota, Step::RawReads) => &["meca", "gsiz", "sfrac"],
        (Seq::GenomeVirus, Step::RawReads) => &["meca", "gsiz", "sfrac"],
        (Seq::GenomeVirus, Step::Genome) => ENVIRONMENT_FIELDS,
        (Seq::Proteomics, Step::Peptides) => &["meca", "gsiz", "seqt", "dati", "sfrac"],
        (Seq::SingleCellGenomics, Step::RawReads) => &["meca", "gsiz", "sfrac"],
        (Seq::Plasmid, Step::RawReads) => &["gsiz", "sfrac"],
        _ => &[],
    }
}

#[must_use]
pub fn is_file_field(field: &str) -> bool {
    FILE_FIELDS.iter().any(|(f, _)| *f == field)
}

fn is_file_name_field(field: &str) -> bool {
    FILE_FIELDS.iter().any(|(_, name)| *name == field)
}

/// Drops file fields and their file name columns.
#[must_use]
pub fn exclude_param_files(params: Fields) -> Fields {
    params
        .into_iter()
        .filter(|(k, _)| !is_file_field(k) && !is_file_name_field(k))
        .collect()
}

/// Drops server-managed columns and, when a sequence step is given, the
/// fields that do not apply to it.
#[must_use]
pub fn exclude_forbidden_fields(
    params: Fields,
    target: Option<(OmicSequence, SequenceStep)>,
) -> Fields {
    let excluded = target.map_or(&[][..], |(sequence, step)| excluded_fields(sequence, step));
    params
        .into_iter()
        .filter(|(k, _)| !FORBIDDEN_FIELDS.contains(&k.as_str()) && !excluded.contains(&k.as_str()))
        .collect()
}

/// A field name a client may set: not a file, file name or server-managed
/// column, and shaped like a column name.
#[must_use]
pub fn valid_field(field: &str) -> bool {
    if is_file_field(field) || is_file_name_field(field) || FORBIDDEN_FIELDS.contains(&field) {
        return false;
    }
    let mut chars = field.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    starts_with_letter
        && field.len() <= MAX_FIELD_NAME_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Names in `params` that fail [`valid_field`], sorted.
#[must_use]
pub fn invalid_fields(params: &Fields) -> Vec<String> {
    let mut invalid: Vec<String> = params.keys().filter(|k| !valid_field(k)).cloned().collect();
    invalid.sort();
    invalid
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn number(field: &str, value: f64) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| invalid(field, "not a finite number"))
}

/// Parses a decimal number that may use a comma as decimal separator.
pub fn commas_to_dot(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Null | Value::Number(_) => Ok(value.clone()),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => {
            let parsed: f64 = s
                .trim()
                .replace(',', ".")
                .parse()
                .map_err(|_| invalid(field, format!("'{s}' is not a number")))?;
            number(field, parsed)
        }
        _ => Err(invalid(field, "expected a number")),
    }
}

/// Converts decimal degrees (`-3,7`) or degrees, minutes and seconds
/// (`40°26'46"N`) into decimal degrees.
pub fn convert_to_coordinate(field: &str, value: &Value) -> Result<Value> {
    let degrees = match value {
        Value::Null => return Ok(Value::Null),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(field, "not a finite number"))?,
        Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
        Value::String(s) => {
            let text = s.trim();
            match text.replace(',', ".").parse::<f64>() {
                Ok(decimal) => decimal,
                Err(_) => parse_dms(text)
                    .ok_or_else(|| invalid(field, format!("'{text}' is not a coordinate")))?,
            }
        }
        _ => return Err(invalid(field, "expected a coordinate")),
    };

    let limit = if field == "lati" { 90.0 } else { 180.0 };

    if degrees.abs() > limit {
        return Err(invalid(field, format!("{degrees} is out of range")));
    }
    number(field, degrees)
}

fn parse_dms(text: &str) -> Option<f64> {
    let mut body = text.trim();
    let mut negative = false;

    if let Some(last) = body.chars().last().filter(char::is_ascii_alphabetic) {
        match last.to_ascii_uppercase() {
            'S' | 'W' => negative = true,
            'N' | 'E' => {}
            _ => return None,
        }
        body = body[..body.len() - 1].trim_end();
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = !negative;
        body = rest;
    }

    let parts: Vec<f64> = body
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|p| !p.is_empty())
        .map(|p| p.replace(',', ".").parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    let (deg, min, sec) = match parts.as_slice() {
        [d] => (*d, 0.0, 0.0),
        [d, m] => (*d, *m, 0.0),
        [d, m, s] => (*d, *m, *s),
        _ => return None,
    };
    if min >= 60.0 || sec >= 60.0 {
        return None;
    }

    let value = deg + min / 60.0 + sec / 3600.0;
    Some(if negative { -value } else { value })
}

fn fix_date(field: &str, value: &Value) -> Result<Value> {
    let Value::String(s) = value else {
        return match value {
            Value::Null => Ok(Value::Null),
            _ => Err(invalid(field, "expected a dd/mm/yyyy date")),
        };
    };
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| invalid(field, format!("'{s}' is not a dd/mm/yyyy date")))
}

fn fix_time(field: &str, value: &Value) -> Result<Value> {
    let Value::String(s) = value else {
        return match value {
            Value::Null => Ok(Value::Null),
            _ => Err(invalid(field, "expected a hh:mm:ss time")),
        };
    };
    let s = s.trim();
    let parsed = match s.split(':').count() {
        1 => s
            .parse::<u32>()
            .ok()
            .and_then(|h| NaiveTime::from_hms_opt(h, 0, 0)),
        2 => NaiveTime::parse_from_str(s, "%H:%M").ok(),
        3 => NaiveTime::parse_from_str(s, "%H:%M:%S").ok(),
        _ => None,
    };
    parsed
        .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
        .ok_or_else(|| invalid(field, format!("'{s}' is not a hh:mm:ss time")))
}

fn convert_each(
    fields: &mut Fields,
    names: &[&str],
    convert: fn(&str, &Value) -> Result<Value>,
) -> Result<()> {
    for name in names {
        if let Some(value) = fields.get_mut(*name) {
            *value = convert(name, value)?;
        }
    }
    Ok(())
}

pub fn filter_coordinates(fields: &mut Fields) -> Result<()> {
    convert_each(fields, COORD_FIELDS, convert_to_coordinate)
}

pub fn filter_floats(fields: &mut Fields) -> Result<()> {
    convert_each(fields, FLOAT_FIELDS, commas_to_dot)
}

/// Normalizes dates to `yyyy-mm-dd` and times to `hh:mm:ss`.
pub fn fix_times(fields: &mut Fields) -> Result<()> {
    convert_each(fields, DATE_FIELDS, fix_date)?;
    convert_each(fields, TIME_FIELDS, fix_time)
}

/// Outcome of running request parameters through the field rules.
#[derive(Debug)]
pub enum Prepared {
    Ready(Fields),
    WrongFieldNames(Vec<String>),
}

/// Runs the whole pipeline on request parameters: file and forbidden field
/// exclusion, name validation, then value normalization.
pub fn prepare_fields(params: Fields, target: Option<(OmicSequence, SequenceStep)>) -> Result<Prepared> {
    let params = exclude_forbidden_fields(exclude_param_files(params), target);

    let wrong = invalid_fields(&params);
    if !wrong.is_empty() {
        return Ok(Prepared::WrongFieldNames(wrong));
    }

    let mut fields = params;
    filter_coordinates(&mut fields)?;
    filter_floats(&mut fields)?;
    fix_times(&mut fields)?;
    Ok(Prepared::Ready(fields))
}

/// Prepends the availability annotations to a serialized record.
pub fn merge_extra_fields(element: Fields, availability: &Availability) -> Result<Fields> {
    let Value::Object(mut merged) = serde_json::to_value(availability)? else {
        return Ok(element);
    };
    merged.extend(element);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_exclude_param_files() {
        let params = fields(json!({"rreads": "x", "rrname": "a.fq", "pgenesname": "b", "name": "s1"}));
        let kept = exclude_param_files(params);
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("name"));
    }

    #[test]
    fn test_exclude_forbidden_fields_by_sequence() {
        let params = fields(json!({"id": 3, "user_id": 9, "gsiz": 10, "sfrac": 1, "meca": 2, "name": "r"}));

        let generic = exclude_forbidden_fields(params.clone(), None);
        assert!(!generic.contains_key("id"));
        assert!(!generic.contains_key("user_id"));
        assert!(generic.contains_key("gsiz"));

        let scoped = exclude_forbidden_fields(
            params,
            Some((OmicSequence::GenomeProcariota, SequenceStep::RawReads)),
        );
        assert_eq!(scoped.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_genome_virus_drops_environment() {
        let excluded = excluded_fields(OmicSequence::GenomeVirus, SequenceStep::Genome);
        assert!(excluded.contains(&"temo"));
        assert!(excluded.contains(&"extr"));
        assert!(excluded_fields(OmicSequence::GenomeProcariota, SequenceStep::Genome).is_empty());
    }

    #[test]
    fn test_valid_field() {
        assert!(valid_field("name"));
        assert!(valid_field("rrname_extra"));
        assert!(!valid_field("rrname"));
        assert!(!valid_field("assembled"));
        assert!(!valid_field("is_public"));
        assert!(!valid_field("Name"));
        assert!(!valid_field("1abc"));
        assert!(!valid_field("drop table"));
    }

    #[test]
    fn test_coordinates() {
        let mut f = fields(json!({"lati": "40°26'46\"N", "long": "-3,7038"}));
        filter_coordinates(&mut f).unwrap();
        let lati = f["lati"].as_f64().unwrap();
        assert!((lati - 40.446_111).abs() < 1e-5);
        assert_eq!(f["long"].as_f64().unwrap(), -3.7038);

        let mut south = fields(json!({"lati": "33 52 S"}));
        filter_coordinates(&mut south).unwrap();
        assert!((south["lati"].as_f64().unwrap() + 33.866_666).abs() < 1e-5);

        let mut bad = fields(json!({"lati": "95.5"}));
        assert!(matches!(
            filter_coordinates(&mut bad),
            Err(Error::InvalidField { .. })
        ));
    }

    #[test]
    fn test_floats_accept_commas() {
        let mut f = fields(json!({"ssize": "12,5", "coverage": 3, "name": "1,5"}));
        filter_floats(&mut f).unwrap();
        assert_eq!(f["ssize"], json!(12.5));
        assert_eq!(f["coverage"], json!(3));
        assert_eq!(f["name"], json!("1,5"));

        let mut bad = fields(json!({"temo": "warm"}));
        assert!(filter_floats(&mut bad).is_err());
    }

    #[test]
    fn test_fix_times() {
        let mut f = fields(json!({"dats": "07/03/2021", "dati": "2020-01-31", "hocs": "9"}));
        fix_times(&mut f).unwrap();
        assert_eq!(f["dats"], json!("2021-03-07"));
        assert_eq!(f["dati"], json!("2020-01-31"));
        assert_eq!(f["hocs"], json!("09:00:00"));

        let mut minutes = fields(json!({"hocs": "14:5"}));
        fix_times(&mut minutes).unwrap();
        assert_eq!(minutes["hocs"], json!("14:05:00"));

        let mut bad = fields(json!({"dats": "31/02/2021"}));
        assert!(fix_times(&mut bad).is_err());
    }

    #[test]
    fn test_prepare_fields_reports_wrong_names() {
        let params = fields(json!({"name": "s", "Bad Name": 1, "id": 4}));
        match prepare_fields(params, None).unwrap() {
            Prepared::WrongFieldNames(names) => assert_eq!(names, vec!["Bad Name"]),
            Prepared::Ready(_) => panic!("expected wrong field names"),
        }
    }

    #[test]
    fn test_merge_extra_fields() {
        let merged = merge_extra_fields(fields(json!({"id": 1})), &Availability::default()).unwrap();
        assert_eq!(merged["public"], json!(true));
        assert_eq!(merged["access_mode"], json!("read"));
        assert_eq!(merged["group_id"], Value::Null);
        assert_eq!(merged["id"], json!(1));
    }
}
