//! Per-record field transforms.
//!
//! Each transform looks at one document and either proposes a single
//! `$set` addressed by `_id`, or nothing when the field is absent or already
//! canonical. Malformed values come back as [`TransformError`] so the caller
//! can log and skip the record without touching the rest of the batch.

use chrono::{NaiveDateTime, SubsecRound};
use mflix_store::{
    CanonicalValue, Document, UpdateInstruction, ValueType, get_path, record_id,
};
use serde_json::Value;

use crate::TransformError;

/// Rating value for text ratings. Empty text counts as zero.
pub fn parse_rating(text: &str) -> Result<i32, std::num::ParseIntError> {
    if text.is_empty() {
        return Ok(0);
    }
    text.parse()
}

/// Propose an integer for a rating stored as text.
pub fn normalize_rating(
    doc: &Document,
    path: &str,
) -> Result<Option<UpdateInstruction>, TransformError> {
    let text = match get_path(doc, path) {
        None | Some(Value::Null) | Some(Value::Number(_)) => return Ok(None),
        Some(Value::String(text)) => text,
        Some(other) => return Err(unexpected(doc, path, other)),
    };

    let id = record_id(doc).ok_or(TransformError::MissingId)?;
    let rating = parse_rating(text).map_err(|source| TransformError::Rating {
        id: describe_id(id),
        path: path.to_string(),
        raw: text.clone(),
        source,
    })?;

    Ok(Some(UpdateInstruction::set(
        id.clone(),
        path,
        CanonicalValue::Int(rating),
    )))
}

/// Parse `text` against `format`, ignoring a trailing `.<digits>` fraction.
///
/// The fraction is dropped rather than kept, so `08:34:43.187000000` reads
/// as `08:34:43`. Any other trailing text is an error.
pub fn parse_timestamp(text: &str, format: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let (parsed, rest) = NaiveDateTime::parse_and_remainder(text, format)?;
    let fraction = rest
        .strip_prefix('.')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));

    if rest.is_empty() || fraction {
        Ok(parsed)
    } else {
        // Reparse strictly to get chrono's error for the leftover text.
        NaiveDateTime::parse_from_str(text, format)
    }
}

/// Propose a date for a timestamp stored as text in `format`.
///
/// The text is read as UTC. Dates are stored with millisecond precision, so
/// anything finer that a custom `format` picks up is truncated.
pub fn normalize_timestamp(
    doc: &Document,
    path: &str,
    format: &str,
) -> Result<Option<UpdateInstruction>, TransformError> {
    let text = match get_path(doc, path) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) if ValueType::of(value) == ValueType::Date => return Ok(None),
        Some(Value::String(text)) => text,
        Some(other) => return Err(unexpected(doc, path, other)),
    };

    let id = record_id(doc).ok_or(TransformError::MissingId)?;
    let parsed = parse_timestamp(text, format).map_err(|source| {
        TransformError::Timestamp {
            id: describe_id(id),
            path: path.to_string(),
            raw: text.clone(),
            format: format.to_string(),
            source,
        }
    })?;

    Ok(Some(UpdateInstruction::set(
        id.clone(),
        path,
        CanonicalValue::Date(parsed.and_utc().trunc_subsecs(3)),
    )))
}

fn unexpected(doc: &Document, path: &str, value: &Value) -> TransformError {
    match record_id(doc) {
        Some(id) => TransformError::UnexpectedType {
            id: describe_id(id),
            path: path.to_string(),
            found: ValueType::of(value),
        },
        None => TransformError::MissingId,
    }
}

/// Short form of an `_id` for log lines: object ids and strings unwrapped.
pub fn describe_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(oid)) => oid.clone(),
            _ => id.to_string(),
        },
        other => other.to_string(),
    }
}
