//! Reply interpreters.
//!
//! Error replies never reach these functions; the connection turns them into
//! `Error::Server` first. Anything else that does not fit the shape a command
//! documents is reported as `Error::Decode` for that call only.

use crate::codec::Codec;
use crate::command::{MatchedPosition, Position, StringMatchResult};
use crate::error::{Error, Result};
use crate::protocol::RespValue;

/// A requested key paired with its value, `None` when the key holds nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: Option<V>,
}

impl<K, V> KeyValue<K, V> {
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

fn unexpected(expected: &str, reply: &RespValue) -> Error {
    Error::Decode(format!("expected {} reply, got {}", expected, reply.kind()))
}

pub fn integer(reply: RespValue) -> Result<i64> {
    match reply {
        RespValue::Integer(n) => Ok(n),
        other => Err(unexpected("integer", &other)),
    }
}

pub fn boolean(reply: RespValue) -> Result<bool> {
    Ok(integer(reply)? == 1)
}

pub fn status(reply: RespValue) -> Result<String> {
    match reply {
        RespValue::Simple(s) => Ok(s),
        RespValue::Bulk(Some(b)) => Ok(String::from_utf8_lossy(&b).into_owned()),
        other => Err(unexpected("status", &other)),
    }
}

/// Status reply, or `None` for nil (e.g. `SET ... NX` that did not write).
pub fn optional_status(reply: RespValue) -> Result<Option<String>> {
    match reply {
        RespValue::Bulk(None) => Ok(None),
        other => status(other).map(Some),
    }
}

pub fn value<C: Codec>(codec: &C, reply: RespValue) -> Result<Option<C::Value>> {
    match reply {
        RespValue::Bulk(None) => Ok(None),
        RespValue::Bulk(Some(bytes)) => codec.decode_value(&bytes).map(Some),
        other => Err(unexpected("bulk string", &other)),
    }
}

/// Bulk string holding a decimal floating point number.
pub fn double(reply: RespValue) -> Result<f64> {
    match reply {
        RespValue::Bulk(Some(bytes)) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| {
                Error::Decode(format!(
                    "'{}' is not a floating point number",
                    String::from_utf8_lossy(&bytes)
                ))
            }),
        other => Err(unexpected("bulk string", &other)),
    }
}

/// Array of integers where nil elements stay `None`.
pub fn integer_list(reply: RespValue) -> Result<Vec<Option<i64>>> {
    match reply {
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                RespValue::Bulk(None) => Ok(None),
                other => integer(other).map(Some),
            })
            .collect(),
        RespValue::Bulk(None) => Ok(Vec::new()),
        other => Err(unexpected("array", &other)),
    }
}

/// Pairs each requested key with the value at the same position.
pub fn key_values<C: Codec>(
    codec: &C,
    keys: &[C::Key],
    reply: RespValue,
) -> Result<Vec<KeyValue<C::Key, C::Value>>> {
    let items = match reply {
        RespValue::Array(items) => items,
        other => return Err(unexpected("array", &other)),
    };
    if items.len() != keys.len() {
        return Err(Error::Decode(format!(
            "expected {} values, got {}",
            keys.len(),
            items.len()
        )));
    }

    keys.iter()
        .zip(items)
        .map(|(key, item)| {
            Ok(KeyValue {
                key: key.clone(),
                value: value(codec, item)?,
            })
        })
        .collect()
}

/// Interprets every `STRALGO LCS` reply form.
pub fn string_match_result(reply: RespValue) -> Result<StringMatchResult> {
    match reply {
        RespValue::Bulk(Some(bytes)) => Ok(StringMatchResult {
            len: bytes.len() as i64,
            match_string: Some(String::from_utf8_lossy(&bytes).into_owned()),
            ..StringMatchResult::default()
        }),
        RespValue::Integer(len) => Ok(StringMatchResult {
            len,
            ..StringMatchResult::default()
        }),
        RespValue::Array(items) => {
            let mut result = StringMatchResult::default();
            let mut items = items.into_iter();
            while let Some(label) = items.next() {
                let label = match label {
                    RespValue::Bulk(Some(b)) => String::from_utf8_lossy(&b).to_ascii_lowercase(),
                    RespValue::Simple(s) => s.to_ascii_lowercase(),
                    other => return Err(unexpected("field name", &other)),
                };
                let Some(field) = items.next() else {
                    return Err(Error::Decode(format!("missing value for '{}'", label)));
                };
                match label.as_str() {
                    "matches" => result.matches = matched_positions(field)?,
                    "len" => result.len = integer(field)?,
                    _ => {}
                }
            }
            Ok(result)
        }
        other => Err(unexpected("LCS", &other)),
    }
}

fn matched_positions(field: RespValue) -> Result<Vec<MatchedPosition>> {
    let entries = match field {
        RespValue::Array(entries) => entries,
        other => return Err(unexpected("array", &other)),
    };

    entries
        .into_iter()
        .map(|entry| {
            let parts = match entry {
                RespValue::Array(parts) => parts,
                other => return Err(unexpected("array", &other)),
            };
            let mut parts = parts.into_iter();
            let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
                return Err(Error::Decode("match entry needs two ranges".to_string()));
            };
            let match_len = match parts.next() {
                Some(len) => integer(len)?,
                None => 0,
            };
            Ok(MatchedPosition {
                a: position(a)?,
                b: position(b)?,
                match_len,
            })
        })
        .collect()
}

fn position(range: RespValue) -> Result<Position> {
    let bounds = match range {
        RespValue::Array(bounds) => bounds,
        other => return Err(unexpected("array", &other)),
    };
    let mut bounds = bounds.into_iter();
    let (Some(start), Some(end)) = (bounds.next(), bounds.next()) else {
        return Err(Error::Decode("range needs start and end".to_string()));
    };
    Ok(Position {
        start: integer(start)?,
        end: integer(end)?,
    })
}
