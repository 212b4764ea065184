//! Oplog entry classification.
//!
//! An entry looks like:
//!
//! ```text
//! {"op": "u", "ns": "test.student", "o": {"diff": {...}}, "o2": {"_id": "..."}}
//!   ─┬─        ─┬──────────────       ─┬────────────────   ─┬───────────────
//!    │          │                      │                    └── Condition (updates)
//!    │          │                      └── Payload
//!    │          └── Namespace: <schema>.<table>
//!    └── Operation: i, u, d
//! ```

use std::fmt;

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::rest,
    sequence::separated_pair,
    IResult,
};
use serde_json::{Map, Value as JsonValue};

use crate::ast::TableRef;
use crate::error::{TranslateError, TranslateResult};

/// Oplog operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Parse the oplog `op` code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "i" => Some(Operation::Insert),
            "u" => Some(Operation::Update),
            "d" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A classified oplog entry borrowing its payload from the decoded JSON.
#[derive(Debug, Clone)]
pub struct OplogEntry<'a> {
    pub op: Operation,
    pub table: TableRef,
    /// `o`: the document for inserts and deletes, the diff wrapper for updates.
    pub payload: &'a Map<String, JsonValue>,
    /// `o2`: the update filter, when present.
    pub condition: Option<&'a Map<String, JsonValue>>,
}

impl<'a> OplogEntry<'a> {
    /// Classify a decoded entry. `op` is checked first, then `ns`, then `o`.
    pub fn classify(entry: &'a JsonValue) -> TranslateResult<Self> {
        let Some(fields) = entry.as_object() else {
            return Err(TranslateError::UnsupportedOperation(format!(
                "entry is not an object: {}",
                entry
            )));
        };

        let op = fields
            .get("op")
            .and_then(JsonValue::as_str)
            .and_then(Operation::from_code)
            .ok_or_else(|| TranslateError::unsupported(fields.get("op")))?;

        let table = match fields.get("ns") {
            Some(JsonValue::String(ns)) => parse_namespace(ns)?,
            Some(other) => return Err(TranslateError::namespace(format!("ns is not a string: {}", other))),
            None => return Err(TranslateError::namespace("ns key not found in the oplog")),
        };

        let payload = fields
            .get("o")
            .and_then(JsonValue::as_object)
            .ok_or(TranslateError::MissingPayload)?;

        let condition = fields.get("o2").and_then(JsonValue::as_object);

        Ok(Self {
            op,
            table,
            payload,
            condition,
        })
    }
}

/// Split `<schema>.<table>` on the first dot.
pub fn parse_namespace(input: &str) -> TranslateResult<TableRef> {
    match namespace(input) {
        Ok((_, (schema, table))) if !table.is_empty() => Ok(TableRef::new(schema, table)),
        _ => Err(TranslateError::namespace(format!(
            "expected <db>.<table>, got '{}'",
            input
        ))),
    }
}

fn namespace(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_while1(|c: char| c != '.'), char('.'), rest)(input)
}
