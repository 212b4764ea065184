//! Oplog → SQL translation engine.
//!
//! A [`Translator`] owns the schema state of one run. Entries are fed in
//! order; each one is translated atomically, so a failing entry leaves
//! neither statements nor schema changes behind.
//!
//! ```
//! use oplog2sql::Translator;
//!
//! let mut translator = Translator::new();
//! translator
//!     .feed_str(r#"{"op": "d", "ns": "test.student", "o": {"_id": "abc"}}"#)
//!     .unwrap();
//! assert_eq!(
//!     translator.finish().sql(),
//!     "DELETE FROM test.student WHERE _id = 'abc';"
//! );
//! ```

use std::io::Read;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::ast::{Assignment, Statement, TableRef, Value};
use crate::config::{ErrorPolicy, TranslatorConfig};
use crate::error::{TranslateError, TranslateResult};
use crate::flatten::{Flattener, IdGenerator, UuidGenerator};
use crate::oplog::{OplogEntry, Operation};
use crate::schema::SchemaTracker;
use crate::transpiler::ToSql;
use crate::value::{infer_column, is_nested, literal, sorted_fields};

/// An entry skipped under [`ErrorPolicy::SkipEntry`].
#[derive(Debug)]
pub struct EntryError {
    /// Zero-based position of the entry in the input stream.
    pub index: usize,
    pub error: TranslateError,
}

/// The result of a translation run.
#[derive(Debug, Default)]
pub struct Translation {
    pub statements: Vec<Statement>,
    pub errors: Vec<EntryError>,
}

impl Translation {
    /// All statements concatenated without separators.
    pub fn sql(&self) -> String {
        self.statements.to_sql()
    }

    /// All statements, one per line.
    pub fn sql_lines(&self) -> String {
        self.statements.iter().map(|s| s.to_sql() + "\n").collect()
    }
}

pub struct Translator {
    config: TranslatorConfig,
    schema: SchemaTracker,
    ids: Box<dyn IdGenerator>,
    statements: Vec<Statement>,
    errors: Vec<EntryError>,
    position: usize,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_config(TranslatorConfig::default())
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            config,
            schema: SchemaTracker::new(),
            ids: Box::new(UuidGenerator),
            statements: Vec::new(),
            errors: Vec::new(),
            position: 0,
        }
    }

    /// Replace the surrogate id source used for child rows.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn schema(&self) -> &SchemaTracker {
        &self.schema
    }

    /// Statements accumulated so far.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Decode a stream of concatenated JSON values and feed each one.
    /// Malformed JSON aborts the run regardless of the error policy.
    pub fn feed_str(&mut self, input: &str) -> TranslateResult<()> {
        for value in serde_json::Deserializer::from_str(input).into_iter::<JsonValue>() {
            self.feed(&value?)?;
        }
        Ok(())
    }

    /// Like [`Translator::feed_str`] but reads from `reader`.
    pub fn feed_reader<R: Read>(&mut self, reader: R) -> TranslateResult<()> {
        for value in serde_json::Deserializer::from_reader(reader).into_iter::<JsonValue>() {
            self.feed(&value?)?;
        }
        Ok(())
    }

    /// Feed one decoded value: a single entry or an array of entries.
    pub fn feed(&mut self, value: &JsonValue) -> TranslateResult<()> {
        match value {
            JsonValue::Array(entries) => entries.iter().try_for_each(|entry| self.feed_entry(entry)),
            entry => self.feed_entry(entry),
        }
    }

    fn feed_entry(&mut self, entry: &JsonValue) -> TranslateResult<()> {
        let index = self.position;
        self.position += 1;

        match self.translate_entry(entry) {
            Ok(stmts) => {
                self.statements.extend(stmts);
                Ok(())
            }
            Err(error) if self.config.error_policy == ErrorPolicy::SkipEntry && !error.is_fatal() => {
                warn!(index, %error, "skipping oplog entry");
                self.errors.push(EntryError { index, error });
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Translate a single entry, returning its statements without
    /// accumulating them. Schema changes are kept only on success.
    pub fn translate_entry(&mut self, raw: &JsonValue) -> TranslateResult<Vec<Statement>> {
        let entry = OplogEntry::classify(raw)?;
        let stmts = match entry.op {
            Operation::Insert => self.insert_atomic(&entry)?,
            Operation::Update => vec![self.update(&entry)?],
            Operation::Delete => vec![self.delete(&entry)?],
        };
        debug!(op = %entry.op, table = %entry.table, statements = stmts.len(), "translated oplog entry");
        Ok(stmts)
    }

    /// Insert with schema rollback on error. Updates and deletes never touch the schema.
    fn insert_atomic(&mut self, entry: &OplogEntry<'_>) -> TranslateResult<Vec<Statement>> {
        let snapshot = self.schema.clone();
        let result = self.insert(entry);
        if result.is_err() {
            self.schema = snapshot;
        }
        result
    }

    fn insert(&mut self, entry: &OplogEntry<'_>) -> TranslateResult<Vec<Statement>> {
        let doc = entry.payload;
        let mut columns = Vec::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();

        for (name, value) in sorted_fields(doc) {
            if is_nested(value) || value.is_null() {
                continue;
            }
            if let (Some(col), Some(lit)) = (infer_column(name, value, &self.config), literal(value)) {
                columns.push(col);
                keys.push(name.clone());
                values.push(lit);
            }
        }

        let mut out = self.schema.observe(&entry.table, columns)?;
        out.push(Statement::insert(entry.table.clone(), keys, values)?);
        self.flatten(&entry.table, doc, &mut out)?;
        Ok(out)
    }

    fn flatten(&mut self, table: &TableRef, doc: &Map<String, JsonValue>, out: &mut Vec<Statement>) -> TranslateResult<()> {
        if !doc.values().any(is_nested) {
            return Ok(());
        }
        let parent_id = doc
            .get(&self.config.identity_field)
            .and_then(literal)
            .filter(|id| *id != Value::Null);
        let Some(parent_id) = parent_id else {
            warn!(table = %table, "document has nested fields but no identity field; nested fields dropped");
            return Ok(());
        };

        let mut flattener = Flattener {
            config: &self.config,
            schema: &mut self.schema,
            ids: self.ids.as_mut(),
        };
        flattener.flatten(table, &parent_id, doc, out)
    }

    fn update(&self, entry: &OplogEntry<'_>) -> TranslateResult<Statement> {
        let diff = entry
            .payload
            .get("diff")
            .and_then(JsonValue::as_object)
            .ok_or(TranslateError::MissingDiff)?;

        let mut set = match diff.get("u").and_then(JsonValue::as_object) {
            Some(u) => assignments(&entry.table, u),
            None => Vec::new(),
        };
        if let Some(d) = diff.get("d").and_then(JsonValue::as_object) {
            set.extend(
                sorted_fields(d)
                    .into_iter()
                    .map(|(name, _)| Assignment::new(name.as_str(), Value::Null)),
            );
        }

        let conditions = entry
            .condition
            .map(|o2| assignments(&entry.table, o2))
            .unwrap_or_default();

        Statement::update(entry.table.clone(), set, conditions)
    }

    fn delete(&self, entry: &OplogEntry<'_>) -> TranslateResult<Statement> {
        let conditions = assignments(&entry.table, entry.payload);
        Statement::delete(entry.table.clone(), conditions)
    }

    /// Accumulated statements and skipped entries.
    pub fn finish(self) -> Translation {
        Translation {
            statements: self.statements,
            errors: self.errors,
        }
    }
}

/// `field = literal` pairs in key order; nested values are dropped.
fn assignments(table: &TableRef, fields: &Map<String, JsonValue>) -> Vec<Assignment> {
    sorted_fields(fields)
        .into_iter()
        .filter_map(|(name, value)| match literal(value) {
            Some(lit) => Some(Assignment::new(name.as_str(), lit)),
            None => {
                warn!(table = %table, field = %name, "dropping non-scalar value");
                None
            }
        })
        .collect()
}

/// Translate a whole input stream with default settings.
pub fn translate(input: &str) -> TranslateResult<String> {
    let mut translator = Translator::new();
    translator.feed_str(input)?;
    Ok(translator.finish().sql())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn translator() -> Translator {
        let mut n = 0;
        Translator::new().with_id_generator(move || {
            n += 1;
            format!("id{}", n)
        })
    }

    fn sql_of(translator: &mut Translator, entry: JsonValue) -> String {
        translator.translate_entry(&entry).unwrap().to_sql()
    }

    const SELENA: &str = r#"{"op":"i","ns":"test.student","o":{"_id":"abc","name":"Selena","roll_no":51,"is_graduated":false}}"#;

    #[test]
    fn test_first_insert() {
        assert_eq!(
            translate(SELENA).unwrap(),
            "CREATE SCHEMA test;\
             CREATE TABLE test.student (_id VARCHAR(255) PRIMARY KEY, is_graduated BOOLEAN, name VARCHAR(255), roll_no FLOAT);\
             INSERT INTO test.student (_id, is_graduated, name, roll_no) VALUES ('abc', false, 'Selena', 51);"
        );
    }

    #[test]
    fn test_schema_created_once() {
        let mut t = translator();
        t.feed_str(SELENA).unwrap();
        t.feed_str(r#"{"op":"i","ns":"test.student","o":{"_id":"def","name":"George","roll_no":21,"is_graduated":true}}"#)
            .unwrap();
        let sql = t.finish().sql();
        assert_eq!(sql.matches("CREATE SCHEMA").count(), 1);
        assert_eq!(sql.matches("CREATE TABLE").count(), 1);
        assert_eq!(sql.matches("INSERT INTO").count(), 2);
    }

    #[test]
    fn test_column_order() {
        let mut t = translator();
        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"b": "1", "a": "2", "c": "3"}}));
        assert_eq!(
            sql,
            "CREATE SCHEMA t;\
             CREATE TABLE t.x (a VARCHAR(255), b VARCHAR(255), c VARCHAR(255));\
             INSERT INTO t.x (a, b, c) VALUES ('2', '1', '3');"
        );
    }

    #[test]
    fn test_schema_evolution() {
        let mut t = translator();
        sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"x": 1, "y": 2}}));
        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"x": 1, "y": 2, "z": true}}));
        assert_eq!(
            sql,
            "ALTER TABLE t.x ADD z BOOLEAN;INSERT INTO t.x (x, y, z) VALUES (1, 2, true);"
        );
    }

    #[test]
    fn test_fractional_literal() {
        let mut t = translator();
        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"gpa": 3.14}}));
        assert!(sql.ends_with("INSERT INTO t.x (gpa) VALUES (3.14);"), "{sql}");
        assert!(sql.contains("gpa FLOAT"));
    }

    #[test]
    fn test_null_fields_omitted() {
        let mut t = translator();
        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"_id": "a", "nick": null}}));
        assert_eq!(
            sql,
            "CREATE SCHEMA t;CREATE TABLE t.x (_id VARCHAR(255) PRIMARY KEY);INSERT INTO t.x (_id) VALUES ('a');"
        );
    }

    #[test]
    fn test_update_set() {
        let mut t = translator();
        let sql = sql_of(
            &mut t,
            json!({"op": "u", "ns": "test.student", "o": {"$v": 2, "diff": {"u": {"is_graduated": true}}}, "o2": {"_id": "abc"}}),
        );
        assert_eq!(sql, "UPDATE test.student SET is_graduated = true WHERE _id = 'abc';");
    }

    #[test]
    fn test_update_unset() {
        let mut t = translator();
        let sql = sql_of(
            &mut t,
            json!({"op": "u", "ns": "test.student", "o": {"diff": {"d": {"roll_no": false}}}, "o2": {"_id": "abc"}}),
        );
        assert_eq!(sql, "UPDATE test.student SET roll_no = NULL WHERE _id = 'abc';");
    }

    #[test]
    fn test_update_multiple_pairs_joined() {
        let mut t = translator();
        let sql = sql_of(
            &mut t,
            json!({
                "op": "u",
                "ns": "test.student",
                "o": {"diff": {"u": {"name": "Sel", "age": 3}, "d": {"nick": false}}},
                "o2": {"_id": "abc", "tenant": "t1"}
            }),
        );
        assert_eq!(
            sql,
            "UPDATE test.student SET age = 3, name = 'Sel', nick = NULL WHERE _id = 'abc' AND tenant = 't1';"
        );
    }

    #[test]
    fn test_update_errors() {
        let mut t = translator();
        let err = t
            .translate_entry(&json!({"op": "u", "ns": "t.x", "o": {"u": {"a": 1}}, "o2": {"_id": "a"}}))
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingDiff));

        let err = t
            .translate_entry(&json!({"op": "u", "ns": "t.x", "o": {"diff": {}}, "o2": {"_id": "a"}}))
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingUpdateClause { .. }));

        let err = t
            .translate_entry(&json!({"op": "u", "ns": "t.x", "o": {"diff": {"u": {"a": 1}}}}))
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingConditionClause { .. }));
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            translate(r#"{"op":"d","ns":"test.student","o":{"_id":"abc"}}"#).unwrap(),
            "DELETE FROM test.student WHERE _id = 'abc';"
        );

        let mut t = translator();
        let err = t.translate_entry(&json!({"op": "d", "ns": "t.x", "o": {}})).unwrap_err();
        assert!(matches!(err, TranslateError::MissingConditionClause { .. }));
    }

    #[test]
    fn test_nested_insert() {
        let mut t = translator();
        let sql = sql_of(
            &mut t,
            json!({
                "op": "i",
                "ns": "test.student",
                "o": {
                    "_id": "abc",
                    "name": "Selena",
                    "address": [
                        {"line1": "481 Harborsburgh", "zip": "89799"},
                        {"line1": "329 Flatside", "zip": "80872"}
                    ]
                }
            }),
        );
        assert_eq!(
            sql,
            "CREATE SCHEMA test;\
             CREATE TABLE test.student (_id VARCHAR(255) PRIMARY KEY, name VARCHAR(255));\
             INSERT INTO test.student (_id, name) VALUES ('abc', 'Selena');\
             CREATE TABLE test.student_address (_id VARCHAR(255) PRIMARY KEY, line1 VARCHAR(255), student_id VARCHAR(255), zip VARCHAR(255));\
             INSERT INTO test.student_address (_id, student_id, line1, zip) VALUES ('id1', 'abc', '481 Harborsburgh', '89799');\
             INSERT INTO test.student_address (_id, student_id, line1, zip) VALUES ('id2', 'abc', '329 Flatside', '80872');"
        );
    }

    #[test]
    fn test_nested_without_identity_is_dropped() {
        let mut t = translator();
        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"a": "1", "b": {"c": "2"}}}));
        assert!(!sql.contains("t.x_b"), "{sql}");
    }

    #[test]
    fn test_failed_entry_rolls_back_schema() {
        let mut t = translator();
        let err = t
            .translate_entry(&json!({"op": "i", "ns": "t.x", "o": {"_id": "a", "tags": []}}))
            .unwrap_err();
        assert!(matches!(err, TranslateError::NoColumnsToCreate(_)));
        assert!(!t.schema().is_created(&TableRef::new("t", "x")));

        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"_id": "a"}}));
        assert!(sql.starts_with("CREATE SCHEMA t;"), "{sql}");
    }

    #[test]
    fn test_failed_update_keeps_schema() {
        let mut t = translator();
        sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"_id": "a", "n": 1}}));
        t.translate_entry(&json!({"op": "u", "ns": "t.x", "o": {"diff": {}}, "o2": {"_id": "a"}}))
            .unwrap_err();
        assert!(t.schema().is_created(&TableRef::new("t", "x")));

        let sql = sql_of(&mut t, json!({"op": "i", "ns": "t.x", "o": {"_id": "b", "n": 2}}));
        assert_eq!(sql, "INSERT INTO t.x (_id, n) VALUES ('b', 2);");
    }

    #[test]
    fn test_fail_fast() {
        let mut t = translator();
        let input = r#"{"op":"n","ns":"t.x","o":{}} {"op":"d","ns":"t.x","o":{"_id":"a"}}"#;
        let err = t.feed_str(input).unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedOperation(_)));
        assert!(t.statements().is_empty());
    }

    #[test]
    fn test_skip_entry_policy() {
        let config = TranslatorConfig::builder().error_policy(ErrorPolicy::SkipEntry).build();
        let mut t = Translator::with_config(config);
        let input = r#"[
            {"op":"i","ns":"t.x","o":{"_id":"a","tags":[]}},
            {"op":"n","ns":"t.x","o":{}},
            {"op":"d","ns":"t.x","o":{"_id":"a"}}
        ]"#;
        t.feed_str(input).unwrap();
        let result = t.finish();
        assert_eq!(result.sql(), "DELETE FROM t.x WHERE _id = 'a';");
        let skipped: Vec<usize> = result.errors.iter().map(|e| e.index).collect();
        assert_eq!(skipped, [0, 1]);
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let config = TranslatorConfig::builder().error_policy(ErrorPolicy::SkipEntry).build();
        let mut t = Translator::with_config(config);
        let err = t.feed_str(r#"{"op": "d", "#).unwrap_err();
        assert!(matches!(err, TranslateError::Json(_)));
    }

    #[test]
    fn test_sql_lines() {
        let mut t = translator();
        t.feed_str(r#"{"op":"d","ns":"t.x","o":{"_id":"a"}}{"op":"d","ns":"t.x","o":{"_id":"b"}}"#)
            .unwrap();
        assert_eq!(
            t.finish().sql_lines(),
            "DELETE FROM t.x WHERE _id = 'a';\nDELETE FROM t.x WHERE _id = 'b';\n"
        );
    }
}
