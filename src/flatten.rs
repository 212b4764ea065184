//! Nested-document flattening.
//!
//! Object- and array-valued fields of an inserted document become child
//! tables named `<table>_<field>`. Every child row gets a surrogate id and a
//! `<table>_id` foreign key holding the parent's identity value:
//!
//! ```text
//! test.student {_id: "s1", address: [{line1: "..."}, {line1: "..."}]}
//!
//! CREATE TABLE test.student_address (_id ..., line1 ..., student_id ...);
//! INSERT INTO test.student_address (_id, student_id, line1) VALUES ('<id>', 's1', '...');
//! INSERT INTO test.student_address (_id, student_id, line1) VALUES ('<id>', 's1', '...');
//! ```
//!
//! Flattening recurses, so a nested field of a child row becomes a grandchild
//! table keyed by the child's surrogate id.

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::ast::{ColumnDef, Statement, TableRef, Value};
use crate::config::TranslatorConfig;
use crate::error::{TranslateError, TranslateResult};
use crate::schema::SchemaTracker;
use crate::value::{infer_column, is_nested, literal, sorted_fields};

/// Column holding scalar array elements.
pub const SCALAR_COLUMN: &str = "value";

/// Source of surrogate ids for child rows.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Random UUIDv4 ids in their 32-hex-digit simple form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Emits child-table DDL and DML for the nested fields of one document.
pub struct Flattener<'a> {
    pub config: &'a TranslatorConfig,
    pub schema: &'a mut SchemaTracker,
    pub ids: &'a mut dyn IdGenerator,
}

impl Flattener<'_> {
    /// Flatten every nested field of `doc`, whose row in `parent` is
    /// identified by `parent_id`. Fields are visited in key order.
    pub fn flatten(
        &mut self,
        parent: &TableRef,
        parent_id: &Value,
        doc: &Map<String, JsonValue>,
        out: &mut Vec<Statement>,
    ) -> TranslateResult<()> {
        for (field, value) in sorted_fields(doc).into_iter().filter(|(_, v)| is_nested(v)) {
            let child = parent.child(field);
            let rows = child_rows(&child, value);
            self.flatten_field(parent, &child, parent_id, &rows, out)?;
        }
        Ok(())
    }

    fn flatten_field(
        &mut self,
        parent: &TableRef,
        child: &TableRef,
        parent_id: &Value,
        rows: &[Map<String, JsonValue>],
        out: &mut Vec<Statement>,
    ) -> TranslateResult<()> {
        let fk = parent.foreign_key();
        // Only a table about to be created needs a representative row.
        if !self.schema.is_created(child) {
            let has_data = rows.first().is_some_and(|first| !self.data_columns(first, &fk).is_empty());
            if !has_data {
                return Err(TranslateError::NoColumnsToCreate(child.to_string()));
            }
        }

        let id_field = self.config.identity_field.clone();
        let key_columns = vec![
            ColumnDef::new(id_field.as_str(), self.config.text_type.as_str()).primary_key(),
            ColumnDef::new(fk.as_str(), self.config.text_type.as_str()),
        ];
        let parent_key = foreign_key_value(parent_id);

        for row in rows {
            let data = self.data_columns(row, &fk);
            let mut columns = key_columns.clone();
            columns.extend(data.iter().map(|(col, _)| col.clone()));
            out.extend(self.schema.observe(child, columns)?);

            let row_id = match row.get(&id_field) {
                Some(JsonValue::String(id)) => id.clone(),
                _ => self.ids.next_id(),
            };
            let mut keys = vec![id_field.clone(), fk.clone()];
            let mut values = vec![Value::String(row_id.clone()), parent_key.clone()];
            for (col, value) in data {
                keys.push(col.name);
                values.push(value);
            }
            out.push(Statement::insert(child.clone(), keys, values)?);

            self.flatten(child, &Value::String(row_id), row, out)?;
        }
        Ok(())
    }

    /// Typed scalar columns of a child row, excluding the key columns.
    fn data_columns(&self, row: &Map<String, JsonValue>, fk: &str) -> Vec<(ColumnDef, Value)> {
        sorted_fields(row)
            .into_iter()
            .filter(|(name, _)| name.as_str() != self.config.identity_field && name.as_str() != fk)
            .filter_map(|(name, value)| {
                let col = infer_column(name, value, self.config)?;
                let lit = literal(value)?;
                Some((col, lit))
            })
            .collect()
    }
}

/// Foreign keys are text columns, so non-string parent ids are stored as
/// their literal text: `5` => `'5'`.
fn foreign_key_value(parent_id: &Value) -> Value {
    match parent_id {
        Value::String(_) => parent_id.clone(),
        other => Value::String(other.to_string()),
    }
}

/// Rows of a nested field: the object itself, or each array element.
/// Scalar elements are wrapped as `{"value": elem}`.
fn child_rows(child: &TableRef, value: &JsonValue) -> Vec<Map<String, JsonValue>> {
    match value {
        JsonValue::Object(obj) => vec![obj.clone()],
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::Object(obj) => Some(obj.clone()),
                JsonValue::Null => None,
                JsonValue::Array(_) => {
                    warn!(table = %child, "skipping nested array element");
                    None
                }
                scalar => {
                    let mut row = Map::new();
                    row.insert(SCALAR_COLUMN.to_string(), scalar.clone());
                    Some(row)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
