//! Statement AST produced by the translator.
//!
//! Every oplog entry becomes zero or more [`Statement`]s. Rendering to SQL
//! text lives in [`crate::transpiler`].

use std::fmt;

use crate::error::{TranslateError, TranslateResult};

/// A `<schema>.<table>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// The child table that holds the flattened contents of `field`.
    ///
    /// `test.student` + `address` => `test.student_address`
    pub fn child(&self, field: &str) -> Self {
        Self {
            schema: self.schema.clone(),
            table: format!("{}_{}", self.table, field),
        }
    }

    /// Name of the foreign-key column a child table uses to point back here.
    pub fn foreign_key(&self) -> String {
        format!("{}_id", self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A column definition as it appears in CREATE/ALTER TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// A SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer beyond `i64::MAX`
    UInt(u64),
    /// Float
    Float(f64),
    /// String
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            // f64 Display is shortest round-trip and drops a zero fraction: 51.0 => 51
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// `column = value`, used both for SET assignments and WHERE conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// One emitted SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateSchema {
        name: String,
    },
    CreateTable {
        table: TableRef,
        columns: Vec<ColumnDef>,
    },
    AlterTableAdd {
        table: TableRef,
        column: ColumnDef,
    },
    Insert {
        table: TableRef,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Update {
        table: TableRef,
        set: Vec<Assignment>,
        conditions: Vec<Assignment>,
    },
    Delete {
        table: TableRef,
        conditions: Vec<Assignment>,
    },
}

impl Statement {
    /// Build an INSERT, checking that every column has exactly one value.
    pub fn insert(table: TableRef, columns: Vec<String>, values: Vec<Value>) -> TranslateResult<Self> {
        if columns.len() != values.len() {
            return Err(TranslateError::KeyValueMismatch {
                table: table.to_string(),
                keys: columns.len(),
                values: values.len(),
            });
        }
        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    /// Build an UPDATE; both clauses must be non-empty.
    pub fn update(table: TableRef, set: Vec<Assignment>, conditions: Vec<Assignment>) -> TranslateResult<Self> {
        if set.is_empty() {
            return Err(TranslateError::MissingUpdateClause {
                table: table.to_string(),
            });
        }
        if conditions.is_empty() {
            return Err(TranslateError::MissingConditionClause {
                table: table.to_string(),
            });
        }
        Ok(Statement::Update {
            table,
            set,
            conditions,
        })
    }

    /// Build a DELETE; the condition clause must be non-empty.
    pub fn delete(table: TableRef, conditions: Vec<Assignment>) -> TranslateResult<Self> {
        if conditions.is_empty() {
            return Err(TranslateError::MissingConditionClause {
                table: table.to_string(),
            });
        }
        Ok(Statement::Delete { table, conditions })
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::CreateSchema { .. } | Statement::CreateTable { .. } | Statement::AlterTableAdd { .. }
        )
    }
}
