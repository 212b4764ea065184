//! Incremental relational schema derived from the documents seen so far.
//!
//! Each table starts `Pending` and becomes `Created` once its CREATE TABLE
//! has been emitted. After that the column set only grows: unseen fields
//! produce `ALTER TABLE ... ADD` and the first-seen type of a column is
//! never revised.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::{ColumnDef, Statement, TableRef};
use crate::error::{TranslateError, TranslateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    #[default]
    Pending,
    Created,
}

/// Known columns of one table.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub state: TableState,
    pub columns: BTreeMap<String, ColumnDef>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }
}

/// Schema state for one translation run.
#[derive(Debug, Clone, Default)]
pub struct SchemaTracker {
    tables: HashMap<TableRef, TableSchema>,
    schemas: HashSet<String>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, table: &TableRef) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    pub fn is_created(&self, table: &TableRef) -> bool {
        self.tables
            .get(table)
            .is_some_and(|t| t.state == TableState::Created)
    }

    /// Reconcile `columns` against the known schema of `table` and return
    /// the DDL needed before a row with these columns can be inserted.
    ///
    /// First call for a table: `CREATE SCHEMA` (once per schema) and
    /// `CREATE TABLE` with every column. Later calls: one `ALTER TABLE ADD`
    /// per unseen column, in the order given.
    pub fn observe(&mut self, table: &TableRef, columns: Vec<ColumnDef>) -> TranslateResult<Vec<Statement>> {
        let mut ddl = Vec::new();
        let entry = self.tables.entry(table.clone()).or_default();

        match entry.state {
            TableState::Pending => {
                if columns.is_empty() {
                    return Err(TranslateError::NoColumnsToCreate(table.to_string()));
                }
                for col in columns {
                    entry.columns.entry(col.name.clone()).or_insert(col);
                }
                entry.state = TableState::Created;

                if self.schemas.insert(table.schema.clone()) {
                    ddl.push(Statement::CreateSchema {
                        name: table.schema.clone(),
                    });
                }
                ddl.push(Statement::CreateTable {
                    table: table.clone(),
                    columns: entry.columns.values().cloned().collect(),
                });
            }
            TableState::Created => {
                for col in columns {
                    if entry.columns.contains_key(&col.name) {
                        continue;
                    }
                    entry.columns.insert(col.name.clone(), col.clone());
                    ddl.push(Statement::AlterTableAdd {
                        table: table.clone(),
                        column: col,
                    });
                }
            }
        }

        Ok(ddl)
    }
}
