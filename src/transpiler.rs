//! SQL transpiler for the statement AST.
//!
//! Converts [`Statement`]s into semicolon-terminated SQL strings.

use crate::ast::*;

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for Statement {
    fn to_sql(&self) -> String {
        match self {
            Statement::CreateSchema { name } => format!("CREATE SCHEMA {};", name),
            Statement::CreateTable { table, columns } => to_create_table_sql(table, columns),
            Statement::AlterTableAdd { table, column } => {
                format!("ALTER TABLE {} ADD {};", table, column.to_sql())
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => to_insert_sql(table, columns, values),
            Statement::Update {
                table,
                set,
                conditions,
            } => {
                let set: Vec<String> = set.iter().map(|a| a.to_sql()).collect();
                format!(
                    "UPDATE {} SET {} WHERE {};",
                    table,
                    set.join(", "),
                    where_clause(conditions)
                )
            }
            Statement::Delete { table, conditions } => {
                format!("DELETE FROM {} WHERE {};", table, where_clause(conditions))
            }
        }
    }
}

impl ToSql for ColumnDef {
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        sql
    }
}

impl ToSql for Assignment {
    fn to_sql(&self) -> String {
        format!("{} = {}", self.column, self.value)
    }
}

impl ToSql for [Statement] {
    /// Statements are concatenated without separators.
    fn to_sql(&self) -> String {
        self.iter().map(|s| s.to_sql()).collect()
    }
}

/// Generate CREATE TABLE SQL. Columns are sorted by name.
fn to_create_table_sql(table: &TableRef, columns: &[ColumnDef]) -> String {
    let mut defs: Vec<&ColumnDef> = columns.iter().collect();
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    let defs: Vec<String> = defs.iter().map(|c| c.to_sql()).collect();
    format!("CREATE TABLE {} ({});", table, defs.join(", "))
}

/// Generate INSERT SQL.
fn to_insert_sql(table: &TableRef, columns: &[String], values: &[Value]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES;", table);
    }
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        columns.join(", "),
        values.join(", ")
    )
}

/// Conditions are joined with AND; a NULL comparison becomes IS NULL.
fn where_clause(conditions: &[Assignment]) -> String {
    let conds: Vec<String> = conditions
        .iter()
        .map(|c| match c.value {
            Value::Null => format!("{} IS NULL", c.column),
            _ => c.to_sql(),
        })
        .collect();
    conds.join(" AND ")
}
