//! # oplog2sql
//!
//! Translates MongoDB oplog entries into SQL against a relational schema
//! inferred as documents arrive.
//!
//! ## Quick Example
//!
//! ```
//! let sql = oplog2sql::translate(
//!     r#"{"op": "i", "ns": "test.student", "o": {"_id": "abc", "roll_no": 51}}"#,
//! )
//! .unwrap();
//! assert_eq!(
//!     sql,
//!     "CREATE SCHEMA test;\
//!      CREATE TABLE test.student (_id VARCHAR(255) PRIMARY KEY, roll_no FLOAT);\
//!      INSERT INTO test.student (_id, roll_no) VALUES ('abc', 51);"
//! );
//! ```
//!
//! ## Mapping
//!
//! | Oplog            | SQL                                              |
//! |------------------|--------------------------------------------------|
//! | first `i`        | `CREATE SCHEMA`, `CREATE TABLE`, `INSERT`        |
//! | `i`, new field   | `ALTER TABLE ... ADD`, `INSERT`                  |
//! | `i`, nested field| `CREATE TABLE <table>_<field>`, child `INSERT`s  |
//! | `u`              | `UPDATE ... SET ... WHERE ...`                   |
//! | `d`              | `DELETE FROM ... WHERE ...`                      |

pub mod ast;
pub mod config;
pub mod error;
pub mod flatten;
pub mod oplog;
pub mod schema;
pub mod translator;
pub mod transpiler;
pub mod value;

pub use translator::{translate, Translation, Translator};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{ErrorPolicy, TranslatorConfig};
    pub use crate::error::*;
    pub use crate::flatten::{IdGenerator, UuidGenerator};
    pub use crate::oplog::{Operation, OplogEntry};
    pub use crate::schema::{SchemaTracker, TableState};
    pub use crate::translator::{translate, EntryError, Translation, Translator};
    pub use crate::transpiler::ToSql;
}
