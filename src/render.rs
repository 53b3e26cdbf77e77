//! Operation to SQL rendering.
//!
//! This is the only place literal DDL is produced. Column types and
//! referential rules are written exactly as they were captured from the
//! schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::operation::Operation;

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl Dialect {
    /// Pick the dialect from a database url scheme.
    pub fn from_url(url: &str) -> Result<Self, Error> {
        let scheme = url.split("://").next().unwrap_or_default();
        scheme.parse()
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

/// Render one operation as a `;`-terminated statement.
pub fn render_operation(op: &Operation, dialect: Dialect) -> String {
    let q = |ident: &str| dialect.quote(ident);
    match op {
        Operation::AddColumn {
            table,
            name,
            db_type,
            nullable,
        } => format!(
            "ALTER TABLE {} ADD COLUMN {} {} {};",
            q(table),
            q(name),
            db_type,
            if *nullable { "NULL" } else { "NOT NULL" }
        ),
        Operation::DropColumn { table, name } => {
            format!("ALTER TABLE {} DROP COLUMN {};", q(table), q(name))
        }
        Operation::RenameColumn { table, from, to } => format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            q(table),
            q(from),
            q(to)
        ),
        Operation::AddForeignKey {
            constraint_name,
            table,
            column,
            ref_table,
            ref_column,
            on_delete,
            on_update,
        } => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {};",
            q(table),
            q(constraint_name),
            q(column),
            q(ref_table),
            q(ref_column),
            on_delete,
            on_update
        ),
        Operation::DropForeignKey {
            constraint_name,
            table,
        } => {
            let clause = match dialect {
                Dialect::MySql => "DROP FOREIGN KEY",
                Dialect::Postgres => "DROP CONSTRAINT",
            };
            format!("ALTER TABLE {} {} {};", q(table), clause, q(constraint_name))
        }
    }
}

/// Render a list of operations, one statement per line.
pub fn render_operations(ops: &[Operation], dialect: Dialect) -> String {
    ops.iter()
        .map(|op| render_operation(op, dialect))
        .collect::<Vec<_>>()
        .join("\n")
}
