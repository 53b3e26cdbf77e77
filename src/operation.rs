//! Structured schema operations.
//!
//! The planner only ever produces these values; turning them into SQL text is
//! the job of [`crate::render`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddColumn {
        table: String,
        name: String,
        db_type: String,
        nullable: bool,
    },
    DropColumn {
        table: String,
        name: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    AddForeignKey {
        constraint_name: String,
        table: String,
        column: String,
        ref_table: String,
        ref_column: String,
        on_delete: String,
        on_update: String,
    },
    DropForeignKey {
        constraint_name: String,
        table: String,
    },
}

impl Operation {
    /// Table the operation alters.
    pub fn table(&self) -> &str {
        match self {
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::RenameColumn { table, .. }
            | Operation::AddForeignKey { table, .. }
            | Operation::DropForeignKey { table, .. } => table,
        }
    }

    /// Short verb used in progress output.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::AddColumn { .. } => "ADD COLUMN",
            Operation::DropColumn { .. } => "DROP COLUMN",
            Operation::RenameColumn { .. } => "RENAME COLUMN",
            Operation::AddForeignKey { .. } => "ADD FOREIGN KEY",
            Operation::DropForeignKey { .. } => "DROP FOREIGN KEY",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddColumn {
                table,
                name,
                db_type,
                nullable,
            } => {
                let null = if *nullable { "null" } else { "not null" };
                write!(f, "add {}.{} {} {}", table, name, db_type, null)
            }
            Operation::DropColumn { table, name } => write!(f, "drop {}.{}", table, name),
            Operation::RenameColumn { table, from, to } => {
                write!(f, "rename {}.{} -> {}", table, from, to)
            }
            Operation::AddForeignKey {
                constraint_name,
                table,
                column,
                ref_table,
                ref_column,
                ..
            } => write!(
                f,
                "add fk {} on {}.{} -> {}.{}",
                constraint_name, table, column, ref_table, ref_column
            ),
            Operation::DropForeignKey {
                constraint_name,
                table,
            } => write!(f, "drop fk {} on {}", constraint_name, table),
        }
    }
}
