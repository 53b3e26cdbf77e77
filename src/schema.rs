//! Schema metadata: column and foreign key snapshots plus the inspector seam.
//!
//! A [`SchemaSnapshot`] is a point-in-time copy of the columns of the tables a
//! run cares about. It is either pulled from a live database by
//! [`crate::introspect`] or loaded from a JSON file:
//!
//! ```json
//! {
//!   "tables": [{
//!     "name": "post",
//!     "columns": [
//!       { "name": "id", "db_type": "int(11)", "allow_null": false },
//!       { "name": "title", "db_type": "varchar(255)", "allow_null": false,
//!         "foreign_key": {
//!           "constraint_name": "fk_title",
//!           "referenced_table": "dictionary",
//!           "referenced_column": "id",
//!           "on_delete": "CASCADE",
//!           "on_update": "RESTRICT"
//!         } }
//!     ]
//!   }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::operation::Operation;

/// Read-only access to column and foreign key metadata.
pub trait SchemaInspector {
    /// Whether `table.column` physically exists.
    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Metadata for `table.column`; [`Error::NotFound`] when it does not exist.
    fn column_info(&self, table: &str, column: &str) -> Result<ColumnInfo>;

    /// The outgoing foreign key on `table.column`, if any. Absence is not an error.
    fn outgoing_foreign_key(&self, table: &str, column: &str) -> Result<Option<ForeignKeyInfo>>;
}

/// Outgoing foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: String,
    pub on_update: String,
    /// The constraint spans more than one column.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub composite: bool,
    /// Further constraints declared on the same column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_constraints: Vec<String>,
}

/// A single physical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub db_type: String,
    pub allow_null: bool,
    #[serde(
        default,
        alias = "outgoing_foreign_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub foreign_key: Option<ForeignKeyInfo>,
}

/// Columns of one table, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Point-in-time copy of the tables a run inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSchema>,
}

impl ForeignKeyInfo {
    pub fn new(
        constraint_name: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_delete: "RESTRICT".to_string(),
            on_update: "RESTRICT".to_string(),
            composite: false,
            other_constraints: Vec::new(),
        }
    }

    pub fn on_delete(mut self, rule: impl Into<String>) -> Self {
        self.on_delete = rule.into();
        self
    }

    pub fn on_update(mut self, rule: impl Into<String>) -> Self {
        self.on_update = rule.into();
        self
    }
}

impl ColumnInfo {
    /// A nullable column without foreign key.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            allow_null: true,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn references(mut self, fk: ForeignKeyInfo) -> Self {
        self.foreign_key = Some(fk);
        self
    }
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, col: ColumnInfo) -> Self {
        self.columns.push(col);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn find_column_mut(&mut self, name: &str) -> Option<&mut ColumnInfo> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    fn has_constraint(&self, constraint_name: &str) -> bool {
        self.columns.iter().any(|c| {
            c.foreign_key
                .as_ref()
                .is_some_and(|fk| fk.constraint_name == constraint_name)
        })
    }
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any previous table with the same name.
    pub fn add_table(&mut self, table: TableSchema) {
        self.tables.retain(|t| t.name != table.name);
        self.tables.push(table);
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.add_table(table);
        self
    }

    pub fn find_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn find_table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    fn table(&self, name: &str) -> Result<&TableSchema> {
        self.find_table(name)
            .ok_or_else(|| Error::unavailable(name, "table not present in schema metadata"))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a snapshot previously written with [`SchemaSnapshot::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::unavailable("*", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Apply an operation to the in-memory copy.
    ///
    /// Fails when the operation does not fit the snapshot, e.g. adding a column
    /// that already exists or dropping a constraint nobody carries.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        let table_name = op.table();
        let table = self
            .find_table_mut(table_name)
            .ok_or_else(|| Error::simulation(table_name, "unknown table"))?;

        match op {
            Operation::AddColumn {
                name,
                db_type,
                nullable,
                ..
            } => {
                if table.find_column(name).is_some() {
                    return Err(Error::simulation(
                        table_name,
                        format!("column `{}` already exists", name),
                    ));
                }
                table.columns.push(ColumnInfo {
                    name: name.clone(),
                    db_type: db_type.clone(),
                    allow_null: *nullable,
                    foreign_key: None,
                });
            }
            Operation::DropColumn { name, .. } => {
                let before = table.columns.len();
                table.columns.retain(|c| &c.name != name);
                if table.columns.len() == before {
                    return Err(Error::simulation(
                        table_name,
                        format!("column `{}` does not exist", name),
                    ));
                }
            }
            Operation::RenameColumn { from, to, .. } => {
                if table.find_column(to).is_some() {
                    return Err(Error::simulation(
                        table_name,
                        format!("column `{}` already exists", to),
                    ));
                }
                let col = table.find_column_mut(from).ok_or_else(|| {
                    Error::simulation(table_name, format!("column `{}` does not exist", from))
                })?;
                if let Some(fk) = &col.foreign_key {
                    return Err(Error::simulation(
                        table_name,
                        format!(
                            "column `{}` still carries foreign key `{}`",
                            from, fk.constraint_name
                        ),
                    ));
                }
                col.name = to.clone();
            }
            Operation::AddForeignKey {
                constraint_name,
                column,
                ref_table,
                ref_column,
                on_delete,
                on_update,
                ..
            } => {
                if table.has_constraint(constraint_name) {
                    return Err(Error::simulation(
                        table_name,
                        format!("constraint `{}` already exists", constraint_name),
                    ));
                }
                let col = table.find_column_mut(column).ok_or_else(|| {
                    Error::simulation(table_name, format!("column `{}` does not exist", column))
                })?;
                if col.foreign_key.is_some() {
                    return Err(Error::simulation(
                        table_name,
                        format!("column `{}` already has a foreign key", column),
                    ));
                }
                col.foreign_key = Some(ForeignKeyInfo {
                    constraint_name: constraint_name.clone(),
                    referenced_table: ref_table.clone(),
                    referenced_column: ref_column.clone(),
                    on_delete: on_delete.clone(),
                    on_update: on_update.clone(),
                    composite: false,
                    other_constraints: Vec::new(),
                });
            }
            Operation::DropForeignKey {
                constraint_name, ..
            } => {
                let col = table
                    .columns
                    .iter_mut()
                    .find(|c| {
                        c.foreign_key
                            .as_ref()
                            .is_some_and(|fk| &fk.constraint_name == constraint_name)
                    })
                    .ok_or_else(|| {
                        Error::simulation(
                            table_name,
                            format!("constraint `{}` does not exist", constraint_name),
                        )
                    })?;
                col.foreign_key = None;
            }
        }
        Ok(())
    }

    /// Apply a sequence of operations in order, stopping at the first failure.
    pub fn apply_all<'a, I>(&mut self, ops: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Operation>,
    {
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }
}

impl SchemaInspector for SchemaSnapshot {
    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.table(table)?.find_column(column).is_some())
    }

    fn column_info(&self, table: &str, column: &str) -> Result<ColumnInfo> {
        self.table(table)?
            .find_column(column)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn outgoing_foreign_key(&self, table: &str, column: &str) -> Result<Option<ForeignKeyInfo>> {
        Ok(self
            .table(table)?
            .find_column(column)
            .and_then(|c| c.foreign_key.clone()))
    }
}
