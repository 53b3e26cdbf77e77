//! Migration planning.
//!
//! For every model, language and translatable attribute the planner decides
//! whether the per-language column `<attribute>_<language>` must be created,
//! and how:
//!
//! - source language, unqualified source column: **rename** it so existing
//!   data moves with it (dropping and re-adding its foreign key around the
//!   rename);
//! - any other language: **add** a column with the source column's type and
//!   nullability, replicating its foreign key under `<constraint>_<language>`.
//!
//! Pairs whose column already exists produce nothing, so planning against a
//! migrated schema yields an empty plan.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::ModelDescriptor;
use crate::operation::Operation;
use crate::schema::{ForeignKeyInfo, SchemaInspector};

/// How a step reaches its target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Rename,
    Add,
}

/// The operations needed for one (model, attribute, language) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub table: String,
    pub attribute: String,
    pub language: String,
    /// Column type, nullability and foreign key were copied from.
    pub source_column: String,
    pub kind: StepKind,
    pub up: Vec<Operation>,
    /// Undoes `up`, already in execution order.
    pub down: Vec<Operation>,
}

/// Ordered result of a planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub steps: Vec<PlanStep>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Forward operations, in planning order.
    pub fn up(&self) -> Vec<Operation> {
        self.steps.iter().flat_map(|s| s.up.iter().cloned()).collect()
    }

    /// Reverse operations: each step's `down`, last step first.
    pub fn down(&self) -> Vec<Operation> {
        self.steps
            .iter()
            .rev()
            .flat_map(|s| s.down.iter().cloned())
            .collect()
    }

    pub fn renames(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Rename).count()
    }

    pub fn additions(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Add).count()
    }
}

/// Plans the per-language column layout against a schema inspector.
pub struct MigrationPlanner<'a, I: SchemaInspector + ?Sized> {
    inspector: &'a I,
    languages: &'a [String],
    source_language: &'a str,
}

impl<'a, I: SchemaInspector + ?Sized> MigrationPlanner<'a, I> {
    pub fn new(inspector: &'a I, languages: &'a [String], source_language: &'a str) -> Self {
        Self {
            inspector,
            languages,
            source_language,
        }
    }

    /// Plan every model in order.
    ///
    /// Any error aborts the whole run: a plan covering only some attributes
    /// would leave the schema half migrated.
    pub fn plan(&self, models: &[ModelDescriptor]) -> Result<MigrationPlan> {
        let mut plan = MigrationPlan::default();
        for model in models {
            debug!(table = model.table(), "planning model");
            for lang in self.languages {
                for attribute in model.attributes() {
                    if let Some(step) = self.plan_attribute(model.table(), attribute, lang)? {
                        plan.steps.push(step);
                    }
                }
            }
        }
        Ok(plan)
    }

    fn plan_attribute(&self, table: &str, attribute: &str, lang: &str) -> Result<Option<PlanStep>> {
        let qualified = qualify(attribute, lang);
        if self.inspector.column_exists(table, &qualified)? {
            debug!(table, column = %qualified, "already present");
            return Ok(None);
        }

        let source = self.resolve_source(table, attribute)?;
        let info = self.inspector.column_info(table, &source)?;
        let fk = self.inspector.outgoing_foreign_key(table, &source)?;
        if let Some(fk) = &fk
            && fk.composite
        {
            return Err(Error::CompositeForeignKey {
                table: table.to_string(),
                column: source,
                constraint: fk.constraint_name.clone(),
            });
        }
        if let Some(fk) = &fk
            && !fk.other_constraints.is_empty()
        {
            let mut constraints = vec![fk.constraint_name.clone()];
            constraints.extend(fk.other_constraints.iter().cloned());
            return Err(Error::MultipleForeignKeys {
                table: table.to_string(),
                column: source,
                constraints,
            });
        }

        let (kind, up, down) = if lang == self.source_language && source == attribute {
            debug!(table, from = %source, to = %qualified, "rename");
            let (up, down) = rename_ops(table, &source, &qualified, fk.as_ref());
            (StepKind::Rename, up, down)
        } else {
            debug!(table, column = %qualified, source = %source, "add");
            let mut up = vec![Operation::AddColumn {
                table: table.to_string(),
                name: qualified.clone(),
                db_type: info.db_type.clone(),
                nullable: info.allow_null,
            }];
            if let Some(fk) = &fk {
                up.push(add_fk(
                    &qualify(&fk.constraint_name, lang),
                    table,
                    &qualified,
                    fk,
                ));
            }
            // Dropping the column takes its foreign key with it.
            let down = vec![Operation::DropColumn {
                table: table.to_string(),
                name: qualified.clone(),
            }];
            (StepKind::Add, up, down)
        };

        Ok(Some(PlanStep {
            table: table.to_string(),
            attribute: attribute.to_string(),
            language: lang.to_string(),
            source_column: source,
            kind,
            up,
            down,
        }))
    }

    /// The unqualified column wins over the source-language column.
    fn resolve_source(&self, table: &str, attribute: &str) -> Result<String> {
        if self.inspector.column_exists(table, attribute)? {
            return Ok(attribute.to_string());
        }
        let qualified = qualify(attribute, self.source_language);
        if self.inspector.column_exists(table, &qualified)? {
            return Ok(qualified);
        }
        Err(Error::NoSourceColumn {
            table: table.to_string(),
            attribute: attribute.to_string(),
            qualified,
        })
    }
}

/// `<name>_<language>`
pub fn qualify(name: &str, lang: &str) -> String {
    format!("{}_{}", name, lang)
}

fn add_fk(constraint_name: &str, table: &str, column: &str, fk: &ForeignKeyInfo) -> Operation {
    Operation::AddForeignKey {
        constraint_name: constraint_name.to_string(),
        table: table.to_string(),
        column: column.to_string(),
        ref_table: fk.referenced_table.clone(),
        ref_column: fk.referenced_column.clone(),
        on_delete: fk.on_delete.clone(),
        on_update: fk.on_update.clone(),
    }
}

fn rename_ops(
    table: &str,
    from: &str,
    to: &str,
    fk: Option<&ForeignKeyInfo>,
) -> (Vec<Operation>, Vec<Operation>) {
    let rename = |from: &str, to: &str| Operation::RenameColumn {
        table: table.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    };

    let Some(fk) = fk else {
        return (vec![rename(from, to)], vec![rename(to, from)]);
    };

    let drop_fk = Operation::DropForeignKey {
        constraint_name: fk.constraint_name.clone(),
        table: table.to_string(),
    };
    let up = vec![
        drop_fk.clone(),
        rename(from, to),
        add_fk(&fk.constraint_name, table, to, fk),
    ];
    let down = vec![
        drop_fk,
        rename(to, from),
        add_fk(&fk.constraint_name, table, from, fk),
    ];
    (up, down)
}
