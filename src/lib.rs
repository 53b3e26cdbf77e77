//! Reversible migrations for per-language ("i18n") columns.
//!
//! Every translatable attribute `title` of a model is stored as one column
//! per configured language (`title_en`, `title_fr`, ...). This crate inspects
//! the current schema, plans the operations that reach that layout, and
//! writes them as a single up/down SQL migration.
//!
//! ```no_run
//! use i18n_columns::prelude::*;
//!
//! let schema = SchemaSnapshot::new().with_table(
//!     TableSchema::new("post").column(ColumnInfo::new("title", "varchar(255)").not_null()),
//! );
//! let languages = vec!["en".to_string(), "fr".to_string()];
//! let models = vec![ModelDescriptor::new("post", ["title"])?];
//!
//! let plan = MigrationPlanner::new(&schema, &languages, "en").plan(&models)?;
//! let artifact = MigrationEmitter::new("migrations", Dialect::MySql).emit(&plan.up(), &plan.down())?;
//! println!("{}", artifact.summary());
//! # Ok::<(), i18n_columns::Error>(())
//! ```

pub mod accessor;
pub mod config;
pub mod emitter;
pub mod error;
pub mod introspect;
pub mod model;
pub mod operation;
pub mod planner;
pub mod render;
pub mod run;
pub mod schema;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::emitter::{MigrationArtifact, MigrationEmitter};
    pub use crate::error::{Error, Result};
    pub use crate::model::ModelDescriptor;
    pub use crate::operation::Operation;
    pub use crate::planner::{MigrationPlan, MigrationPlanner, PlanStep, StepKind};
    pub use crate::render::Dialect;
    pub use crate::schema::{
        ColumnInfo, ForeignKeyInfo, SchemaInspector, SchemaSnapshot, TableSchema,
    };
}
