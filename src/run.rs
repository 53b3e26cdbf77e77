//! One generation run: config → descriptors → schema → plan → artifact.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Config, LanguageSettings};
use crate::emitter::{MigrationArtifact, MigrationEmitter};
use crate::error::{Error, Result};
use crate::introspect;
use crate::model::ModelDescriptor;
use crate::planner::{MigrationPlan, MigrationPlanner};
use crate::render::Dialect;
use crate::schema::SchemaSnapshot;

/// Inputs of a run. None of them change what gets planned.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Config file; default locations are searched when absent.
    pub config: Option<PathBuf>,
    /// Overrides `database_url` from the config.
    pub database_url: Option<String>,
    /// Plan against a saved snapshot instead of the live database.
    pub schema: Option<PathBuf>,
    /// Write the inspected snapshot here.
    pub save_schema: Option<PathBuf>,
    /// JSON model manifest overriding the config's models.
    pub models: Option<PathBuf>,
    /// Build and return the artifact without writing it.
    pub dry_run: bool,
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every per-language column already exists; nothing was written.
    UpToDate,
    /// Dry run: the artifact that would have been written.
    Preview {
        plan: MigrationPlan,
        artifact: MigrationArtifact,
    },
    Written {
        plan: MigrationPlan,
        artifact: MigrationArtifact,
    },
}

/// Execute a full run.
pub async fn run(options: &RunOptions) -> Result<Outcome> {
    let config = Config::load(options.config.as_deref())?;
    let settings = config.language_settings()?;
    let destination = config.destination()?;
    let models = config.model_descriptors(options.models.as_deref())?;
    info!(
        models = models.len(),
        languages = settings.languages.len(),
        source = %settings.source_language,
        "configuration loaded"
    );

    let url = options
        .database_url
        .clone()
        .or_else(|| config.database_url.clone());

    let dialect = resolve_dialect(config.dialect, url.as_deref())?;

    let snapshot = if models.iter().all(ModelDescriptor::is_empty) {
        warn!("no model declares translatable attributes");
        SchemaSnapshot::new()
    } else if let Some(path) = &options.schema {
        debug!(path = %path.display(), "loading schema snapshot");
        SchemaSnapshot::load(path)?
    } else {
        let url = url.as_deref().ok_or(Error::MissingDatabaseUrl)?;
        introspect::introspect(url, &tables(&models)).await?
    };

    if let Some(path) = &options.save_schema {
        snapshot.save(path)?;
        info!(path = %path.display(), "schema snapshot saved");
    }

    let plan = plan_checked(&snapshot, &settings, &models)?;
    let emitter = MigrationEmitter::new(destination, dialect);
    let (up, down) = (plan.up(), plan.down());

    let result = if options.dry_run {
        emitter
            .prepare_at(&up, &down, Utc::now())
            .map(|artifact| Outcome::Preview { plan, artifact })
    } else {
        emitter
            .emit(&up, &down)
            .map(|artifact| Outcome::Written { plan, artifact })
    };

    match result {
        Err(Error::EmptyPlan) => Ok(Outcome::UpToDate),
        other => other,
    }
}

/// The configured dialect, else the one named by the url scheme, else MySQL.
///
/// A configured dialect must agree with the url: the script is meant for the
/// database that was inspected.
fn resolve_dialect(configured: Option<Dialect>, url: Option<&str>) -> Result<Dialect> {
    match (configured, url) {
        (Some(dialect), Some(url)) => {
            let from_url = Dialect::from_url(url)?;
            if from_url != dialect {
                return Err(Error::DialectMismatch {
                    configured: dialect.to_string(),
                    url: url.split("://").next().unwrap_or_default().to_string(),
                });
            }
            Ok(dialect)
        }
        (Some(dialect), None) => Ok(dialect),
        (None, Some(url)) => Dialect::from_url(url),
        (None, None) => Ok(Dialect::default()),
    }
}

/// Distinct tables of `models`, first occurrence first.
fn tables(models: &[ModelDescriptor]) -> Vec<&str> {
    let mut tables: Vec<&str> = Vec::new();
    for model in models.iter().filter(|m| !m.is_empty()) {
        if !tables.contains(&model.table()) {
            tables.push(model.table());
        }
    }
    tables
}

/// Plan against `snapshot` and verify the plan before anything is written.
///
/// The plan must apply cleanly, leave nothing to do when planned again, and
/// `down` must bring the snapshot back to exactly where it started.
pub fn plan_checked(
    snapshot: &SchemaSnapshot,
    settings: &LanguageSettings,
    models: &[ModelDescriptor],
) -> Result<MigrationPlan> {
    let planner = MigrationPlanner::new(snapshot, &settings.languages, &settings.source_language);
    let plan = planner.plan(models)?;
    if plan.is_empty() {
        return Ok(plan);
    }

    let mut migrated = snapshot.clone();
    migrated
        .apply_all(&plan.up())
        .map_err(|e| Error::RollbackCheck(format!("up does not apply: {}", e)))?;

    let again = MigrationPlanner::new(&migrated, &settings.languages, &settings.source_language)
        .plan(models)?;
    if !again.is_empty() {
        return Err(Error::RollbackCheck(format!(
            "plan is not idempotent, {} step(s) left after up",
            again.steps.len()
        )));
    }

    let mut restored = migrated;
    restored
        .apply_all(&plan.down())
        .map_err(|e| Error::RollbackCheck(format!("down does not apply: {}", e)))?;
    if &restored != snapshot {
        return Err(Error::RollbackCheck(
            "down does not restore the original schema".to_string(),
        ));
    }

    debug!(steps = plan.steps.len(), "plan verified");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_deduplicated_in_order() {
        let models = vec![
            ModelDescriptor::new("post", ["title"]).unwrap(),
            ModelDescriptor::new("tag", Vec::<String>::new()).unwrap(),
            ModelDescriptor::new("page", ["heading"]).unwrap(),
            ModelDescriptor::new("post", ["body"]).unwrap(),
        ];
        assert_eq!(tables(&models), vec!["post", "page"]);
    }

    #[test]
    fn test_resolve_dialect() {
        assert_eq!(resolve_dialect(None, None).unwrap(), Dialect::MySql);
        assert_eq!(
            resolve_dialect(None, Some("postgres://localhost/app")).unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            resolve_dialect(Some(Dialect::Postgres), Some("postgresql://localhost/app")).unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            resolve_dialect(Some(Dialect::MySql), Some("mariadb://root@localhost/app")).unwrap(),
            Dialect::MySql
        );
    }

    #[test]
    fn test_configured_dialect_must_match_url() {
        let err = resolve_dialect(Some(Dialect::Postgres), Some("mysql://root:secret@db/app"))
            .unwrap_err();
        match err {
            Error::DialectMismatch { configured, url } => {
                assert_eq!(configured, "postgres");
                assert_eq!(url, "mysql");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
