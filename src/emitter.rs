//! Migration artifact emission.
//!
//! An artifact is a single SQL file named after its UTC generation time:
//!
//! ```sql
//! -- Migration: m261019_142501_i18n
//! -- Generated: 2026-10-19T14:25:01+00:00
//!
//! -- migrate:up
//! ALTER TABLE `post` RENAME COLUMN `title` TO `title_en`;
//!
//! -- migrate:down
//! ALTER TABLE `post` RENAME COLUMN `title_en` TO `title`;
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::render::{Dialect, render_operations};

/// Fixed topic suffix of every generated migration name.
pub const TOPIC: &str = "i18n";

/// File extension of generated migrations.
pub const EXTENSION: &str = "sql";

/// A rendered, named migration.
#[derive(Debug, Clone)]
pub struct MigrationArtifact {
    pub name: String,
    pub path: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub dialect: Dialect,
    pub up: Vec<Operation>,
    pub down: Vec<Operation>,
}

impl MigrationArtifact {
    /// The full script text.
    pub fn render(&self) -> String {
        format!(
            "-- Migration: {}\n-- Generated: {}\n\n-- migrate:up\n{}\n\n-- migrate:down\n{}\n",
            self.name,
            self.generated_at.to_rfc3339(),
            render_operations(&self.up, self.dialect),
            render_operations(&self.down, self.dialect),
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} up / {} down operation(s) written to {}",
            self.name,
            self.dialect,
            self.up.len(),
            self.down.len(),
            self.path.display()
        )
    }
}

/// `m<yymmdd>_<HHMMSS>_i18n`, sorting by creation time.
pub fn migration_name(at: DateTime<Utc>) -> String {
    format!("m{}_{}", at.format("%y%m%d_%H%M%S"), TOPIC)
}

/// Writes migration artifacts into an existing directory.
pub struct MigrationEmitter {
    destination: PathBuf,
    dialect: Dialect,
}

impl MigrationEmitter {
    pub fn new(destination: impl Into<PathBuf>, dialect: Dialect) -> Self {
        Self {
            destination: destination.into(),
            dialect,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Build the artifact for `up`/`down` without touching the filesystem.
    pub fn prepare_at(
        &self,
        up: &[Operation],
        down: &[Operation],
        at: DateTime<Utc>,
    ) -> Result<MigrationArtifact> {
        if up.is_empty() && down.is_empty() {
            return Err(Error::EmptyPlan);
        }
        let name = migration_name(at);
        let path = self.destination.join(format!("{}.{}", name, EXTENSION));
        Ok(MigrationArtifact {
            name,
            path,
            generated_at: at,
            dialect: self.dialect,
            up: up.to_vec(),
            down: down.to_vec(),
        })
    }

    /// Render and write a migration stamped with the current time.
    pub fn emit(&self, up: &[Operation], down: &[Operation]) -> Result<MigrationArtifact> {
        self.emit_at(up, down, Utc::now())
    }

    /// Render and write a migration stamped with `at`.
    ///
    /// The destination directory must already exist and an existing file is
    /// never overwritten. The script is staged in a temporary file next to the
    /// target, so a failed write leaves nothing behind.
    pub fn emit_at(
        &self,
        up: &[Operation],
        down: &[Operation],
        at: DateTime<Utc>,
    ) -> Result<MigrationArtifact> {
        let artifact = self.prepare_at(up, down, at)?;
        if !self.destination.is_dir() {
            return Err(Error::DestinationMissing(self.destination.clone()));
        }

        let script = artifact.render();
        write_new(&self.destination, &artifact.path, |file| {
            file.write_all(script.as_bytes())
        })
        .map_err(|source| Error::Write {
            path: artifact.path.clone(),
            source,
        })?;

        info!(path = %artifact.path.display(), "migration written");
        Ok(artifact)
    }
}

/// Create `path` with the content produced by `fill`, all or nothing.
///
/// Fails with `AlreadyExists` if `path` exists. The staging file is removed
/// on every error path.
fn write_new<F>(dir: &Path, path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    let mut staged = tempfile::Builder::new()
        .prefix(".i18n-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    fill(&mut staged)?;
    staged.as_file().sync_all()?;
    staged.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}
