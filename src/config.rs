//! Configuration file loading.
//!
//! ```toml
//! languages = ["en", "fr", "de"]
//! source_language = "en"
//! migrations_dir = "migrations"
//! database_url = "mysql://app@localhost/app"
//!
//! [[models]]
//! table = "post"
//! attributes = ["title", "body"]
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{self, ModelDescriptor, RawDescriptor};
use crate::render::Dialect;

/// Config file looked up in the working directory.
pub const DEFAULT_FILE: &str = "i18n-columns.toml";

/// Raw configuration as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default)]
    pub models_file: Option<PathBuf>,
    #[serde(default)]
    pub models: Vec<RawDescriptor>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Validated language configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSettings {
    pub languages: Vec<String>,
    pub source_language: String,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

/// Candidate config locations, most specific first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(DEFAULT_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("i18n-columns").join("config.toml"));
    }
    paths
}

impl Config {
    /// Load `explicit` if given, otherwise the first existing default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => return Err(Error::ConfigNotFound(path.to_path_buf())),
            None => search_paths()
                .into_iter()
                .find(|p| p.is_file())
                .ok_or_else(|| Error::ConfigNotFound(PathBuf::from(DEFAULT_FILE)))?,
        };
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, &path)
    }

    /// Parse config text that was read from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Validate languages and the source language.
    pub fn language_settings(&self) -> Result<LanguageSettings> {
        if self.languages.is_empty() || self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(Error::MissingLanguages);
        }
        let source_language = match &self.source_language {
            Some(lang) if !lang.trim().is_empty() => lang.clone(),
            _ => return Err(Error::MissingSourceLanguage),
        };

        let mut seen = std::collections::HashSet::new();
        for lang in &self.languages {
            if !seen.insert(lang.as_str()) {
                return Err(Error::DuplicateLanguage(lang.clone()));
            }
        }
        if !seen.contains(source_language.as_str()) {
            warn!(
                source = %source_language,
                "source language is not among the configured languages; unqualified columns will never be renamed"
            );
        }

        Ok(LanguageSettings {
            languages: self.languages.clone(),
            source_language,
        })
    }

    /// The migration directory, which must already exist.
    pub fn destination(&self) -> Result<PathBuf> {
        let dir = self.resolve(&self.migrations_dir);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::DestinationMissing(dir))
        }
    }

    /// Descriptors from `manifest` (if given), else `models_file`, else `[[models]]`.
    pub fn model_descriptors(&self, manifest: Option<&Path>) -> Result<Vec<ModelDescriptor>> {
        if let Some(path) = manifest {
            return model::load_manifest(path);
        }
        if let Some(path) = &self.models_file {
            return model::load_manifest(&self.resolve(path));
        }
        model::from_raw(self.models.clone())
    }
}
