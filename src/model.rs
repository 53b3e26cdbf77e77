//! Model descriptors: which attributes of which table are translatable.
//!
//! Descriptors are produced by whatever discovers models in the host
//! application. This crate only consumes them, either from the `[[models]]`
//! section of the config file or from a JSON manifest:
//!
//! ```json
//! { "models": [ { "table": "post", "attributes": ["title", "body"] } ] }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A model's backing table and its translatable attributes, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    table: String,
    attributes: Vec<String>,
}

/// Unvalidated descriptor as written in config or manifest files.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    pub table: String,
    #[serde(default, alias = "translatable_attributes")]
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    models: Vec<RawDescriptor>,
}

impl ModelDescriptor {
    /// Build a descriptor, rejecting empty names and duplicate attributes.
    pub fn new<I, S>(table: impl Into<String>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        let invalid = |reason: String| Error::InvalidDescriptor {
            table: table.clone(),
            reason,
        };

        if table.trim().is_empty() {
            return Err(invalid("table name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for attr in attributes {
            let attr = attr.into();
            if attr.trim().is_empty() {
                return Err(invalid("attribute name is empty".to_string()));
            }
            if !seen.insert(attr.clone()) {
                return Err(invalid(format!("attribute `{}` listed twice", attr)));
            }
            ordered.push(attr);
        }

        Ok(Self {
            table,
            attributes: ordered,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl TryFrom<RawDescriptor> for ModelDescriptor {
    type Error = Error;

    fn try_from(raw: RawDescriptor) -> Result<Self> {
        ModelDescriptor::new(raw.table, raw.attributes)
    }
}

/// Validate a list of raw descriptors, keeping their order.
pub fn from_raw(raw: Vec<RawDescriptor>) -> Result<Vec<ModelDescriptor>> {
    raw.into_iter().map(ModelDescriptor::try_from).collect()
}

/// Load descriptors from a JSON manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<ModelDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ModelManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let manifest: Manifest = serde_json::from_str(&content).map_err(|e| Error::ModelManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    from_raw(manifest.models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_keeps_declaration_order() {
        let d = ModelDescriptor::new("post", ["title", "body", "slug"]).unwrap();
        assert_eq!(d.table(), "post");
        assert_eq!(d.attributes(), &["title", "body", "slug"]);
    }

    #[test]
    fn test_descriptor_rejects_duplicates() {
        let err = ModelDescriptor::new("post", ["title", "title"]).unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor { .. }));
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_descriptor_rejects_empty_names() {
        assert!(ModelDescriptor::new("", ["title"]).is_err());
        assert!(ModelDescriptor::new("post", [""]).is_err());
    }

    #[test]
    fn test_descriptor_without_attributes() {
        let d = ModelDescriptor::new("tag", Vec::<String>::new()).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(
            &path,
            r#"{"models": [
                {"table": "post", "attributes": ["title"]},
                {"table": "page", "translatable_attributes": ["heading", "body"]}
            ]}"#,
        )
        .unwrap();

        let models = load_manifest(&path).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].table(), "page");
        assert_eq!(models[1].attributes(), &["heading", "body"]);
    }

    #[test]
    fn test_load_manifest_reports_path() {
        let err = load_manifest(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
