//! Unqualified access to per-language columns.
//!
//! Once a table is migrated, application code can keep addressing `title`
//! while the value actually lives in `title_<language>`. [`Translated`] wraps a
//! record and does that resolution explicitly.

use std::collections::HashMap;

use thiserror::Error;

/// A field store a record exposes to [`Translated`].
pub trait AttributeStore {
    type Value;

    fn has_field(&self, name: &str) -> bool;
    fn field(&self, name: &str) -> Option<&Self::Value>;
    fn set_field(&mut self, name: &str, value: Self::Value);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("attribute `{qualified}` does not exist (resolving `{attribute}`)")]
    MissingTranslationColumn { attribute: String, qualified: String },
    #[error("attribute `{0}` does not exist")]
    MissingAttribute(String),
}

/// A record viewed through the active language.
pub struct Translated<'a, S: AttributeStore> {
    store: &'a mut S,
    attributes: &'a [String],
    language: &'a str,
}

impl<'a, S: AttributeStore> Translated<'a, S> {
    pub fn new(store: &'a mut S, attributes: &'a [String], language: &'a str) -> Self {
        Self {
            store,
            attributes,
            language,
        }
    }

    pub fn is_translatable(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    /// The field backing `attribute` for the active language.
    fn resolve(&self, attribute: &str) -> Result<String, AccessError> {
        if !self.is_translatable(attribute) {
            return if self.store.has_field(attribute) {
                Ok(attribute.to_string())
            } else {
                Err(AccessError::MissingAttribute(attribute.to_string()))
            };
        }
        let qualified = crate::planner::qualify(attribute, self.language);
        if self.store.has_field(&qualified) {
            Ok(qualified)
        } else {
            Err(AccessError::MissingTranslationColumn {
                attribute: attribute.to_string(),
                qualified,
            })
        }
    }

    pub fn get(&self, attribute: &str) -> Result<Option<&S::Value>, AccessError> {
        let field = self.resolve(attribute)?;
        Ok(self.store.field(&field))
    }

    pub fn set(&mut self, attribute: &str, value: S::Value) -> Result<(), AccessError> {
        let field = self.resolve(attribute)?;
        self.store.set_field(&field, value);
        Ok(())
    }
}

impl AttributeStore for serde_json::Map<String, serde_json::Value> {
    type Value = serde_json::Value;

    fn has_field(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn field(&self, name: &str) -> Option<&Self::Value> {
        self.get(name)
    }

    fn set_field(&mut self, name: &str, value: Self::Value) {
        self.insert(name.to_string(), value);
    }
}

impl<V> AttributeStore for HashMap<String, V> {
    type Value = V;

    fn has_field(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn field(&self, name: &str) -> Option<&V> {
        self.get(name)
    }

    fn set_field(&mut self, name: &str, value: V) {
        self.insert(name.to_string(), value);
    }
}
