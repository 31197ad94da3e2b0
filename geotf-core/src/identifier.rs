//! Identifier - Composite keys addressing remote objects
//!
//! A remote object is addressed by an ordered tuple of natural keys
//! (e.g. workspace, datastore, feature type). The orchestrator stores a
//! single string per resource, so the tuple is serialized here and nowhere
//! else: components are joined with [`SEPARATOR`], and any `%` or separator
//! inside a component is percent-escaped so that parsing always reproduces
//! the original tuple.

use std::borrow::Cow;

use crate::resource::{Attributes, Value};

/// Reserved separator between identifier components
pub const SEPARATOR: char = '/';

/// Identifier parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Malformed identifier '{raw}': expected {expected} component(s) separated by '/', found {found}")]
    WrongArity {
        raw: String,
        expected: String,
        found: usize,
    },

    #[error("Malformed identifier '{raw}': component {index} must not be empty")]
    EmptyComponent { raw: String, index: usize },

    #[error("Malformed identifier '{raw}': invalid escape sequence")]
    InvalidEscape { raw: String },

    #[error("Malformed identifier '{raw}': expected prefix '{expected}'")]
    UnexpectedPrefix { raw: String, expected: String },

    #[error("Key attribute '{name}' is missing or not a string")]
    MissingKey { name: String },
}

/// Ordered list of key components
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    components: Vec<String>,
}

impl CompositeId {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Serialize to the flat string stored by the orchestrator
    pub fn encode(&self) -> String {
        self.components
            .iter()
            .map(|c| escape(c))
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string())
    }

    /// Split a raw identifier without checking arity
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let components = raw
            .split(SEPARATOR)
            .map(|part| {
                urlencoding::decode(part)
                    .map(Cow::into_owned)
                    .map_err(|_| IdentifierError::InvalidEscape {
                        raw: raw.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    /// Split a raw identifier that must carry exactly `arity` components
    pub fn parse_exact(raw: &str, arity: usize) -> Result<Self, IdentifierError> {
        let id = Self::parse(raw)?;
        if id.len() != arity {
            return Err(IdentifierError::WrongArity {
                raw: raw.to_string(),
                expected: arity.to_string(),
                found: id.len(),
            });
        }
        Ok(id)
    }
}

impl std::fmt::Display for CompositeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

fn escape(component: &str) -> Cow<'_, str> {
    if component.contains(['%', SEPARATOR]) {
        Cow::Owned(component.replace('%', "%25").replace(SEPARATOR, "%2F"))
    } else {
        Cow::Borrowed(component)
    }
}

/// One key attribute contributing a component to the identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComponent {
    /// Attribute holding the key value
    pub attribute: &'static str,
    /// An empty value is allowed (e.g. a style outside any workspace)
    pub optional: bool,
}

impl KeyComponent {
    pub const fn required(attribute: &'static str) -> Self {
        Self {
            attribute,
            optional: false,
        }
    }

    pub const fn optional(attribute: &'static str) -> Self {
        Self {
            attribute,
            optional: true,
        }
    }
}

/// How an entity kind derives its identifier from its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Parent keys followed by the entity's own key, in order
    Keys(Vec<KeyComponent>),
    /// Exactly one instance exists, globally or per optional scope
    Singleton {
        name: &'static str,
        /// Attribute naming the scope (e.g. `workspace_name`)
        scope: Option<&'static str>,
    },
}

impl Identity {
    pub fn keys(components: &[KeyComponent]) -> Self {
        Identity::Keys(components.to_vec())
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Identity::Singleton { .. })
    }

    /// Attribute names that make up the identifier
    pub fn key_attributes(&self) -> Vec<&'static str> {
        match self {
            Identity::Keys(keys) => keys.iter().map(|k| k.attribute).collect(),
            Identity::Singleton { scope, .. } => scope.iter().copied().collect(),
        }
    }

    /// Build the composite identifier from resource attributes
    pub fn from_attributes(&self, attributes: &Attributes) -> Result<CompositeId, IdentifierError> {
        match self {
            Identity::Keys(keys) => {
                let mut components = Vec::with_capacity(keys.len());
                for key in keys {
                    let value = match attributes.get(key.attribute) {
                        Some(Value::String(s)) => s.clone(),
                        None if key.optional => String::new(),
                        _ => {
                            return Err(IdentifierError::MissingKey {
                                name: key.attribute.to_string(),
                            });
                        }
                    };
                    if value.is_empty() && !key.optional {
                        return Err(IdentifierError::MissingKey {
                            name: key.attribute.to_string(),
                        });
                    }
                    components.push(value);
                }
                Ok(CompositeId::new(components))
            }
            Identity::Singleton { name, scope } => {
                let scope_value = scope
                    .and_then(|attr| attributes.get(attr))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());
                match scope_value {
                    Some(s) => Ok(CompositeId::new([name.to_string(), s.to_string()])),
                    None => Ok(CompositeId::new([name.to_string()])),
                }
            }
        }
    }

    /// Parse a raw identifier into the key attributes it encodes
    pub fn decode(&self, raw: &str) -> Result<Attributes, IdentifierError> {
        let mut seeded = Attributes::new();
        match self {
            Identity::Keys(keys) => {
                let id = CompositeId::parse_exact(raw, keys.len())?;
                for (index, (key, value)) in keys.iter().zip(id.components()).enumerate() {
                    if value.is_empty() {
                        if key.optional {
                            continue;
                        }
                        return Err(IdentifierError::EmptyComponent {
                            raw: raw.to_string(),
                            index,
                        });
                    }
                    seeded.insert(key.attribute.to_string(), Value::String(value.clone()));
                }
            }
            Identity::Singleton { name, scope } => {
                let id = CompositeId::parse(raw)?;
                let max = if scope.is_some() { 2 } else { 1 };
                if id.is_empty() || id.len() > max {
                    return Err(IdentifierError::WrongArity {
                        raw: raw.to_string(),
                        expected: if max == 1 { "1".into() } else { "1 or 2".into() },
                        found: id.len(),
                    });
                }
                if id.components()[0] != *name {
                    return Err(IdentifierError::UnexpectedPrefix {
                        raw: raw.to_string(),
                        expected: name.to_string(),
                    });
                }
                if let (Some(attr), Some(value)) = (scope, id.components().get(1)) {
                    if value.is_empty() {
                        return Err(IdentifierError::EmptyComponent {
                            raw: raw.to_string(),
                            index: 1,
                        });
                    }
                    seeded.insert(attr.to_string(), Value::String(value.clone()));
                }
            }
        }
        Ok(seeded)
    }
}
