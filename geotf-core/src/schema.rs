//! Schema - Define type schemas for resources
//!
//! Providers define a schema for each resource type. The schema drives
//! validation before any remote call, default values, creation-only
//! (replacement forcing) attributes and the mapping onto the remote DTO.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number (integers are accepted)
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Integer constrained to an inclusive range
    IntRange { min: i64, max: i64 },
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own named attributes
    Block(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::IntRange { min, max }, Value::Int(n)) => {
                if (*min..=*max).contains(n) {
                    Ok(())
                } else {
                    Err(TypeError::OutOfRange {
                        value: *n,
                        min: *min,
                        max: *max,
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(fields), Value::Map(map)) => {
                for field in fields {
                    match map.get(&field.name) {
                        Some(v) => field.attr_type.validate(v).map_err(|e| {
                            TypeError::MapValueError {
                                key: field.name.clone(),
                                inner: Box::new(e),
                            }
                        })?,
                        None if field.required && field.default.is_none() => {
                            return Err(TypeError::MissingRequired {
                                name: field.name.clone(),
                            });
                        }
                        None => {}
                    }
                }
                if let Some(unknown) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                    return Err(TypeError::UnknownAttribute {
                        name: unknown.clone(),
                    });
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Coerce a value read from the remote side into this type's canonical shape.
    ///
    /// Integers become floats for `Float`, numeric strings become numbers, and
    /// nested blocks get their defaults filled in. Values that cannot be
    /// coerced are returned unchanged.
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (AttributeType::Float, Value::Int(n)) => Value::Float(n as f64),
            (AttributeType::Float, Value::String(s)) => match s.parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::String(s),
            },
            (AttributeType::Int | AttributeType::IntRange { .. }, Value::String(s)) => {
                match s.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::String(s),
                }
            }
            (AttributeType::Int | AttributeType::IntRange { .. }, Value::Float(f))
                if f.fract() == 0.0 =>
            {
                Value::Int(f as i64)
            }
            (AttributeType::Bool, Value::String(s)) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s),
            },
            (AttributeType::String | AttributeType::Enum(_), Value::Int(n)) => {
                Value::String(n.to_string())
            }
            (AttributeType::String | AttributeType::Enum(_), Value::Bool(b)) => {
                Value::String(b.to_string())
            }
            (AttributeType::Custom { base, .. }, v) => base.coerce(v),
            (AttributeType::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| inner.coerce(v)).collect())
            }
            // A single element where a list is expected
            (AttributeType::List(inner), v @ (Value::String(_) | Value::Map(_))) => {
                Value::List(vec![inner.coerce(v)])
            }
            (AttributeType::Map(inner), Value::Map(map)) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, inner.coerce(v)))
                    .collect(),
            ),
            (AttributeType::Block(fields), Value::Map(mut map)) => {
                for field in fields {
                    match map.remove(&field.name) {
                        Some(v) => {
                            map.insert(field.name.clone(), field.attr_type.coerce(v));
                        }
                        None => {
                            if let Some(default) = &field.default {
                                map.insert(field.name.clone(), default.clone());
                            }
                        }
                    }
                }
                Value::Map(map)
            }
            (_, v) => v,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::IntRange { min, max } => format!("Int({}..={})", min, max),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Value {value} is out of range, expected {min} to {max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is set by the provider and cannot be configured")]
    ComputedAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Path of the field in the remote DTO, dot separated (e.g., "nativeBoundingBox.minx")
    pub provider_name: Option<String>,
    /// Changing this attribute requires destroying and recreating the resource
    pub force_new: bool,
    /// Set by the provider, never by the user
    pub computed: bool,
    /// Value must not be echoed in logs or plans
    pub sensitive: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            default: None,
            description: None,
            provider_name: None,
            force_new: false,
            computed: false,
            sensitive: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Names of attributes whose change forces a replacement, sorted
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Fill in schema defaults for attributes the user left unset,
    /// including fields of nested blocks
    pub fn apply_defaults(&self, attributes: &mut Attributes) {
        for (name, schema) in &self.attributes {
            match attributes.get_mut(name) {
                Some(value) => fill_nested_defaults(&schema.attr_type, value),
                None => {
                    if let Some(default) = &schema.default {
                        attributes.insert(name.clone(), default.clone());
                    }
                }
            }
        }
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        let mut given: Vec<(&String, &Value)> = attributes.iter().collect();
        given.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in given {
            match self.attributes.get(name) {
                Some(schema) if schema.computed => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn fill_nested_defaults(attr_type: &AttributeType, value: &mut Value) {
    match (attr_type, value) {
        (AttributeType::List(inner), Value::List(items)) => {
            for item in items {
                fill_nested_defaults(inner, item);
            }
        }
        (AttributeType::Block(fields), Value::Map(map)) => {
            for field in fields {
                match map.get_mut(&field.name) {
                    Some(v) => fill_nested_defaults(&field.attr_type, v),
                    None => {
                        if let Some(default) = &field.default {
                            map.insert(field.name.clone(), default.clone());
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Enum type from a static list of variants
    pub fn enumeration(variants: &[&str]) -> AttributeType {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n >= 0 {
                        Ok(())
                    } else {
                        Err("Value must not be negative".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Map of strings
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// List of nested blocks
    pub fn block_list(fields: Vec<AttributeSchema>) -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Block(fields)))
    }
}
