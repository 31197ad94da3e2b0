//! Differ - Compare desired state with current state
//!
//! Compares the desired attributes declared in configuration with the state
//! last read from the remote service, and decides whether the resource must
//! be created, updated in place, replaced, or left alone.

use crate::resource::{Attributes, Resource, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create,
    /// Resource exists with differences that can be applied in place
    Update { changed_attributes: Vec<String> },
    /// A creation-only attribute changed -> destroy and recreate
    Replace {
        changed_attributes: Vec<String>,
        forcing_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange,
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange)
    }

    /// Short action label used in plan output
    pub fn action(&self) -> &'static str {
        match self {
            Diff::Create => "create",
            Diff::Update { .. } => "update",
            Diff::Replace { .. } => "replace",
            Diff::NoChange => "no_change",
        }
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create;
    }

    let mut desired_attributes = desired.attributes.clone();
    schema.apply_defaults(&mut desired_attributes);

    let changed = find_changed_attributes(&desired_attributes, &current.attributes, schema);
    if changed.is_empty() {
        return Diff::NoChange;
    }

    let forcing: Vec<String> = changed
        .iter()
        .filter(|name| schema.attributes.get(*name).is_some_and(|a| a.force_new))
        .cloned()
        .collect();

    if forcing.is_empty() {
        Diff::Update {
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            changed_attributes: changed,
            forcing_attributes: forcing,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// Attributes declared by the user are compared; computed attributes never
/// count as drift. A creation-only attribute the remote never reports (an
/// optional parent key such as a style's workspace) can only have come from
/// the user, so dropping it from the configuration is a change as well.
pub fn find_changed_attributes(
    desired: &Attributes,
    current: &Attributes,
    schema: &ResourceSchema,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        if schema.attributes.get(key).is_some_and(|a| a.computed) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if values_equal(current_value, desired_value) => {}
            None if is_empty_value(desired_value) => {}
            _ => changed.push(key.clone()),
        }
    }

    for (key, attr) in &schema.attributes {
        let user_only = attr.force_new && !attr.computed && attr.provider_name.is_none();
        if user_only
            && !desired.contains_key(key)
            && current.get(key).is_some_and(|v| !is_empty_value(v))
        {
            changed.push(key.clone());
        }
    }

    changed.sort();
    changed
}

/// Structural equality that treats numerically equal ints and floats as equal
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_float() == b.as_float()
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::schema::{AttributeSchema, AttributeType};

    fn datastore_schema() -> ResourceSchema {
        ResourceSchema::new("geoserver_datastore")
            .attribute(AttributeSchema::new("workspace_name", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("name", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("description", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).with_default(true))
    }

    fn current(attrs: &[(&str, Value)]) -> State {
        State::existing(
            ResourceId::new("geoserver_datastore", "pg"),
            attrs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        )
        .with_identifier("demo/pg")
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("geoserver_datastore", "pg");
        let current = State::not_found(ResourceId::new("geoserver_datastore", "pg"));

        assert_eq!(diff(&desired, &current, &datastore_schema()), Diff::Create);
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("geoserver_datastore", "pg")
            .with_attribute("workspace_name", "demo")
            .with_attribute("name", "pg");
        let current = current(&[
            ("workspace_name", "demo".into()),
            ("name", "pg".into()),
            ("description", "".into()),
            ("enabled", true.into()),
        ]);

        assert_eq!(diff(&desired, &current, &datastore_schema()), Diff::NoChange);
    }

    #[test]
    fn diff_update_when_mutable_attribute_differs() {
        let desired = Resource::new("geoserver_datastore", "pg")
            .with_attribute("workspace_name", "demo")
            .with_attribute("name", "pg")
            .with_attribute("enabled", false);
        let current = current(&[
            ("workspace_name", "demo".into()),
            ("name", "pg".into()),
            ("description", "".into()),
            ("enabled", true.into()),
        ]);

        match diff(&desired, &current, &datastore_schema()) {
            Diff::Update { changed_attributes } => {
                assert_eq!(changed_attributes, vec!["enabled".to_string()]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_creation_only_attribute_differs() {
        let desired = Resource::new("geoserver_datastore", "pg")
            .with_attribute("workspace_name", "other")
            .with_attribute("name", "pg");
        let current = current(&[
            ("workspace_name", "demo".into()),
            ("name", "pg".into()),
            ("description", "".into()),
            ("enabled", true.into()),
        ]);

        match diff(&desired, &current, &datastore_schema()) {
            Diff::Replace {
                forcing_attributes, ..
            } => assert_eq!(forcing_attributes, vec!["workspace_name".to_string()]),
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn numeric_values_compare_across_int_and_float() {
        assert!(values_equal(&Value::Int(10), &Value::Float(10.0)));
        assert!(!values_equal(&Value::Int(10), &Value::Float(10.5)));
        assert!(values_equal(
            &Value::List(vec![Value::Int(1)]),
            &Value::List(vec![Value::Float(1.0)])
        ));
    }

    #[test]
    fn unset_empty_value_is_not_drift() {
        let schema = datastore_schema();
        let desired: Attributes = [("description".to_string(), Value::String(String::new()))]
            .into_iter()
            .collect();
        assert!(find_changed_attributes(&desired, &Attributes::new(), &schema).is_empty());
    }

    fn style_schema() -> ResourceSchema {
        ResourceSchema::new("geoserver_style")
            .attribute(AttributeSchema::new("workspace_name", AttributeType::String).force_new())
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("title", AttributeType::String)
                    .force_new()
                    .with_provider_name("title"),
            )
    }

    #[test]
    fn diff_replace_when_optional_parent_key_is_removed() {
        let desired = Resource::new("geoserver_style", "point").with_attribute("name", "point");
        let current = State::existing(
            ResourceId::new("geoserver_style", "point"),
            [
                ("workspace_name".to_string(), Value::from("demo")),
                ("name".to_string(), Value::from("point")),
            ]
            .into_iter()
            .collect(),
        );

        match diff(&desired, &current, &style_schema()) {
            Diff::Replace {
                forcing_attributes, ..
            } => assert_eq!(forcing_attributes, vec!["workspace_name".to_string()]),
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn reported_creation_only_value_left_unset_is_not_drift() {
        let desired = Resource::new("geoserver_style", "point").with_attribute("name", "point");
        let current = State::existing(
            ResourceId::new("geoserver_style", "point"),
            [
                ("name".to_string(), Value::from("point")),
                ("title".to_string(), Value::from("Point")),
                ("workspace_name".to_string(), Value::from("")),
            ]
            .into_iter()
            .collect(),
        );

        assert_eq!(diff(&desired, &current, &style_schema()), Diff::NoChange);
    }
}
