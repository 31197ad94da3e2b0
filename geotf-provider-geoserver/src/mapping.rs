//! Translation between attribute bags and GeoServer DTOs
//!
//! Every attribute with a `provider_name` is mapped onto the dot separated
//! path it names inside the DTO. A few GeoServer encodings get dedicated
//! treatment:
//!
//! - maps stored under an `entry` path use `{"@key": k, "$": v}` entries
//! - lists of nested blocks map each block field through its own path
//! - single-element arrays that the server collapses to a bare object or
//!   scalar are widened back into arrays on read

use std::collections::HashMap;

use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde_json::{Map, Value as Json};

/// Look up a dot separated path in a JSON document
pub fn get_path<'a>(json: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('.')
        .try_fold(json, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Set a dot separated path in a JSON document, creating objects on the way
pub fn set_path(json: &mut Json, path: &str, value: Json) {
    let mut current = json;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Json::Object(Map::new());
        }
        let Json::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
    }
}

/// View a JSON value as a list, widening a bare element into a one-item list
pub fn as_array(json: Option<&Json>) -> Vec<&Json> {
    match json {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items.iter().collect(),
        // An empty string stands for an empty collection in some responses
        Some(Json::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![other],
    }
}

fn is_entry_path(path: &str) -> bool {
    path == "entry" || path.ends_with(".entry")
}

/// Encode a map as GeoServer `entry` items, sorted by key
pub fn map_to_entries(map: &HashMap<String, Value>) -> Json {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    Json::Array(
        keys.into_iter()
            .map(|key| {
                let value = match &map[key] {
                    Value::String(s) => Json::String(s.clone()),
                    other => Json::String(scalar_to_string(other)),
                };
                serde_json::json!({"@key": key, "$": value})
            })
            .collect(),
    )
}

/// Decode GeoServer `entry` items into a string map
pub fn entries_to_map(json: Option<&Json>) -> HashMap<String, Value> {
    as_array(json)
        .into_iter()
        .filter_map(|entry| {
            let key = entry.get("@key")?.as_str()?;
            let value = match entry.get("$") {
                Some(Json::String(s)) => s.clone(),
                Some(Json::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Some((key.to_string(), Value::String(value)))
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_json().to_string(),
    }
}

/// Encode one attribute value at its DTO path
fn encode_value(attr_type: &AttributeType, path: &str, value: &Value, dto: &mut Json) {
    match (attr_type, value) {
        (AttributeType::Map(_), Value::Map(map)) if is_entry_path(path) => {
            set_path(dto, path, map_to_entries(map));
        }
        (AttributeType::List(inner), Value::List(items)) => {
            if let AttributeType::Block(fields) = inner.as_ref() {
                let blocks = items
                    .iter()
                    .filter_map(Value::as_map)
                    .map(|block| block_to_json(fields, block))
                    .collect();
                set_path(dto, path, Json::Array(blocks));
            } else {
                set_path(dto, path, value.to_json());
            }
        }
        _ => set_path(dto, path, value.to_json()),
    }
}

fn block_to_json(fields: &[AttributeSchema], block: &HashMap<String, Value>) -> Json {
    let mut json = Json::Object(Map::new());
    for field in fields {
        let Some(path) = field.provider_name.as_deref() else {
            continue;
        };
        let value = block.get(&field.name).or(field.default.as_ref());
        if let Some(value) = value {
            encode_value(&field.attr_type, path, value, &mut json);
        }
    }
    json
}

/// Decode the value stored at a DTO path into the attribute's type
fn decode_value(attr_type: &AttributeType, path: &str, dto: &Json) -> Option<Value> {
    match attr_type {
        AttributeType::Map(_) if is_entry_path(path) => {
            Some(Value::Map(entries_to_map(get_path(dto, path))))
        }
        AttributeType::List(inner) => {
            let raw = get_path(dto, path)?;
            let items = as_array(Some(raw));
            let values = match inner.as_ref() {
                AttributeType::Block(fields) => items
                    .into_iter()
                    .map(|item| block_from_json(fields, item))
                    .collect(),
                other => items
                    .into_iter()
                    .filter_map(Value::from_json)
                    .map(|v| other.coerce(v))
                    .collect(),
            };
            Some(Value::List(values))
        }
        other => get_path(dto, path)
            .and_then(Value::from_json)
            .map(|v| other.coerce(v)),
    }
}

fn block_from_json(fields: &[AttributeSchema], json: &Json) -> Value {
    let mut block = HashMap::new();
    for field in fields {
        let Some(path) = field.provider_name.as_deref() else {
            continue;
        };
        match decode_value(&field.attr_type, path, json) {
            Some(value) => {
                block.insert(field.name.clone(), value);
            }
            None => {
                if let Some(default) = &field.default {
                    block.insert(field.name.clone(), default.clone());
                }
            }
        }
    }
    Value::Map(block)
}

/// Build the DTO body from attributes using the schema's provider names
pub fn dto_from_attributes(schema: &ResourceSchema, attributes: &Attributes) -> Json {
    let mut dto = Json::Object(Map::new());
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    for name in names {
        let Some(attr) = schema.attributes.get(name) else {
            continue;
        };
        if attr.computed {
            continue;
        }
        if let Some(path) = attr.provider_name.as_deref() {
            encode_value(&attr.attr_type, path, &attributes[name], &mut dto);
        }
    }
    dto
}

/// Extract attributes from a DTO body using the schema's provider names
pub fn attributes_from_dto(schema: &ResourceSchema, dto: &Json) -> Attributes {
    let mut attributes = Attributes::new();
    for (name, attr) in &schema.attributes {
        let Some(path) = attr.provider_name.as_deref() else {
            continue;
        };
        if let Some(value) = decode_value(&attr.attr_type, path, dto) {
            attributes.insert(name.clone(), value);
        }
    }
    attributes
}

/// Wrap a DTO body in its root element (e.g. `{"dataStore": {...}}`)
pub fn wrap(root: &str, body: Json) -> Json {
    let mut map = Map::new();
    map.insert(root.to_string(), body);
    Json::Object(map)
}

/// Strip the root element, tolerating responses that omit it
pub fn unwrap<'a>(root: &str, document: &'a Json) -> &'a Json {
    document.get(root).unwrap_or(document)
}

/// Read a string attribute, treating absence as empty
pub fn str_attr<'a>(attributes: &'a Attributes, name: &str) -> &'a str {
    attributes.get(name).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotf_core::schema::types;
    use serde_json::json;

    fn datastore_schema() -> ResourceSchema {
        ResourceSchema::new("geoserver_datastore")
            .attribute(AttributeSchema::new("name", AttributeType::String).with_provider_name("name"))
            .attribute(
                AttributeSchema::new("connection_params", types::string_map())
                    .with_provider_name("connectionParameters.entry"),
            )
            .attribute(
                AttributeSchema::new("default", AttributeType::Bool).with_provider_name("_default"),
            )
    }

    #[test]
    fn set_and_get_nested_path() {
        let mut dto = json!({});
        set_path(&mut dto, "nativeBoundingBox.crs.$", json!("EPSG:4326"));
        set_path(&mut dto, "nativeBoundingBox.minx", json!(-180.0));
        assert_eq!(dto, json!({"nativeBoundingBox": {"crs": {"$": "EPSG:4326"}, "minx": -180.0}}));
        assert_eq!(get_path(&dto, "nativeBoundingBox.crs.$"), Some(&json!("EPSG:4326")));
        assert_eq!(get_path(&dto, "nativeBoundingBox.maxx"), None);
    }

    #[test]
    fn get_path_through_scalar_is_none() {
        let dto = json!({"nativeCRS": "EPSG:4326"});
        assert_eq!(get_path(&dto, "nativeCRS.$"), None);
    }

    #[test]
    fn connection_params_use_entries() {
        let schema = datastore_schema();
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), "pg".into());
        attrs.insert(
            "connection_params".into(),
            Value::Map(
                [
                    ("port".to_string(), Value::from("5432")),
                    ("host".to_string(), Value::from("localhost")),
                ]
                .into_iter()
                .collect(),
            ),
        );

        let dto = dto_from_attributes(&schema, &attrs);
        assert_eq!(
            dto,
            json!({
                "name": "pg",
                "connectionParameters": {"entry": [
                    {"@key": "host", "$": "localhost"},
                    {"@key": "port", "$": "5432"}
                ]}
            })
        );

        let back = attributes_from_dto(&schema, &dto);
        assert_eq!(back["connection_params"], attrs["connection_params"]);
    }

    #[test]
    fn single_entry_object_is_widened() {
        let dto = json!({"connectionParameters": {"entry": {"@key": "host", "$": "db"}}});
        let map = entries_to_map(get_path(&dto, "connectionParameters.entry"));
        assert_eq!(map.get("host"), Some(&Value::from("db")));
    }

    #[test]
    fn block_lists_map_nested_fields() {
        let schema = ResourceSchema::new("gwc_disk_quota").attribute(
            AttributeSchema::new(
                "layer_quota",
                types::block_list(vec![
                    AttributeSchema::new("layer", AttributeType::String).with_provider_name("layer"),
                    AttributeSchema::new("quota_value", AttributeType::Int)
                        .with_provider_name("quota.value"),
                ]),
            )
            .with_provider_name("layerQuotas"),
        );

        let mut attrs = Attributes::new();
        attrs.insert(
            "layer_quota".into(),
            Value::List(vec![Value::Map(
                [
                    ("layer".to_string(), Value::from("topp:states")),
                    ("quota_value".to_string(), Value::Int(5)),
                ]
                .into_iter()
                .collect(),
            )]),
        );

        let dto = dto_from_attributes(&schema, &attrs);
        assert_eq!(
            dto,
            json!({"layerQuotas": [{"layer": "topp:states", "quota": {"value": 5}}]})
        );
        assert_eq!(attributes_from_dto(&schema, &dto), attrs);
    }

    #[test]
    fn string_lists_accept_bare_scalar() {
        let schema = ResourceSchema::new("geoserver_layergroup").attribute(
            AttributeSchema::new("keywords", types::string_list()).with_provider_name("keywords.string"),
        );
        let attrs = attributes_from_dto(&schema, &json!({"keywords": {"string": "roads"}}));
        assert_eq!(attrs["keywords"], Value::List(vec![Value::from("roads")]));
    }

    #[test]
    fn computed_attributes_are_not_sent() {
        let schema = ResourceSchema::new("x").attribute(
            AttributeSchema::new("flag", AttributeType::Bool)
                .computed()
                .with_provider_name("flag"),
        );
        let mut attrs = Attributes::new();
        attrs.insert("flag".into(), Value::Bool(true));
        assert_eq!(dto_from_attributes(&schema, &attrs), json!({}));
    }

    #[test]
    fn unwrap_tolerates_missing_root() {
        let doc = json!({"name": "demo"});
        assert_eq!(unwrap("workspace", &doc), &doc);
        let wrapped = wrap("workspace", doc.clone());
        assert_eq!(unwrap("workspace", &wrapped), &doc);
    }
}
