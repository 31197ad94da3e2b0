//! geoserver_layergroup schema definition

use serde_json::{Value as Json, json};

use super::{
    Endpoint, GeoserverSchemaConfig, Hooks, Payload, bounding_box_attributes, keywords_attribute,
};
use crate::client::Service;
use crate::mapping::{as_array, get_path, set_path};
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const MODES: &[&str] = &["SINGLE", "OPAQUE_CONTAINER", "NAMED", "CONTAINER", "EO"];
pub const MEMBER_TYPES: &[&str] = &["layer", "layerGroup"];

fn layer_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("name", AttributeType::String).required(),
        AttributeSchema::new("style", AttributeType::String).with_default(""),
        AttributeSchema::new("type", types::enumeration(MEMBER_TYPES)).with_default("layer"),
    ]
}

fn metadata_link_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("type", AttributeType::String)
            .required()
            .with_provider_name("type"),
        AttributeSchema::new("metadatatype", AttributeType::String)
            .required()
            .with_provider_name("metadataType"),
        AttributeSchema::new("content", AttributeType::String)
            .required()
            .with_provider_name("content"),
    ]
}

/// Members are sent as two parallel lists: published objects and their styles
fn encode_layers(attributes: &Attributes, dto: &mut Json) {
    let Some(layers) = attributes.get("layers").and_then(Value::as_list) else {
        return;
    };

    let mut published = Vec::with_capacity(layers.len());
    let mut styles = Vec::with_capacity(layers.len());
    for layer in layers.iter().filter_map(Value::as_map) {
        let field = |name: &str| layer.get(name).and_then(Value::as_str).unwrap_or("");
        let member_type = match field("type") {
            "" => "layer",
            other => other,
        };
        published.push(json!({"@type": member_type, "name": field("name")}));
        styles.push(match field("style") {
            "" => Json::String(String::new()),
            style => json!({"name": style}),
        });
    }

    set_path(dto, "publishables.published", Json::Array(published));
    set_path(dto, "styles.style", Json::Array(styles));
}

fn decode_layers(dto: &Json, attributes: &mut Attributes) {
    let published = as_array(get_path(dto, "publishables.published"));
    let styles = as_array(get_path(dto, "styles.style"));

    let layers = published
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let name = member.get("name").and_then(Json::as_str).unwrap_or("");
            let member_type = member.get("@type").and_then(Json::as_str).unwrap_or("layer");
            let style = styles
                .get(i)
                .and_then(|s| s.get("name"))
                .and_then(Json::as_str)
                .unwrap_or("");
            Value::Map(
                [
                    ("name".to_string(), Value::from(name)),
                    ("style".to_string(), Value::from(style)),
                    ("type".to_string(), Value::from(member_type)),
                ]
                .into_iter()
                .collect(),
            )
        })
        .collect();

    attributes.insert("layers".to_string(), Value::List(layers));
}

/// Returns the schema config for geoserver_layergroup
pub fn geoserver_layergroup_config() -> GeoserverSchemaConfig {
    let schema = ResourceSchema::new("geoserver_layergroup")
        .with_description("A group of layers published as one")
        .attribute(
            AttributeSchema::new("workspace_name", AttributeType::String)
                .force_new()
                .with_description("Name of the workspace owning the group; global when unset"),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_provider_name("name"),
        )
        .attribute(
            AttributeSchema::new("mode", types::enumeration(MODES))
                .with_default("SINGLE")
                .with_provider_name("mode"),
        )
        .attribute(AttributeSchema::new("title", AttributeType::String).with_provider_name("title"))
        .attribute(
            AttributeSchema::new("abstract", AttributeType::String)
                .with_provider_name("abstractTxt"),
        )
        .attribute(
            AttributeSchema::new("layers", types::block_list(layer_fields()))
                .required()
                .with_description("Members of the group, drawn in order"),
        )
        .attribute(
            AttributeSchema::new("metadatalink", types::block_list(metadata_link_fields()))
                .with_provider_name("metadataLinks.metadataLink"),
        )
        .attribute(keywords_attribute());
    let schema = bounding_box_attributes(schema, "bounding_box", "bounds", false);

    GeoserverSchemaConfig::new(
        "geoserver_layergroup",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::optional("workspace_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest[/workspaces/{workspace_name}]/layergroups",
            "/rest[/workspaces/{workspace_name}]/layergroups/{name}",
        ),
        Payload::Json { root: "layerGroup" },
        schema,
    )
    .compensate_on_failure()
    .with_hooks(Hooks {
        encode: Some(encode_layers),
        decode: Some(decode_layers),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, style: &str, member_type: &str) -> Value {
        Value::Map(
            [
                ("name".to_string(), Value::from(name)),
                ("style".to_string(), Value::from(style)),
                ("type".to_string(), Value::from(member_type)),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn layers_encode_as_parallel_lists() {
        let mut attrs = Attributes::new();
        attrs.insert(
            "layers".to_string(),
            Value::List(vec![layer("demo:roads", "line", "layer"), layer("base", "", "layerGroup")]),
        );
        let mut dto = json!({});
        encode_layers(&attrs, &mut dto);
        assert_eq!(
            dto,
            json!({
                "publishables": {"published": [
                    {"@type": "layer", "name": "demo:roads"},
                    {"@type": "layerGroup", "name": "base"}
                ]},
                "styles": {"style": [{"name": "line"}, ""]}
            })
        );
    }

    #[test]
    fn layers_decode_from_parallel_lists() {
        let dto = json!({
            "publishables": {"published": {"@type": "layer", "name": "demo:roads", "href": "x"}},
            "styles": {"style": {"name": "line", "href": "y"}}
        });
        let mut attrs = Attributes::new();
        decode_layers(&dto, &mut attrs);
        assert_eq!(attrs["layers"], Value::List(vec![layer("demo:roads", "line", "layer")]));
    }

    #[test]
    fn invalid_member_type_fails_validation() {
        let config = geoserver_layergroup_config();
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("group"));
        attrs.insert(
            "layers".to_string(),
            Value::List(vec![layer("demo:roads", "", "group")]),
        );
        assert!(config.schema.validate(&attrs).is_err());
    }
}
