//! gwc_wms_layer schema definition
//!
//! A standalone cached layer in front of any WMS. GeoWebCache replaces such
//! a layer with POST on its item and creates it with PUT.

use serde_json::{Value as Json, json};

use super::{Endpoint, GeoserverSchemaConfig, Hooks, Payload, WriteMethod};
use crate::client::Service;
use crate::mapping::{as_array, get_path, set_path, str_attr};
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

fn grid_subset_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .with_description("Name of the gridset")
            .with_provider_name("gridSetName"),
        AttributeSchema::new("min_cached_level", types::non_negative_int())
            .with_provider_name("minCachedLevel"),
        AttributeSchema::new("max_cached_level", types::non_negative_int())
            .with_provider_name("maxCachedLevel"),
    ]
}

/// The upstream URL is a one-item string list; meta tiles are `[width, height]`
fn encode_layer(attributes: &Attributes, dto: &mut Json) {
    set_path(dto, "wmsUrl.string", json!([str_attr(attributes, "wms_url")]));

    let dimension = |name: &str| attributes.get(name).and_then(Value::as_int).unwrap_or(1);
    set_path(
        dto,
        "metaWidthHeight.int",
        json!([dimension("metatile_width"), dimension("metatile_height")]),
    );
}

fn decode_layer(dto: &Json, attributes: &mut Attributes) {
    if let Some(url) = as_array(get_path(dto, "wmsUrl.string"))
        .first()
        .and_then(|u| u.as_str())
    {
        attributes.insert("wms_url".to_string(), Value::from(url));
    }

    let dimensions = as_array(get_path(dto, "metaWidthHeight.int"));
    for (name, dimension) in ["metatile_width", "metatile_height"].iter().zip(dimensions) {
        if let Some(n) = dimension.as_i64() {
            attributes.insert(name.to_string(), Value::Int(n));
        }
    }
}

/// Returns the schema config for gwc_wms_layer
pub fn gwc_wms_layer_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "gwc_wms_layer",
        Service::Tilecache,
        Identity::keys(&[KeyComponent::required("name")]),
        Endpoint::item("/rest/layers/{name}").with_update(WriteMethod::Post),
        Payload::Json { root: "wmsLayer" },
        ResourceSchema::new("gwc_wms_layer")
            .with_description("A tile cache in front of a remote WMS layer")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("blobstore_id", AttributeType::String)
                    .required()
                    .with_description("Blobstore holding the tiles")
                    .with_provider_name("blobStoreId"),
            )
            .attribute(
                AttributeSchema::new("wms_url", AttributeType::String)
                    .required()
                    .with_description("URL of the upstream WMS"),
            )
            .attribute(
                AttributeSchema::new("wms_layer", AttributeType::String)
                    .required()
                    .with_description("Layer requested from the upstream WMS")
                    .with_provider_name("wmsLayers"),
            )
            .attribute(
                AttributeSchema::new("wms_version", AttributeType::String)
                    .with_default("1.3.0")
                    .with_provider_name("wmsVersion"),
            )
            .attribute(
                AttributeSchema::new("vendor_parameters", AttributeType::String)
                    .with_default("")
                    .with_provider_name("vendorParameters"),
            )
            .attribute(
                AttributeSchema::new("background_color", AttributeType::String)
                    .with_default("")
                    .with_provider_name("bgColor"),
            )
            .attribute(
                AttributeSchema::new("mime_formats", types::string_list())
                    .required()
                    .with_description("Image formats cached for this layer")
                    .with_provider_name("mimeFormats.string"),
            )
            .attribute(
                AttributeSchema::new("grid_subset", types::block_list(grid_subset_fields()))
                    .required()
                    .with_provider_name("gridSubsets.gridSubset"),
            )
            .attribute(AttributeSchema::new("metatile_height", types::positive_int()).required())
            .attribute(AttributeSchema::new("metatile_width", types::positive_int()).required())
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(true)
                    .with_provider_name("enabled"),
            )
            .attribute(
                AttributeSchema::new("allow_cache_bypass", AttributeType::Bool)
                    .with_default(false)
                    .with_provider_name("cacheBypassAllowed"),
            )
            .attribute(
                AttributeSchema::new("expire_duration_cache", types::non_negative_int())
                    .with_default(0)
                    .with_description("Seconds before a cached tile expires on the server")
                    .with_provider_name("expireCache"),
            )
            .attribute(
                AttributeSchema::new("expire_duration_clients", types::non_negative_int())
                    .with_default(0)
                    .with_description("Seconds clients may keep a tile")
                    .with_provider_name("expireClients"),
            )
            .attribute(
                AttributeSchema::new("gutter_size", types::non_negative_int())
                    .with_default(0)
                    .with_provider_name("gutter"),
            )
            .attribute(
                AttributeSchema::new("backend_timeout", types::positive_int())
                    .with_default(120)
                    .with_provider_name("backendTimeout"),
            )
            .attribute(
                AttributeSchema::new("transparent", AttributeType::Bool)
                    .with_default(true)
                    .with_provider_name("transparent"),
            ),
    )
    .with_hooks(Hooks {
        encode: Some(encode_layer),
        decode: Some(decode_layer),
    })
}
