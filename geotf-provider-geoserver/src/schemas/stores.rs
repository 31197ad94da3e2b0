//! Cascaded WMS and WMTS stores and the layers published from them
//!
//! Both store kinds share one field set, and so do both layer kinds. The
//! layers cannot be modified in place: every field is creation-only.

use super::{
    Endpoint, GeoserverSchemaConfig, OptIn, Payload, bounding_box_attributes, metadata_attribute,
};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const PROJECTION_POLICIES: &[&str] = &["FORCE_DECLARED", "REPROJECT_TO_DECLARED", "NONE"];

const LAYER_OPT_IN: &[OptIn] = &[OptIn {
    attribute: "metadata",
    flag: "custom_metadata",
}];

fn store_schema(resource_type: &str, description: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .with_description(description)
        .attribute(
            AttributeSchema::new("workspace_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_provider_name("name"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .with_default("")
                .with_provider_name("description"),
        )
        .attribute(
            AttributeSchema::new("enabled", AttributeType::Bool)
                .with_default(true)
                .with_provider_name("enabled"),
        )
        .attribute(
            AttributeSchema::new("default", AttributeType::Bool)
                .with_default(false)
                .with_provider_name("_default"),
        )
        .attribute(
            AttributeSchema::new("disable_connection_on_failure", AttributeType::Bool)
                .with_default(false)
                .with_provider_name("disableOnConnFailure"),
        )
        .attribute(
            AttributeSchema::new("capabilities_url", AttributeType::String)
                .required()
                .with_description("GetCapabilities URL of the remote service")
                .with_provider_name("capabilitiesURL"),
        )
        .attribute(
            AttributeSchema::new("max_connections", types::positive_int())
                .with_default(6)
                .with_provider_name("maxConnections"),
        )
        .attribute(
            AttributeSchema::new("read_timeout", types::non_negative_int())
                .with_default(60)
                .with_description("Read timeout in seconds")
                .with_provider_name("readTimeout"),
        )
        .attribute(
            AttributeSchema::new("connection_timeout", types::non_negative_int())
                .with_default(30)
                .with_description("Connection timeout in seconds")
                .with_provider_name("connectTimeout"),
        )
}

/// Returns the schema config for geoserver_wmsstore
pub fn geoserver_wmsstore_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_wmsstore",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/wmsstores",
            "/rest/workspaces/{workspace_name}/wmsstores/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "wmsStore" },
        store_schema("geoserver_wmsstore", "A store cascading a remote WMS"),
    )
}

/// Returns the schema config for geoserver_wmts_store
pub fn geoserver_wmts_store_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_wmts_store",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/wmtsstores",
            "/rest/workspaces/{workspace_name}/wmtsstores/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "wmtsStore" },
        store_schema("geoserver_wmts_store", "A store cascading a remote WMTS"),
    )
}

fn layer_schema(resource_type: &str, store_key: &str, description: &str) -> ResourceSchema {
    let schema = ResourceSchema::new(resource_type)
        .with_description(description)
        .attribute(
            AttributeSchema::new("workspace_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new(store_key, AttributeType::String).required().force_new())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_provider_name("name"),
        )
        .attribute(
            AttributeSchema::new("native_name", AttributeType::String)
                .required()
                .force_new()
                .with_description("Name of the layer on the remote service")
                .with_provider_name("nativeName"),
        )
        .attribute(
            AttributeSchema::new("enabled", AttributeType::Bool)
                .with_default(true)
                .force_new()
                .with_provider_name("enabled"),
        )
        .attribute(
            AttributeSchema::new("projection_policy", types::enumeration(PROJECTION_POLICIES))
                .required()
                .force_new()
                .with_provider_name("projectionPolicy"),
        )
        .attribute(
            AttributeSchema::new("title", AttributeType::String)
                .force_new()
                .with_provider_name("title"),
        )
        .attribute(
            AttributeSchema::new("abstract", AttributeType::String)
                .force_new()
                .with_provider_name("abstract"),
        )
        .attribute(
            AttributeSchema::new("native_crs_class", AttributeType::String)
                .force_new()
                .with_provider_name("nativeCRS.@class"),
        )
        .attribute(
            AttributeSchema::new("native_crs_value", AttributeType::String)
                .force_new()
                .with_provider_name("nativeCRS.$"),
        )
        .attribute(
            AttributeSchema::new("srs", AttributeType::String)
                .required()
                .force_new()
                .with_provider_name("srs"),
        )
        .attribute(metadata_attribute().force_new())
        .attribute(
            AttributeSchema::new("custom_metadata", AttributeType::Bool)
                .computed()
                .with_description("Whether the metadata map was set explicitly"),
        );

    let schema = bounding_box_attributes(schema, "native_bounding_box", "nativeBoundingBox", true);
    bounding_box_attributes(schema, "lat_lon_bounding_box", "latLonBoundingBox", true)
}

/// Returns the schema config for geoserver_wms_layer
pub fn geoserver_wms_layer_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_wms_layer",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("wmsstore_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/wmsstores/{wmsstore_name}/wmslayers",
            "/rest/workspaces/{workspace_name}/wmsstores/{wmsstore_name}/wmslayers/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "wmsLayer" },
        layer_schema(
            "geoserver_wms_layer",
            "wmsstore_name",
            "A layer published from a cascaded WMS store",
        ),
    )
    .compensate_on_failure()
    .with_opt_in(LAYER_OPT_IN)
}

/// Returns the schema config for geoserver_wmts_layer
pub fn geoserver_wmts_layer_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_wmts_layer",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("wmtsstore_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/wmtsstores/{wmtsstore_name}/layers",
            "/rest/workspaces/{workspace_name}/wmtsstores/{wmtsstore_name}/layers/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "wmtsLayer" },
        layer_schema(
            "geoserver_wmts_layer",
            "wmtsstore_name",
            "A layer published from a cascaded WMTS store",
        ),
    )
    .compensate_on_failure()
    .with_opt_in(LAYER_OPT_IN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotf_core::resource::Value;

    #[test]
    fn store_kinds_share_fields() {
        let wms = geoserver_wmsstore_config();
        let wmts = geoserver_wmts_store_config();
        let mut wms_fields: Vec<_> = wms.schema.attributes.keys().collect();
        let mut wmts_fields: Vec<_> = wmts.schema.attributes.keys().collect();
        wms_fields.sort();
        wmts_fields.sort();
        assert_eq!(wms_fields, wmts_fields);
        assert_eq!(wms.schema.attributes["max_connections"].default, Some(Value::Int(6)));
    }

    #[test]
    fn cascaded_layer_fields_are_creation_only() {
        let config = geoserver_wms_layer_config();
        for (name, attr) in &config.schema.attributes {
            assert!(attr.force_new || attr.computed, "{} should be creation-only", name);
        }
        assert!(config.compensate_on_failure);
    }
}
