//! geoserver_featuretype schema definition

use super::{Endpoint, GeoserverSchemaConfig, OptIn, Payload, bounding_box_attributes};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const OPT_IN: &[OptIn] = &[OptIn {
    attribute: "attribute",
    flag: "custom_attributes",
}];

/// Published layer sharing the feature type's name; removed before the feature type
const DEPENDENTS: &[&str] = &["/rest/workspaces/{workspace_name}/layers/{name}"];

fn attribute_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .with_provider_name("name"),
        AttributeSchema::new("min_occurs", AttributeType::Int)
            .with_default(0)
            .with_provider_name("minOccurs"),
        AttributeSchema::new("max_occurs", AttributeType::Int)
            .with_default(1)
            .with_provider_name("maxOccurs"),
        AttributeSchema::new("nillable", AttributeType::Bool)
            .with_default(true)
            .with_provider_name("nillable"),
        AttributeSchema::new("binding", AttributeType::String)
            .required()
            .with_description("Java class of the attribute (e.g. java.lang.String)")
            .with_provider_name("binding"),
    ]
}

/// Returns the schema config for geoserver_featuretype
pub fn geoserver_featuretype_config() -> GeoserverSchemaConfig {
    let schema = ResourceSchema::new("geoserver_featuretype")
        .with_description("A feature type published from a datastore")
        .attribute(
            AttributeSchema::new("workspace_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("datastore_name", AttributeType::String)
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
            AttributeSchema::new("native_name", AttributeType::String)
                .required()
                .with_description("Name of the table or type in the underlying store")
                .with_provider_name("nativeName"),
        )
        .attribute(
            AttributeSchema::new("enabled", AttributeType::Bool)
                .with_default(true)
                .with_provider_name("enabled"),
        )
        .attribute(
            AttributeSchema::new(
                "projection_policy",
                types::enumeration(&["FORCE_DECLARED", "REPROJECT_TO_DECLARED", "NONE"]),
            )
            .with_default("FORCE_DECLARED")
            .with_provider_name("projectionPolicy"),
        )
        .attribute(AttributeSchema::new("title", AttributeType::String).with_provider_name("title"))
        .attribute(
            AttributeSchema::new("abstract", AttributeType::String).with_provider_name("abstract"),
        )
        .attribute(
            AttributeSchema::new("native_crs_class", AttributeType::String)
                .with_provider_name("nativeCRS.@class"),
        )
        .attribute(
            AttributeSchema::new("native_crs_value", AttributeType::String)
                .with_description("WKT definition of the native CRS")
                .with_provider_name("nativeCRS.$"),
        )
        .attribute(
            AttributeSchema::new("srs", AttributeType::String)
                .required()
                .with_description("Declared SRS (e.g. EPSG:4326)")
                .with_provider_name("srs"),
        )
        .attribute(
            AttributeSchema::new("attribute", types::block_list(attribute_fields()))
                .with_description("Attributes exposed by the feature type; inferred from the store when unset")
                .with_provider_name("attributes.attribute"),
        )
        .attribute(
            AttributeSchema::new("custom_attributes", AttributeType::Bool)
                .computed()
                .with_description("Whether the attribute list was set explicitly"),
        );

    let schema = bounding_box_attributes(schema, "native_bounding_box", "nativeBoundingBox", false);
    let schema =
        bounding_box_attributes(schema, "lat_lon_bounding_box", "latLonBoundingBox", false);

    GeoserverSchemaConfig::new(
        "geoserver_featuretype",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("datastore_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/datastores/{datastore_name}/featuretypes",
            "/rest/workspaces/{workspace_name}/datastores/{datastore_name}/featuretypes/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "featureType" },
        schema,
    )
    .with_dependents(DEPENDENTS)
    .with_opt_in(OPT_IN)
}
