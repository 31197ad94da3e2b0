//! geoserver_datastore schema definition

use super::{Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Returns the schema config for geoserver_datastore
pub fn geoserver_datastore_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_datastore",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("workspace_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest/workspaces/{workspace_name}/datastores",
            "/rest/workspaces/{workspace_name}/datastores/{name}",
        )
        .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "dataStore" },
        ResourceSchema::new("geoserver_datastore")
            .with_description("A vector data store (PostGIS, shapefile directory, ...)")
            .attribute(
                AttributeSchema::new("workspace_name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Name of the workspace owning the datastore"),
            )
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Name of the datastore")
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
                    .with_description("Make this datastore the default one of its workspace")
                    .with_provider_name("_default"),
            )
            .attribute(
                AttributeSchema::new("connection_params", types::string_map())
                    .required()
                    .with_description("Connection parameters of the underlying store (host, port, dbtype, ...)")
                    .with_provider_name("connectionParameters.entry"),
            ),
    )
}
