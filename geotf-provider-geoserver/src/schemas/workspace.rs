//! geoserver_workspace schema definition

use super::{Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Returns the schema config for geoserver_workspace
pub fn geoserver_workspace_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_workspace",
        Service::Geoserver,
        Identity::keys(&[KeyComponent::required("name")]),
        Endpoint::collection("/rest/workspaces", "/rest/workspaces/{name}")
            .with_create_query(&["default"])
            .with_delete_query(&[("recurse", "true")]),
        Payload::Json { root: "workspace" },
        ResourceSchema::new("geoserver_workspace")
            .with_description("A GeoServer workspace, the namespace grouping stores, layers and styles")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Name of the workspace")
                    .with_provider_name("name"),
            )
            // Only accepted as a query parameter on creation; never echoed back
            .attribute(
                AttributeSchema::new("default", AttributeType::Bool)
                    .with_default(false)
                    .force_new()
                    .with_description("Make this workspace the default one"),
            )
            .attribute(
                AttributeSchema::new("isolated", AttributeType::Bool)
                    .with_default(false)
                    .with_description("Isolated workspaces are only visible through their virtual services")
                    .with_provider_name("isolated"),
            ),
    )
}
