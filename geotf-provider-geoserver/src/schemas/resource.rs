//! geoserver_resource schema definition
//!
//! A file in the data directory, addressed by path and extension. The body
//! is stored as is; there is no JSON document around it.

use super::{Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Returns the schema config for geoserver_resource
pub fn geoserver_resource_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_resource",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::required("path"),
            KeyComponent::required("extension"),
        ]),
        Endpoint::item("/rest/resource/{path*}.{extension}"),
        Payload::Raw {
            attribute: "resource",
            content_type: "application/octet-stream",
        },
        ResourceSchema::new("geoserver_resource")
            .with_description("A file stored in the data directory")
            .attribute(
                AttributeSchema::new("path", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Path of the file without extension (e.g. styles/logo)"),
            )
            .attribute(
                AttributeSchema::new("extension", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Extension of the file (e.g. png)"),
            )
            .attribute(
                AttributeSchema::new("resource", AttributeType::String)
                    .required()
                    .with_description("Content of the file"),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::render_path;
    use geotf_core::resource::Value;

    #[test]
    fn nested_paths_keep_their_directories() {
        let config = geoserver_resource_config();
        let attrs = [
            ("path".to_string(), Value::from("workspaces/demo/logo")),
            ("extension".to_string(), Value::from("png")),
        ]
        .into_iter()
        .collect();

        let id = config.identity.from_attributes(&attrs).unwrap();
        assert_eq!(id.to_string(), "workspaces%2Fdemo%2Flogo/png");
        assert_eq!(
            render_path(config.endpoint.item, &attrs),
            "/rest/resource/workspaces/demo/logo.png"
        );
        assert_eq!(config.identity.decode(&id.to_string()).unwrap(), attrs);
    }
}
