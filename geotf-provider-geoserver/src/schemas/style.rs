//! geoserver_style schema definition
//!
//! A style is created in two steps: the catalog entry first, then the
//! definition body uploaded to the same path with a format specific
//! content type.

use super::{Content, Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use crate::mapping::str_attr;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::resource::Attributes;
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const STYLE_FORMATS: &[&str] = &["sld", "css", "ysld", "mbstyle", "zip"];

/// Content type of a style body for its format and version
pub fn style_content_type(attributes: &Attributes) -> &'static str {
    match (str_attr(attributes, "format"), str_attr(attributes, "version")) {
        ("sld", "1.1.0") => "application/vnd.ogc.se+xml",
        ("css", _) => "application/vnd.geoserver.geocss+css",
        ("ysld", _) => "application/vnd.geoserver.ysld+yaml",
        ("mbstyle", _) => "application/vnd.geoserver.mbstyle+json",
        ("zip", _) => "application/zip",
        _ => "application/vnd.ogc.sld+xml",
    }
}

/// Returns the schema config for geoserver_style
pub fn geoserver_style_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_style",
        Service::Geoserver,
        Identity::keys(&[
            KeyComponent::optional("workspace_name"),
            KeyComponent::required("name"),
        ]),
        Endpoint::collection(
            "/rest[/workspaces/{workspace_name}]/styles",
            "/rest[/workspaces/{workspace_name}]/styles/{name}",
        )
        .with_delete_query(&[("purge", "true"), ("recurse", "true")]),
        Payload::Json { root: "style" },
        ResourceSchema::new("geoserver_style")
            .with_description("A style, global or scoped to a workspace")
            .attribute(
                AttributeSchema::new("workspace_name", AttributeType::String)
                    .force_new()
                    .with_description("Name of the workspace owning the style; global when unset"),
            )
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("filename", AttributeType::String)
                    .required()
                    .with_description("Name of the file holding the style definition")
                    .with_provider_name("filename"),
            )
            .attribute(
                AttributeSchema::new("format", types::enumeration(STYLE_FORMATS))
                    .with_default("sld")
                    .with_provider_name("format"),
            )
            .attribute(
                AttributeSchema::new("version", AttributeType::String)
                    .with_default("1.0.0")
                    .with_description("Version of the format; only meaningful for SLD")
                    .with_provider_name("languageVersion.version"),
            )
            .attribute(
                AttributeSchema::new("style_definition", AttributeType::String)
                    .required()
                    .with_description("Body of the style"),
            ),
    )
    .with_content(Content {
        attribute: "style_definition",
        content_type: style_content_type,
    })
}
