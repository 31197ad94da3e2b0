//! geoserver_service_wms schema definition
//!
//! Settings of the WMS service, either global or overridden for one
//! workspace. There is exactly one such object per scope, so create and
//! update both replace it and delete is a no-op.

use serde_json::{Value as Json, json};

use super::{Endpoint, GeoserverSchemaConfig, Hooks, Payload, keywords_attribute, metadata_attribute};
use crate::client::Service;
use crate::mapping::{as_array, set_path};
use geotf_core::identifier::Identity;
use geotf_core::resource::{Attributes, Value};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const WATERMARK_POSITIONS: &[&str] = &[
    "TOP_LEFT",
    "TOP_CENTER",
    "TOP_RIGHT",
    "MID_LEFT",
    "MID_CENTER",
    "MID_RIGHT",
    "BOT_LEFT",
    "BOT_CENTER",
    "BOT_RIGHT",
];

pub const INTERPOLATIONS: &[&str] = &["Nearest", "Bilinear", "Bicubic"];

fn encode_service(attributes: &Attributes, dto: &mut Json) {
    set_path(dto, "name", json!("WMS"));

    if let Some(versions) = attributes.get("supported_versions").and_then(Value::as_list) {
        let versions: Vec<Json> = versions
            .iter()
            .filter_map(Value::as_str)
            .map(|v| json!({"version": v}))
            .collect();
        // The version class name contains dots, so it cannot go through set_path
        set_path(dto, "versions", json!({"org.geotools.util.Version": versions}));
    }
}

fn decode_service(dto: &Json, attributes: &mut Attributes) {
    let versions = dto
        .get("versions")
        .and_then(|v| v.get("org.geotools.util.Version"));
    if versions.is_none() {
        return;
    }
    let versions = as_array(versions)
        .into_iter()
        .filter_map(|v| v.get("version").and_then(Json::as_str))
        .map(Value::from)
        .collect();
    attributes.insert("supported_versions".to_string(), Value::List(versions));
}

fn bool_attribute(name: &str, provider_name: &str, default: bool) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool)
        .with_default(default)
        .with_provider_name(provider_name)
}

fn limit_attribute(name: &str, provider_name: &str, default: i64) -> AttributeSchema {
    AttributeSchema::new(name, types::non_negative_int())
        .with_default(default)
        .with_provider_name(provider_name)
}

fn text_attribute(name: &str, provider_name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).with_provider_name(provider_name)
}

/// Returns the schema config for geoserver_service_wms
pub fn geoserver_service_wms_config() -> GeoserverSchemaConfig {
    let schema = ResourceSchema::new("geoserver_service_wms")
        .with_description("Settings of the WMS service, globally or for one workspace")
        .attribute(
            AttributeSchema::new("workspace_name", AttributeType::String)
                .force_new()
                .with_description("Workspace whose settings are managed; global settings when unset"),
        )
        .attribute(
            AttributeSchema::new("enabled", AttributeType::Bool)
                .required()
                .with_provider_name("enabled"),
        )
        .attribute(text_attribute("title", "title"))
        .attribute(text_attribute("maintainer", "maintainer"))
        .attribute(text_attribute("abstract", "abstrct"))
        .attribute(text_attribute("access_constraints", "accessConstraints"))
        .attribute(text_attribute("fees", "fees"))
        .attribute(text_attribute("online_resource", "onlineResource"))
        .attribute(
            AttributeSchema::new("schema_base_url", AttributeType::String)
                .with_default("http://schemas.opengis.net")
                .with_provider_name("schemaBaseURL"),
        )
        .attribute(bool_attribute("is_verbose", "verbose", false))
        .attribute(bool_attribute("use_bbox_foreach_crs", "bboxForEachCRS", false))
        .attribute(bool_attribute("watermark_enabled", "watermark.enabled", false))
        .attribute(
            AttributeSchema::new("watermark_position", types::enumeration(WATERMARK_POSITIONS))
                .with_default("TOP_LEFT")
                .with_provider_name("watermark.position"),
        )
        .attribute(
            AttributeSchema::new("watermark_transparency", AttributeType::IntRange { min: 0, max: 255 })
                .with_default(100)
                .with_description("Transparency of the watermark logo, from 0 to 255")
                .with_provider_name("watermark.transparency"),
        )
        .attribute(
            AttributeSchema::new("interpolation", types::enumeration(INTERPOLATIONS))
                .with_default("Nearest")
                .with_provider_name("interpolation"),
        )
        .attribute(bool_attribute("is_cite_compliant", "citeCompliant", false))
        .attribute(
            limit_attribute("maximum_buffer", "maxBuffer", 0)
                .with_description("Maximum search radius for GetFeatureInfo"),
        )
        .attribute(bool_attribute(
            "is_dynamic_styling_disabled",
            "dynamicStylingDisabled",
            false,
        ))
        .attribute(bool_attribute(
            "is_getfeatureinfo_mimetype_checking_enabled",
            "getFeatureInfoMimeTypeCheckingEnabled",
            false,
        ))
        .attribute(
            limit_attribute("maximum_request_memory", "maxRequestMemory", 0)
                .with_description("Memory in kilobytes a request may allocate; 0 for no limit"),
        )
        .attribute(limit_attribute("maximum_rendering_errors", "maxRenderingErrors", 0))
        .attribute(
            limit_attribute("maximum_rendering_time", "maxRenderingTime", 0)
                .with_description("Rendering time limit in seconds; 0 for no limit"),
        )
        .attribute(
            AttributeSchema::new("supported_versions", types::string_list())
                .with_description("Versions of the service offered to clients"),
        )
        .attribute(bool_attribute(
            "is_getmap_mimetype_checking_enabled",
            "getMapMimeTypeCheckingEnabled",
            false,
        ))
        .attribute(bool_attribute(
            "is_features_reprojection_disabled",
            "featuresReprojectionDisabled",
            false,
        ))
        .attribute(limit_attribute(
            "maximum_requested_dimension_values",
            "maxRequestedDimensionValues",
            100,
        ))
        .attribute(bool_attribute("is_cache_enabled", "cacheConfiguration.enabled", false))
        .attribute(limit_attribute(
            "cache_maximum_entries",
            "cacheConfiguration.maxEntries",
            1000,
        ))
        .attribute(limit_attribute(
            "cache_maximum_entry_size",
            "cacheConfiguration.maxEntrySize",
            51200,
        ))
        .attribute(limit_attribute(
            "remote_style_max_request_time",
            "remoteStyleMaxRequestTime",
            60000,
        ))
        .attribute(limit_attribute("remote_style_timeout", "remoteStyleTimeout", 30000))
        .attribute(bool_attribute(
            "is_default_group_style_enabled",
            "defaultGroupStyleEnabled",
            true,
        ))
        .attribute(bool_attribute(
            "is_transform_feature_info_disabled",
            "transformFeatureInfoDisabled",
            false,
        ))
        .attribute(bool_attribute(
            "is_autoescape_templatevalues_enabled",
            "autoEscapeTemplateValues",
            false,
        ))
        .attribute(text_attribute("root_layer_title", "rootLayerTitle"))
        .attribute(metadata_attribute())
        .attribute(keywords_attribute());

    GeoserverSchemaConfig::new(
        "geoserver_service_wms",
        Service::Geoserver,
        Identity::Singleton {
            name: "wms_service_configuration",
            scope: Some("workspace_name"),
        },
        Endpoint::item("/rest/services/wms[/workspaces/{workspace_name}]/settings"),
        Payload::Json { root: "wms" },
        schema,
    )
    .with_hooks(Hooks {
        encode: Some(encode_service),
        decode: Some(decode_service),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::dto_from_attributes;
    use crate::schemas::render_path;
    use geotf_core::schema::TypeError;

    #[test]
    fn transparency_range_is_enforced() {
        let config = geoserver_service_wms_config();
        let mut attrs = Attributes::new();
        attrs.insert("enabled".to_string(), Value::Bool(true));
        attrs.insert("watermark_transparency".to_string(), Value::Int(300));

        let errors = config.schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            TypeError::AttributeError { name, inner }
                if name == "watermark_transparency"
                    && matches!(**inner, TypeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn versions_use_the_geotools_class_name() {
        let config = geoserver_service_wms_config();
        let mut attrs = Attributes::new();
        attrs.insert("enabled".to_string(), Value::Bool(true));
        attrs.insert(
            "supported_versions".to_string(),
            Value::List(vec![Value::from("1.1.1"), Value::from("1.3.0")]),
        );
        attrs.insert("watermark_position".to_string(), Value::from("BOT_RIGHT"));

        let mut dto = dto_from_attributes(&config.schema, &attrs);
        encode_service(&attrs, &mut dto);
        assert_eq!(dto["name"], json!("WMS"));
        assert_eq!(dto["watermark"]["position"], json!("BOT_RIGHT"));
        assert_eq!(
            dto["versions"]["org.geotools.util.Version"],
            json!([{"version": "1.1.1"}, {"version": "1.3.0"}])
        );

        let mut back = Attributes::new();
        decode_service(&dto, &mut back);
        assert_eq!(back["supported_versions"], attrs["supported_versions"]);
    }

    #[test]
    fn settings_path_follows_scope() {
        let config = geoserver_service_wms_config();
        let mut attrs = Attributes::new();
        assert_eq!(
            render_path(config.endpoint.item, &attrs),
            "/rest/services/wms/settings"
        );
        attrs.insert("workspace_name".to_string(), Value::from("demo"));
        assert_eq!(
            render_path(config.endpoint.item, &attrs),
            "/rest/services/wms/workspaces/demo/settings"
        );
        assert_eq!(
            config.identity.from_attributes(&attrs).unwrap().to_string(),
            "wms_service_configuration/demo"
        );
    }
}
