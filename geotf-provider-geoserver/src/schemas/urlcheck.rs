//! geoserver_urlcheck schema definition

use regex::Regex;

use super::{Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::resource::Value;
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// String holding a pattern the `regex` crate accepts
fn regular_expression() -> AttributeType {
    AttributeType::Custom {
        name: "RegularExpression".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(pattern) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| format!("Invalid regular expression '{}': {}", pattern, e)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Returns the schema config for geoserver_urlcheck
pub fn geoserver_urlcheck_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "geoserver_urlcheck",
        Service::Geoserver,
        Identity::keys(&[KeyComponent::required("name")]),
        Endpoint::collection("/rest/urlchecks", "/rest/urlchecks/{name}"),
        Payload::Json {
            root: "regexUrlCheck",
        },
        ResourceSchema::new("geoserver_urlcheck")
            .with_description("A regular expression restricting the URLs GeoServer may fetch")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_provider_name("name"),
            )
            .attribute(
                AttributeSchema::new("regex", regular_expression())
                    .required()
                    .force_new()
                    .with_description("Pattern the fetched URLs must match")
                    .with_provider_name("regex"),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(true)
                    .force_new()
                    .with_provider_name("enabled"),
            )
            .attribute(
                AttributeSchema::new("description", AttributeType::String)
                    .with_provider_name("description"),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotf_core::resource::Attributes;

    fn attrs(regex: &str) -> Attributes {
        [
            ("name".to_string(), Value::from("icons")),
            ("regex".to_string(), Value::from(regex)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn valid_pattern_passes() {
        let config = geoserver_urlcheck_config();
        assert!(config.schema.validate(&attrs(r"^https://icons\.example\.com/.*$")).is_ok());
    }

    #[test]
    fn broken_pattern_is_rejected() {
        let config = geoserver_urlcheck_config();
        let errors = config.schema.validate(&attrs("^(unclosed")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("regex"));
    }
}
