//! gwc_disk_quota schema definition
//!
//! The disk quota policy always exists. Creating it replaces the current
//! configuration and deleting it leaves the server untouched.

use super::{EXPIRATION_POLICIES, Endpoint, GeoserverSchemaConfig, Payload, STORAGE_UNITS, TIME_UNITS};
use crate::client::Service;
use geotf_core::identifier::Identity;
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

fn layer_quota_fields() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("layer", AttributeType::String)
            .required()
            .with_provider_name("layer"),
        AttributeSchema::new("expiration_policy_name", types::enumeration(EXPIRATION_POLICIES))
            .required()
            .with_provider_name("expirationPolicyName"),
        AttributeSchema::new("quota_value", types::non_negative_int())
            .required()
            .with_provider_name("quota.value"),
        AttributeSchema::new("quota_units", types::enumeration(STORAGE_UNITS))
            .required()
            .with_provider_name("quota.units"),
    ]
}

/// Returns the schema config for gwc_disk_quota
pub fn gwc_disk_quota_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "gwc_disk_quota",
        Service::Tilecache,
        Identity::Singleton {
            name: "gwc_disk_quota_singleton",
            scope: None,
        },
        Endpoint::item("/rest/diskquota"),
        Payload::Json {
            root: "gwcQuotaConfiguration",
        },
        ResourceSchema::new("gwc_disk_quota")
            .with_description("Disk quota policy of the tile cache")
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .required()
                    .with_provider_name("enabled"),
            )
            .attribute(
                AttributeSchema::new("cache_cleanup_frequency", types::positive_int())
                    .required()
                    .with_description("Time between two cleanups, in cache_cleanup_units")
                    .with_provider_name("cacheCleanUpFrequency"),
            )
            .attribute(
                AttributeSchema::new("cache_cleanup_units", types::enumeration(TIME_UNITS))
                    .required()
                    .with_provider_name("cacheCleanUpUnits"),
            )
            .attribute(
                AttributeSchema::new("maximum_concurrent_cleanup", types::positive_int())
                    .required()
                    .with_description("Threads used to process the quota")
                    .with_provider_name("maxConcurrentCleanUps"),
            )
            .attribute(
                AttributeSchema::new(
                    "global_expiration_policy_name",
                    types::enumeration(EXPIRATION_POLICIES),
                )
                .required()
                .with_provider_name("globalExpirationPolicyName"),
            )
            .attribute(
                AttributeSchema::new("global_quota_value", types::non_negative_int())
                    .required()
                    .with_provider_name("globalQuota.value"),
            )
            .attribute(
                AttributeSchema::new("global_quota_units", types::enumeration(STORAGE_UNITS))
                    .required()
                    .with_provider_name("globalQuota.units"),
            )
            .attribute(
                AttributeSchema::new("layer_quota", types::block_list(layer_quota_fields()))
                    .with_description("Quotas overriding the global one for single layers")
                    .with_provider_name("layerQuotas"),
            ),
    )
}
