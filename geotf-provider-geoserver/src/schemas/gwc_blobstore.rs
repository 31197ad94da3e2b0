//! gwc_file_blobstore and gwc_s3_blobstore schema definitions

use super::{Endpoint, GeoserverSchemaConfig, Payload};
use crate::client::Service;
use geotf_core::identifier::{Identity, KeyComponent};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const ACCESS_TYPES: &[&str] = &["PUBLIC", "PRIVATE"];

const BLOBSTORE_ITEM: &str = "/rest/blobstores/{blobstore_id}";

fn blobstore_id() -> AttributeSchema {
    AttributeSchema::new("blobstore_id", AttributeType::String)
        .required()
        .force_new()
        .with_description("Identifier of the blobstore")
        .with_provider_name("id")
}

/// Returns the schema config for gwc_file_blobstore
pub fn gwc_file_blobstore_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "gwc_file_blobstore",
        Service::Tilecache,
        Identity::keys(&[KeyComponent::required("blobstore_id")]),
        Endpoint::item(BLOBSTORE_ITEM),
        Payload::Json {
            root: "FileBlobStore",
        },
        ResourceSchema::new("gwc_file_blobstore")
            .with_description("Tile storage on the local file system")
            .attribute(blobstore_id())
            .attribute(
                AttributeSchema::new("base_directory", AttributeType::String)
                    .required()
                    .with_description("Directory the tiles are written to")
                    .with_provider_name("baseDirectory"),
            )
            .attribute(
                AttributeSchema::new("file_system_block_size", types::positive_int())
                    .required()
                    .with_provider_name("fileSystemBlockSize"),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(true)
                    .with_provider_name("enabled"),
            ),
    )
}

/// Returns the schema config for gwc_s3_blobstore
pub fn gwc_s3_blobstore_config() -> GeoserverSchemaConfig {
    GeoserverSchemaConfig::new(
        "gwc_s3_blobstore",
        Service::Tilecache,
        Identity::keys(&[KeyComponent::required("blobstore_id")]),
        Endpoint::item(BLOBSTORE_ITEM),
        Payload::Json {
            root: "S3BlobStore",
        },
        ResourceSchema::new("gwc_s3_blobstore")
            .with_description("Tile storage in an S3 compatible bucket")
            .attribute(blobstore_id())
            .attribute(
                AttributeSchema::new("bucket", AttributeType::String)
                    .required()
                    .with_provider_name("bucket"),
            )
            .attribute(
                AttributeSchema::new("bucket_access_key", AttributeType::String)
                    .required()
                    .sensitive()
                    .with_provider_name("awsAccessKey"),
            )
            .attribute(
                AttributeSchema::new("bucket_secret_key", AttributeType::String)
                    .required()
                    .sensitive()
                    .with_provider_name("awsSecretKey"),
            )
            .attribute(
                AttributeSchema::new("prefix", AttributeType::String)
                    .with_default("")
                    .with_description("Prefix added to the path of every tile")
                    .with_provider_name("prefix"),
            )
            .attribute(
                AttributeSchema::new("access_type", types::enumeration(ACCESS_TYPES))
                    .with_default("PUBLIC")
                    .with_provider_name("access"),
            )
            .attribute(
                AttributeSchema::new("endpoint", AttributeType::String)
                    .with_default("")
                    .with_description("Endpoint of a non-AWS S3 service")
                    .with_provider_name("endpoint"),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(true)
                    .with_provider_name("enabled"),
            )
            .attribute(
                AttributeSchema::new("default", AttributeType::Bool)
                    .with_default(false)
                    .with_provider_name("default"),
            )
            .attribute(
                AttributeSchema::new("use_https", AttributeType::Bool)
                    .with_default(false)
                    .with_provider_name("useHTTPS"),
            )
            .attribute(
                AttributeSchema::new("use_gzip", AttributeType::Bool)
                    .with_default(false)
                    .with_provider_name("useGzip"),
            )
            .attribute(
                AttributeSchema::new("max_connections", types::positive_int())
                    .with_default(50)
                    .with_provider_name("maxConnections"),
            ),
    )
}
