//! Resource type registry
//!
//! Maps every resource type name served by this provider to its schema
//! configuration.

use geotf_core::provider::ResourceType;
use geotf_core::schema::ResourceSchema;

use crate::schemas::GeoserverSchemaConfig;
use crate::schemas::{
    datastore, featuretype, gwc_blobstore, gwc_disk_quota, gwc_gridset, gwc_wms_layer, layergroup,
    resource, service_wms, stores, style, urlcheck, workspace,
};

/// Returns the schema config of every supported kind
pub fn configs() -> Vec<GeoserverSchemaConfig> {
    vec![
        workspace::geoserver_workspace_config(),
        datastore::geoserver_datastore_config(),
        featuretype::geoserver_featuretype_config(),
        style::geoserver_style_config(),
        layergroup::geoserver_layergroup_config(),
        resource::geoserver_resource_config(),
        urlcheck::geoserver_urlcheck_config(),
        stores::geoserver_wmsstore_config(),
        stores::geoserver_wmts_store_config(),
        stores::geoserver_wms_layer_config(),
        stores::geoserver_wmts_layer_config(),
        service_wms::geoserver_service_wms_config(),
        gwc_blobstore::gwc_file_blobstore_config(),
        gwc_blobstore::gwc_s3_blobstore_config(),
        gwc_gridset::gwc_gridset_config(),
        gwc_wms_layer::gwc_wms_layer_config(),
        gwc_disk_quota::gwc_disk_quota_config(),
    ]
}

/// Get the schema config for a resource type
pub fn get_resource_config(resource_type: &str) -> Option<GeoserverSchemaConfig> {
    configs()
        .into_iter()
        .find(|c| c.resource_type == resource_type)
}

/// A resource type as exposed to the plugin transport
pub struct GeoserverResourceType {
    name: &'static str,
    schema: ResourceSchema,
}

impl ResourceType for GeoserverResourceType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    configs()
        .into_iter()
        .map(|c| {
            Box::new(GeoserverResourceType {
                name: c.resource_type,
                schema: c.schema,
            }) as Box<dyn ResourceType>
        })
        .collect()
}
