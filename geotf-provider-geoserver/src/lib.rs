//! GeoTF GeoServer Provider
//!
//! Manages GeoServer catalog objects and GeoWebCache configuration through
//! their REST APIs.
//!
//! ## Module Structure
//!
//! - `client` - REST client for both services
//! - `config` - Provider block and resolved connection settings
//! - `mapping` - Attribute bag to DTO translation
//! - `provider` - GeoserverProvider, the generic lifecycle engine
//! - `resources` - Resource type registry
//! - `schemas` - Per-kind schema configurations

pub mod client;
pub mod config;
pub mod mapping;
pub mod provider;
pub mod resources;
pub mod schemas;

// Re-export main types
pub use config::{ConnectionConfig, ProviderConfig};
pub use provider::GeoserverProvider;

use geotf_core::differ::Diff;
use geotf_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use geotf_core::resource::{Attributes, Resource, ResourceId, State};
use geotf_core::schema::ResourceSchema;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for GeoserverProvider {
    fn name(&self) -> &'static str {
        "geoserver"
    }

    fn config_schema(&self) -> ResourceSchema {
        ProviderConfig::schema()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn configure(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<()>> {
        let config = config.clone();
        Box::pin(async move { self.configure_provider(&config).await })
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        self.validate_resource(resource)
    }

    fn plan(&self, desired: &Resource, current: &State) -> ProviderResult<Diff> {
        self.plan_resource(desired, current)
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let prior = prior.clone();
        Box::pin(async move { self.read_resource(&id, &identifier, &prior).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.import_resource(&id, &identifier).await })
    }
}
