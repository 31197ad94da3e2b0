//! GeoServer Provider implementation
//!
//! One generic engine drives the lifecycle of every entity kind. The
//! per-kind differences (paths, DTO shape, singletons, cascades, opt-in
//! substructures) come from the [`GeoserverSchemaConfig`] tables in
//! `schemas`, so no kind has a handler of its own.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use geotf_core::differ::{self, Diff};
use geotf_core::provider::{ErrorKind, ProviderError, ProviderResult};
use geotf_core::resource::{Attributes, Resource, ResourceId, State, Value};
use tracing::{debug, info, warn};

use crate::client::{RemoteError, RestClient};
use crate::config::{ConnectionConfig, ProviderConfig};
use crate::mapping::{attributes_from_dto, dto_from_attributes, str_attr, unwrap, wrap};
use crate::resources::configs;
use crate::schemas::{GeoserverSchemaConfig, Payload, WriteMethod, has_dot_segment, render_path};

/// GeoServer / GeoWebCache Provider
pub struct GeoserverProvider {
    connection: OnceLock<Arc<ConnectionConfig>>,
    configs: HashMap<&'static str, GeoserverSchemaConfig>,
}

impl Default for GeoserverProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoserverProvider {
    /// Create an unconfigured provider; `configure` must run before any
    /// remote operation
    pub fn new() -> Self {
        Self {
            connection: OnceLock::new(),
            configs: configs().into_iter().map(|c| (c.resource_type, c)).collect(),
        }
    }

    /// Create a provider bound to an already resolved connection
    pub fn with_connection(connection: ConnectionConfig) -> Self {
        let provider = Self::new();
        let _ = provider.connection.set(Arc::new(connection));
        provider
    }

    fn schema_config(&self, id: &ResourceId) -> ProviderResult<&GeoserverSchemaConfig> {
        self.configs.get(id.resource_type.as_str()).ok_or_else(|| {
            ProviderError::unknown_resource_type(&id.resource_type).for_resource(id.clone())
        })
    }

    fn connection(&self) -> ProviderResult<&ConnectionConfig> {
        self.connection
            .get()
            .map(Arc::as_ref)
            .ok_or_else(|| ProviderError::configuration("Provider is not configured"))
    }

    fn client(&self, id: &ResourceId, config: &GeoserverSchemaConfig) -> ProviderResult<RestClient> {
        self.connection()?
            .client(config.service)
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Validate the provider block, resolve it and probe both services
    pub async fn configure_provider(&self, attributes: &Attributes) -> ProviderResult<()> {
        let mut attributes = attributes.clone();
        ProviderConfig::schema().apply_defaults(&mut attributes);
        let connection = ProviderConfig::from_attributes(&attributes)?.resolve()?;
        debug!("Resolved connection: {:?}", connection);
        connection.probe().await?;

        self.connection
            .set(Arc::new(connection))
            .map_err(|_| ProviderError::configuration("Provider is already configured"))
    }

    // =========================================================================
    // Local operations
    // =========================================================================

    /// Check desired attributes against the schema; no remote call is made
    pub fn validate_resource(&self, resource: &Resource) -> ProviderResult<()> {
        let config = self.schema_config(&resource.id)?;
        let mut attributes = resource.attributes.clone();
        config.schema.apply_defaults(&mut attributes);
        check_attributes(config, &resource.id, &attributes)
    }

    /// Diff desired against current state
    pub fn plan_resource(&self, desired: &Resource, current: &State) -> ProviderResult<Diff> {
        let config = self.schema_config(&desired.id)?;
        Ok(differ::diff(desired, current, &config.schema))
    }

    // =========================================================================
    // Remote writes
    // =========================================================================

    /// Send the object itself: the JSON document, or the raw body
    async fn write_object(
        &self,
        client: &RestClient,
        config: &GeoserverSchemaConfig,
        attributes: &Attributes,
        creating: bool,
    ) -> Result<(), RemoteError> {
        let item = render_path(config.endpoint.item, attributes);

        match config.payload {
            Payload::Json { root } => {
                let mut dto = dto_from_attributes(&config.schema, attributes);
                if let Some(encode) = config.hooks.encode {
                    encode(attributes, &mut dto);
                }
                let body = wrap(root, dto);

                let (method, query) = if creating {
                    (config.endpoint.create, create_query(config, attributes))
                } else {
                    (config.endpoint.update, Vec::new())
                };
                match method {
                    WriteMethod::Post if creating => {
                        let collection = render_path(config.endpoint.collection, attributes);
                        client.post_json(&collection, &query, &body).await
                    }
                    WriteMethod::Post => client.post_json(&item, &query, &body).await,
                    WriteMethod::Put => client.put_json(&item, &query, &body).await,
                }
            }
            Payload::Raw {
                attribute,
                content_type,
            } => {
                client
                    .put_raw(&item, content_type, str_attr(attributes, attribute).to_string())
                    .await
            }
        }
    }

    /// Upload the body of content bearing kinds (style definitions)
    async fn upload_content(
        &self,
        client: &RestClient,
        config: &GeoserverSchemaConfig,
        attributes: &Attributes,
    ) -> Result<(), RemoteError> {
        let Some(content) = config.content else {
            return Ok(());
        };
        let item = render_path(config.endpoint.item, attributes);
        client
            .put_raw(
                &item,
                (content.content_type)(attributes),
                str_attr(attributes, content.attribute).to_string(),
            )
            .await
    }

    /// Best-effort removal of a partially created object
    async fn compensate(
        &self,
        client: &RestClient,
        config: &GeoserverSchemaConfig,
        attributes: &Attributes,
    ) {
        let item = render_path(config.endpoint.item, attributes);
        warn!(
            "Creation of {} failed, deleting partially created object {}",
            config.resource_type, item
        );
        match client.delete(&item, config.endpoint.delete_query).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("Compensating delete of {} failed: {}", item, e),
        }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its identifier
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
    ) -> ProviderResult<State> {
        let config = self.schema_config(id)?;
        let keys = decode_keys(config, id, identifier)?;

        info!("Reading {} {}", config.resource_type, identifier);

        let client = self.client(id, config)?;
        let item = render_path(config.endpoint.item, &keys);

        let mut attributes = match config.payload {
            Payload::Json { root } => match client.get_json(&item).await {
                Ok(document) => {
                    let dto = unwrap(root, &document);
                    let mut attributes = attributes_from_dto(&config.schema, dto);
                    if let Some(decode) = config.hooks.decode {
                        decode(dto, &mut attributes);
                    }
                    attributes
                }
                Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
                Err(e) => return Err(remote_error(id, "read", e)),
            },
            Payload::Raw {
                attribute,
                content_type,
            } => match client.get_raw(&item, content_type).await {
                Ok(body) => Attributes::from([(attribute.to_string(), Value::String(body))]),
                Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
                Err(e) => return Err(remote_error(id, "read", e)),
            },
        };

        // Keys always come from the identifier
        attributes.extend(keys);

        if let Some(content) = config.content {
            let accept = (content.content_type)(&attributes);
            let body = match client.get_raw(&item, accept).await {
                Ok(body) => body,
                Err(e) if e.is_not_found() => String::new(),
                Err(e) => return Err(remote_error(id, "read", e)),
            };
            attributes.insert(content.attribute.to_string(), Value::String(body));
        }

        for opt_in in config.opt_in {
            let wanted = prior
                .get(opt_in.flag)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !wanted {
                attributes.remove(opt_in.attribute);
            }
            attributes.insert(opt_in.flag.to_string(), Value::Bool(wanted));
        }

        // Values the remote never reports back
        for (name, attr) in &config.schema.attributes {
            let unreported = attr.sensitive || attr.provider_name.is_none();
            if unreported
                && !attr.computed
                && !attributes.contains_key(name)
                && let Some(value) = prior.get(name)
            {
                attributes.insert(name.clone(), value.clone());
            }
        }

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Create a resource
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = resource.id.clone();
        let config = self.schema_config(&id)?;

        let mut attributes = resource.attributes;
        config.schema.apply_defaults(&mut attributes);
        check_attributes(config, &id, &attributes)?;

        let identifier = config
            .identity
            .from_attributes(&attributes)
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?
            .encode();

        info!("Creating {} {}", config.resource_type, identifier);

        let client = self.client(&id, config)?;
        let singleton = config.identity.is_singleton();

        // Singletons always exist: creating one replaces its configuration
        if let Err(e) = self
            .write_object(&client, config, &attributes, !singleton)
            .await
        {
            if e.is_conflict() {
                warn!(
                    "{} {} already exists, leaving it in place",
                    config.resource_type, identifier
                );
            } else if config.compensate_on_failure && !singleton {
                self.compensate(&client, config, &attributes).await;
            }
            return Err(remote_error(&id, "create", e));
        }

        if let Err(e) = self.upload_content(&client, config, &attributes).await {
            if !singleton {
                self.compensate(&client, config, &attributes).await;
            }
            return Err(remote_error(&id, "create", e));
        }

        let prior = with_opt_in_flags(config, attributes, None);
        let state = self.read_resource(&id, &identifier, &prior).await?;
        if !state.exists {
            return Err(ProviderError::remote(format!(
                "{} {} was not found after creation",
                config.resource_type, identifier
            ))
            .for_resource(id));
        }
        Ok(state)
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let config = self.schema_config(id)?;

        if let Diff::Replace {
            forcing_attributes, ..
        } = differ::diff(&to, from, &config.schema)
        {
            return Err(ProviderError::new(
                ErrorKind::ReplacementRequired,
                format!(
                    "Changing {} requires replacing {} {}",
                    forcing_attributes.join(", "),
                    config.resource_type,
                    identifier
                ),
            )
            .for_resource(id.clone()));
        }

        let mut attributes = to.attributes;
        config.schema.apply_defaults(&mut attributes);
        check_attributes(config, id, &attributes)?;
        let keys = decode_keys(config, id, identifier)?;
        attributes.extend(keys);

        info!("Updating {} {}", config.resource_type, identifier);

        let client = self.client(id, config)?;
        self.write_object(&client, config, &attributes, false)
            .await
            .map_err(|e| remote_error(id, "update", e))?;
        self.upload_content(&client, config, &attributes)
            .await
            .map_err(|e| remote_error(id, "update", e))?;

        let prior = with_opt_in_flags(config, attributes, Some(&from.attributes));
        self.read_resource(id, identifier, &prior).await
    }

    /// Delete a resource and the dependents that would block its removal
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let config = self.schema_config(id)?;
        let keys = decode_keys(config, id, identifier)?;

        if config.identity.is_singleton() {
            info!(
                "{} {} cannot be deleted, leaving remote configuration untouched",
                config.resource_type, identifier
            );
            return Ok(());
        }

        info!("Deleting {} {}", config.resource_type, identifier);

        let client = self.client(id, config)?;

        for dependent in config.dependents {
            let path = render_path(dependent, &keys);
            match client.delete(&path, &[]).await {
                Ok(()) => debug!("Deleted dependent {}", path),
                Err(e) if e.is_not_found() => {
                    warn!("Dependent {} not found, skipping", path)
                }
                Err(e) => return Err(remote_error(id, "delete", e)),
            }
        }

        let item = render_path(config.endpoint.item, &keys);
        client
            .delete(&item, config.endpoint.delete_query)
            .await
            .map_err(|e| remote_error(id, "delete", e))
    }

    /// Adopt an existing remote object
    pub async fn import_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let config = self.schema_config(id)?;
        let seeded = decode_keys(config, id, identifier)?;

        info!("Importing {} {}", config.resource_type, identifier);

        // Read every optional substructure, then keep the ones the remote has
        let mut prior = seeded;
        for opt_in in config.opt_in {
            prior.insert(opt_in.flag.to_string(), Value::Bool(true));
        }

        let mut state = self.read_resource(id, identifier, &prior).await?;
        if !state.exists {
            return Err(ProviderError::remote(format!(
                "Cannot import {} {}: no such object",
                config.resource_type, identifier
            ))
            .for_resource(id.clone()));
        }

        let attributes = &mut state.attributes;
        for opt_in in config.opt_in {
            let present = is_set(attributes.get(opt_in.attribute));
            if !present {
                attributes.remove(opt_in.attribute);
            }
            attributes.insert(opt_in.flag.to_string(), Value::Bool(present));
        }

        // The remote never reports these; assume the configuration defaults
        for (name, attr) in &config.schema.attributes {
            let unreported = attr.sensitive || attr.provider_name.is_none();
            if unreported
                && !attr.computed
                && !attributes.contains_key(name)
                && let Some(default) = &attr.default
            {
                attributes.insert(name.clone(), default.clone());
            }
        }

        let canonical = config
            .identity
            .from_attributes(&state.attributes)
            .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?
            .encode();
        Ok(state.with_identifier(canonical))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_attributes(
    config: &GeoserverSchemaConfig,
    id: &ResourceId,
    attributes: &Attributes,
) -> ProviderResult<()> {
    config
        .schema
        .validate(attributes)
        .map_err(|errors| ProviderError::from_type_errors(&errors).for_resource(id.clone()))?;

    for key in config.identity.key_attributes() {
        let value = str_attr(attributes, key);
        if has_dot_segment(value) {
            return Err(ProviderError::validation(format!(
                "Attribute '{}' must not contain '.' or '..' path segments: '{}'",
                key, value
            ))
            .for_resource(id.clone()));
        }
    }
    Ok(())
}

/// Decode an identifier into key attributes usable in a request path
fn decode_keys(
    config: &GeoserverSchemaConfig,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<Attributes> {
    let keys = config
        .identity
        .decode(identifier)
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
    if keys
        .values()
        .any(|value| value.as_str().is_some_and(has_dot_segment))
    {
        return Err(ProviderError::new(
            ErrorKind::MalformedIdentifier,
            format!(
                "Malformed identifier '{}': '.' and '..' are not valid names",
                identifier
            ),
        )
        .for_resource(id.clone()));
    }
    Ok(keys)
}

fn remote_error(id: &ResourceId, action: &str, e: RemoteError) -> ProviderError {
    ProviderError::remote(format!("Failed to {} {}: {}", action, id.resource_type, e))
        .for_resource(id.clone())
        .with_cause(e)
}

/// Boolean attributes sent as `?name=true` on creation
fn create_query(
    config: &GeoserverSchemaConfig,
    attributes: &Attributes,
) -> Vec<(&'static str, &'static str)> {
    config
        .endpoint
        .create_query
        .iter()
        .filter(|name| attributes.get(**name).and_then(Value::as_bool) == Some(true))
        .map(|name| (*name, "true"))
        .collect()
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::List(items)) => !items.is_empty(),
        Some(Value::Map(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

/// Record which optional substructures the user opted into
///
/// Once set, a flag stays set for the lifetime of the resource.
fn with_opt_in_flags(
    config: &GeoserverSchemaConfig,
    mut attributes: Attributes,
    previous: Option<&Attributes>,
) -> Attributes {
    for opt_in in config.opt_in {
        let before = previous
            .and_then(|p| p.get(opt_in.flag))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let wanted = before || is_set(attributes.get(opt_in.attribute));
        attributes.insert(opt_in.flag.to_string(), Value::Bool(wanted));
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::get_resource_config;

    fn featuretype_attributes(with_attribute_list: bool) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("roads"));
        if with_attribute_list {
            attrs.insert(
                "attribute".to_string(),
                Value::List(vec![Value::Map(
                    [
                        ("name".to_string(), Value::from("geom")),
                        ("binding".to_string(), Value::from("org.locationtech.jts.geom.LineString")),
                    ]
                    .into_iter()
                    .collect(),
                )]),
            );
        }
        attrs
    }

    #[test]
    fn opt_in_flag_follows_desired_attribute() {
        let config = get_resource_config("geoserver_featuretype").unwrap();

        let prior = with_opt_in_flags(&config, featuretype_attributes(true), None);
        assert_eq!(prior["custom_attributes"], Value::Bool(true));

        let prior = with_opt_in_flags(&config, featuretype_attributes(false), None);
        assert_eq!(prior["custom_attributes"], Value::Bool(false));
    }

    #[test]
    fn opt_in_flag_is_sticky() {
        let config = get_resource_config("geoserver_featuretype").unwrap();
        let mut previous = Attributes::new();
        previous.insert("custom_attributes".to_string(), Value::Bool(true));

        let prior = with_opt_in_flags(&config, featuretype_attributes(false), Some(&previous));
        assert_eq!(prior["custom_attributes"], Value::Bool(true));
    }

    #[test]
    fn create_query_only_sends_true_flags() {
        let config = get_resource_config("geoserver_workspace").unwrap();
        let mut attrs = Attributes::new();
        attrs.insert("default".to_string(), Value::Bool(false));
        assert!(create_query(&config, &attrs).is_empty());
        attrs.insert("default".to_string(), Value::Bool(true));
        assert_eq!(create_query(&config, &attrs), vec![("default", "true")]);
    }

    #[test]
    fn validate_without_configuration() {
        let provider = GeoserverProvider::new();
        let resource = Resource::new("geoserver_workspace", "demo").with_attribute("name", "demo");
        assert!(provider.validate_resource(&resource).is_ok());

        let resource = Resource::new("geoserver_workspace", "demo").with_attribute("name", 5i64);
        let err = provider.validate_resource(&resource).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn unknown_resource_type_is_reported() {
        let provider = GeoserverProvider::new();
        let resource = Resource::new("geoserver_coverage", "x");
        let err = provider.validate_resource(&resource).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownResourceType);
    }

    #[tokio::test]
    async fn remote_operations_require_configuration() {
        let provider = GeoserverProvider::new();
        let id = ResourceId::new("geoserver_workspace", "demo");
        let err = provider.read_resource(&id, "demo", &Attributes::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn dot_segment_names_are_rejected() {
        let provider = GeoserverProvider::new();
        for name in ["..", ".", "a/../b"] {
            let resource = Resource::new("geoserver_workspace", "demo").with_attribute("name", name);
            let err = provider.validate_resource(&resource).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "name {:?}", name);
        }

        let resource = Resource::new("geoserver_workspace", "demo").with_attribute("name", "a/b");
        assert!(provider.validate_resource(&resource).is_ok());
    }

    #[tokio::test]
    async fn dot_segment_identifiers_are_malformed() {
        let provider = GeoserverProvider::new();
        let id = ResourceId::new("geoserver_datastore", "pg");
        let err = provider.read_resource(&id, "demo/..", &Attributes::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedIdentifier);

        let err = provider.delete_resource(&id, "./pg").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedIdentifier);
    }

    #[test]
    fn provider_set_flags_cannot_be_configured() {
        let provider = GeoserverProvider::new();
        let mut resource = Resource::new("geoserver_featuretype", "roads")
            .with_attributes(featuretype_attributes(true))
            .with_attribute("workspace_name", "demo")
            .with_attribute("datastore_name", "pg")
            .with_attribute("native_name", "roads")
            .with_attribute("srs", "EPSG:4326");
        assert!(provider.validate_resource(&resource).is_ok());

        resource = resource.with_attribute("custom_attributes", true);
        let err = provider.validate_resource(&resource).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("custom_attributes"));
    }

    #[tokio::test]
    async fn singleton_delete_needs_no_connection() {
        let provider = GeoserverProvider::new();
        let id = ResourceId::new("gwc_disk_quota", "quota");
        assert!(provider.delete_resource(&id, "gwc_disk_quota_singleton").await.is_ok());

        let err = provider.delete_resource(&id, "something_else").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedIdentifier);
    }
}
