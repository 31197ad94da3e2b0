//! Provider - Trait abstracting resource operations
//!
//! A Provider exposes the lifecycle of every resource type it knows
//! (create, read, update, delete, import) to the plugin transport. All
//! errors crossing this boundary are [`ProviderError`]s tagged with an
//! [`ErrorKind`] the orchestrator can act on.

use std::future::Future;
use std::pin::Pin;

use crate::differ::Diff;
use crate::identifier::IdentifierError;
use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Classification of a provider error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Schema constraint violated; nothing was sent to the remote service
    Validation,
    /// Identifier does not decode into the expected components
    MalformedIdentifier,
    /// A creation-only attribute changed and an in-place update was requested
    ReplacementRequired,
    /// The remote service reported a failure
    Remote,
    /// Provider configuration is invalid or an endpoint is unreachable
    Configuration,
    /// The requested resource type is not served by this provider
    UnknownResourceType,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::MalformedIdentifier => "malformed_identifier",
            ErrorKind::ReplacementRequired => "replacement_required",
            ErrorKind::Remote => "remote",
            ErrorKind::Configuration => "configuration",
            ErrorKind::UnknownResourceType => "unknown_resource_type",
        }
    }
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn unknown_resource_type(resource_type: &str) -> Self {
        Self::new(
            ErrorKind::UnknownResourceType,
            format!("Unknown resource type: {}", resource_type),
        )
    }

    /// Collect schema violations into a single validation error
    pub fn from_type_errors(errors: &[TypeError]) -> Self {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::validation(message)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl From<IdentifierError> for ProviderError {
    fn from(e: IdentifierError) -> Self {
        ProviderError::new(ErrorKind::MalformedIdentifier, e.to_string()).with_cause(e)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "geoserver_workspace")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects against the remote
/// service, except `validate` and `plan`, which are local.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "geoserver")
    fn name(&self) -> &'static str;

    /// Schema of the provider-wide configuration block
    fn config_schema(&self) -> ResourceSchema;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Validate and apply provider configuration; probes endpoint reachability
    fn configure(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<()>>;

    /// Check attributes against the resource schema without remote calls
    fn validate(&self, resource: &Resource) -> ProviderResult<()>;

    /// Decide how to move from the current state to the desired one
    fn plan(&self, desired: &Resource, current: &State) -> ProviderResult<Diff>;

    /// Get the current state of a resource
    ///
    /// `prior` is the last persisted state; it carries derived flags that
    /// decide which optional substructures are reported.
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the composite remote key
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Adopt an existing remote object by its raw identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn config_schema(&self) -> ResourceSchema {
        (**self).config_schema()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn configure(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).configure(config)
    }

    fn validate(&self, resource: &Resource) -> ProviderResult<()> {
        (**self).validate(resource)
    }

    fn plan(&self, desired: &Resource, current: &State) -> ProviderResult<Diff> {
        (**self).plan(desired, current)
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: &str,
        prior: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier, prior)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn config_schema(&self) -> ResourceSchema {
            ResourceSchema::new("mock")
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn configure(&self, _config: &Attributes) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn validate(&self, _resource: &Resource) -> ProviderResult<()> {
            Ok(())
        }

        fn plan(&self, desired: &Resource, current: &State) -> ProviderResult<Diff> {
            Ok(differ::diff(desired, current, &ResourceSchema::new("test")))
        }

        fn read(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _prior: &Attributes,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock/123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(&self, _id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn import(
            &self,
            id: &ResourceId,
            identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let identifier = identifier.to_string();
            Box::pin(async move { Ok(State::existing(id, Attributes::new()).with_identifier(identifier)) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        let id = ResourceId::new("test", "example");
        let state = provider.read(&id, "a/b", &Attributes::new()).await.unwrap();
        assert!(!state.exists);
        assert!(state.identifier.is_none());
    }

    #[tokio::test]
    async fn mock_provider_create_returns_existing() {
        let provider = MockProvider;
        let resource = Resource::new("test", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock/123".to_string()));
    }

    #[test]
    fn error_display_includes_resource() {
        let err = ProviderError::remote("boom")
            .for_resource(ResourceId::new("geoserver_workspace", "demo"));
        assert_eq!(err.to_string(), "[geoserver_workspace.demo] boom");
        assert_eq!(err.kind, ErrorKind::Remote);
    }

    #[test]
    fn identifier_error_maps_to_malformed_identifier() {
        let err: ProviderError = IdentifierError::WrongArity {
            raw: "demo".to_string(),
            expected: "2".to_string(),
            found: 1,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::MalformedIdentifier);
        assert!(err.message.contains("expected 2 component(s)"));
    }

    #[test]
    fn type_errors_join_into_validation_error() {
        let err = ProviderError::from_type_errors(&[
            TypeError::MissingRequired {
                name: "name".to_string(),
            },
            TypeError::OutOfRange {
                value: 300,
                min: 0,
                max: 255,
            },
        ]);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(
            err.message,
            "Required attribute 'name' is missing; Value 300 is out of range, expected 0 to 255"
        );
    }
}
