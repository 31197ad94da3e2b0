//! Plugin protocol - newline-delimited JSON over stdio
//!
//! Each request line is `{"id": n, "method": m, "params": {...}}` and is
//! answered by exactly one response line, `{"id": n, "result": ...}` or
//! `{"id": n, "error": {"kind": k, "message": s}}`. Requests are served one
//! at a time in arrival order.

use geotf_core::differ::Diff;
use geotf_core::provider::{Provider, ProviderError};
use geotf_core::resource::{
    Attributes, Resource, ResourceId, State, attributes_from_json, attributes_to_json,
};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Line written to stdout before the first request is read
pub const HANDSHAKE: &str = "GEOTF_PROVIDER|1|stdio";

/// Error kind reported for requests the transport cannot make sense of
const PROTOCOL_ERROR: &str = "protocol";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Missing parameter '{0}'")]
    MissingParam(&'static str),

    #[error("Invalid params: {0}")]
    InvalidParams(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<ProviderError> for ErrorBody {
    fn from(e: ProviderError) -> Self {
        Self {
            kind: e.kind.as_str().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<ProtocolError> for ErrorBody {
    fn from(e: ProtocolError) -> Self {
        Self {
            kind: PROTOCOL_ERROR.to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn success(id: u64, result: Json) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: u64, error: ErrorBody) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Prior state as sent by the orchestrator
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StateParams {
    identifier: Option<String>,
    attributes: Json,
    exists: bool,
}

/// Union of the parameters of every method; each method picks what it needs
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Params {
    #[serde(rename = "type")]
    resource_type: Option<String>,
    name: Option<String>,
    identifier: Option<String>,
    attributes: Json,
    prior: Json,
    state: Option<StateParams>,
    config: Json,
}

impl Params {
    fn resource_id(&self) -> Result<ResourceId, ProtocolError> {
        let resource_type = self
            .resource_type
            .as_deref()
            .ok_or(ProtocolError::MissingParam("type"))?;
        let name = self.name.as_deref().unwrap_or(resource_type);
        Ok(ResourceId::new(resource_type, name))
    }

    fn resource(&self) -> Result<Resource, ProtocolError> {
        let id = self.resource_id()?;
        Ok(Resource {
            id,
            attributes: attributes_from_json(&self.attributes),
        })
    }

    fn identifier(&self) -> Result<&str, ProtocolError> {
        self.identifier
            .as_deref()
            .ok_or(ProtocolError::MissingParam("identifier"))
    }

    fn state(&self) -> Result<State, ProtocolError> {
        let id = self.resource_id()?;
        let Some(params) = &self.state else {
            return Ok(State::not_found(id));
        };
        if !params.exists {
            return Ok(State::not_found(id));
        }
        let state = State::existing(id, attributes_from_json(&params.attributes));
        Ok(match &params.identifier {
            Some(identifier) => state.with_identifier(identifier.clone()),
            None => state,
        })
    }
}

fn state_to_json(state: &State) -> Json {
    json!({
        "identifier": state.identifier,
        "exists": state.exists,
        "attributes": attributes_to_json(&state.attributes),
    })
}

fn diff_to_json(diff: &Diff) -> Json {
    let none: &[String] = &[];
    let (changed, forcing) = match diff {
        Diff::Update { changed_attributes } => (changed_attributes.as_slice(), none),
        Diff::Replace {
            changed_attributes,
            forcing_attributes,
        } => (changed_attributes.as_slice(), forcing_attributes.as_slice()),
        Diff::Create | Diff::NoChange => (none, none),
    };
    json!({
        "action": diff.action(),
        "changed_attributes": changed,
        "forcing_attributes": forcing,
    })
}

fn attribute_to_json(attr: &AttributeSchema) -> Json {
    let mut json = json!({
        "type": attr.attr_type.to_string(),
        "required": attr.required,
        "force_new": attr.force_new,
        "computed": attr.computed,
        "sensitive": attr.sensitive,
    });
    if let Some(description) = &attr.description {
        json["description"] = json!(description);
    }
    if let Some(default) = &attr.default {
        json["default"] = default.to_json();
    }
    describe_type(&attr.attr_type, &mut json);
    json
}

/// Constraints a client needs beyond the type name
fn describe_type(attr_type: &AttributeType, json: &mut Json) {
    match attr_type {
        AttributeType::Enum(variants) => json["enum"] = json!(variants),
        AttributeType::IntRange { min, max } => {
            json["min"] = json!(min);
            json["max"] = json!(max);
        }
        AttributeType::Custom { base, .. } => describe_type(base, json),
        AttributeType::List(inner) | AttributeType::Map(inner) => describe_type(inner, json),
        AttributeType::Block(fields) => {
            let block: Map<String, Json> = fields
                .iter()
                .map(|f| (f.name.clone(), attribute_to_json(f)))
                .collect();
            json["block"] = Json::Object(block);
        }
        _ => {}
    }
}

/// JSON description of a schema, as returned by the `schema` method
pub fn schema_to_json(schema: &ResourceSchema) -> Json {
    let attributes: Map<String, Json> = schema
        .attributes
        .iter()
        .map(|(name, attr)| (name.clone(), attribute_to_json(attr)))
        .collect();
    json!({
        "description": schema.description,
        "attributes": attributes,
    })
}

async fn handle(provider: &dyn Provider, method: &str, params: Params) -> Result<Json, ErrorBody> {
    match method {
        "schema" => {
            let resources: Map<String, Json> = provider
                .resource_types()
                .iter()
                .map(|rt| (rt.name().to_string(), schema_to_json(&rt.schema())))
                .collect();
            Ok(json!({
                "provider": schema_to_json(&provider.config_schema()),
                "resources": resources,
            }))
        }
        "configure" => {
            provider
                .configure(&attributes_from_json(&params.config))
                .await?;
            Ok(Json::Null)
        }
        "validate" => {
            provider.validate(&params.resource()?)?;
            Ok(Json::Null)
        }
        "plan" => {
            let diff = provider.plan(&params.resource()?, &params.state()?)?;
            Ok(diff_to_json(&diff))
        }
        "create" => {
            let state = provider.create(&params.resource()?).await?;
            Ok(state_to_json(&state))
        }
        "read" => {
            let prior: Attributes = attributes_from_json(&params.prior);
            let state = provider
                .read(&params.resource_id()?, params.identifier()?, &prior)
                .await?;
            Ok(state_to_json(&state))
        }
        "update" => {
            let state = provider
                .update(
                    &params.resource_id()?,
                    params.identifier()?,
                    &params.state()?,
                    &params.resource()?,
                )
                .await?;
            Ok(state_to_json(&state))
        }
        "delete" => {
            provider
                .delete(&params.resource_id()?, params.identifier()?)
                .await?;
            Ok(Json::Null)
        }
        "import" => {
            let state = provider
                .import(&params.resource_id()?, params.identifier()?)
                .await?;
            Ok(state_to_json(&state))
        }
        other => Err(ProtocolError::UnknownMethod(other.to_string()).into()),
    }
}

/// Answer a single request
pub async fn dispatch(provider: &dyn Provider, request: Request) -> Response {
    debug!("Request {} {}", request.id, request.method);

    let params = if request.params.is_null() {
        Ok(Params::default())
    } else {
        serde_json::from_value::<Params>(request.params).map_err(ProtocolError::from)
    };
    let outcome = match params {
        Ok(params) => handle(provider, &request.method, params).await,
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(result) => Response::success(request.id, result),
        Err(error) => {
            warn!("{} failed: {}", request.method, error.message);
            Response::failure(request.id, error)
        }
    }
}

/// Decode one request line; an unparsable line is answered with a protocol error
async fn answer(provider: &dyn Provider, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(provider, request).await,
        Err(e) => {
            let id = serde_json::from_str::<Json>(line)
                .ok()
                .and_then(|v| v.get("id").and_then(Json::as_u64))
                .unwrap_or(0);
            Response::failure(id, ProtocolError::InvalidParams(e).into())
        }
    }
}

/// Serve requests from `reader` until EOF, writing one response line each
pub async fn serve<R, W>(provider: &dyn Provider, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = answer(provider, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }
    debug!("Request stream closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotf_core::differ;
    use geotf_core::provider::{BoxFuture, ErrorKind, ProviderResult, ResourceType};
    use geotf_core::resource::Value;
    use geotf_core::schema::types;

    struct MockResourceType;

    impl ResourceType for MockResourceType {
        fn name(&self) -> &'static str {
            "mock_workspace"
        }

        fn schema(&self) -> ResourceSchema {
            mock_schema()
        }
    }

    fn mock_schema() -> ResourceSchema {
        ResourceSchema::new("mock_workspace")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("mode", types::enumeration(&["SINGLE", "NAMED"]))
                    .with_default("SINGLE"),
            )
    }

    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn config_schema(&self) -> ResourceSchema {
            ResourceSchema::new("mock")
                .attribute(AttributeSchema::new("url", AttributeType::String).required())
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![Box::new(MockResourceType)]
        }

        fn configure(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<()>> {
            let configured = config.contains_key("url");
            Box::pin(async move {
                if configured {
                    Ok(())
                } else {
                    Err(ProviderError::configuration("url is required"))
                }
            })
        }

        fn validate(&self, resource: &Resource) -> ProviderResult<()> {
            mock_schema()
                .validate(&resource.attributes)
                .map_err(|errors| ProviderError::from_type_errors(&errors))
        }

        fn plan(&self, desired: &Resource, current: &State) -> ProviderResult<Diff> {
            Ok(differ::diff(desired, current, &mock_schema()))
        }

        fn read(
            &self,
            id: &ResourceId,
            identifier: &str,
            prior: &Attributes,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let state = if identifier == "missing" {
                State::not_found(id.clone())
            } else {
                State::existing(id.clone(), prior.clone()).with_identifier(identifier)
            };
            Box::pin(async move { Ok(state) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let identifier = resource
                .attributes
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let state = State::existing(resource.id.clone(), resource.attributes.clone())
                .with_identifier(identifier);
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            _id: &ResourceId,
            _identifier: &str,
            _from: &State,
            _to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            Box::pin(async {
                Err(ProviderError::new(
                    ErrorKind::ReplacementRequired,
                    "Changing name requires replacement",
                ))
            })
        }

        fn delete(&self, _id: &ResourceId, _identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
            self.read(id, identifier, &Attributes::new())
        }
    }

    async fn call(method: &str, params: Json) -> Response {
        let request = Request {
            id: 7,
            method: method.to_string(),
            params,
        };
        dispatch(&MockProvider, request).await
    }

    #[tokio::test]
    async fn schema_lists_provider_and_resources() {
        let response = call("schema", Json::Null).await;
        let result = response.result.unwrap();

        assert_eq!(result["provider"]["attributes"]["url"]["required"], json!(true));
        let mode = &result["resources"]["mock_workspace"]["attributes"]["mode"];
        assert_eq!(mode["enum"], json!(["SINGLE", "NAMED"]));
        assert_eq!(mode["default"], json!("SINGLE"));
        assert_eq!(
            result["resources"]["mock_workspace"]["attributes"]["name"]["force_new"],
            json!(true)
        );
    }

    #[tokio::test]
    async fn create_returns_state() {
        let response = call(
            "create",
            json!({"type": "mock_workspace", "name": "demo", "attributes": {"name": "demo"}}),
        )
        .await;

        assert_eq!(response.id, 7);
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["identifier"], json!("demo"));
        assert_eq!(result["exists"], json!(true));
        assert_eq!(result["attributes"]["name"], json!("demo"));
    }

    #[tokio::test]
    async fn read_of_missing_object_has_no_identifier() {
        let response = call(
            "read",
            json!({"type": "mock_workspace", "identifier": "missing"}),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["exists"], json!(false));
        assert_eq!(result["identifier"], Json::Null);
    }

    #[tokio::test]
    async fn validation_errors_carry_their_kind() {
        let response = call(
            "validate",
            json!({"type": "mock_workspace", "attributes": {"name": "demo", "mode": "MIXED"}}),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.kind, "validation");
        assert!(error.message.contains("MIXED"));
    }

    #[tokio::test]
    async fn plan_reports_replacement() {
        let response = call(
            "plan",
            json!({
                "type": "mock_workspace",
                "attributes": {"name": "renamed"},
                "state": {"identifier": "demo", "exists": true, "attributes": {"name": "demo", "mode": "SINGLE"}}
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["action"], json!("replace"));
        assert_eq!(result["forcing_attributes"], json!(["name"]));
    }

    #[tokio::test]
    async fn plan_without_state_creates() {
        let response = call(
            "plan",
            json!({"type": "mock_workspace", "attributes": {"name": "demo"}}),
        )
        .await;

        assert_eq!(response.result.unwrap()["action"], json!("create"));
    }

    #[tokio::test]
    async fn update_surfaces_replacement_required() {
        let response = call(
            "update",
            json!({
                "type": "mock_workspace",
                "identifier": "demo",
                "attributes": {"name": "renamed"},
                "state": {"identifier": "demo", "exists": true, "attributes": {"name": "demo"}}
            }),
        )
        .await;

        assert_eq!(response.error.unwrap().kind, "replacement_required");
    }

    #[tokio::test]
    async fn delete_returns_null_result() {
        let response = call(
            "delete",
            json!({"type": "mock_workspace", "identifier": "demo"}),
        )
        .await;

        assert_eq!(response.result, Some(Json::Null));
        let line = serde_json::to_string(&response).unwrap();
        assert_eq!(line, r#"{"id":7,"result":null}"#);
    }

    #[tokio::test]
    async fn configure_failure_is_configuration_error() {
        let response = call("configure", json!({"config": {}})).await;
        assert_eq!(response.error.unwrap().kind, "configuration");

        let response = call("configure", json!({"config": {"url": "http://localhost"}})).await;
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn protocol_errors() {
        let response = call("destroy_everything", Json::Null).await;
        let error = response.error.unwrap();
        assert_eq!(error.kind, "protocol");
        assert!(error.message.contains("destroy_everything"));

        let response = call("read", json!({"type": "mock_workspace"})).await;
        let error = response.error.unwrap();
        assert_eq!(error.kind, "protocol");
        assert!(error.message.contains("identifier"));

        let response = call("create", json!({"name": "demo"})).await;
        assert_eq!(response.error.unwrap().kind, "protocol");

        let response = call("create", json!({"type": 5})).await;
        assert_eq!(response.error.unwrap().kind, "protocol");
    }

    #[tokio::test]
    async fn serve_answers_each_line() {
        let input = concat!(
            r#"{"id": 1, "method": "read", "params": {"type": "mock_workspace", "identifier": "demo"}}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"id": 3, "method": "delete", "params": {"type": "mock_workspace", "identifier": "demo"}}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve(&MockProvider, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Json> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], json!(1));
        assert_eq!(responses[0]["result"]["identifier"], json!("demo"));
        assert_eq!(responses[1]["id"], json!(0));
        assert_eq!(responses[1]["error"]["kind"], json!("protocol"));
        assert_eq!(responses[2]["id"], json!(3));
        assert_eq!(responses[2]["result"], Json::Null);
    }

    #[tokio::test]
    async fn unparsable_request_keeps_its_id() {
        let response = answer(&MockProvider, r#"{"id": 12, "params": {}}"#).await;
        assert_eq!(response.id, 12);
        assert_eq!(response.error.unwrap().kind, "protocol");
    }
}
