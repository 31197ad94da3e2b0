//! REST client for GeoServer and GeoWebCache
//!
//! Thin wrapper over `reqwest` that speaks JSON (or raw bodies for style
//! definitions and resource files) with basic authentication. A 404 is
//! reported as [`RemoteError::NotFound`] so callers can tell "absent" apart
//! from every other failure without inspecting messages.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crate::config::ConnectionConfig;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

const JSON: &str = "application/json";

/// Which remote service a resource kind talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Geoserver,
    Tilecache,
}

impl Service {
    pub fn label(&self) -> &'static str {
        match self {
            Service::Geoserver => "GeoServer",
            Service::Tilecache => "GeoWebCache",
        }
    }
}

/// Error returned by the remote adapter
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{path} not found")]
    NotFound { path: String },

    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid JSON returned by {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    /// Whether the remote refused a creation because the object already exists
    ///
    /// GeoServer answers 409 for most kinds but a plain 500 for some, with
    /// the reason only in the body.
    pub fn is_conflict(&self) -> bool {
        match self {
            RemoteError::Status { status: 409, .. } => true,
            RemoteError::Status { body, .. } => body.to_lowercase().contains("already exists"),
            _ => false,
        }
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::NotFound { .. } => Some(404),
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sanitize response body for logging
fn sanitize_for_log(body: &str) -> String {
    let mut truncated: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
    if truncated.len() < body.len() {
        truncated.push_str(&format!("... [truncated, {} bytes total]", body.len()));
    }
    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client bound to one service endpoint
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client for one of the configured services
    pub fn for_service(
        config: &ConnectionConfig,
        service: Service,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("geotf-provider-geoserver/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        let base_url = match service {
            Service::Geoserver => config.url.as_str(),
            Service::Tilecache => config.gwc_url.as_str(),
        };

        tracing::debug!("{} client configured for {}", service.label(), base_url);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let mut builder = self
            .http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder
    }

    /// Send a request and return the response body of a successful call
    async fn send(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<String, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                method: method.clone(),
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport {
                method: method.clone(),
                path: path.to_string(),
                source,
            })?;

        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("{} {} returned 404", method, path);
            return Err(RemoteError::NotFound {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(RemoteError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn parse_json(path: &str, body: &str) -> Result<Value, RemoteError> {
        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body).map_err(|source| RemoteError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// GET a JSON document
    pub async fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let builder = self.request(Method::GET, path, &[]).header(ACCEPT, JSON);
        let body = self.send(Method::GET, path, builder).await?;
        Self::parse_json(path, &body)
    }

    /// POST a JSON document
    pub async fn post_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        payload: &Value,
    ) -> Result<(), RemoteError> {
        self.write_json(Method::POST, path, query, payload).await
    }

    /// PUT a JSON document
    pub async fn put_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        payload: &Value,
    ) -> Result<(), RemoteError> {
        self.write_json(Method::PUT, path, query, payload).await
    }

    async fn write_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        payload: &Value,
    ) -> Result<(), RemoteError> {
        let builder = self
            .request(method.clone(), path, query)
            .header(ACCEPT, JSON)
            .json(payload);
        self.send(method, path, builder).await?;
        Ok(())
    }

    /// GET a raw body in the given representation
    pub async fn get_raw(&self, path: &str, accept: &str) -> Result<String, RemoteError> {
        let builder = self.request(Method::GET, path, &[]).header(ACCEPT, accept);
        self.send(Method::GET, path, builder).await
    }

    /// PUT a raw body with the given content type
    pub async fn put_raw(
        &self,
        path: &str,
        content_type: &str,
        payload: String,
    ) -> Result<(), RemoteError> {
        let builder = self
            .request(Method::PUT, path, &[])
            .header(CONTENT_TYPE, content_type)
            .body(payload);
        self.send(Method::PUT, path, builder).await?;
        Ok(())
    }

    /// DELETE an object; `query` carries cascade flags such as `recurse=true`
    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<(), RemoteError> {
        let builder = self.request(Method::DELETE, path, query);
        self.send(Method::DELETE, path, builder).await?;
        Ok(())
    }
}
