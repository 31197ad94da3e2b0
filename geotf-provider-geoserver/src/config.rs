//! Provider configuration
//!
//! `ProviderConfig` is the provider block as written by the user;
//! `ConnectionConfig` is the resolved, immutable connection context passed
//! to every lifecycle operation.

use geotf_core::provider::{ErrorKind, ProviderError};
use geotf_core::resource::{Attributes, attributes_to_json};
use geotf_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use url::Url;

use crate::client::{RemoteError, RestClient, Service};

pub const URL_ENV: &[&str] = &["SERVICE_URL", "GEOSERVER_URL"];
pub const GWC_URL_ENV: &[&str] = &["TILECACHE_URL", "GEOSERVER_GWC_URL"];
pub const USERNAME_ENV: &[&str] = &["SERVICE_USERNAME", "GEOSERVER_USERNAME"];
pub const PASSWORD_ENV: &[&str] = &["SERVICE_PASSWORD", "GEOSERVER_PASSWORD"];

/// Path probed on each service at configuration time
const GEOSERVER_PROBE_PATH: &str = "/rest/about/version";
const TILECACHE_PROBE_PATH: &str = "/rest/gridsets";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid provider configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting '{setting}' (set it in the provider block or via {})", env.join(" or "))]
    Missing {
        setting: &'static str,
        env: &'static [&'static str],
    },

    #[error("Setting '{setting}' is not a valid URL ({value}): {source}")]
    InvalidUrl {
        setting: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{service} endpoint {url} is unreachable: {source}")]
    Unreachable {
        service: &'static str,
        url: String,
        #[source]
        source: RemoteError,
    },
}

impl From<ConfigError> for ProviderError {
    fn from(e: ConfigError) -> Self {
        ProviderError::new(ErrorKind::Configuration, e.to_string()).with_cause(e)
    }
}

/// Provider block as written in configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub url: Option<String>,
    pub gwc_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub insecure: bool,
}

impl ProviderConfig {
    /// Schema of the provider block
    pub fn schema() -> ResourceSchema {
        ResourceSchema::new("geoserver")
            .with_description("Connection settings for GeoServer and GeoWebCache")
            .attribute(
                AttributeSchema::new("url", AttributeType::String)
                    .with_description("The GeoServer URL. Falls back to SERVICE_URL."),
            )
            .attribute(
                AttributeSchema::new("gwc_url", AttributeType::String).with_description(
                    "The GeoWebCache URL. Falls back to TILECACHE_URL, then to <url>/gwc.",
                ),
            )
            .attribute(
                AttributeSchema::new("username", AttributeType::String)
                    .with_description("Username to use for connection. Falls back to SERVICE_USERNAME."),
            )
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .sensitive()
                    .with_description("Password to use for connection. Falls back to SERVICE_PASSWORD."),
            )
            .attribute(
                AttributeSchema::new("insecure", AttributeType::Bool)
                    .with_default(false)
                    .with_description("Skip verification of the server's TLS certificate"),
            )
    }

    pub fn from_attributes(attributes: &Attributes) -> Result<Self, ConfigError> {
        Self::schema()
            .validate(attributes)
            .map_err(|errors| {
                ConfigError::Invalid(
                    errors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            })?;
        serde_json::from_value(attributes_to_json(attributes))
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Apply environment fallbacks and defaults
    pub fn resolve(self) -> Result<ConnectionConfig, ConfigError> {
        let url = setting(self.url, "url", URL_ENV)?;
        let url = parse_url("url", &url)?;

        let gwc_url = match non_empty(self.gwc_url).or_else(|| env_fallback(GWC_URL_ENV)) {
            Some(gwc) => parse_url("gwc_url", &gwc)?,
            None => parse_url("gwc_url", &format!("{}/gwc", url.as_str().trim_end_matches('/')))?,
        };

        Ok(ConnectionConfig {
            url,
            gwc_url,
            username: setting(self.username, "username", USERNAME_ENV)?,
            password: setting(self.password, "password", PASSWORD_ENV)?,
            insecure: self.insecure,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn env_fallback(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

fn setting(
    value: Option<String>,
    setting: &'static str,
    env: &'static [&'static str],
) -> Result<String, ConfigError> {
    non_empty(value)
        .or_else(|| env_fallback(env))
        .ok_or(ConfigError::Missing { setting, env })
}

fn parse_url(setting: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        setting,
        value: value.to_string(),
        source,
    })
}

/// Resolved connection settings for both services
#[derive(Clone)]
pub struct ConnectionConfig {
    pub url: Url,
    pub gwc_url: Url,
    pub username: String,
    pub password: String,
    pub insecure: bool,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url.as_str())
            .field("gwc_url", &self.gwc_url.as_str())
            .field("username", &self.username)
            .field("password", &"***")
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl ConnectionConfig {
    /// Construct a client for one service; handles are not cached
    pub fn client(&self, service: Service) -> Result<RestClient, ConfigError> {
        Ok(RestClient::for_service(self, service)?)
    }

    /// Check that both endpoints answer
    ///
    /// Any HTTP answer other than an authentication failure counts as
    /// reachable: the probe paths may be absent on older versions.
    pub async fn probe(&self) -> Result<(), ConfigError> {
        for (service, path) in [
            (Service::Geoserver, GEOSERVER_PROBE_PATH),
            (Service::Tilecache, TILECACHE_PROBE_PATH),
        ] {
            let client = self.client(service)?;
            match client.get_json(path).await {
                Ok(_) | Err(RemoteError::NotFound { .. }) | Err(RemoteError::Decode { .. }) => {
                    tracing::info!("{} client configured for {}", service.label(), client.base_url());
                }
                Err(e @ RemoteError::Status { status, .. }) if status == 401 || status == 403 => {
                    return Err(ConfigError::Unreachable {
                        service: service.label(),
                        url: client.base_url().to_string(),
                        source: e,
                    });
                }
                Err(RemoteError::Status { status, .. }) => {
                    tracing::warn!(
                        "{} probe answered with status {}; continuing",
                        service.label(),
                        status
                    );
                }
                Err(e @ RemoteError::Transport { .. }) => {
                    return Err(ConfigError::Unreachable {
                        service: service.label(),
                        url: client.base_url().to_string(),
                        source: e,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotf_core::resource::Value;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    const NO_ENV: [(&str, Option<&str>); 8] = [
        ("SERVICE_URL", None),
        ("GEOSERVER_URL", None),
        ("TILECACHE_URL", None),
        ("GEOSERVER_GWC_URL", None),
        ("SERVICE_USERNAME", None),
        ("GEOSERVER_USERNAME", None),
        ("SERVICE_PASSWORD", None),
        ("GEOSERVER_PASSWORD", None),
    ];

    #[test]
    fn resolve_from_block() {
        temp_env::with_vars(NO_ENV, || {
            let config = ProviderConfig::from_attributes(&attrs(&[
                ("url", "http://localhost:8080/geoserver".into()),
                ("username", "admin".into()),
                ("password", "geoserver".into()),
            ]))
            .unwrap()
            .resolve()
            .unwrap();

            assert_eq!(config.url.as_str(), "http://localhost:8080/geoserver");
            assert_eq!(config.gwc_url.as_str(), "http://localhost:8080/geoserver/gwc");
            assert_eq!(config.username, "admin");
            assert!(!config.insecure);
        });
    }

    #[test]
    fn resolve_falls_back_to_env() {
        temp_env::with_vars(
            [
                ("SERVICE_URL", Some("https://maps.example.com/geoserver")),
                ("GEOSERVER_URL", None),
                ("TILECACHE_URL", Some("https://tiles.example.com/gwc")),
                ("SERVICE_USERNAME", Some("ops")),
                ("SERVICE_PASSWORD", Some("secret")),
            ],
            || {
                let config = ProviderConfig::default().resolve().unwrap();
                assert_eq!(config.url.as_str(), "https://maps.example.com/geoserver");
                assert_eq!(config.gwc_url.as_str(), "https://tiles.example.com/gwc");
                assert_eq!(config.username, "ops");
                assert_eq!(config.password, "secret");
            },
        );
    }

    #[test]
    fn legacy_env_names_are_honoured() {
        temp_env::with_vars(
            [
                ("SERVICE_URL", None),
                ("GEOSERVER_URL", Some("http://legacy:8080/geoserver")),
                ("SERVICE_USERNAME", Some("admin")),
                ("SERVICE_PASSWORD", Some("pw")),
            ],
            || {
                let config = ProviderConfig::default().resolve().unwrap();
                assert_eq!(config.url.as_str(), "http://legacy:8080/geoserver");
            },
        );
    }

    #[test]
    fn block_value_wins_over_env() {
        temp_env::with_vars([("SERVICE_USERNAME", Some("from-env"))], || {
            let config = ProviderConfig {
                url: Some("http://localhost/geoserver".to_string()),
                username: Some("from-block".to_string()),
                password: Some("pw".to_string()),
                ..Default::default()
            }
            .resolve()
            .unwrap();
            assert_eq!(config.username, "from-block");
        });
    }

    #[test]
    fn missing_url_is_an_error() {
        temp_env::with_vars(NO_ENV, || {
            let err = ProviderConfig::default().resolve().unwrap_err();
            assert!(matches!(err, ConfigError::Missing { setting: "url", .. }));
            assert!(err.to_string().contains("SERVICE_URL"));
        });
    }

    #[test]
    fn invalid_url_is_an_error() {
        temp_env::with_vars(NO_ENV, || {
            let err = ProviderConfig {
                url: Some("not a url".to_string()),
                ..Default::default()
            }
            .resolve()
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidUrl { setting: "url", .. }));
        });
    }

    #[test]
    fn invalid_attribute_type_is_rejected() {
        let err = ProviderConfig::from_attributes(&attrs(&[("insecure", "yes".into())])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn debug_redacts_password() {
        temp_env::with_vars(NO_ENV, || {
            let config = ProviderConfig {
                url: Some("http://localhost/geoserver".to_string()),
                username: Some("admin".to_string()),
                password: Some("hunter2".to_string()),
                ..Default::default()
            }
            .resolve()
            .unwrap();
            assert!(!format!("{:?}", config).contains("hunter2"));
        });
    }
}
