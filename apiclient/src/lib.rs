// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP client for the Kastela tokenization server REST API

use std::time::Duration;

use kastelacommon::version::VersionGuard;
use reqwest::{Client, ClientBuilder, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::ParseError;

pub use transport::RequestError;
use transport::HttpTransport;

pub mod backend_api;
pub mod channel_api;
pub mod secure_api;
mod transport;
mod version;

// TODO: Turn this on once the tokenization server is deployed behind TLS in
// the local test setup.
const HTTPS_BY_DEFAULT: bool = false;

const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 4;
const DEFAULT_USER_AGENT: &str = "KastelaClient/0.1";

#[derive(Error, Debug)]
pub enum ApiClientInitError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error("Failed to parse URL {0}")]
    UrlParsingError(String),
    #[error("Could not find hostname in URL {0}")]
    NoHostname(String),
}

/// Transport settings of a client.
///
/// Passed in explicitly when the client is built; there is no process-wide
/// HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    /// Base URL, or a `host:port` pair. Without a scheme, `http` is assumed.
    pub url: String,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
    /// Overall timeout of one request. No timeout if unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Accept responses without a version header.
    #[serde(default)]
    pub allow_unversioned: bool,
}

fn default_pool_idle_timeout_secs() -> u64 {
    DEFAULT_POOL_IDLE_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_idle_timeout_secs: DEFAULT_POOL_IDLE_TIMEOUT_SECS,
            request_timeout_secs: None,
            user_agent: default_user_agent(),
            allow_unversioned: false,
        }
    }

    /// Creates a new HTTP client with these settings.
    pub fn build_http_client(&self) -> reqwest::Result<Client> {
        let mut builder = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .user_agent(&self.user_agent);
        if let Some(timeout) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        builder.build()
    }

    /// Parses the configured URL.
    ///
    /// If the URL starts with `https`, TLS will be used. A bare `host:port`
    /// pair is completed with [`HTTPS_BY_DEFAULT`].
    pub(crate) fn parse_url(&self) -> Result<Url, ApiClientInitError> {
        parse_base_url(&self.url)
    }
}

pub(crate) fn parse_base_url(domain: &str) -> Result<Url, ApiClientInitError> {
    let url = match Url::parse(domain) {
        Ok(url) if url.has_host() => url,
        // Either no scheme at all, or a hostname that was taken for a scheme,
        // e.g. `localhost:3200`.
        Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {
            let protocol = if HTTPS_BY_DEFAULT { "https" } else { "http" };
            let domain = format!("{protocol}://{domain}");
            Url::parse(&domain).map_err(|_| ApiClientInitError::UrlParsingError(domain))?
        }
        Err(_) => return Err(ApiClientInitError::UrlParsingError(domain.to_owned())),
    };
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ApiClientInitError::NoHostname(domain.to_owned()));
    }
    Ok(url)
}

// ApiClient is a wrapper around a reqwest client.
// It exposes a single function for each tokenization server endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: HttpTransport,
}

impl ApiClient {
    pub fn new(config: &TransportConfig) -> Result<Self, ApiClientInitError> {
        let client = config.build_http_client()?;
        Self::initialize(client, config)
    }

    pub fn with_default_http_client(domain: impl Into<String>) -> Result<Self, ApiClientInitError> {
        Self::new(&TransportConfig::new(domain))
    }

    /// Creates a new API client on top of an existing HTTP client.
    ///
    /// The HTTP client's own settings take precedence over the transport
    /// settings in `config`; only the URL and the version policy are used.
    pub fn initialize(client: Client, config: &TransportConfig) -> Result<Self, ApiClientInitError> {
        let url = config.parse_url()?;
        let version_guard = VersionGuard::default().allow_missing(config.allow_unversioned);
        info!(%url, expected_version = %version_guard.expected(), "Initialized tokenization server client");
        Ok(Self {
            transport: HttpTransport::new(client, url, Some(version_guard)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urls_with_and_without_scheme() {
        let url = parse_base_url("http://127.0.0.1:3200").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3200/");

        let url = parse_base_url("127.0.0.1:3200").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3200/");

        let url = parse_base_url("localhost:3200").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3200/");

        let url = parse_base_url("https://kastela.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn rejects_unparsable_urls() {
        assert!(parse_base_url("http://").is_err());
        assert!(parse_base_url("").is_err());
    }

    #[test]
    fn transport_config_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"url": "http://127.0.0.1:3200"}"#).unwrap();
        assert_eq!(config, TransportConfig::new("http://127.0.0.1:3200"));
        assert!(!config.allow_unversioned);
        assert!(config.build_http_client().is_ok());
    }
}
