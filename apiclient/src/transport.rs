// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request plumbing shared by all endpoints.

use kastelacommon::{
    crypto::KeyError,
    messages::ErrorBody,
    version::{VersionError, VersionGuard},
};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error};

use crate::version::check_response_version;

#[derive(Error, Debug)]
pub enum RequestError {
    /// No response was received.
    #[error("Network error: {0}")]
    NetworkError(String),
    /// The server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    ServerError { status: StatusCode, message: String },
    #[error(transparent)]
    VersionError(#[from] VersionError),
    #[error("Couldn't deserialize response body.")]
    BadResponse,
    #[error("Invalid server public key: {0}")]
    InvalidServerKey(#[from] KeyError),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl RequestError {
    /// Message the server reported, if this is a server error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::ServerError { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    url: Url,
    version_guard: Option<VersionGuard>,
}

impl HttpTransport {
    pub(crate) fn new(client: Client, url: Url, version_guard: Option<VersionGuard>) -> Self {
        Self {
            client,
            url,
            version_guard,
        }
    }

    /// Joins `segments` into an absolute endpoint path. Every segment is
    /// percent-encoded on its own, so it cannot add segments or a query.
    pub(crate) fn segments_path(&self, segments: &[&str]) -> Result<String, RequestError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                error!(url = %self.url, "Base URL cannot carry a path");
                RequestError::InvalidUrl(self.url.to_string())
            })?
            .clear()
            .extend(segments);
        Ok(url.path().to_owned())
    }

    /// Builds a URL for a given endpoint.
    fn build_url(&self, endpoint: &str) -> Result<Url, RequestError> {
        self.url.join(endpoint).map_err(|e| {
            error!(%e, endpoint, "Could not build endpoint URL");
            RequestError::InvalidUrl(endpoint.to_owned())
        })
    }

    /// Sends a request and returns the raw body of a successful response.
    ///
    /// The version header is checked before anything else of the response is
    /// looked at, including its status.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, RequestError> {
        let url = self.build_url(endpoint)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let res = match request.send().await {
            Ok(res) => res,
            // A network error occurred.
            Err(e) => {
                error!(%e, %method, endpoint, "Network error");
                return Err(RequestError::NetworkError(e.to_string()));
            }
        };

        if let Some(guard) = &self.version_guard {
            check_response_version(guard, &res)?;
        }

        let status = res.status();
        if status.is_success() {
            let bytes = res.bytes().await.map_err(|e| {
                error!(%e, "Could not read response body");
                RequestError::BadResponse
            })?;
            debug!(%method, endpoint, %status, "Request succeeded");
            return Ok(bytes.to_vec());
        }

        let text = res.text().await.unwrap_or_else(|e| {
            error!(%e, %status, "Could not read error response body");
            String::new()
        });
        let message = server_error_message(status, &text);
        error!(%method, endpoint, %status, %message, "Server reported an error");
        Err(RequestError::ServerError { status, message })
    }

    /// Sends a JSON request and parses the JSON response.
    pub(crate) async fn request<B, R>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<R, RequestError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.send(method, endpoint, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(%e, endpoint, "Couldn't deserialize response body");
            RequestError::BadResponse
        })
    }

    pub(crate) async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, RequestError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }
}

/// Extracts the error message from the body of a non-success response.
///
/// A JSON object contributes its `error` field, a JSON string its content,
/// and any other body is taken verbatim. An empty body falls back to the
/// status reason.
fn server_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str(body) {
        return error;
    }
    if let Ok(message) = serde_json::from_str::<String>(body) {
        return message;
    }
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned();
    }
    body.to_owned()
}
