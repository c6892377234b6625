// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use http::HeaderMap;
use kastelacommon::{
    VERSION_HEADER,
    version::{VersionError, VersionGuard},
};
use tracing::error;

/// Checks the protocol version reported by the server.
///
/// Header names are case-insensitive, so `X-Kastela-Version` and
/// `x-kastela-version` are the same header.
pub(crate) fn check_response_version(
    guard: &VersionGuard,
    response: &reqwest::Response,
) -> Result<(), VersionError> {
    let version = parse_version_header(response.headers());
    guard.check(version.as_deref())
}

fn parse_version_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(VERSION_HEADER)?;
    let Ok(value) = value.to_str() else {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        error!(%value, "Invalid value for {VERSION_HEADER} header");
        return Some(value);
    };
    Some(value.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn response(status: StatusCode, version: Option<&str>) -> reqwest::Response {
        let mut builder = http::response::Builder::new().status(status);
        if let Some(version) = version {
            builder = builder.header("X-Kastela-Version", version);
        }
        builder.body(Vec::new()).unwrap().into()
    }

    #[test]
    fn version_header_is_case_insensitive() {
        let response = response(StatusCode::OK, Some("v0.2.1"));
        assert!(check_response_version(&VersionGuard::default(), &response).is_ok());
    }

    #[test]
    fn version_mismatch_on_error_response() {
        let response = response(StatusCode::BAD_REQUEST, Some("v9.9"));
        let err = check_response_version(&VersionGuard::default(), &response).unwrap_err();
        assert_eq!(err.actual(), Some("v9.9"));
    }

    #[test]
    fn version_header_missing() {
        let response = response(StatusCode::OK, None);
        assert!(check_response_version(&VersionGuard::default(), &response).is_err());
        assert!(
            check_response_version(&VersionGuard::default().allow_missing(true), &response)
                .is_ok()
        );
    }
}
