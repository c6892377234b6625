// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Protocol version check performed on every tokenization server response.
//!
//! The nonce length and the field names of the secure endpoints are tied to
//! the protocol version, so a response is only trusted if the server reports
//! a version compatible with the one this client was built for.

use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::{debug, error};

/// Protocol version this client speaks.
pub const EXPECTED_VERSION: ProtocolVersion = ProtocolVersion::new(0, 2, None);

/// Version reported by servers that are not versioned yet. Always accepted.
///
/// Only the full form `v0.0.0` matches; `v0.0` is compared like any other
/// version and rejected.
pub const UNVERSIONED: ProtocolVersion = ProtocolVersion::new(0, 0, Some(0));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    major: u64,
    minor: u64,
    patch: Option<u64>,
}

impl ProtocolVersion {
    pub const fn new(major: u64, minor: u64, patch: Option<u64>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    fn same_major_minor(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "v{}.{}.{patch}", self.major, self.minor),
            None => write!(f, "v{}.{}", self.major, self.minor),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid protocol version: {0}")]
pub struct ParseVersionError(String);

impl FromStr for ProtocolVersion {
    type Err = ParseVersionError;

    /// Parses `v<major>.<minor>[.<patch>]`. The `v` prefix is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_owned());
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let mut parts = digits.split('.');
        let mut next_number = || -> Result<Option<u64>, ParseVersionError> {
            parts
                .next()
                .map(|part| part.parse::<u64>().map_err(|_| invalid()))
                .transpose()
        };
        let major = next_number()?.ok_or_else(invalid)?;
        let minor = next_number()?.ok_or_else(invalid)?;
        let patch = next_number()?;
        if next_number()?.is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, patch))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Kastela server version mismatch, expected: {expected}.x, actual: {}",
    .actual.as_deref().unwrap_or("<missing>")
)]
pub struct VersionError {
    expected: ProtocolVersion,
    actual: Option<String>,
}

impl VersionError {
    pub fn new(expected: ProtocolVersion, actual: Option<String>) -> Self {
        Self { expected, actual }
    }

    pub fn expected(&self) -> ProtocolVersion {
        self.expected
    }

    /// Raw value of the version header, if the server sent one.
    pub fn actual(&self) -> Option<&str> {
        self.actual.as_deref()
    }
}

/// Validates the version header of server responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGuard {
    expected: ProtocolVersion,
    allow_missing: bool,
}

impl Default for VersionGuard {
    fn default() -> Self {
        Self::new(EXPECTED_VERSION)
    }
}

impl VersionGuard {
    pub fn new(expected: ProtocolVersion) -> Self {
        Self {
            expected,
            allow_missing: false,
        }
    }

    /// Accept responses that carry no version header at all.
    pub fn allow_missing(mut self, allow_missing: bool) -> Self {
        self.allow_missing = allow_missing;
        self
    }

    pub fn expected(&self) -> ProtocolVersion {
        self.expected
    }

    /// Accepts the unversioned escape value and any version with the
    /// expected major and minor number.
    pub fn check(&self, header: Option<&str>) -> Result<(), VersionError> {
        let Some(value) = header else {
            if self.allow_missing {
                debug!("Response carries no version header");
                return Ok(());
            }
            error!("Response carries no version header");
            return Err(VersionError::new(self.expected, None));
        };
        let version = match value.parse::<ProtocolVersion>() {
            Ok(version) => version,
            Err(e) => {
                error!(%e, "Could not parse server version");
                return Err(VersionError::new(self.expected, Some(value.to_owned())));
            }
        };
        if version == UNVERSIONED || version.same_major_minor(&self.expected) {
            return Ok(());
        }
        error!(expected = %self.expected, actual = %version, "Server version mismatch");
        Err(VersionError::new(self.expected, Some(value.to_owned())))
    }
}
