// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use kastelaapiclient::{TransportConfig, backend_api::BackendConfig};
use serde::Deserialize;

/// Configuration of the demo.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub tokenization: TransportConfig,
    pub backend: BackendConfig,
    pub demo: DemoSettings,
}

/// What the demo tokenizes.
#[derive(Deserialize, Clone, Debug)]
pub struct DemoSettings {
    /// Protected field the values belong to.
    pub protection_id: String,
    /// Lifetime of the requested credentials, as understood by the backend.
    pub ttl: u32,
}
