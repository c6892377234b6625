// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::Context;
use kastelaapplogic::{
    configurations::get_configuration,
    demo::run,
    telemetry::{get_subscriber, init_subscriber},
};
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configure logging/trace subscription
    let subscriber = get_subscriber("kastela-demo".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let settings = get_configuration("applogic/").context("Could not load configuration")?;

    // Arguments that are valid JSON are tokenized as such, anything else as
    // a plain string.
    let mut values: Vec<Value> = std::env::args()
        .skip(1)
        .map(|arg| serde_json::from_str(&arg).unwrap_or(Value::String(arg)))
        .collect();
    if values.is_empty() {
        values.push(Value::String("alice@example.com".to_owned()));
    }

    let outcome = run(&settings, values).await?;
    for (token, value) in outcome.tokens.iter().zip(outcome.values.iter()) {
        info!(%token, %value, "Round trip complete");
    }
    Ok(())
}
