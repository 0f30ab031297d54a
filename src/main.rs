//! alertdeck Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - ALERTDECK_HOST: Bind address (default: 0.0.0.0)
//! - ALERTDECK_PORT: Port number (default: 8080)
//! - ALERTDECK_INSTANCES: Comma-separated backend list, e.g. "prod=http://am1:9093,dev=http://am2:9093"
//! - ALERTDECK_PULL_INTERVAL_SECS: Seconds between pull cycles (default: 60)
//! - RUST_LOG: Log level (default: info)
//!
//! See the `config` module for the full list.

use alertdeck::api::run_server;
use alertdeck::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alertdeck=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    settings.log_summary();

    println!(
        r#"
        _           _      _           _
   __ _| | ___ _ __| |_ __| | ___  ___| | __
  / _` | |/ _ \ '__| __/ _` |/ _ \/ __| |/ /
 | (_| | |  __/ |  | || (_| |  __/ (__|   <
  \__,_|_|\___|_|   \__\__,_|\___|\___|_|\_\

 Alertmanager Aggregation Dashboard
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(settings).await
}
