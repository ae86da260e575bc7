//! # domosyncd — domosync daemon
//!
//! Composition root that wires a hub transport to the application services.
//!
//! ## Responsibilities
//! - Load configuration (`domosync.toml`, env vars)
//! - Install the tracing subscriber
//! - Build the configured transport (real hub over HTTP or the virtual hub)
//! - Log in, discover devices and log the device table
//! - Poll the hub on an interval until Ctrl-C, then log out
//!
//! ## Dependency rule
//! This is the **only** crate that depends on every other crate.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use anyhow::Context;
use domosync_adapter_http::DomoHttpTransport;
use domosync_adapter_virtual::VirtualHub;
use domosync_app::ports::HubTransport;
use domosync_app::proxy::Readable;
use domosync_app::services::hub::{Devices, DomoHub};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, TransportKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match config.hub.transport {
        TransportKind::Http => {
            let transport = DomoHttpTransport::new(&config.hub.host, config.timeout())?;
            run(transport, &config).await
        }
        TransportKind::Virtual => {
            tracing::info!("using the virtual demo hub");
            run(VirtualHub::demo(config.credentials()), &config).await
        }
    }
}

async fn run<T: HubTransport + 'static>(transport: T, config: &Config) -> anyhow::Result<()> {
    let host = transport.host().to_string();
    let hub = DomoHub::connect(transport, config.credentials(), config.hub_options())
        .await
        .with_context(|| format!("connecting to hub at {host}"))?;

    match hub.hub_info().await {
        Ok(info) => tracing::info!(
            serial = %info.serial,
            features = ?info.features,
            "connected to hub"
        ),
        Err(err) => tracing::warn!(%err, "could not read hub identity"),
    }

    let devices = hub.discover().await.context("discovering devices")?;
    log_devices(&devices);

    let poller = hub.start_polling(&devices, config.poll_interval());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutting down");

    poller.abort();
    if let Err(err) = hub.shutdown().await {
        tracing::warn!(%err, "logout failed");
    }

    Ok(())
}

fn log_devices<T: HubTransport>(devices: &Devices<T>) {
    for light in &devices.lights {
        let record = light.read().record;
        tracing::info!(
            unique_id = light.unique_id(),
            room = %record.room_name,
            on = record.on,
            "light"
        );
    }
    for relay in &devices.relays {
        tracing::info!(unique_id = relay.unique_id(), on = relay.is_on(), "switch");
    }
    for climate in &devices.climates {
        let zone = climate.read().record;
        tracing::info!(
            unique_id = climate.unique_id(),
            hvac_mode = %climate.hvac_mode(),
            setpoint = %zone.setpoint,
            temperature = %zone.temperature,
            "climate"
        );
    }
    for sensor in &devices.sensors {
        let reading = sensor.read().record;
        tracing::info!(
            unique_id = sensor.unique_id(),
            value = reading.value,
            unit = %reading.unit,
            "sensor"
        );
    }
}
