//! # homerulesd: homerules daemon
//!
//! Composition root that wires the rule engine to its adapters and runs it.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Construct the device layer, the sun times client and the event bus
//! - Load the rule set and hand it to the engine
//! - Feed `<device> on|off` lines from stdin to the virtual devices
//! - Forward device events to the engine until SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod rules;
mod simulate;

use std::sync::Arc;

use homerules_adapter_sunrise_sunset::SunriseSunsetClient;
use homerules_adapter_virtual::VirtualDevices;
use homerules_app::event_bus::InProcessEventBus;
use homerules_app::ports::SystemClock;
use homerules_app::rule_engine::RuleEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .with_target(true)
        .init();

    info!(
        latitude = config.location.latitude,
        longitude = config.location.longitude,
        rules = %config.rules.path.display(),
        "starting homerulesd"
    );

    // Device layer
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let devices = Arc::new(VirtualDevices::new(Arc::clone(&event_bus)));
    for device in devices.list() {
        info!(device = %device.id, kind = %device.kind, state = device.state, "virtual device ready");
    }

    // Engine
    let sun = SunriseSunsetClient::new(&config.sun)?;
    let engine = RuleEngine::new(Arc::clone(&devices), sun, SystemClock, config.location());
    let listener = engine.listen(event_bus.subscribe());

    let rule_set = rules::load(&config.rules.path)?;
    engine.set_active_rules(rule_set.rules, Arc::clone(&devices));
    engine.start().await;

    let simulator = if config.devices.stdin_simulation {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        simulate::spawn_stdin_reader(tx)?;
        info!("reading `<device> on|off` lines from stdin");
        Some(tokio::spawn(simulate::run(rx, Arc::clone(&devices))))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    engine.shutdown();
    listener.abort();
    if let Some(simulator) = simulator {
        simulator.abort();
    }
    Ok(())
}
