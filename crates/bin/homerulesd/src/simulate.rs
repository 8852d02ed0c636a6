//! Stdin driver for the virtual device layer.
//!
//! Each line `<device> on|off` simulates a physical state change, for
//! example `virtual_motion on`. Blank lines and `#` comments are ignored.

use std::sync::Arc;

use homerules_adapter_virtual::VirtualDevices;
use homerules_app::ports::DeviceEventPublisher;
use homerules_domain::id::DeviceId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A line that is not a simulation command.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimulateError {
    #[error("expected `<device> on|off`, got {0:?}")]
    Syntax(String),

    #[error("unknown state {0:?}, expected on or off")]
    State(String),
}

/// Parse one input line, `None` for blank lines and comments.
pub fn parse(line: &str) -> Result<Option<(DeviceId, bool)>, SimulateError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let (Some(device), Some(state), None) = (words.next(), words.next(), words.next()) else {
        return Err(SimulateError::Syntax(line.to_string()));
    };
    let state = match state.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        _ => return Err(SimulateError::State(state.to_string())),
    };
    Ok(Some((DeviceId::from(device), state)))
}

/// Forward stdin lines to `tx` from a detached thread.
///
/// A blocking read on a runtime thread would hold up shutdown, so the
/// thread is left to die with the process.
pub fn spawn_stdin_reader(tx: mpsc::Sender<String>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-simulation".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

/// Apply every received line to `devices` until the channel closes.
///
/// Returns the number of state changes simulated.
pub async fn run<P: DeviceEventPublisher>(
    mut lines: mpsc::Receiver<String>,
    devices: Arc<VirtualDevices<P>>,
) -> usize {
    let mut applied = 0;
    while let Some(line) = lines.recv().await {
        match parse(&line) {
            Ok(Some((id, state))) => match devices.simulate(&id, state) {
                Ok(_) => applied += 1,
                Err(err) => warn!(device = %id, error = %err, "simulation rejected"),
            },
            Ok(None) => {}
            Err(err) => warn!(error = %err, "ignoring simulation input"),
        }
    }
    debug!(applied, "simulation input closed");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use homerules_app::event_bus::InProcessEventBus;

    #[test]
    fn should_parse_on_and_off() {
        assert_eq!(
            parse("virtual_motion on").unwrap(),
            Some((DeviceId::from("virtual_motion"), true))
        );
        assert_eq!(
            parse("  virtual_switch   OFF ").unwrap(),
            Some((DeviceId::from("virtual_switch"), false))
        );
    }

    #[test]
    fn should_skip_blank_lines_and_comments() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("# motion in the hall").unwrap(), None);
    }

    #[test]
    fn should_reject_malformed_lines() {
        assert!(matches!(parse("virtual_motion"), Err(SimulateError::Syntax(_))));
        assert!(matches!(parse("a on now"), Err(SimulateError::Syntax(_))));
        assert_eq!(
            parse("virtual_motion maybe"),
            Err(SimulateError::State("maybe".to_string()))
        );
    }

    #[tokio::test]
    async fn should_simulate_each_valid_line() {
        let bus = Arc::new(InProcessEventBus::new(16));
        let mut events = bus.subscribe();
        let devices = Arc::new(VirtualDevices::new(Arc::clone(&bus)));

        let (tx, rx) = mpsc::channel(8);
        for line in ["virtual_motion on", "garbage", "ghost on", "", "virtual_motion off"] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);

        assert_eq!(run(rx, Arc::clone(&devices)).await, 2);
        let first = events.recv().await.unwrap();
        assert_eq!(first.device_id.as_str(), "virtual_motion");
        assert!(first.state);
        assert!(!events.recv().await.unwrap().state);
    }
}
