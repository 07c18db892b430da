//! GPIO relay outputs for the ESP32 target.

use esp_hal::gpio::{Level, Output};
use log::info;
use watchdog_core::cycle::RelayDriver;
use watchdog_core::relays::{RelayAction, RelayId, RelayPolarity, relay_by_id};

use crate::status;

/// Push-pull outputs driving the two-channel relay board.
pub struct RelayOutputs {
    router: Output<'static>,
    mesh: Output<'static>,
}

impl RelayOutputs {
    /// Wraps the configured outputs; the caller picks the initial levels.
    pub fn new(router: Output<'static>, mesh: Output<'static>) -> Self {
        Self { router, mesh }
    }

    fn output_mut(&mut self, line: RelayId) -> &mut Output<'static> {
        match line {
            RelayId::Router => &mut self.router,
            RelayId::Mesh => &mut self.mesh,
        }
    }
}

impl RelayDriver for RelayOutputs {
    fn apply(&mut self, line: RelayId, action: RelayAction) {
        let relay = relay_by_id(line);
        let level = drive_level(relay.polarity, action);
        self.output_mut(line).set_level(level);
        status::record_relay_state(line, action.resulting_state());
        info!(
            "relays: {} {} pin={} {}",
            relay.name,
            action_label(action),
            relay.mcu_pin,
            relay.board_input
        );
    }
}

/// Maps a logical relay action onto the wire level for the board's polarity.
const fn drive_level(polarity: RelayPolarity, action: RelayAction) -> Level {
    match (polarity, action) {
        (RelayPolarity::ActiveLow, RelayAction::Energize)
        | (RelayPolarity::ActiveHigh, RelayAction::DeEnergize) => Level::Low,
        (RelayPolarity::ActiveLow, RelayAction::DeEnergize)
        | (RelayPolarity::ActiveHigh, RelayAction::Energize) => Level::High,
    }
}

const fn action_label(action: RelayAction) -> &'static str {
    match action {
        RelayAction::Energize => "energize",
        RelayAction::DeEnergize => "de-energize",
    }
}
