//! Relay catalog and power-cycle template shared by firmware and host targets.
//!
//! The cycle state machine uses these definitions to drive the relay outputs
//! without embedding any MCU-specific knowledge. Everything in this module is
//! `no_std` friendly so the same data can be compiled for both the ESP32
//! firmware and the host-side emulator.

use core::time::Duration;

pub mod power_cycle;

pub use power_cycle::{POWER_CYCLE_TEMPLATE, power_cycle_template};

/// Identifier for the controlled relay outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelayId {
    Router,
    Mesh,
}

impl RelayId {
    /// Deterministic index for lookups into [`ALL_RELAYS`].
    pub const fn as_index(self) -> usize {
        match self {
            RelayId::Router => 0,
            RelayId::Mesh => 1,
        }
    }

    /// Attempts to construct a [`RelayId`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(RelayId::Router),
            1 => Some(RelayId::Mesh),
            _ => None,
        }
    }
}

/// Electrical convention for the relay board wiring.
///
/// Most IoT relay boards close the contact when the input is driven low, so
/// `ActiveLow` is the deployment default. The catalog records the convention
/// per line; only the hardware driver consults it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelayPolarity {
    ActiveLow,
    ActiveHigh,
}

/// Logical power state of a controlled device.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelayState {
    Energized,
    DeEnergized,
}

/// Action applied to a relay during a cycle step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelayAction {
    Energize,
    DeEnergize,
}

impl RelayAction {
    /// The power state a line settles into after the action is applied.
    pub const fn resulting_state(self) -> RelayState {
        match self {
            RelayAction::Energize => RelayState::Energized,
            RelayAction::DeEnergize => RelayState::DeEnergized,
        }
    }
}

/// Metadata describing how a relay line is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RelayLine {
    pub id: RelayId,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub board_input: &'static str,
    pub polarity: RelayPolarity,
    pub default_state: RelayState,
}

impl RelayLine {
    pub const fn new(
        id: RelayId,
        name: &'static str,
        mcu_pin: &'static str,
        board_input: &'static str,
        polarity: RelayPolarity,
        default_state: RelayState,
    ) -> Self {
        Self {
            id,
            name,
            mcu_pin,
            board_input,
            polarity,
            default_state,
        }
    }
}

/// Compile-time catalog of every relay line.
///
/// Both lines default to `Energized`: the watchdog must never leave the
/// network hardware unpowered at rest.
pub const ALL_RELAYS: [RelayLine; 2] = [
    RelayLine::new(
        RelayId::Router,
        "ROUTER",
        "GPIO17",
        "IN1",
        RelayPolarity::ActiveLow,
        RelayState::Energized,
    ),
    RelayLine::new(
        RelayId::Mesh,
        "MESH",
        "GPIO27",
        "IN2",
        RelayPolarity::ActiveLow,
        RelayState::Energized,
    ),
];

/// Retrieve relay metadata by identifier.
pub const fn relay_by_id(id: RelayId) -> RelayLine {
    ALL_RELAYS[id.as_index()]
}

/// Narration label for the phase a cycle step belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleStage {
    PowerDownAll,
    Settle,
    PowerUpRouter,
    StabilizeRouter,
    PowerUpMesh,
    Complete,
}

impl CycleStage {
    /// Human-readable tag used in log narration and transcripts.
    pub const fn label(self) -> &'static str {
        match self {
            CycleStage::PowerDownAll => "power-down-all",
            CycleStage::Settle => "settle",
            CycleStage::PowerUpRouter => "power-up-router",
            CycleStage::StabilizeRouter => "stabilize-router",
            CycleStage::PowerUpMesh => "power-up-mesh",
            CycleStage::Complete => "complete",
        }
    }
}

/// Ordered operation the cycle state machine applies to a relay line.
///
/// `hold_for` is the time the sequence rests after applying the action before
/// the next step may run; `hold_stage` names that rest for narration (the
/// quiescent and stabilization windows have their own stages).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PowerStep {
    pub stage: CycleStage,
    pub line: RelayId,
    pub action: RelayAction,
    pub hold_for: Duration,
    pub hold_stage: Option<CycleStage>,
}

impl PowerStep {
    pub const fn new(
        stage: CycleStage,
        line: RelayId,
        action: RelayAction,
        hold_for: Duration,
        hold_stage: Option<CycleStage>,
    ) -> Self {
        Self {
            stage,
            line,
            action,
            hold_for,
            hold_stage,
        }
    }

    /// Returns the relay metadata associated with this step.
    pub fn relay(&self) -> RelayLine {
        relay_by_id(self.line)
    }

    /// Returns the hold duration as a [`Duration`].
    pub fn hold_duration(&self) -> Duration {
        self.hold_for
    }
}

/// Immutable power-cycle template shared across targets.
///
/// The default template lives in [`power_cycle`]; the emulator builds its own
/// via [`CycleTemplate::with_delays`] to compress the real-time holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleTemplate {
    steps: [PowerStep; CYCLE_STEP_COUNT],
}

/// Number of timed relay transitions in a power cycle.
pub const CYCLE_STEP_COUNT: usize = 4;

impl CycleTemplate {
    pub const fn new(steps: [PowerStep; CYCLE_STEP_COUNT]) -> Self {
        Self { steps }
    }

    /// Builds a template with the standard transition order but custom holds.
    pub const fn with_delays(quiescent: Duration, stabilization: Duration) -> Self {
        Self::new([
            PowerStep::new(
                CycleStage::PowerDownAll,
                RelayId::Router,
                RelayAction::DeEnergize,
                Duration::ZERO,
                None,
            ),
            PowerStep::new(
                CycleStage::PowerDownAll,
                RelayId::Mesh,
                RelayAction::DeEnergize,
                quiescent,
                Some(CycleStage::Settle),
            ),
            PowerStep::new(
                CycleStage::PowerUpRouter,
                RelayId::Router,
                RelayAction::Energize,
                stabilization,
                Some(CycleStage::StabilizeRouter),
            ),
            PowerStep::new(
                CycleStage::PowerUpMesh,
                RelayId::Mesh,
                RelayAction::Energize,
                Duration::ZERO,
                None,
            ),
        ])
    }

    /// Returns the ordered relay steps that make up the cycle.
    pub const fn steps(&self) -> &[PowerStep] {
        &self.steps
    }

    /// Returns the number of steps contained in the template.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Sum of every hold in the template; the minimum wall-clock time a full
    /// cycle blocks the monitor.
    pub fn total_hold(&self) -> Duration {
        self.steps
            .iter()
            .fold(Duration::ZERO, |total, step| total + step.hold_for)
    }
}
