//! Default power-cycle template shared by firmware and host targets.
//!
//! The sequence de-energizes both devices, holds the quiescent delay so any
//! residual charge in the power-cycled hardware fully discharges, re-energizes
//! the router, waits out its boot/negotiation window, and finally re-energizes
//! the mesh node. The mesh node depends on the router having a stable uplink,
//! so the two power-up steps must never be collapsed.

use core::time::Duration;

use super::{CYCLE_STEP_COUNT, CycleStage, CycleTemplate, PowerStep, RelayAction, RelayId};

/// Time both devices are held de-energized before restart.
pub const QUIESCENT_DELAY: Duration = Duration::from_secs(10);
/// Time allotted for the router to finish booting before the mesh powers up.
pub const STABILIZATION_DELAY: Duration = Duration::from_secs(150);

/// Ordered relay steps that implement the power cycle.
pub const POWER_CYCLE_STEPS: [PowerStep; CYCLE_STEP_COUNT] = [
    // Kill power to the router first, then the mesh node.
    PowerStep::new(
        CycleStage::PowerDownAll,
        RelayId::Router,
        RelayAction::DeEnergize,
        Duration::ZERO,
        None,
    ),
    // Hold everything dark for the quiescent window.
    PowerStep::new(
        CycleStage::PowerDownAll,
        RelayId::Mesh,
        RelayAction::DeEnergize,
        QUIESCENT_DELAY,
        Some(CycleStage::Settle),
    ),
    // Restore the router and give its boot sequence time to complete.
    PowerStep::new(
        CycleStage::PowerUpRouter,
        RelayId::Router,
        RelayAction::Energize,
        STABILIZATION_DELAY,
        Some(CycleStage::StabilizeRouter),
    ),
    // Restore the mesh node once the uplink is expected to be stable.
    PowerStep::new(
        CycleStage::PowerUpMesh,
        RelayId::Mesh,
        RelayAction::Energize,
        Duration::ZERO,
        None,
    ),
];

/// Template describing the full power-cycle workflow.
pub const POWER_CYCLE_TEMPLATE: CycleTemplate = CycleTemplate::new(POWER_CYCLE_STEPS);

/// Returns the shared power-cycle template.
#[must_use]
pub const fn power_cycle_template() -> CycleTemplate {
    POWER_CYCLE_TEMPLATE
}
