use core::time::Duration;

use watchdog_core::relays::power_cycle::{
    POWER_CYCLE_STEPS, QUIESCENT_DELAY, STABILIZATION_DELAY,
};
use watchdog_core::relays::{CycleStage, RelayAction, RelayId, power_cycle_template};

#[test]
fn power_cycle_step_durations_match_deployment() {
    let template = power_cycle_template();
    let steps = template.steps();

    assert_eq!(steps.len(), 4);

    let down_router = &steps[0];
    assert_eq!(down_router.line, RelayId::Router);
    assert_eq!(down_router.action, RelayAction::DeEnergize);
    assert_eq!(down_router.hold_duration(), Duration::ZERO);

    let down_mesh = &steps[1];
    assert_eq!(down_mesh.line, RelayId::Mesh);
    assert_eq!(down_mesh.action, RelayAction::DeEnergize);
    assert_eq!(down_mesh.hold_duration(), QUIESCENT_DELAY);

    let up_router = &steps[2];
    assert_eq!(up_router.line, RelayId::Router);
    assert_eq!(up_router.action, RelayAction::Energize);
    assert_eq!(up_router.hold_duration(), STABILIZATION_DELAY);

    let up_mesh = &steps[3];
    assert_eq!(up_mesh.line, RelayId::Mesh);
    assert_eq!(up_mesh.action, RelayAction::Energize);
    assert_eq!(up_mesh.hold_duration(), Duration::ZERO);
}

#[test]
fn power_cycle_stages_cover_the_full_narrative() {
    let mut labels = Vec::new();
    for step in POWER_CYCLE_STEPS {
        labels.push(step.stage);
        if let Some(hold_stage) = step.hold_stage {
            labels.push(hold_stage);
        }
    }

    assert_eq!(
        labels,
        vec![
            CycleStage::PowerDownAll,
            CycleStage::PowerDownAll,
            CycleStage::Settle,
            CycleStage::PowerUpRouter,
            CycleStage::StabilizeRouter,
            CycleStage::PowerUpMesh,
        ]
    );
}

#[test]
fn default_delays_block_for_at_least_160_seconds() {
    assert_eq!(QUIESCENT_DELAY, Duration::from_secs(10));
    assert_eq!(STABILIZATION_DELAY, Duration::from_secs(150));
    assert!(power_cycle_template().total_hold() >= Duration::from_secs(160));
}
