//! Pure power-cycle state machine driven by injected instants.
//!
//! A [`CycleRun`] walks a [`CycleTemplate`] step by step: apply a relay
//! transition, rest for the step's hold, repeat. The machine is feed-forward
//! and unconditional; there is no failure branch and no cancellation path.
//! Whether the hardware actually recovered is judged by the next monitor
//! sample, never here. Firmware drives a run against real timers; host tests
//! and the emulator drive it with synthetic instants.

use core::ops::Add;
use core::time::Duration;

use crate::relays::{ALL_RELAYS, CycleStage, CycleTemplate, RelayAction, RelayId};
use crate::telemetry::{TelemetryEventKind, TelemetryInstant, TelemetryPayload, TelemetryRecorder};

/// Abstraction over the physical relay outputs.
pub trait RelayDriver {
    /// Applies the requested action to the relay line.
    fn apply(&mut self, line: RelayId, action: RelayAction);

    /// Forces every relay line to its fail-safe energized state.
    fn energize_all(&mut self) {
        for line in ALL_RELAYS {
            self.apply(line.id, RelayAction::Energize);
        }
    }
}

/// Relay driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRelayDriver;

impl NoopRelayDriver {
    /// Creates a new no-op relay driver.
    pub const fn new() -> Self {
        Self
    }
}

impl RelayDriver for NoopRelayDriver {
    fn apply(&mut self, _: RelayId, _: RelayAction) {}
}

/// Progress report returned by [`CycleRun::advance`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleStatus<TInstant> {
    /// The run is resting; call `advance` again once the deadline passes.
    HoldUntil(TInstant),
    /// Every step has been applied; the failure counter may now be reset.
    Complete,
}

/// In-flight execution state for one power cycle.
#[derive(Clone, Debug)]
pub struct CycleRun<TInstant> {
    template: CycleTemplate,
    next_step: usize,
    hold_until: Option<TInstant>,
    started_at: Option<TInstant>,
    last_stage: Option<CycleStage>,
    relays_switched: usize,
    complete: bool,
}

impl<TInstant> CycleRun<TInstant>
where
    TInstant: Copy + Ord + Add<Duration, Output = TInstant> + TelemetryInstant,
{
    /// Creates a run that has not yet touched any relay.
    pub const fn new(template: CycleTemplate) -> Self {
        Self {
            template,
            next_step: 0,
            hold_until: None,
            started_at: None,
            last_stage: None,
            relays_switched: 0,
            complete: false,
        }
    }

    /// Returns `true` once every step has been applied.
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the stage the run is currently in, if it has started.
    pub const fn current_stage(&self) -> Option<CycleStage> {
        self.last_stage
    }

    /// Returns the instant the first relay transition was applied.
    pub const fn started_at(&self) -> Option<TInstant> {
        self.started_at
    }

    /// Applies every step whose deadline has passed at `now`.
    ///
    /// Steps execute strictly in template order; a hold is never shortened
    /// and never skipped. Calling `advance` before the returned deadline is
    /// harmless and changes nothing.
    pub fn advance<D, const CAPACITY: usize>(
        &mut self,
        driver: &mut D,
        telemetry: &mut TelemetryRecorder<TInstant, CAPACITY>,
        now: TInstant,
    ) -> CycleStatus<TInstant>
    where
        D: RelayDriver,
    {
        if self.complete {
            return CycleStatus::Complete;
        }

        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        loop {
            if let Some(deadline) = self.hold_until {
                if now < deadline {
                    return CycleStatus::HoldUntil(deadline);
                }
                self.hold_until = None;
            }

            let Some(step) = self.template.steps().get(self.next_step).copied() else {
                self.complete = true;
                telemetry.record(
                    TelemetryEventKind::StageEntered(CycleStage::Complete),
                    TelemetryPayload::none(),
                    now,
                );
                telemetry.record_cycle_completion(self.started_at, now, self.relays_switched);
                self.last_stage = Some(CycleStage::Complete);
                return CycleStatus::Complete;
            };

            if self.last_stage != Some(step.stage) {
                telemetry.record(
                    TelemetryEventKind::StageEntered(step.stage),
                    TelemetryPayload::none(),
                    now,
                );
                self.last_stage = Some(step.stage);
            }

            driver.apply(step.line, step.action);
            telemetry.record_relay_transition(step.line, step.action, now);
            self.relays_switched += 1;
            self.next_step += 1;

            if !step.hold_for.is_zero() {
                if let Some(hold_stage) = step.hold_stage {
                    telemetry.record(
                        TelemetryEventKind::StageEntered(hold_stage),
                        TelemetryPayload::none(),
                        now,
                    );
                    self.last_stage = Some(hold_stage);
                }
                self.hold_until = Some(now + step.hold_for);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relays::power_cycle_template;
    use heapless::Vec;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MockInstant(u64);

    impl MockInstant {
        fn millis(value: u64) -> Self {
            Self(value)
        }
    }

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
        }
    }

    impl TelemetryInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    #[derive(Default)]
    struct RecordingDriver {
        transitions: Vec<(RelayId, RelayAction), 16>,
    }

    impl RelayDriver for RecordingDriver {
        fn apply(&mut self, line: RelayId, action: RelayAction) {
            self.transitions
                .push((line, action))
                .expect("transition log overflow");
        }
    }

    #[test]
    fn default_energize_all_covers_every_line() {
        let mut driver = RecordingDriver::default();
        driver.energize_all();

        assert_eq!(
            driver.transitions.as_slice(),
            &[
                (RelayId::Router, RelayAction::Energize),
                (RelayId::Mesh, RelayAction::Energize),
            ]
        );
    }

    #[test]
    fn cycle_applies_transitions_in_fixed_order_with_spaced_deadlines() {
        let mut run = CycleRun::new(power_cycle_template());
        let mut driver = RecordingDriver::default();
        let mut telemetry = TelemetryRecorder::<MockInstant>::new();

        // Both devices drop immediately; the quiescent hold follows.
        let start = MockInstant::millis(0);
        let status = run.advance(&mut driver, &mut telemetry, start);
        assert_eq!(status, CycleStatus::HoldUntil(MockInstant::millis(10_000)));
        assert_eq!(
            driver.transitions.as_slice(),
            &[
                (RelayId::Router, RelayAction::DeEnergize),
                (RelayId::Mesh, RelayAction::DeEnergize),
            ]
        );
        assert_eq!(run.current_stage(), Some(CycleStage::Settle));

        // Advancing early must not shorten the hold or touch a relay.
        let early = run.advance(&mut driver, &mut telemetry, MockInstant::millis(9_999));
        assert_eq!(early, CycleStatus::HoldUntil(MockInstant::millis(10_000)));
        assert_eq!(driver.transitions.len(), 2);

        // Quiescent delay elapsed: router powers up, stabilization begins.
        let settle_done = MockInstant::millis(10_000);
        let status = run.advance(&mut driver, &mut telemetry, settle_done);
        assert_eq!(status, CycleStatus::HoldUntil(MockInstant::millis(160_000)));
        assert_eq!(
            driver.transitions.last().copied(),
            Some((RelayId::Router, RelayAction::Energize))
        );
        assert_eq!(run.current_stage(), Some(CycleStage::StabilizeRouter));

        // Stabilization elapsed: mesh powers up and the run completes.
        let stabilize_done = MockInstant::millis(160_000);
        let status = run.advance(&mut driver, &mut telemetry, stabilize_done);
        assert_eq!(status, CycleStatus::Complete);
        assert!(run.is_complete());
        assert_eq!(run.current_stage(), Some(CycleStage::Complete));
        assert_eq!(
            driver.transitions.as_slice(),
            &[
                (RelayId::Router, RelayAction::DeEnergize),
                (RelayId::Mesh, RelayAction::DeEnergize),
                (RelayId::Router, RelayAction::Energize),
                (RelayId::Mesh, RelayAction::Energize),
            ]
        );

        // Further advances stay complete without re-driving relays.
        let status = run.advance(&mut driver, &mut telemetry, MockInstant::millis(200_000));
        assert_eq!(status, CycleStatus::Complete);
        assert_eq!(driver.transitions.len(), 4);
    }

    #[test]
    fn cycle_records_stage_narration_and_summary() {
        let mut run = CycleRun::new(power_cycle_template());
        let mut driver = RecordingDriver::default();
        let mut telemetry = TelemetryRecorder::<MockInstant>::new();

        let mut now = MockInstant::millis(0);
        loop {
            match run.advance(&mut driver, &mut telemetry, now) {
                CycleStatus::HoldUntil(deadline) => now = deadline,
                CycleStatus::Complete => break,
            }
        }

        let stages: Vec<CycleStage, 16> = telemetry
            .oldest_first()
            .filter_map(|record| match record.event {
                TelemetryEventKind::StageEntered(stage) => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages.as_slice(),
            &[
                CycleStage::PowerDownAll,
                CycleStage::Settle,
                CycleStage::PowerUpRouter,
                CycleStage::StabilizeRouter,
                CycleStage::PowerUpMesh,
                CycleStage::Complete,
            ]
        );

        let summary = telemetry.latest().copied().expect("missing completion");
        assert_eq!(summary.event, TelemetryEventKind::CycleComplete);
        match summary.details {
            TelemetryPayload::Cycle(details) => {
                assert_eq!(details.relays_switched, 4);
                assert_eq!(
                    details.duration,
                    Some(Duration::from_millis(160_000))
                );
            }
            _ => panic!("expected cycle payload"),
        }
    }

    #[test]
    fn zero_delay_template_completes_in_one_advance() {
        let template = CycleTemplate::with_delays(Duration::ZERO, Duration::ZERO);
        let mut run = CycleRun::new(template);
        let mut driver = RecordingDriver::default();
        let mut telemetry = TelemetryRecorder::<MockInstant>::new();

        let status = run.advance(&mut driver, &mut telemetry, MockInstant::millis(5));
        assert_eq!(status, CycleStatus::Complete);
        assert_eq!(driver.transitions.len(), 4);
        assert_eq!(run.started_at(), Some(MockInstant::millis(5)));
    }
}
