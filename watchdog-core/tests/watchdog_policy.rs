//! End-to-end policy checks: verdict streams feeding the failure counter and,
//! past the threshold, a full cycle run with a simulated clock.

use core::ops::Add;
use core::time::Duration;

use watchdog_core::cycle::{CycleRun, CycleStatus, RelayDriver};
use watchdog_core::monitor::{FailureTracker, ReachabilityVerdict};
use watchdog_core::relays::{RelayAction, RelayId, power_cycle_template};
use watchdog_core::telemetry::{TelemetryInstant, TelemetryRecorder};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
struct SimInstant(u64);

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

impl TelemetryInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Default)]
struct TransitionLog {
    applied: std::vec::Vec<(RelayId, RelayAction)>,
}

impl RelayDriver for TransitionLog {
    fn apply(&mut self, line: RelayId, action: RelayAction) {
        self.applied.push((line, action));
    }
}

/// Runs the watchdog decision loop over a scripted verdict stream, executing
/// a full simulated cycle whenever the threshold is crossed.
fn run_script(verdicts: &[ReachabilityVerdict], max_failures: u32) -> (u32, usize, TransitionLog) {
    let mut tracker = FailureTracker::new(max_failures);
    let mut driver = TransitionLog::default();
    let mut telemetry = TelemetryRecorder::<SimInstant>::new();
    let mut now = SimInstant(0);
    let mut cycles = 0;

    for verdict in verdicts.iter().copied() {
        tracker.record(verdict);
        if tracker.threshold_crossed() {
            let mut run = CycleRun::new(power_cycle_template());
            loop {
                match run.advance(&mut driver, &mut telemetry, now) {
                    CycleStatus::HoldUntil(deadline) => now = deadline,
                    CycleStatus::Complete => break,
                }
            }
            tracker.reset_after_cycle();
            cycles += 1;
        }
        now = now + Duration::from_secs(300);
    }

    (tracker.count(), cycles, driver)
}

#[test]
fn three_consecutive_failures_trigger_exactly_one_cycle() {
    let verdicts = [ReachabilityVerdict::Down; 3];
    let (count, cycles, driver) = run_script(&verdicts, 3);

    assert_eq!(cycles, 1);
    assert_eq!(count, 0);
    assert_eq!(
        driver.applied,
        vec![
            (RelayId::Router, RelayAction::DeEnergize),
            (RelayId::Mesh, RelayAction::DeEnergize),
            (RelayId::Router, RelayAction::Energize),
            (RelayId::Mesh, RelayAction::Energize),
        ]
    );
}

#[test]
fn recovery_mid_stream_prevents_any_cycle() {
    let verdicts = [
        ReachabilityVerdict::Down,
        ReachabilityVerdict::Down,
        ReachabilityVerdict::Up,
        ReachabilityVerdict::Down,
        ReachabilityVerdict::Down,
    ];
    let (count, cycles, driver) = run_script(&verdicts, 3);

    assert_eq!(cycles, 0);
    assert_eq!(count, 2);
    assert!(driver.applied.is_empty());
}

#[test]
fn cycle_never_runs_below_threshold() {
    let verdicts = [ReachabilityVerdict::Down; 2];
    let (count, cycles, _) = run_script(&verdicts, 3);

    assert_eq!(cycles, 0);
    assert_eq!(count, 2);
}

#[test]
fn persistent_outage_keeps_trying_forever() {
    // Six straight failures with threshold 3: the counter re-accumulates
    // after each cycle, so the watchdog fires again. Keep-trying-forever is
    // the intended unattended-device policy.
    let verdicts = [ReachabilityVerdict::Down; 6];
    let (count, cycles, driver) = run_script(&verdicts, 3);

    assert_eq!(cycles, 2);
    assert_eq!(count, 0);
    assert_eq!(driver.applied.len(), 8);
}
