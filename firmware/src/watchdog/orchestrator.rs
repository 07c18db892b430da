//! Watchdog orchestrator.
//!
//! Ties the reachability policy from `watchdog-core` to the collaborators the
//! firmware injects: a network link, an echo probe, and the relay driver. The
//! decision logic is synchronous and host-testable; only the waiting happens
//! behind `await`.

use core::net::Ipv4Addr;

use embassy_time::{Instant, Timer};
use log::{info, warn};
use watchdog_core::cycle::{CycleRun, CycleStatus, RelayDriver};
use watchdog_core::monitor::{FailureTracker, MonitorConfig, ReachabilityVerdict};
use watchdog_core::relays::power_cycle_template;
use watchdog_core::telemetry::{TelemetryEventKind, TelemetryInstant, TelemetryPayload};

use super::{FirmwareInstant, TelemetryRecorder, core_duration_to_embassy};
use crate::status;

/// Association state of the Wi-Fi uplink the watchdog monitors through.
pub trait NetworkLink {
    /// Returns `true` while the link is associated and has an address.
    fn is_associated(&self) -> bool;

    /// Resolves once the link is usable again. May wait indefinitely.
    async fn associate(&mut self);
}

/// Echo-request reachability probe against a single reference host.
pub trait ReachabilityProbe {
    /// Returns `true` if `host` answered within the attempt budget.
    async fn probe(&mut self, host: Ipv4Addr, attempts: u8) -> bool;
}

/// Outcome of folding one reachability sample into the failure counter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleOutcome {
    /// The path is up; the counter was reset.
    Reachable,
    /// The path is down but the threshold has not been reached.
    Failure { count: u32 },
    /// The threshold was crossed; a power cycle is due.
    ThresholdCrossed { count: u32 },
}

/// Coordinates sampling, counting, and power cycling.
pub struct Watchdog<L, P, D> {
    config: MonitorConfig,
    link: L,
    probe: P,
    relays: D,
    tracker: FailureTracker,
}

impl<L, P, D> Watchdog<L, P, D>
where
    L: NetworkLink,
    P: ReachabilityProbe,
    D: RelayDriver,
{
    /// Creates a watchdog and drives every relay to its fail-safe state.
    ///
    /// Both devices must be powered before any monitoring decision is made;
    /// an MCU reset mid-cycle otherwise leaves the network dark.
    pub fn new(config: MonitorConfig, link: L, probe: P, mut relays: D) -> Self {
        relays.energize_all();
        Self {
            tracker: FailureTracker::new(config.max_failures),
            config,
            link,
            probe,
            relays,
        }
    }

    /// Returns the failure counter.
    pub fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    /// Returns the monitoring policy in force.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Folds one sample verdict into the counter and reports what it means.
    pub fn note_sample(
        &mut self,
        verdict: ReachabilityVerdict,
        telemetry: &mut TelemetryRecorder,
        now: FirmwareInstant,
    ) -> SampleOutcome {
        let count = self.tracker.record(verdict);
        let threshold = self.tracker.threshold();
        telemetry.record_sample_verdict(verdict, count, threshold, now);
        status::record_sample(verdict, count);

        match verdict {
            ReachabilityVerdict::Up => {
                info!("monitor: internet reachable, counter reset");
                SampleOutcome::Reachable
            }
            ReachabilityVerdict::Down if self.tracker.threshold_crossed() => {
                telemetry.record(TelemetryEventKind::ThresholdCrossed, TelemetryPayload::none(), now);
                warn!("monitor: internet down {count}/{threshold}, threshold crossed");
                SampleOutcome::ThresholdCrossed { count }
            }
            ReachabilityVerdict::Down => {
                warn!("monitor: internet down {count}/{threshold}");
                SampleOutcome::Failure { count }
            }
        }
    }

    /// Blocks until the uplink is associated, narrating the recovery.
    ///
    /// Association loss is handled here, orthogonally to the failure counter:
    /// a watchdog that cannot even reach its own access point has no business
    /// judging the internet path.
    pub async fn ensure_associated(&mut self, telemetry: &mut TelemetryRecorder) {
        if self.link.is_associated() {
            return;
        }

        telemetry.record(
            TelemetryEventKind::LinkAssociating,
            TelemetryPayload::none(),
            FirmwareInstant::from(Instant::now()),
        );
        info!("link: lost association, waiting for the uplink");

        self.link.associate().await;

        telemetry.record(
            TelemetryEventKind::LinkAssociated,
            TelemetryPayload::none(),
            FirmwareInstant::from(Instant::now()),
        );
        info!("link: associated");
    }

    /// Probes both reference hosts and aggregates them into one verdict.
    ///
    /// Both hosts are probed every sample, each with its own attempt budget;
    /// one answer is enough for UP.
    pub async fn sample_once(&mut self) -> ReachabilityVerdict {
        let [primary, secondary] = self.config.reference_hosts;
        let attempts = self.config.probe_attempts;

        let primary_up = self.probe.probe(primary, attempts).await;
        let secondary_up = self.probe.probe(secondary, attempts).await;

        ReachabilityVerdict::from_probes(primary_up, secondary_up)
    }

    /// Runs one full power cycle against real timers, then resets the counter.
    pub async fn power_cycle(&mut self, telemetry: &mut TelemetryRecorder) {
        info!("cycle: starting power cycle");
        let mut run = CycleRun::new(power_cycle_template());

        loop {
            let now = FirmwareInstant::from(Instant::now());
            match run.advance(&mut self.relays, telemetry, now) {
                CycleStatus::HoldUntil(deadline) => {
                    if let Some(stage) = run.current_stage() {
                        let hold = deadline.saturating_duration_since(now);
                        info!("cycle: {} for {}s", stage.label(), hold.as_secs());
                    }
                    Timer::at(deadline.into_embassy()).await;
                }
                CycleStatus::Complete => break,
            }
        }

        self.tracker.reset_after_cycle();
        status::record_cycle_completed();
        info!("cycle: complete, failure counter reset");
    }

    /// Monitoring loop: sample, count, cycle, forever.
    pub async fn run(mut self, telemetry: &mut TelemetryRecorder) -> ! {
        let interval = core_duration_to_embassy(self.config.sample_interval);
        let [primary, secondary] = self.config.reference_hosts;
        info!(
            "watchdog: probing {primary} and {secondary} every {}s, threshold {}",
            self.config.sample_interval.as_secs(),
            self.tracker.threshold()
        );

        loop {
            self.ensure_associated(telemetry).await;

            let verdict = self.sample_once().await;
            let now = FirmwareInstant::from(Instant::now());
            if let SampleOutcome::ThresholdCrossed { .. } = self.note_sample(verdict, telemetry, now)
            {
                self.power_cycle(telemetry).await;
            }

            Timer::after(interval).await;
        }
    }
}
