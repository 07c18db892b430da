//! Reachability sampling policy and the consecutive-failure counter.
//!
//! The monitor decides, once per sampling interval, whether the internet path
//! is up, and decides when the failure threshold has been crossed. Probing
//! itself is a firmware concern; this module owns the aggregation rules so
//! they can be exercised on the host without network hardware.

use core::fmt;
use core::net::Ipv4Addr;
use core::time::Duration;

/// Default wall-clock period between reachability checks.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default number of consecutive failed samples required to trigger a cycle.
pub const DEFAULT_MAX_FAILURES: u32 = 3;
/// Default per-host echo attempt budget.
pub const DEFAULT_PROBE_ATTEMPTS: u8 = 3;
/// Default reference hosts: two independent public resolvers so a single
/// provider outage cannot masquerade as a dead uplink.
pub const DEFAULT_REFERENCE_HOSTS: [Ipv4Addr; 2] =
    [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 1, 1, 1)];

/// Per-sample reachability verdict for the internet path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReachabilityVerdict {
    Up,
    Down,
}

impl ReachabilityVerdict {
    /// Dual-host OR policy: the path is up if either reference host answered.
    ///
    /// Redundancy against single-host outages, deliberately not a stricter
    /// AND: one silent resolver must not power-cycle the network.
    pub const fn from_probes(primary: bool, secondary: bool) -> Self {
        if primary || secondary {
            ReachabilityVerdict::Up
        } else {
            ReachabilityVerdict::Down
        }
    }

    pub const fn is_up(self) -> bool {
        matches!(self, ReachabilityVerdict::Up)
    }
}

impl fmt::Display for ReachabilityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityVerdict::Up => f.write_str("up"),
            ReachabilityVerdict::Down => f.write_str("down"),
        }
    }
}

/// Read-only monitor configuration, fixed at build/deploy time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub max_failures: u32,
    pub probe_attempts: u8,
    pub reference_hosts: [Ipv4Addr; 2],
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        sample_interval: DEFAULT_SAMPLE_INTERVAL,
        max_failures: DEFAULT_MAX_FAILURES,
        probe_attempts: DEFAULT_PROBE_ATTEMPTS,
        reference_hosts: DEFAULT_REFERENCE_HOSTS,
    };
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Consecutive-failure counter owned by the monitor.
///
/// Incremented by exactly one per DOWN sample, reset on any UP sample and
/// unconditionally after a completed power cycle. The counter is never
/// clamped; every reset path fires long before the range matters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FailureTracker {
    consecutive_failures: u32,
    max_failures: u32,
}

impl FailureTracker {
    /// Creates a tracker with the provided threshold and a zeroed counter.
    pub const fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
        }
    }

    /// Folds one sample verdict into the counter and returns the new count.
    pub fn record(&mut self, verdict: ReachabilityVerdict) -> u32 {
        match verdict {
            ReachabilityVerdict::Up => self.consecutive_failures = 0,
            ReachabilityVerdict::Down => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            }
        }
        self.consecutive_failures
    }

    /// Clears the counter after a completed power cycle.
    pub fn reset_after_cycle(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Returns the current consecutive-failure count.
    pub const fn count(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns the configured failure threshold.
    pub const fn threshold(&self) -> u32 {
        self.max_failures
    }

    /// Pure read: `true` iff the counter has reached the threshold.
    pub const fn threshold_crossed(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_policy_masks_single_host_outage() {
        assert_eq!(
            ReachabilityVerdict::from_probes(true, true),
            ReachabilityVerdict::Up
        );
        assert_eq!(
            ReachabilityVerdict::from_probes(true, false),
            ReachabilityVerdict::Up
        );
        assert_eq!(
            ReachabilityVerdict::from_probes(false, true),
            ReachabilityVerdict::Up
        );
        assert_eq!(
            ReachabilityVerdict::from_probes(false, false),
            ReachabilityVerdict::Down
        );
    }

    #[test]
    fn counter_tracks_trailing_failures() {
        let mut tracker = FailureTracker::new(3);
        assert_eq!(tracker.count(), 0);

        assert_eq!(tracker.record(ReachabilityVerdict::Down), 1);
        assert_eq!(tracker.record(ReachabilityVerdict::Down), 2);
        assert!(!tracker.threshold_crossed());

        assert_eq!(tracker.record(ReachabilityVerdict::Down), 3);
        assert!(tracker.threshold_crossed());
    }

    #[test]
    fn single_up_resets_counter_from_any_value() {
        let mut tracker = FailureTracker::new(3);
        tracker.record(ReachabilityVerdict::Down);
        tracker.record(ReachabilityVerdict::Down);

        assert_eq!(tracker.record(ReachabilityVerdict::Up), 0);
        assert_eq!(tracker.count(), 0);
        assert!(!tracker.threshold_crossed());
    }

    #[test]
    fn reset_after_cycle_clears_counter() {
        let mut tracker = FailureTracker::new(2);
        tracker.record(ReachabilityVerdict::Down);
        tracker.record(ReachabilityVerdict::Down);
        assert!(tracker.threshold_crossed());

        tracker.reset_after_cycle();
        assert_eq!(tracker.count(), 0);
        assert!(!tracker.threshold_crossed());
    }

    #[test]
    fn interleaved_up_prevents_threshold() {
        // [DOWN, DOWN, UP, DOWN, DOWN] with threshold 3 never crosses.
        let mut tracker = FailureTracker::new(3);
        let verdicts = [
            ReachabilityVerdict::Down,
            ReachabilityVerdict::Down,
            ReachabilityVerdict::Up,
            ReachabilityVerdict::Down,
            ReachabilityVerdict::Down,
        ];

        let mut crossed = false;
        for verdict in verdicts {
            tracker.record(verdict);
            crossed |= tracker.threshold_crossed();
        }

        assert!(!crossed);
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn default_config_matches_deployment_constants() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_interval, Duration::from_secs(300));
        assert_eq!(config.max_failures, 3);
        assert_eq!(config.probe_attempts, 3);
        assert_eq!(config.reference_hosts[0], Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(config.reference_hosts[1], Ipv4Addr::new(1, 1, 1, 1));
    }
}
