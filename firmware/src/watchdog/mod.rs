#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Watchdog control surface bridging firmware tasks with `watchdog-core`.

pub mod orchestrator;

use core::ops::Add;
use core::time::Duration;

use embassy_time::{Duration as EmbassyDuration, Instant};
use watchdog_core::telemetry::{self, TelemetryInstant};

/// Monotonic firmware timestamp shared by telemetry and the cycle engine.
///
/// Wraps [`embassy_time::Instant`] so `watchdog-core` can stay agnostic of
/// the timer driver while firmware code converts freely in both directions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Returns the wrapped Embassy instant.
    pub const fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl From<FirmwareInstant> for Instant {
    fn from(instant: FirmwareInstant) -> Self {
        instant.0
    }
}

impl Add<Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + core_duration_to_embassy(rhs))
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_duration_since(earlier.0).as_micros())
    }
}

pub(crate) fn core_duration_to_embassy(duration: Duration) -> EmbassyDuration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    EmbassyDuration::from_micros(micros)
}

/// Telemetry recorder bound to the firmware clock.
pub type TelemetryRecorder = telemetry::TelemetryRecorder<FirmwareInstant>;

/// Telemetry record bound to the firmware clock.
#[allow(dead_code)]
pub type TelemetryRecord = telemetry::TelemetryRecord<FirmwareInstant>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_core_durations_advances_the_wrapped_clock() {
        let base = FirmwareInstant::from(Instant::from_micros(1_000));
        let later = base + Duration::from_millis(2);
        assert_eq!(later.into_embassy().as_micros(), 3_000);
        assert_eq!(
            later.saturating_duration_since(base),
            Duration::from_millis(2)
        );
    }

    #[test]
    fn duration_since_saturates_at_zero() {
        let early = FirmwareInstant::from(Instant::from_micros(100));
        let late = FirmwareInstant::from(Instant::from_micros(500));
        assert_eq!(early.saturating_duration_since(late), Duration::ZERO);
    }
}
