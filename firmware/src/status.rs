#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics track the relay power states, the failure counter, and
//! the last reachability verdict so the heartbeat task can surface a
//! [`StatusSnapshot`] without touching shared mutable state directly.

use portable_atomic::{AtomicU8, AtomicU32, Ordering};
use watchdog_core::monitor::ReachabilityVerdict;
use watchdog_core::relays::{RelayId, RelayState};

const VERDICT_UNKNOWN: u8 = 0;
const VERDICT_UP: u8 = 1;
const VERDICT_DOWN: u8 = 2;

/// Bitmask describing currently energized relays (1 == energized).
///
/// Starts with every bit set to match the fail-safe power-up state.
static RELAY_MASK: AtomicU8 = AtomicU8::new(0b11);
/// Consecutive failed samples as last reported by the monitor.
static CONSECUTIVE_FAILURES: AtomicU32 = AtomicU32::new(0);
/// Number of completed power cycles since boot.
static CYCLES_COMPLETED: AtomicU32 = AtomicU32::new(0);
/// Encoded last sample verdict.
static LAST_VERDICT: AtomicU8 = AtomicU8::new(VERDICT_UNKNOWN);

fn bit_for(id: RelayId) -> u8 {
    1 << id.as_index()
}

fn encode_verdict(verdict: ReachabilityVerdict) -> u8 {
    match verdict {
        ReachabilityVerdict::Up => VERDICT_UP,
        ReachabilityVerdict::Down => VERDICT_DOWN,
    }
}

fn decode_verdict(raw: u8) -> Option<ReachabilityVerdict> {
    match raw {
        VERDICT_UP => Some(ReachabilityVerdict::Up),
        VERDICT_DOWN => Some(ReachabilityVerdict::Down),
        _ => None,
    }
}

/// Records the power state for a relay line.
pub fn record_relay_state(id: RelayId, state: RelayState) {
    let bit = bit_for(id);
    match state {
        RelayState::Energized => {
            RELAY_MASK.fetch_or(bit, Ordering::Relaxed);
        }
        RelayState::DeEnergized => {
            RELAY_MASK.fetch_and(!bit, Ordering::Relaxed);
        }
    }
}

/// Records the verdict and counter value from the latest sample.
pub fn record_sample(verdict: ReachabilityVerdict, consecutive_failures: u32) {
    LAST_VERDICT.store(encode_verdict(verdict), Ordering::Relaxed);
    CONSECUTIVE_FAILURES.store(consecutive_failures, Ordering::Relaxed);
}

/// Bumps the completed power-cycle counter.
pub fn record_cycle_completed() {
    CYCLES_COMPLETED.fetch_add(1, Ordering::Relaxed);
    CONSECUTIVE_FAILURES.store(0, Ordering::Relaxed);
}

/// Returns the sampled relay power states in catalog order.
pub fn relay_samples() -> [(RelayId, RelayState); 2] {
    let mask = RELAY_MASK.load(Ordering::Relaxed);
    [
        sample_from_mask(mask, RelayId::Router),
        sample_from_mask(mask, RelayId::Mesh),
    ]
}

/// Point-in-time view of the watchdog used for heartbeat logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub relays: [(RelayId, RelayState); 2],
    pub last_verdict: Option<ReachabilityVerdict>,
    pub consecutive_failures: u32,
    pub cycles_completed: u32,
}

/// Builds a [`StatusSnapshot`] from the stored metrics.
pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        relays: relay_samples(),
        last_verdict: decode_verdict(LAST_VERDICT.load(Ordering::Relaxed)),
        consecutive_failures: CONSECUTIVE_FAILURES.load(Ordering::Relaxed),
        cycles_completed: CYCLES_COMPLETED.load(Ordering::Relaxed),
    }
}

fn sample_from_mask(mask: u8, id: RelayId) -> (RelayId, RelayState) {
    let state = if mask & bit_for(id) != 0 {
        RelayState::Energized
    } else {
        RelayState::DeEnergized
    };
    (id, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchdog_core::relays::ALL_RELAYS;

    // The atomics are process-global and other tests write them, so coverage
    // sticks to the pure encode/decode helpers.
    #[test]
    fn boot_mask_matches_catalog_defaults() {
        for line in ALL_RELAYS {
            assert_eq!(line.default_state, RelayState::Energized);
            assert_eq!(sample_from_mask(0b11, line.id), (line.id, RelayState::Energized));
        }
    }

    #[test]
    fn mask_decodes_per_line() {
        assert_eq!(
            sample_from_mask(0b01, RelayId::Router),
            (RelayId::Router, RelayState::Energized)
        );
        assert_eq!(
            sample_from_mask(0b01, RelayId::Mesh),
            (RelayId::Mesh, RelayState::DeEnergized)
        );
        assert_eq!(
            sample_from_mask(0b10, RelayId::Router),
            (RelayId::Router, RelayState::DeEnergized)
        );
    }

    #[test]
    fn verdict_encoding_round_trips() {
        for verdict in [ReachabilityVerdict::Up, ReachabilityVerdict::Down] {
            assert_eq!(decode_verdict(encode_verdict(verdict)), Some(verdict));
        }
        assert_eq!(decode_verdict(VERDICT_UNKNOWN), None);
    }
}
