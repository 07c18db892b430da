//! Telemetry event catalog and ring buffer shared by firmware and host targets.
//!
//! The watchdog narrates its decisions through strongly typed event kinds that
//! serialize to compact numeric codes for transport over diagnostic channels.
//! Payload enums carry the extra metadata the emulator transcript and host
//! tests rely on while remaining `no_std` compatible.

use core::{convert::TryFrom, fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::monitor::ReachabilityVerdict;
use crate::relays::{CycleStage, RelayAction, RelayId};

/// Identifier assigned to recorded telemetry events.
pub type EventId = u32;

/// Discriminated telemetry events shared across all watchdog targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    RelayEnergized(RelayId),
    RelayDeEnergized(RelayId),
    LinkAssociating,
    LinkAssociated,
    SampleVerdict(ReachabilityVerdict),
    ThresholdCrossed,
    StageEntered(CycleStage),
    CycleComplete,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::RelayEnergized(line) => write!(f, "relay-energized {line:?}"),
            TelemetryEventKind::RelayDeEnergized(line) => {
                write!(f, "relay-de-energized {line:?}")
            }
            TelemetryEventKind::LinkAssociating => f.write_str("link-associating"),
            TelemetryEventKind::LinkAssociated => f.write_str("link-associated"),
            TelemetryEventKind::SampleVerdict(verdict) => write!(f, "sample-verdict {verdict}"),
            TelemetryEventKind::ThresholdCrossed => f.write_str("threshold-crossed"),
            TelemetryEventKind::StageEntered(stage) => {
                write!(f, "stage-entered {}", stage.label())
            }
            TelemetryEventKind::CycleComplete => f.write_str("cycle-complete"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const RELAY_ENERGIZED_BASE: u16 = 0x0000;
    const RELAY_DEENERGIZED_BASE: u16 = 0x0002;
    const LINK_ASSOCIATING_CODE: u16 = 0x0004;
    const LINK_ASSOCIATED_CODE: u16 = 0x0005;
    const SAMPLE_UP_CODE: u16 = 0x0006;
    const SAMPLE_DOWN_CODE: u16 = 0x0007;
    const THRESHOLD_CODE: u16 = 0x0008;
    const STAGE_BASE: u16 = 0x0010;
    const STAGE_COUNT: u16 = 6;
    const CYCLE_COMPLETE_CODE: u16 = 0x0018;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::RelayEnergized(line) => {
                Self::RELAY_ENERGIZED_BASE + relay_index(line)
            }
            TelemetryEventKind::RelayDeEnergized(line) => {
                Self::RELAY_DEENERGIZED_BASE + relay_index(line)
            }
            TelemetryEventKind::LinkAssociating => Self::LINK_ASSOCIATING_CODE,
            TelemetryEventKind::LinkAssociated => Self::LINK_ASSOCIATED_CODE,
            TelemetryEventKind::SampleVerdict(ReachabilityVerdict::Up) => Self::SAMPLE_UP_CODE,
            TelemetryEventKind::SampleVerdict(ReachabilityVerdict::Down) => Self::SAMPLE_DOWN_CODE,
            TelemetryEventKind::ThresholdCrossed => Self::THRESHOLD_CODE,
            TelemetryEventKind::StageEntered(stage) => Self::STAGE_BASE + stage_index(stage),
            TelemetryEventKind::CycleComplete => Self::CYCLE_COMPLETE_CODE,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant into a telemetry event, falling back to [`Custom`].
    ///
    /// [`Custom`]: TelemetryEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::LINK_ASSOCIATING_CODE => TelemetryEventKind::LinkAssociating,
            Self::LINK_ASSOCIATED_CODE => TelemetryEventKind::LinkAssociated,
            Self::SAMPLE_UP_CODE => TelemetryEventKind::SampleVerdict(ReachabilityVerdict::Up),
            Self::SAMPLE_DOWN_CODE => TelemetryEventKind::SampleVerdict(ReachabilityVerdict::Down),
            Self::THRESHOLD_CODE => TelemetryEventKind::ThresholdCrossed,
            Self::CYCLE_COMPLETE_CODE => TelemetryEventKind::CycleComplete,
            value if (Self::RELAY_ENERGIZED_BASE..Self::RELAY_DEENERGIZED_BASE).contains(&value) => {
                let offset = value - Self::RELAY_ENERGIZED_BASE;
                relay_from_index(offset).map_or(TelemetryEventKind::Custom(value), |line| {
                    TelemetryEventKind::RelayEnergized(line)
                })
            }
            value if (Self::RELAY_DEENERGIZED_BASE..Self::LINK_ASSOCIATING_CODE).contains(&value) => {
                let offset = value - Self::RELAY_DEENERGIZED_BASE;
                relay_from_index(offset).map_or(TelemetryEventKind::Custom(value), |line| {
                    TelemetryEventKind::RelayDeEnergized(line)
                })
            }
            value if (Self::STAGE_BASE..Self::STAGE_BASE + Self::STAGE_COUNT).contains(&value) => {
                let offset = value - Self::STAGE_BASE;
                stage_from_index(offset).map_or(TelemetryEventKind::Custom(value), |stage| {
                    TelemetryEventKind::StageEntered(stage)
                })
            }
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Details describing a relay transition.
    Relay(RelayTelemetry),
    /// Counter state captured with a sample verdict.
    Verdict(VerdictTelemetry),
    /// Summary of a completed power cycle.
    Cycle(CycleTelemetry),
}

impl TelemetryPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

/// Relay transition payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RelayTelemetry {
    pub line: RelayId,
    pub action: RelayAction,
    pub elapsed_since_previous: Option<Duration>,
}

impl RelayTelemetry {
    #[must_use]
    pub const fn new(
        line: RelayId,
        action: RelayAction,
        elapsed_since_previous: Option<Duration>,
    ) -> Self {
        Self {
            line,
            action,
            elapsed_since_previous,
        }
    }
}

/// Failure-counter snapshot attached to each sample verdict.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VerdictTelemetry {
    pub verdict: ReachabilityVerdict,
    pub failure_count: u32,
    pub threshold: u32,
}

impl VerdictTelemetry {
    #[must_use]
    pub const fn new(verdict: ReachabilityVerdict, failure_count: u32, threshold: u32) -> Self {
        Self {
            verdict,
            failure_count,
            threshold,
        }
    }
}

/// Power-cycle completion summary payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CycleTelemetry {
    pub duration: Option<Duration>,
    pub relays_switched: u8,
}

impl CycleTelemetry {
    #[must_use]
    pub const fn new(duration: Option<Duration>, relays_switched: u8) -> Self {
        Self {
            duration,
            relays_switched,
        }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_relay_transition_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_relay_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    /// Records a relay transition and captures elapsed time since the previous one.
    pub fn record_relay_transition(
        &mut self,
        line: RelayId,
        action: RelayAction,
        timestamp: TInstant,
    ) -> EventId {
        let elapsed = self
            .last_relay_transition_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_relay_transition_at = Some(timestamp);

        let payload = TelemetryPayload::Relay(RelayTelemetry::new(line, action, elapsed));
        self.record(
            match action {
                RelayAction::Energize => TelemetryEventKind::RelayEnergized(line),
                RelayAction::DeEnergize => TelemetryEventKind::RelayDeEnergized(line),
            },
            payload,
            timestamp,
        )
    }

    /// Records a per-cycle reachability verdict with the counter snapshot.
    pub fn record_sample_verdict(
        &mut self,
        verdict: ReachabilityVerdict,
        failure_count: u32,
        threshold: u32,
        timestamp: TInstant,
    ) -> EventId {
        let payload =
            TelemetryPayload::Verdict(VerdictTelemetry::new(verdict, failure_count, threshold));
        self.record(TelemetryEventKind::SampleVerdict(verdict), payload, timestamp)
    }

    /// Records the completion of a power cycle.
    pub fn record_cycle_completion(
        &mut self,
        started_at: Option<TInstant>,
        timestamp: TInstant,
        relays_switched: usize,
    ) -> EventId {
        let duration = started_at.map(|start| timestamp.saturating_duration_since(start));
        let payload = TelemetryPayload::Cycle(CycleTelemetry::new(
            duration,
            truncate_count(relays_switched),
        ));

        self.record(TelemetryEventKind::CycleComplete, payload, timestamp)
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_count(count: usize) -> u8 {
    match u8::try_from(count) {
        Ok(value) => value,
        Err(_) => u8::MAX,
    }
}

const fn relay_index(line: RelayId) -> u16 {
    match line {
        RelayId::Router => 0,
        RelayId::Mesh => 1,
    }
}

fn relay_from_index(index: u16) -> Option<RelayId> {
    match index {
        0 => Some(RelayId::Router),
        1 => Some(RelayId::Mesh),
        _ => None,
    }
}

const fn stage_index(stage: CycleStage) -> u16 {
    match stage {
        CycleStage::PowerDownAll => 0,
        CycleStage::Settle => 1,
        CycleStage::PowerUpRouter => 2,
        CycleStage::StabilizeRouter => 3,
        CycleStage::PowerUpMesh => 4,
        CycleStage::Complete => 5,
    }
}

fn stage_from_index(index: u16) -> Option<CycleStage> {
    match index {
        0 => Some(CycleStage::PowerDownAll),
        1 => Some(CycleStage::Settle),
        2 => Some(CycleStage::PowerUpRouter),
        3 => Some(CycleStage::StabilizeRouter),
        4 => Some(CycleStage::PowerUpMesh),
        5 => Some(CycleStage::Complete),
        _ => None,
    }
}
