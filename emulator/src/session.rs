use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::{Add, AddAssign};
use std::path::Path;
use std::time::{Duration as HostDuration, Instant as HostInstant};

use core::time::Duration;

use watchdog_core::cycle::{CycleRun, CycleStatus, RelayDriver};
use watchdog_core::monitor::{FailureTracker, MonitorConfig, ReachabilityVerdict};
use watchdog_core::relays::{
    ALL_RELAYS, RelayAction, RelayId, RelayState, power_cycle_template, relay_by_id,
};
use watchdog_core::telemetry::{
    TelemetryEventKind, TelemetryInstant, TelemetryPayload, TelemetryRecorder,
};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "sample",
        "sample <up|down> [count]     - feed reachability verdicts to the monitor",
    ),
    (
        "link",
        "link drop                    - drop the simulated Wi-Fi association",
    ),
    (
        "cycle",
        "cycle                        - force a power cycle immediately",
    ),
    (
        "status",
        "status                       - show counter, link, and relay state",
    ),
    (
        "telemetry",
        "telemetry [n]                - dump the most recent telemetry records",
    ),
    (
        "help",
        "help [topic]                 - show help for a command",
    ),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Outage,
    Flap,
    Steady,
}

impl TranscriptProfile {
    /// Path of the transcript log this profile writes under `docs/evidence/`.
    #[must_use]
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Outage => "docs/evidence/emulator-outage.log",
            TranscriptProfile::Flap => "docs/evidence/emulator-flap.log",
            TranscriptProfile::Steady => "docs/evidence/emulator-steady.log",
        }
    }

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Outage => "Internet Watchdog Emulator outage transcript",
            TranscriptProfile::Flap => "Internet Watchdog Emulator flapping-link transcript",
            TranscriptProfile::Steady => "Internet Watchdog Emulator steady-state transcript",
        }
    }

    /// Parses a profile tag supplied on the command line.
    ///
    /// # Errors
    ///
    /// Returns a usage message when the tag names no known profile.
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("outage") {
            Ok(Self::Outage)
        } else if tag.eq_ignore_ascii_case("flap") {
            Ok(Self::Flap)
        } else if tag.eq_ignore_ascii_case("steady") {
            Ok(Self::Steady)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

/// Virtual monotonic clock: milliseconds since session start.
///
/// The emulator never sleeps through the quiescent or stabilization holds; it
/// jumps the clock to each deadline so a full outage plays out instantly.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SimInstant(u64);

impl SimInstant {
    /// Milliseconds elapsed on the simulated clock since session start.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

impl AddAssign<Duration> for SimInstant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl TelemetryInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Simulated relay board holding the logical power state per line.
struct SimRelayBank {
    states: [RelayState; 2],
    pending: Vec<(RelayId, RelayAction)>,
}

impl SimRelayBank {
    fn new() -> Self {
        Self {
            states: [ALL_RELAYS[0].default_state, ALL_RELAYS[1].default_state],
            pending: Vec::new(),
        }
    }

    fn state(&self, id: RelayId) -> RelayState {
        self.states[id.as_index()]
    }

    fn drain_pending(&mut self) -> Vec<(RelayId, RelayAction)> {
        std::mem::take(&mut self.pending)
    }
}

impl RelayDriver for SimRelayBank {
    fn apply(&mut self, line: RelayId, action: RelayAction) {
        self.states[line.as_index()] = action.resulting_state();
        self.pending.push((line, action));
    }
}

pub struct Session {
    config: MonitorConfig,
    tracker: FailureTracker,
    relays: SimRelayBank,
    telemetry: TelemetryRecorder<SimInstant>,
    now: SimInstant,
    link_up: bool,
    cycles_completed: u32,
    transcript: TranscriptLogger,
    started_at: HostInstant,
}

impl Session {
    /// Opens an interactive session and starts its transcript log.
    ///
    /// # Errors
    ///
    /// Returns an error when the transcript file cannot be created.
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        let config = MonitorConfig::DEFAULT;

        Ok(Self {
            config,
            tracker: FailureTracker::new(config.max_failures),
            relays: SimRelayBank::new(),
            telemetry: TelemetryRecorder::new(),
            now: SimInstant::default(),
            link_up: true,
            cycles_completed: 0,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    /// Executes one command line and returns the response lines.
    ///
    /// # Errors
    ///
    /// Returns an error when the transcript log cannot be written.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = self.dispatch(trimmed);
        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    fn dispatch(&mut self, input: &str) -> Vec<String> {
        let mut tokens = input.split_whitespace();
        let command = tokens.next().unwrap_or_default().to_ascii_lowercase();

        match command.as_str() {
            "help" => help_text(tokens.next()),
            "status" => self.handle_status(),
            "sample" => {
                let verdict = match tokens.next().map(str::to_ascii_lowercase).as_deref() {
                    Some("up") => ReachabilityVerdict::Up,
                    Some("down") => ReachabilityVerdict::Down,
                    other => {
                        return vec![format!(
                            "ERR syntax expected `sample <up|down> [count]`, got `{}`",
                            other.unwrap_or("")
                        )];
                    }
                };
                let count = match tokens.next() {
                    None => 1,
                    Some(raw) => match raw.parse::<u32>() {
                        Ok(value) if value >= 1 => value,
                        _ => return vec![format!("ERR syntax bad sample count `{raw}`")],
                    },
                };
                self.handle_samples(verdict, count)
            }
            "link" => match tokens.next().map(str::to_ascii_lowercase).as_deref() {
                Some("drop") => self.handle_link_drop(),
                other => vec![format!(
                    "ERR syntax expected `link drop`, got `{}`",
                    other.unwrap_or("")
                )],
            },
            "cycle" => {
                let mut lines = vec!["OK cycle forced".to_string()];
                self.run_cycle(&mut lines);
                lines
            }
            "telemetry" => {
                let limit = match tokens.next() {
                    None => 8,
                    Some(raw) => match raw.parse::<usize>() {
                        Ok(value) if value >= 1 => value,
                        _ => return vec![format!("ERR syntax bad telemetry count `{raw}`")],
                    },
                };
                self.handle_telemetry(limit)
            }
            other => vec![format!("ERR unknown command `{other}` (try `help`)")],
        }
    }

    fn handle_status(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "state: link={} failures={}/{} cycles={}",
            if self.link_up { "associated" } else { "down" },
            self.tracker.count(),
            self.tracker.threshold(),
            self.cycles_completed,
        )];
        for line in ALL_RELAYS {
            lines.push(format!(
                "relay {} {} ({} {})",
                line.name,
                state_label(self.relays.state(line.id)),
                line.board_input,
                line.mcu_pin,
            ));
        }
        lines.push(format!(
            "clock: {} telemetry-records={}",
            format_sim(self.now),
            self.telemetry.len(),
        ));
        lines
    }

    fn handle_link_drop(&mut self) -> Vec<String> {
        self.link_up = false;
        vec![
            "OK link dropped".to_string(),
            "association recovery will run before the next sample; the failure counter is untouched"
                .to_string(),
        ]
    }

    fn handle_samples(&mut self, verdict: ReachabilityVerdict, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            self.now += self.config.sample_interval;

            if !self.link_up {
                self.telemetry.record(
                    TelemetryEventKind::LinkAssociating,
                    TelemetryPayload::none(),
                    self.now,
                );
                self.telemetry.record(
                    TelemetryEventKind::LinkAssociated,
                    TelemetryPayload::none(),
                    self.now,
                );
                self.link_up = true;
                lines.push(format!("  [{}] link re-associated", format_sim(self.now)));
            }

            let failures = self.tracker.record(verdict);
            self.telemetry.record_sample_verdict(
                verdict,
                failures,
                self.tracker.threshold(),
                self.now,
            );
            lines.push(format!(
                "OK sample verdict={verdict} failures={failures}/{} {}",
                self.tracker.threshold(),
                format_sim(self.now),
            ));

            if verdict == ReachabilityVerdict::Down && self.tracker.threshold_crossed() {
                self.telemetry.record(
                    TelemetryEventKind::ThresholdCrossed,
                    TelemetryPayload::none(),
                    self.now,
                );
                lines.push(format!(
                    "  [{}] threshold crossed: starting power cycle",
                    format_sim(self.now)
                ));
                self.run_cycle(&mut lines);
            }
        }
        lines
    }

    fn run_cycle(&mut self, lines: &mut Vec<String>) {
        let template = power_cycle_template();
        lines.push(format!(
            "cycle: {} steps, minimum {} wall-clock",
            template.step_count(),
            format_duration_short(template.total_hold()),
        ));

        let mut run = CycleRun::new(template);
        loop {
            let status = run.advance(&mut self.relays, &mut self.telemetry, self.now);
            for (line, action) in self.relays.drain_pending() {
                let relay = relay_by_id(line);
                lines.push(format!(
                    "  [{}] {} {} ({} {})",
                    format_sim(self.now),
                    relay.name,
                    action_label(action),
                    relay.board_input,
                    relay.mcu_pin,
                ));
            }

            match status {
                CycleStatus::HoldUntil(deadline) => {
                    if let Some(stage) = run.current_stage() {
                        lines.push(format!(
                            "  [{}] {} until {}",
                            format_sim(self.now),
                            stage.label(),
                            format_sim(deadline),
                        ));
                    }
                    self.now = deadline;
                }
                CycleStatus::Complete => break,
            }
        }

        self.tracker.reset_after_cycle();
        self.cycles_completed += 1;
        lines.push(format!(
            "  [{}] cycle complete, failure counter reset",
            format_sim(self.now)
        ));
    }

    fn handle_telemetry(&self, limit: usize) -> Vec<String> {
        let records: Vec<_> = self.telemetry.oldest_first().copied().collect();
        if records.is_empty() {
            return vec!["telemetry: no records".to_string()];
        }

        let skip = records.len().saturating_sub(limit);
        let mut lines = vec![format!(
            "telemetry: showing {} of {} records",
            records.len() - skip,
            records.len(),
        )];
        for record in &records[skip..] {
            let mut line = format!(
                "  #{:03} [{}] {}",
                record.id,
                format_sim(record.timestamp),
                record.event,
            );
            match record.details {
                TelemetryPayload::Verdict(details) => {
                    line.push_str(&format!(
                        " failures={}/{}",
                        details.failure_count, details.threshold
                    ));
                }
                TelemetryPayload::Cycle(details) => {
                    if let Some(duration) = details.duration {
                        line.push_str(&format!(
                            " duration={} relays-switched={}",
                            format_duration_short(duration),
                            details.relays_switched
                        ));
                    }
                }
                TelemetryPayload::Relay(details) => {
                    if let Some(elapsed) = details.elapsed_since_previous {
                        line.push_str(&format!(" Δ={}", format_duration_short(elapsed)));
                    }
                }
                TelemetryPayload::None => {}
            }
            lines.push(line);
        }
        lines
    }

    fn record_output(&mut self, elapsed: HostDuration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Host timestamps are milliseconds since session start; [t=+...] marks the simulated clock"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: HostDuration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {line}",
            elapsed.as_millis(),
            role.prefix(),
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn help_text(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) if !target.is_empty() => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        _ => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    let mut buffer = String::new();
    for (index, (name, _)) in HELP_TOPICS.iter().enumerate() {
        if index > 0 {
            buffer.push_str(", ");
        }
        buffer.push_str(name);
    }
    buffer
}

fn state_label(state: RelayState) -> &'static str {
    match state {
        RelayState::Energized => "energized",
        RelayState::DeEnergized => "de-energized",
    }
}

fn action_label(action: RelayAction) -> &'static str {
    match action {
        RelayAction::Energize => "energize",
        RelayAction::DeEnergize => "de-energize",
    }
}

fn format_sim(instant: SimInstant) -> String {
    let millis = instant.as_millis();
    if millis % 1_000 == 0 {
        format!("t=+{}s", millis / 1_000)
    } else {
        format!("t=+{millis}ms")
    }
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
