//! Records reference transcripts for every emulator profile.
//!
//! Run with `cargo run --bin capture_transcripts`; the logs land under
//! `docs/evidence/` and double as living documentation of the watchdog
//! policy: what an outage, a flapping link, and a quiet week look like.

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use std::io;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record(
        TranscriptProfile::Outage,
        &[
            "status",
            "sample down",
            "sample down",
            "sample down",
            "status",
            "telemetry 16",
        ],
    )?;

    record(
        TranscriptProfile::Flap,
        &[
            "sample down 2",
            "sample up",
            "sample down 2",
            "status",
            "telemetry 8",
        ],
    )?;

    record(
        TranscriptProfile::Steady,
        &[
            "sample up 3",
            "link drop",
            "sample up",
            "status",
            "telemetry 6",
        ],
    )?;

    Ok(())
}

fn record(profile: TranscriptProfile, script: &[&str]) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    for command in script {
        let responses = session.handle_command(command)?;
        for response in responses {
            println!("{response}");
        }
    }
    println!("Recorded transcript at {}", profile.log_path());
    Ok(())
}
