mod session;

use std::env;
use std::io::{self, BufRead, Write};

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    let profile = match profile_from_args() {
        Ok(profile) => profile,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: watchdog-emulator [--profile] [outage|flap|steady]");
            std::process::exit(2);
        }
    };

    repl(Session::new(profile)?)
}

fn repl(mut session: Session) -> io::Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    writeln!(
        out,
        "Internet Watchdog Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // EOF: finish the prompt line and close down quietly.
            writeln!(out)?;
            return Ok(());
        }

        let command = input.trim();
        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
            writeln!(out, "Session closed.")?;
            return Ok(());
        }

        for line in session.handle_command(command)? {
            writeln!(out, "{line}")?;
        }
    }
}

fn profile_from_args() -> Result<TranscriptProfile, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(TranscriptProfile::Outage),
        [tag] => TranscriptProfile::from_tag(tag.strip_prefix("--profile=").unwrap_or(tag)),
        [flag, tag] if flag == "--profile" => TranscriptProfile::from_tag(tag),
        _ => Err("Expected at most one transcript profile".to_string()),
    }
}
