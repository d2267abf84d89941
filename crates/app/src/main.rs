mod bank;
mod console;

use std::fmt;

use exam_core::model::{ExitTimerPolicy, SessionSettingsDraft};
use services::{Clock, CountdownConfig, SessionController, SessionEvent, SessionRunner, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::Input;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--questions <n>] [--duration <secs>] [--pause-on-exit] [--json]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --questions 30");
    eprintln!("  --duration 3600");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_QUESTION_COUNT, EXAM_DURATION_SECS, EXAM_PAUSE_ON_EXIT, RUST_LOG");
}

struct Args {
    settings: SessionSettingsDraft,
    json: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut settings = SessionSettingsDraft {
            question_count: env_number("EXAM_QUESTION_COUNT"),
            duration_secs: env_number("EXAM_DURATION_SECS"),
            exit_timer_policy: std::env::var("EXAM_PAUSE_ON_EXIT")
                .ok()
                .filter(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .map(|_| ExitTimerPolicy::Pause),
        };
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    settings.question_count = Some(parse_number("--questions", value)?);
                }
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    settings.duration_secs = Some(parse_number("--duration", value)?);
                }
                "--pause-on-exit" => settings.exit_timer_policy = Some(ExitTimerPolicy::Pause),
                "--json" => json = true,
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self { settings, json }))
    }
}

fn env_number(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Screen {
    json: bool,
    last: Option<SessionView>,
}

impl Screen {
    fn show(&mut self, view: SessionView) -> Result<(), serde_json::Error> {
        if self.json {
            println!("{}", serde_json::to_string(&view)?);
        } else {
            let only_clock = self.last.as_ref().is_some_and(|last| {
                let mut last = last.clone();
                last.remaining_secs = view.remaining_secs;
                last.remaining.clone_from(&view.remaining);
                last == view
            });
            if only_clock {
                if let Some(line) = console::render_clock(&view) {
                    println!("{line}");
                }
            } else {
                println!("\n{}", console::render_view(&view));
            }
        }
        self.last = Some(view);
        Ok(())
    }

    fn redraw(&mut self, view: SessionView) -> Result<(), serde_json::Error> {
        self.last = None;
        self.show(view)
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let Some(parsed) = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    init_tracing();

    let settings = parsed.settings.validate()?;
    let questions = bank::sample_questions()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller =
        SessionController::with_settings(questions, settings, Clock::default_clock()).with_events(tx);
    let runner = SessionRunner::launch(controller, CountdownConfig::default());
    let mut screen = Screen {
        json: parsed.json,
        last: None,
    };
    if !parsed.json {
        println!("{}", console::HELP);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(SessionEvent::Changed(view)) => screen.show(view)?,
                Some(SessionEvent::Ended(event)) => {
                    if parsed.json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else {
                        println!("\n{}", console::render_terminal(&event));
                    }
                    break;
                }
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed; leaving the test");
                    break;
                };
                match console::parse_input(&line) {
                    Ok(Input::Command(command)) => {
                        if let Err(err) = runner.dispatch(command) {
                            eprintln!("{err}");
                        }
                    }
                    Ok(Input::Show) => screen.redraw(runner.view()?)?,
                    Ok(Input::Help) => println!("{}", console::HELP),
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    let status = runner.status()?;
    if !status.is_terminal() {
        warn!(%status, "leaving before the session ended");
    }
    drop(runner);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
    // The stdin reader thread may still be parked on a read.
    std::process::exit(0);
}
