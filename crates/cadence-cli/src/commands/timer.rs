//! Timer commands. `run` hosts a live session on the terminal: commands come
//! in on stdin, events go out on stdout as one JSON object per line.

use std::sync::mpsc;
use std::time::Duration;

use cadence_core::storage::{FeedbackConfig, TimerConfig};
use cadence_core::timer::format_remaining;
use cadence_core::{Config, Event, Pomodoro, SystemClock};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};

use super::{open_app, warning_sink};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer interactively.
    ///
    /// Reads one command per line from stdin: start, pause, reset, skip,
    /// stop, hide, show, status, quit.
    Run,
    /// Print the current timer state as JSON
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    Stop,
    Hide,
    Show,
    Status,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let cmd = match line.trim().to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "reset" => Command::Reset,
            "skip" => Command::Skip,
            "stop" => Command::Stop,
            "hide" => Command::Hide,
            "show" => Command::Show,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

type App = Pomodoro<SystemClock, mpsc::Sender<Event>>;

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Status => {
            let app = open_app(warning_sink())?;
            let state = app.state();
            let status = serde_json::json!({
                "label": state.session_label(),
                "remaining": format_remaining(state.remaining_ms),
                "progress": state.progress(),
                "activeTask": app.active_task().map(|t| t.text.as_str()),
                "state": state,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        TimerAction::Run => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_loop())
        }
    }
}

async fn run_loop() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (tx, rx) = mpsc::channel();
    let mut app = open_app(tx)?;

    println!(
        "{}",
        serde_json::to_string(&Event::StateChanged { state: app.state() })?
    );
    drain(&rx, &config, &mut None)?;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.timer.tick_interval_ms.max(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut auto_start_at: Option<Instant> = None;

    loop {
        let auto_start = async move {
            match auto_start_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ticker.tick() => {
                app.tick_pending();
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(Command::Quit) => break,
                    Some(cmd) => apply(&mut app, cmd)?,
                    None => eprintln!("unknown command: {}", line.trim()),
                }
            }
            _ = auto_start => {
                auto_start_at = None;
                // A manual start in the meantime clears eligibility.
                if app.auto_start_eligible() {
                    tracing::debug!("auto-starting break");
                    app.start_timer();
                }
            }
        }

        drain(&rx, &config, &mut auto_start_at)?;
    }

    drain(&rx, &config, &mut auto_start_at)?;
    Ok(())
}

fn apply(app: &mut App, cmd: Command) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Start => {
            app.start_timer();
        }
        Command::Pause => {
            if let Err(e) = app.pause_timer() {
                eprintln!("error: {e}");
            }
        }
        Command::Reset => app.reset_timer(),
        Command::Skip => {
            app.skip_session();
        }
        Command::Stop => app.stop_timer(),
        Command::Hide => app.host_hidden(),
        Command::Show => {
            app.host_visible();
        }
        Command::Status => {
            println!(
                "{}",
                serde_json::to_string(&Event::StateChanged { state: app.state() })?
            );
        }
        Command::Quit => {}
    }
    Ok(())
}

/// Print queued events, surface feedback on stderr, and arm the auto-start
/// timer when a break becomes eligible.
fn drain(
    rx: &mpsc::Receiver<Event>,
    config: &Config,
    auto_start_at: &mut Option<Instant>,
) -> Result<(), serde_json::Error> {
    for event in rx.try_iter() {
        println!("{}", serde_json::to_string(&event)?);
        if let Some(message) = notification(&event, &config.feedback) {
            eprintln!("{message}");
        }
        if config.feedback.sound && matches!(event, Event::SessionCompleted { .. }) {
            eprint!("\x07");
        }
        if let Some(delay) = auto_start_delay(&event, &config.timer) {
            *auto_start_at = Some(Instant::now() + delay);
        }
    }
    Ok(())
}

/// How long to wait before starting a break, if `event` calls for it.
fn auto_start_delay(event: &Event, policy: &TimerConfig) -> Option<Duration> {
    match event {
        Event::BreakAutoStartEligible { .. } if policy.auto_start_breaks => {
            Some(Duration::from_millis(policy.auto_start_delay_ms))
        }
        _ => None,
    }
}

/// Completion notice shown when notifications are enabled.
fn notification(event: &Event, feedback: &FeedbackConfig) -> Option<String> {
    match event {
        Event::SessionCompleted { record } if feedback.notifications => Some(format!(
            "{} complete ({} min)",
            record.session_type.label(),
            record.duration_minutes.round()
        )),
        _ => None,
    }
}
