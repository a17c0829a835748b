use clap::Subcommand;
use cadence_core::{Config, DurationConfig};

use super::{open_app, warning_sink};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "ui.theme", "timer.auto_start_breaks")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values.
    ///
    /// `timer run` reads `timer.*`, `feedback.sound` and
    /// `feedback.notifications`; `ui.theme` and `feedback.flash` are kept for
    /// graphical front ends.
    List,
    /// Reset config to defaults
    Reset,
    /// Show or change session lengths, in minutes (1-60)
    Durations {
        #[arg(long)]
        work: Option<String>,
        #[arg(long)]
        short_break: Option<String>,
        #[arg(long)]
        long_break: Option<String>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Durations {
            work,
            short_break,
            long_break,
        } => {
            let mut app = open_app(warning_sink())?;
            let current = app.durations();
            if work.is_none() && short_break.is_none() && long_break.is_none() {
                println!("{}", serde_json::to_string_pretty(&current)?);
                return Ok(());
            }
            let durations = DurationConfig::parse(
                &work.unwrap_or_else(|| current.work_minutes.to_string()),
                &short_break.unwrap_or_else(|| current.short_break_minutes.to_string()),
                &long_break.unwrap_or_else(|| current.long_break_minutes.to_string()),
            )?;
            app.save_duration_config(durations)?;
            println!("{}", serde_json::to_string_pretty(&durations)?);
        }
    }
    Ok(())
}
