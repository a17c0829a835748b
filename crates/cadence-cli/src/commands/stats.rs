use clap::Subcommand;
use cadence_core::storage::date_label;

use super::{open_app, warning_sink};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today, total and streak
    Show,
    /// Completed sessions grouped by day
    History {
        /// Print raw records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Erase the session history
    Clear {
        /// Confirm the erase
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = open_app(warning_sink())?;

    match action {
        StatsAction::Show => {
            println!("{}", serde_json::to_string_pretty(app.stats())?);
        }
        StatsAction::History { json } => {
            if json {
                let records: Vec<_> = app.sessions().all().collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            let today = app.today();
            for (date, records) in app.sessions().grouped_by_date() {
                println!("{}", date_label(date, today));
                for record in records {
                    let time = record.end_time.with_timezone(&chrono::Local).format("%H:%M");
                    let task = record
                        .task_name
                        .as_deref()
                        .map(|name| format!("  {name}"))
                        .unwrap_or_default();
                    println!(
                        "  {time}  {:<11} {:>3} min{task}",
                        record.session_type.label(),
                        record.duration_minutes.round()
                    );
                }
            }
        }
        StatsAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear history without --yes".into());
            }
            app.clear_history();
            println!("history cleared");
        }
    }
    Ok(())
}
