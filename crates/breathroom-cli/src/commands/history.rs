use breathroom_core::storage::Database;
use clap::Subcommand;

use crate::terminal::fmt_secs;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent sessions
    List {
        /// Maximum number of entries
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals, all time and today
    Stats,
    /// Delete all history
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit, json } => {
            let history = db.list_history(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for record in &history {
                    let status = if record.completed { "complete" } else { "stopped" };
                    println!(
                        "{}  {:<28} {:>6} / {:<6} {status}",
                        record.recorded_at.format("%Y-%m-%d %H:%M"),
                        record.name,
                        fmt_secs(record.actual_duration_secs),
                        fmt_secs(record.total_target_secs),
                    );
                }
            }
        }
        HistoryAction::Stats => {
            let stats = db.history_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Clear => {
            let removed = db.clear_history()?;
            println!("history cleared ({removed} entries)");
        }
    }
    Ok(())
}
