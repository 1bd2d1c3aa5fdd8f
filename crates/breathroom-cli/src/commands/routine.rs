//! Routine catalog commands for CLI.

use std::collections::BTreeMap;

use breathroom_core::storage::Database;
use breathroom_core::{PhaseKey, RoutineDraft};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List built-in and custom routines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one routine as JSON
    Show {
        /// Routine ID
        id: String,
    },
    /// Create a custom routine
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// Target duration in minutes
        #[arg(long)]
        minutes: u32,
        /// Inhale seconds
        #[arg(long)]
        inhale: f64,
        /// Hold after inhale, seconds
        #[arg(long, default_value = "0")]
        hold_in: f64,
        /// Exhale seconds
        #[arg(long)]
        exhale: f64,
        /// Hold after exhale, seconds
        #[arg(long, default_value = "0")]
        hold_out: f64,
        /// Label shown during the hold after inhale
        #[arg(long)]
        hold_in_label: Option<String>,
        /// Label shown during the hold after exhale
        #[arg(long)]
        hold_out_label: Option<String>,
    },
    /// Delete a custom routine
    Delete {
        /// Routine ID
        id: String,
    },
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        RoutineAction::List { json } => {
            let catalog = db.load_catalog()?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.routines())?);
            } else {
                for routine in catalog.routines() {
                    let marker = if routine.is_builtin() { "" } else { "  (custom)" };
                    println!(
                        "{:<24} {:<28} {:>9}  {:>3} min{marker}",
                        routine.id,
                        routine.name,
                        routine.pattern(),
                        routine.duration_minutes,
                    );
                }
            }
        }
        RoutineAction::Show { id } => {
            let catalog = db.load_catalog()?;
            let routine = catalog
                .routine(&id)
                .ok_or_else(|| format!("unknown routine: {id}"))?;
            println!("{}", serde_json::to_string_pretty(routine)?);
        }
        RoutineAction::Create {
            name,
            minutes,
            inhale,
            hold_in,
            exhale,
            hold_out,
            hold_in_label,
            hold_out_label,
        } => {
            let mut phase_labels = BTreeMap::new();
            if let Some(label) = hold_in_label {
                phase_labels.insert(PhaseKey::HoldIn, label);
            }
            if let Some(label) = hold_out_label {
                phase_labels.insert(PhaseKey::HoldOut, label);
            }

            let routine = RoutineDraft {
                name,
                duration_minutes: minutes,
                inhale,
                hold_in,
                exhale,
                hold_out,
                phase_labels,
            }
            .validate()?;
            db.save_routine(&routine)?;
            println!("Routine created: {}", routine.id);
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Delete { id } => {
            if !db.delete_routine(&id)? {
                return Err(format!("unknown routine: {id}").into());
            }
            println!("Routine deleted: {id}");
        }
    }
    Ok(())
}
