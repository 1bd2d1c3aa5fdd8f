//! Combo commands for CLI.

use breathroom_core::storage::Database;
use breathroom_core::ComboDraft;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ComboAction {
    /// List built-in and custom combos
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a combo from existing routines
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// Routine IDs in play order, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        routines: Vec<String>,
        /// Sound played between routines
        #[arg(long)]
        transition_sound: Option<String>,
    },
    /// Delete a custom combo
    Delete {
        /// Combo ID
        id: String,
    },
}

pub fn run(action: ComboAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ComboAction::List { json } => {
            let catalog = db.load_catalog()?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.combos())?);
            } else {
                for combo in catalog.combos() {
                    let minutes = catalog.combo_target_secs(combo) / 60.0;
                    println!(
                        "{:<24} {:<24} {:>5.1} min  {}",
                        combo.id,
                        combo.name,
                        minutes,
                        combo.routines.join(" > ")
                    );
                }
            }
        }
        ComboAction::Create {
            name,
            routines,
            transition_sound,
        } => {
            let catalog = db.load_catalog()?;
            let combo = ComboDraft {
                name,
                routines: routines
                    .into_iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect(),
                transition_sound,
            }
            .validate(&catalog)?;
            db.save_combo(&combo)?;
            println!("Combo created: {}", combo.id);
            println!("{}", serde_json::to_string_pretty(&combo)?);
        }
        ComboAction::Delete { id } => {
            if !db.delete_combo(&id)? {
                return Err(format!("unknown combo: {id}").into());
            }
            println!("Combo deleted: {id}");
        }
    }
    Ok(())
}
