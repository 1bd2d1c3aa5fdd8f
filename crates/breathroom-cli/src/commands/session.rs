//! Real-time session runner.
//!
//! The engine is pumped from a tokio loop that sleeps until the next
//! wakeup. Stdin lines `p`, `r`, `s` and `q` pause, resume, print a
//! snapshot and stop; Ctrl-C stops as well.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use breathroom_core::storage::Database;
use breathroom_core::{
    Clock, Collaborators, Config, Event, HistoryEntry, HistorySink, RemoteHistory, SessionEngine,
    SessionTarget, SystemClock,
};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::terminal::{fmt_secs, TerminalBell, TerminalVisual};

const LAST_SESSION_KEY: &str = "last_session";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a routine or a combo (reruns the last one when no id is given)
    Run {
        /// Routine ID
        routine: Option<String>,
        /// Combo ID
        #[arg(long, conflicts_with = "routine")]
        combo: Option<String>,
        /// Print events as JSON lines instead of drawing a progress bar
        #[arg(long)]
        json: bool,
    },
    /// Print the routine or combo that ran last
    Last,
}

enum Control {
    Pause,
    Resume,
    Snapshot,
    Stop,
}

/// Saves locally right away; the remote copy is posted in the background.
struct CliHistory {
    db: Database,
    remote: Option<RemoteHistory>,
    uploads: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl HistorySink for CliHistory {
    fn submit_history(&mut self, entry: &HistoryEntry) -> breathroom_core::Result<()> {
        self.db.record_history(entry)?;
        if let Some(remote) = &self.remote {
            let handle = remote.submit_detached(entry.clone());
            if let Ok(mut uploads) = self.uploads.lock() {
                uploads.push(handle);
            }
        }
        Ok(())
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionAction::Run {
            routine,
            combo,
            json,
        } => {
            let target = match (routine, combo) {
                (Some(id), None) => SessionTarget::Routine(id),
                (None, Some(id)) => SessionTarget::Combo(id),
                _ => match db.kv_get(LAST_SESSION_KEY)? {
                    Some(saved) => serde_json::from_str(&saved)?,
                    None => return Err("no routine given and no previous session to repeat".into()),
                },
            };

            let config = Config::load()?;
            let remote = RemoteHistory::from_config(&config.remote)?;
            let uploads = Arc::new(Mutex::new(Vec::new()));
            let collab = Collaborators {
                routines: Box::new(db.load_catalog()?),
                cues: Box::new(TerminalBell::new(
                    !json && config.sound.enabled && config.sound.volume > 0,
                )),
                visual: Box::new(TerminalVisual::new(json)),
                history: Box::new(CliHistory {
                    db: Database::open()?,
                    remote,
                    uploads: Arc::clone(&uploads),
                }),
            };
            let settings = config.engine_settings();
            let upload_timeout = Duration::from_secs(config.remote.timeout_secs.max(1));
            let mut engine = SessionEngine::new(SystemClock::new(), settings, collab);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(async {
                let started = engine.start(target.clone())?;
                db.kv_set(LAST_SESSION_KEY, &serde_json::to_string(&target)?)?;
                print_events(started, json)?;
                drive(&mut engine, json).await?;

                let pending: Vec<_> = uploads
                    .lock()
                    .map(|mut u| u.drain(..).collect())
                    .unwrap_or_default();
                for upload in pending {
                    if tokio::time::timeout(upload_timeout, upload).await.is_err() {
                        tracing::warn!("remote history upload still running at exit");
                    }
                }
                Ok::<_, Box<dyn std::error::Error>>(())
            });
            // The stdin reader may still be blocked on a read.
            runtime.shutdown_background();
            result?;
        }
        SessionAction::Last => match db.kv_get(LAST_SESSION_KEY)? {
            Some(saved) => {
                let target: SessionTarget = serde_json::from_str(&saved)?;
                println!("{}", serde_json::to_string_pretty(&target)?);
            }
            None => println!("no sessions yet"),
        },
    }
    Ok(())
}

async fn drive(
    engine: &mut SessionEngine<SystemClock>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let control = match line.trim() {
                "p" => Control::Pause,
                "r" => Control::Resume,
                "s" => Control::Snapshot,
                "q" => Control::Stop,
                _ => continue,
            };
            if tx.send(control).is_err() {
                break;
            }
        }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        for event in engine.pump() {
            print_event(&event, json)?;
        }
        if !engine.is_active() {
            break;
        }

        let now = engine.clock().now_ms();
        let wait = engine
            .next_wakeup_ms()
            .map_or(engine.settings().frame_interval_ms, |due| due.saturating_sub(now));

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(wait)) => {}
            Some(control) = rx.recv() => {
                let event = match control {
                    Control::Pause => engine.pause(),
                    Control::Resume => engine.resume(),
                    Control::Snapshot => Some(engine.snapshot()),
                    Control::Stop => engine.stop(true),
                };
                print_events(event, json)?;
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                print_events(engine.stop(true), json)?;
            }
        }
    }
    Ok(())
}

fn print_events(event: Option<Event>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_event(&event, json),
        None => Ok(()),
    }
}

fn print_event(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        Event::CountdownStarted { name, .. } => println!("{name}"),
        Event::ComboAdvanced { routine_id, .. } => println!("\nnext: {routine_id}"),
        Event::SessionStopped {
            actual_duration_secs,
            total_target_secs,
            history_saved,
            ..
        } => {
            let saved = if *history_saved { "saved" } else { "not saved" };
            println!(
                "\n{} of {} ({saved})",
                fmt_secs(*actual_duration_secs),
                fmt_secs(*total_target_secs)
            );
        }
        Event::StateSnapshot { .. } => println!("\n{}", serde_json::to_string_pretty(event)?),
        _ => {}
    }
    Ok(())
}
