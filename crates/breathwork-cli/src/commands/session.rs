//! Session commands: run a routine live and review history.
//!
//! While a session runs, stdin accepts one command per line:
//! `p` pause, `r` resume, `s` skip phase, `q` quit.

use std::io::Write;

use breathwork_core::storage::NotificationsConfig;
use breathwork_core::{
    find_routine, AlertTier, Config, CountdownNotifier, Database, Routine, SessionCommand,
    SessionDriver, SessionError, SessionEvent, SessionHandle, SessionOutcome, SessionPhase,
    SessionRunner,
};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

const LAST_ROUTINE_KEY: &str = "last_routine";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a routine (defaults to the last one run)
    Run {
        /// Routine ID
        id: Option<String>,
    },
    /// Run the quick-start routine from the config
    Quick,
    /// Show completed sessions, newest first
    History {
        /// Maximum number of sessions
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Rings the terminal bell. Two bells for early warnings, one per final second.
struct BellNotifier {
    notifications: NotificationsConfig,
}

impl CountdownNotifier for BellNotifier {
    fn notify(&mut self, tier: AlertTier) {
        if !self.notifications.allows(tier) {
            return;
        }
        let pattern = match tier {
            AlertTier::Early => "\x07\x07",
            AlertTier::Final => "\x07",
        };
        eprint!("{pattern}");
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        SessionAction::Run { id } => {
            let db = Database::open()?;
            let id = match id {
                Some(id) => id,
                None => db
                    .kv_get(LAST_ROUTINE_KEY)?
                    .ok_or("no routine given and no previous session to repeat")?,
            };
            let routine = find_routine(&db, &id)?;
            db.kv_set(LAST_ROUTINE_KEY, &routine.id)?;
            run_live(routine, &config)?;
        }
        SessionAction::Quick => run_live(config.quick_start_routine(), &config)?,
        SessionAction::History { limit, json } => {
            let db = Database::open()?;
            let sessions = db.list_sessions(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No sessions yet.");
            } else {
                for s in &sessions {
                    println!(
                        "{}  {:<24} {:>3} min",
                        s.completed_at.format("%Y-%m-%d %H:%M"),
                        s.routine_name,
                        s.duration_min
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_live(routine: Routine, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut runner = SessionRunner::new().with_recorder(Box::new(Database::open()?));
    if config.notifications.enabled && config.notifications.bell {
        runner = runner.with_notifier(Box::new(BellNotifier {
            notifications: config.notifications.clone(),
        }));
    }

    debug!(routine = %routine.id, rounds = routine.round_count(), "Starting live session");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(runner, routine, config.session.show_breath_ticks));
    // Stdin reads sit on a blocking thread that never returns on its own.
    runtime.shutdown_background();
    result
}

async fn drive(
    runner: SessionRunner,
    routine: Routine,
    show_breath_ticks: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let round_count = routine.round_count();
    let breaths: Vec<u32> = routine.rounds.iter().map(|r| r.breath_count).collect();
    println!(
        "{} ({} rounds, ~{} min)",
        routine.name,
        round_count,
        routine.estimated_duration_min()
    );
    println!("Commands: p = pause, r = resume, s = skip, q = quit");

    let (tx, mut events) = mpsc::unbounded_channel();
    let (driver, handle) = SessionDriver::new(runner);
    let session = tokio::spawn(driver.with_event_sink(tx).run(routine));
    let input = tokio::spawn(read_commands(handle));

    while let Some(event) = events.recv().await {
        render(&event, round_count, &breaths, show_breath_ticks);
    }
    input.abort();

    match session.await?? {
        SessionOutcome::Completed(summary) => {
            println!(
                "\nSession complete! {} minutes of {}.",
                summary.duration_minutes, summary.routine_name
            );
        }
        SessionOutcome::Exited => println!("\nSession ended early. Nothing was recorded."),
    }
    Ok(())
}

async fn read_commands(handle: SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "p" => SessionCommand::Pause,
            "r" => SessionCommand::Resume,
            "s" => SessionCommand::Skip,
            "q" => SessionCommand::Exit,
            "" => continue,
            other => {
                eprintln!("unknown command '{other}' (p, r, s, q)");
                continue;
            }
        };
        match handle.send(command).await {
            Ok(()) => {}
            Err(SessionError::DriverClosed) => return,
            Err(e) => eprintln!("{e}"),
        }
    }
    // Stdin closed: keep the handle alive so the session runs to the end.
    std::future::pending::<()>().await;
}

fn render(event: &SessionEvent, round_count: usize, breaths: &[u32], show_breath_ticks: bool) {
    match event {
        SessionEvent::PhaseEntered {
            round_index,
            phase: SessionPhase::Breathing,
            ..
        } => {
            let target = breaths.get(*round_index).copied().unwrap_or_default();
            println!(
                "\nRound {}/{}: {} ({} breaths)",
                round_index + 1,
                round_count,
                SessionPhase::Breathing,
                target
            );
            if show_breath_ticks {
                println!("  breath 1 of {target}");
            }
        }
        SessionEvent::PhaseEntered {
            phase,
            time_remaining_secs,
            ..
        } => {
            println!("\n{} for {}", phase, format_time(*time_remaining_secs));
        }
        SessionEvent::BreathAdvanced {
            round_index,
            breath_number,
            ..
        } if show_breath_ticks => {
            let target = breaths.get(*round_index).copied().unwrap_or_default();
            println!("  breath {breath_number} of {target}");
        }
        SessionEvent::HoldTick {
            time_remaining_secs,
            ..
        } => {
            print!("\r  {}   ", format_time(*time_remaining_secs));
            let _ = std::io::stdout().flush();
        }
        SessionEvent::SessionPaused { .. } => println!("\nPaused. Type r to resume."),
        SessionEvent::SessionResumed { .. } => println!("Resumed."),
        SessionEvent::PhaseSkipped { from, .. } => println!("\nSkipped {from}."),
        _ => {}
    }
}

/// `m:ss`
fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_pads_seconds() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(9), "0:09");
        assert_eq!(format_time(75), "1:15");
        assert_eq!(format_time(600), "10:00");
    }

    #[test]
    fn bell_respects_disabled_tiers() {
        let mut notifications = NotificationsConfig::default();
        notifications.final_countdown = false;
        let notifier = BellNotifier { notifications };
        assert!(notifier.notifications.allows(AlertTier::Early));
        assert!(!notifier.notifications.allows(AlertTier::Final));
    }
}
