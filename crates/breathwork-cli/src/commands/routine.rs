//! Routine management commands for CLI.

use std::path::PathBuf;

use breathwork_core::{
    catalog, find_routine, BreathingSpeed, Database, Round, Routine, RoutineRepository,
};
use clap::Subcommand;
use serde::Serialize;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List preset and custom routines
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a routine as JSON
    Show {
        /// Routine ID
        id: String,
    },
    /// Create a custom routine of identical rounds
    Create {
        /// Routine name
        name: String,
        /// Number of rounds
        #[arg(long, default_value_t = 3)]
        rounds: u32,
        /// Breaths per round
        #[arg(long, default_value_t = 30)]
        breaths: u32,
        /// Breathing speed (fast, medium, slow)
        #[arg(long, default_value = "medium")]
        speed: BreathingSpeed,
        /// Exhale hold in seconds
        #[arg(long, default_value_t = 60)]
        exhale: u32,
        /// Inhale hold in seconds
        #[arg(long, default_value_t = 15)]
        inhale: u32,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Mark the last round's hold as the final hold
        #[arg(long)]
        final_hold: bool,
    },
    /// Import a routine from a JSON file
    Import {
        /// Path to a JSON routine
        path: PathBuf,
    },
    /// Delete a custom routine
    Delete {
        /// Routine ID
        id: String,
    },
}

#[derive(Serialize)]
struct RoutineListing<'a> {
    id: &'a str,
    name: &'a str,
    rounds: usize,
    estimated_minutes: u32,
    is_preset: bool,
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        RoutineAction::List { json } => {
            let routines = catalog(&db)?;
            if json {
                let listing: Vec<_> = routines
                    .iter()
                    .map(|r| RoutineListing {
                        id: &r.id,
                        name: &r.name,
                        rounds: r.round_count(),
                        estimated_minutes: r.estimated_duration_min(),
                        is_preset: r.is_preset,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for r in &routines {
                    println!(
                        "{:<38} {:<24} {:>2} rounds  ~{:>2} min{}",
                        r.id,
                        r.name,
                        r.round_count(),
                        r.estimated_duration_min(),
                        if r.is_preset { "  [preset]" } else { "" }
                    );
                }
            }
        }
        RoutineAction::Show { id } => {
            let routine = find_routine(&db, &id)?;
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Create {
            name,
            rounds,
            breaths,
            speed,
            exhale,
            inhale,
            description,
            final_hold,
        } => {
            let mut round_list: Vec<Round> = (0..rounds)
                .map(|_| Round::new(breaths, speed, exhale, inhale))
                .collect();
            if final_hold {
                if let Some(last) = round_list.last_mut() {
                    *last = last.with_final_hold();
                }
            }
            let mut routine = Routine::custom(Uuid::new_v4().to_string(), name, round_list);
            routine.description = description;
            db.save_routine(&routine)?;
            eprintln!("Routine created: {}", routine.id);
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Import { path } => {
            let content = std::fs::read_to_string(&path)?;
            let mut routine: Routine = serde_json::from_str(&content)?;
            routine.is_preset = false;
            db.save_routine(&routine)?;
            println!("Routine imported: {}", routine.id);
        }
        RoutineAction::Delete { id } => {
            db.delete_routine(&id)?;
            println!("Routine deleted: {id}");
        }
    }
    Ok(())
}
