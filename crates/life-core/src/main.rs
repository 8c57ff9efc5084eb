//! Headless life simulation runner.
//!
//! Creates one character, then alternates advancing time and resolving every
//! due event with the validator's preferred choice.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use life_core::{EngineConfig, InitParams, LifeSimulator, Phase, Profile, DEFAULT_TUNING_PATH};
use life_events::SimDate;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "life_sim")]
#[command(about = "Run a headless life simulation")]
struct Args {
    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Character name
    #[arg(long, default_value = "Lin Wei")]
    name: String,

    /// Birth date (YYYY-MM-DD)
    #[arg(long, default_value = "1990-01-01")]
    birth_date: SimDate,

    /// Birth place
    #[arg(long, default_value = "Hangzhou")]
    birth_place: String,

    /// Days to advance per step
    #[arg(long, default_value_t = 90)]
    days: u32,

    /// Number of steps to run
    #[arg(long, default_value_t = 40)]
    steps: u32,

    /// Engine tuning file
    #[arg(long, default_value = DEFAULT_TUNING_PATH)]
    config: PathBuf,

    /// Write the final profile as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::load_or_default(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    println!("Life Simulation");
    println!("===============");
    println!("Seed: {}", config.seed);
    println!("Steps: {} x {} days", args.steps, args.days);
    println!();

    let mut sim = LifeSimulator::new(config)?;
    let params = InitParams::new(args.name.as_str(), args.birth_date, args.birth_place.as_str());
    let state = sim.create_character(&params)?;
    let profile_id = state.profile_id.clone();
    println!(
        "Born: {} on {} in {} (wellbeing {:.1})",
        state.name,
        state.birth_date,
        state.location,
        state.dimensions.wellbeing()
    );

    for step in 1..=args.steps {
        let report = sim.advance_time(&profile_id, args.days)?;
        if let Some((_, to)) = report.stage_change {
            println!("[{}] {} is now {}", report.state.current_date, report.state.name, to);
        }
        for event in report.new_events.iter().filter(|e| e.is_completed()) {
            println!("[{}] {} (auto)", event.event_date, event.title);
        }

        while sim.phase(&profile_id)? == Phase::EventPending {
            let profile = sim.profile(&profile_id)?;
            let Some(event) = profile.due_events().next() else {
                break;
            };
            let event_id = event.id.clone();
            let title = event.title.clone();
            let choice = sim
                .engine()
                .validator()
                .preferred_choice(&profile.state, event)
                .unwrap_or(0);

            let decision = sim.resolve_decision(&profile_id, &event_id, choice)?;
            println!(
                "[{}] {} -> {}",
                decision.state.current_date, title, decision.outcome.choice.text
            );
        }

        if step % 10 == 0 {
            let profile = sim.profile(&profile_id)?;
            println!(
                "  age {} | {} | wellbeing {:.1} | memories {} | events {}",
                profile.state.age,
                profile.state.life_stage,
                profile.state.dimensions.wellbeing(),
                profile.memories.len(),
                profile.events.len()
            );
        }
    }

    let profile = sim.profile(&profile_id)?;
    println!();
    println!("Final state");
    println!("-----------");
    println!("Date: {} (age {})", profile.state.current_date, profile.state.age);
    println!("Education: {}", profile.state.education);
    println!("Occupation: {}", profile.state.occupation_label());
    println!("Location: {}", profile.state.location);
    println!("Decisions: {}", profile.state.total_decisions);
    println!("Causal links: {}", profile.causality.len());

    if let Some(path) = &args.output {
        write_profile(path, profile)?;
        println!("Profile written to {}", path.display());
    }
    Ok(())
}

fn write_profile(path: &Path, profile: &Profile) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(profile)?;
    fs::write(path, json)?;
    Ok(())
}
