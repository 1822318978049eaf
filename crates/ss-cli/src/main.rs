//! SkipShield CLI
//!
//! CLI tool for replaying recorded page scenarios through the ad guard
//! agent and inspecting what it does.

use std::fs;
use std::time::Instant;

use clap::{Parser, Subcommand};

mod scenario;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "ss-cli")]
#[command(about = "SkipShield scenario runner and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file through the agent
    Simulate {
        /// Scenario JSON file
        #[arg(short, long)]
        input: String,

        /// Emit the full report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check that a scenario file parses
    Validate {
        /// Scenario JSON file
        #[arg(short, long)]
        input: String,
    },

    /// Print the cosmetic stylesheet the agent injects
    Css,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate { input, json } => cmd_simulate(&input, json),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Css => cmd_css(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_scenario(path: &str) -> Result<Scenario, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Scenario::parse(&content)
}

fn cmd_simulate(input: &str, json: bool) -> Result<(), String> {
    let scenario = load_scenario(input)?;

    let start = Instant::now();
    let report = scenario::run(&scenario);
    let elapsed = start.elapsed();

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{out}");
        return Ok(());
    }

    println!("Scenario: {}", scenario.name.as_deref().unwrap_or(input));
    for entry in &report.entries {
        println!("  [{}] {:<8} {}", entry.timestamp, entry.level.as_str(), entry.message);
    }
    if report.entries.is_empty() {
        println!("  (no agent activity)");
    }
    println!();
    println!("Simulated {}ms in {} cycles ({:.1}ms wall)",
        scenario.duration_ms,
        report.cycles,
        elapsed.as_secs_f64() * 1000.0,
    );
    println!("  Skipped:          {}", report.stats.skipped);
    println!("  Fast-forwarded:   {}", report.stats.fast_forwarded);
    println!("  Transition skips: {}", report.stats.transition_skips);
    println!("  Mid-rolls:        {}", report.stats.mid_rolls_blocked);

    Ok(())
}

fn cmd_validate(input: &str) -> Result<(), String> {
    let scenario = load_scenario(input)?;

    println!("Scenario '{}' is valid", input);
    println!("  Name:      {}", scenario.name.as_deref().unwrap_or("(unnamed)"));
    println!("  Duration:  {}ms", scenario.duration_ms);
    println!("  Frames:    {}", scenario.frames.len());

    Ok(())
}

fn cmd_css() -> Result<(), String> {
    print!("{}", ss_core::style::COSMETIC_CSS);
    Ok(())
}
