//! Headless tactics encounter runner.
//!
//! This binary runs encounters without graphics, controlled via JSON on stdin/stdout.
//! Designed for external controllers, CI testing, and determinism verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tactics_headless
//!
//! # Play a scenario with the AI stepping at its configured cadence
//! cargo run -p tactics_headless -- run --scenario kennel --realtime
//!
//! # Both sides on autopilot
//! cargo run -p tactics_headless -- simulate --scenario training_grounds --max-rounds 50
//!
//! # Check scenario files
//! cargo run -p tactics_headless -- validate scenarios/*.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_headless::{
    ascii_visualizer::{render_encounter, AsciiConfig},
    autopilot::{simulate, verify_determinism},
    runner::{AiPacing, HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, BUILTIN_SCENARIOS},
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactics encounter runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single encounter over stdin/stdout
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "training_grounds")]
        scenario: String,

        /// Step the AI at the configured interval instead of all at once
        #[arg(long)]
        realtime: bool,

        /// Output state after every applied command
        #[arg(long)]
        auto_state: bool,
    },

    /// Let the decision engine play both sides
    Simulate {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "training_grounds")]
        scenario: String,

        /// Stop after this many rounds
        #[arg(long, default_value = "100")]
        max_rounds: u32,

        /// Print the final board
        #[arg(long)]
        render: bool,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Verify determinism by simulating the same scenario repeatedly
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "training_grounds")]
        scenario: String,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Stop each run after this many rounds
        #[arg(long, default_value = "100")]
        max_rounds: u32,
    },

    /// Check scenario files; checks the built-ins when no file is given
    Validate {
        /// Scenario files
        files: Vec<PathBuf>,
    },

    /// Display a scenario's starting board
    Render {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "training_grounds")]
        scenario: String,

        /// Mark the active unit's legal cells
        #[arg(long)]
        legal: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            realtime,
            auto_state,
        }) => cmd_run(&scenario, realtime, auto_state),
        Some(Commands::Simulate {
            scenario,
            max_rounds,
            render,
            json,
        }) => cmd_simulate(&scenario, max_rounds, render, json),
        Some(Commands::Verify {
            scenario,
            runs,
            max_rounds,
        }) => cmd_verify(&scenario, runs, max_rounds),
        Some(Commands::Validate { files }) => cmd_validate(&files),
        Some(Commands::Render {
            scenario,
            legal,
            no_color,
        }) => cmd_render(&scenario, legal, no_color),
        None => {
            // Default: interactive mode
            cmd_run("training_grounds", false, false);
        }
    }
}

/// Resolve a scenario or exit with an error.
fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, scenario = name, "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single interactive encounter
fn cmd_run(scenario: &str, realtime: bool, auto_state: bool) {
    let scenario = load_scenario(scenario);
    let encounter = match scenario.build_encounter() {
        Ok(encounter) => encounter,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let config = HeadlessConfig {
        auto_state_output: auto_state,
        pacing: if realtime {
            AiPacing::Realtime
        } else {
            AiPacing::Batch
        },
    };

    let mut runner = HeadlessRunner::with_config(encounter, scenario.name, config);
    let stdin = io::stdin();
    match runner.run(stdin.lock(), io::stdout().lock()) {
        Ok(end) => tracing::info!(?end, "Runner stopped"),
        Err(e) => {
            tracing::error!(error = %e, "I/O failure");
            std::process::exit(1);
        }
    }
}

/// Both sides on autopilot
fn cmd_simulate(scenario: &str, max_rounds: u32, render: bool, json: bool) {
    let scenario = load_scenario(scenario);
    let mut encounter = match scenario.build_encounter() {
        Ok(encounter) => encounter,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let report = simulate(&mut encounter, max_rounds);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("FATAL: Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
    }

    if render {
        eprintln!("{}", render_encounter(&encounter, &AsciiConfig::default()));
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("SIMULATION COMPLETE: {}", scenario.name);
    eprintln!("{}", "=".repeat(50));
    eprintln!("Outcome:        {:?}", report.outcome);
    eprintln!("Rounds:         {}", report.rounds);
    eprintln!("Player actions: {}", report.player_actions);
    eprintln!("AI actions:     {}", report.ai_actions);
    eprintln!(
        "Survivors:      {} party / {} enemies",
        report.survivors.0, report.survivors.1
    );
    eprintln!("Final hash:     {:016x}", report.final_hash());
}

/// Verify determinism
fn cmd_verify(scenario: &str, runs: u32, max_rounds: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        "Verifying determinism: {} ({} runs, max {} rounds)",
        scenario.name,
        runs,
        max_rounds
    );

    match verify_determinism(&scenario, runs, max_rounds) {
        Ok(true) => eprintln!("PASS: All {runs} runs produced identical results"),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Validate scenario files
fn cmd_validate(files: &[PathBuf]) {
    let mut failures = 0;

    let results: Vec<(String, Result<(), String>)> = if files.is_empty() {
        BUILTIN_SCENARIOS
            .iter()
            .map(|name| {
                let result = Scenario::resolve(name)
                    .and_then(|s| s.validate())
                    .map_err(|e| e.to_string());
                ((*name).to_string(), result)
            })
            .collect()
    } else {
        files
            .iter()
            .map(|path| {
                let result = Scenario::load(path)
                    .and_then(|s| s.validate())
                    .map_err(|e| e.to_string());
                (path.display().to_string(), result)
            })
            .collect()
    };

    for (name, result) in &results {
        match result {
            Ok(()) => eprintln!("OK    {name}"),
            Err(e) => {
                failures += 1;
                eprintln!("ERROR {name}: {e}");
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} of {} scenario(s) invalid", results.len());
        std::process::exit(1);
    }
}

/// Render a scenario's starting board
fn cmd_render(scenario: &str, legal: bool, no_color: bool) {
    let scenario = load_scenario(scenario);
    match scenario.build_encounter() {
        Ok(encounter) => {
            let config = AsciiConfig {
                show_legal_cells: legal,
                use_color: !no_color,
                ..AsciiConfig::default()
            };
            println!("{}", render_encounter(&encounter, &config));
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}
