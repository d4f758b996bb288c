//! Headless encounter runner for scripted play and CI verification.
//!
//! This crate wraps the tactics core with everything the core deliberately leaves out:
//!
//! - **Scenarios**: RON files and built-in levels that set up an encounter
//! - **Protocol**: JSON lines so an external controller can play the party
//! - **Autopilot**: both sides driven by the decision engine, with outcome detection
//! - **Visualization**: ASCII rendering of the board for terminal review
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (select_cell, end_turn, etc.)
//! - **stdout**: Updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Play the first level over stdin
//! echo '{"cmd":"query"}' | cargo run -p tactics_headless -- run --scenario training_grounds
//!
//! # Let the decision engine play both sides
//! cargo run -p tactics_headless -- simulate --scenario kennel --render
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --scenario crates/tactics_headless/scenarios/crossroads.ron
//! ```

pub mod ascii_visualizer;
pub mod autopilot;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use ascii_visualizer::{render_encounter, AsciiConfig};
pub use autopilot::{outcome, simulate, verify_determinism, Autopilot, Outcome, SimulationReport};
pub use protocol::{Command, ProtocolError, Response};
pub use runner::{AiPacing, HeadlessConfig, HeadlessRunner, RunEnd};
pub use scenario::{Scenario, ScenarioError, BUILTIN_SCENARIOS};
