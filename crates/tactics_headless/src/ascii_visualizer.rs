//! ASCII encounter visualizer.
//!
//! Renders the board and a unit roster for quick terminal review.

use std::fmt::Write as _;

use tactics_core::prelude::*;

use crate::autopilot::{outcome, Outcome};

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Show the unit roster under the board.
    pub show_legend: bool,
    /// Mark the active unit's legal cells with `*`.
    pub show_legal_cells: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            show_legal_cells: false,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Board glyph for a unit: uppercase initial for the party, lowercase for enemies.
fn unit_char(unit: &Combatant) -> char {
    if unit.is_dead() {
        return 'x';
    }
    let initial = unit.name.chars().next().unwrap_or('?');
    match unit.side {
        Side::Player => initial.to_ascii_uppercase(),
        Side::Ai => initial.to_ascii_lowercase(),
    }
}

fn side_color(side: Side) -> &'static str {
    match side {
        Side::Player => colors::BLUE,
        Side::Ai => colors::RED,
    }
}

fn health_color(unit: &Combatant) -> &'static str {
    let max = unit.max_health();
    if unit.health() * 3 > max * 2 {
        colors::GREEN
    } else if unit.health() * 3 > max {
        colors::YELLOW
    } else {
        colors::RED
    }
}

fn paint(out: &mut String, text: &str, color: &str, config: &AsciiConfig) {
    if config.use_color && !color.is_empty() {
        out.push_str(color);
        out.push_str(text);
        out.push_str(colors::RESET);
    } else {
        out.push_str(text);
    }
}

fn phase_label(encounter: &Encounter) -> String {
    let active = encounter
        .active_unit()
        .map_or_else(|| "-".to_string(), |u| format!("{} {}", u.id, u.name));
    match encounter.state() {
        TurnState::PlayerPhase { mode, .. } => format!("Player phase ({mode:?}): {active}"),
        TurnState::AiPhase { .. } => format!("AI phase: {active}"),
    }
}

/// Render an encounter as ASCII art.
pub fn render_encounter(encounter: &Encounter, config: &AsciiConfig) -> String {
    let grid = encounter.grid();
    let width = grid.width() as usize;
    let mut output = String::new();

    // Header
    let header = format!("══ Round {} │ {} ══", encounter.round(), phase_label(encounter));
    paint(&mut output, &header, colors::BOLD, config);
    output.push('\n');

    let legal = if config.show_legal_cells {
        encounter.legal_cells()
    } else {
        CostMap::new()
    };
    let active = encounter.active_unit().map(|u| u.id);

    output.push('╔');
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");

    for y in 0..grid.height() as i32 {
        output.push('║');
        for x in 0..grid.width() as i32 {
            let pos = GridPos::new(x, y);
            // Living units draw over corpses.
            let unit = encounter
                .units()
                .iter()
                .filter(|u| u.position == pos)
                .min_by_key(|u| u.is_dead());

            match unit {
                Some(unit) => {
                    let mut glyph = String::new();
                    glyph.push(unit_char(unit));
                    let color = if unit.is_dead() {
                        colors::GRAY
                    } else if Some(unit.id) == active {
                        colors::BOLD
                    } else {
                        side_color(unit.side)
                    };
                    paint(&mut output, &glyph, color, config);
                }
                None if legal.contains_key(&pos) => paint(&mut output, "*", colors::YELLOW, config),
                None => {
                    let glyph = grid.terrain_at(pos).map_or(' ', Terrain::glyph);
                    output.push(glyph);
                }
            }
        }
        output.push_str("║\n");
    }

    output.push('╚');
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");

    if config.show_legend {
        for unit in encounter.units() {
            let line = format!(
                "{} {:>3} {:<10} ({:>2},{:>2})  hp {:>5.1}/{:<5.1} end {}/{}{}",
                unit_char(unit),
                unit.id.to_string(),
                unit.name,
                unit.position.x,
                unit.position.y,
                unit.health().to_num::<f64>(),
                unit.max_health().to_num::<f64>(),
                unit.endurance(),
                unit.max_endurance(),
                if unit.is_dead() { "  dead" } else { "" },
            );
            let color = if unit.is_dead() {
                colors::GRAY
            } else {
                health_color(unit)
            };
            paint(&mut output, &line, color, config);
            output.push('\n');
        }

        match outcome(encounter) {
            Outcome::Ongoing => {}
            result => {
                let _ = writeln!(output, "Result: {result:?}");
            }
        }
    }

    output
}
