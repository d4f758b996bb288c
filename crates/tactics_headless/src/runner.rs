//! Headless encounter runner implementation.
//!
//! Reads [`Command`]s as JSON lines, applies them to the encounter and writes
//! [`Response`]s back. Once the player phase ends the AI phase is played out before the
//! next command is read.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use tactics_core::prelude::{AiStep, CommandOutcome, Encounter};

use crate::autopilot::{outcome, Outcome};
use crate::protocol::{Command, GameResult, ProtocolError, Response};

/// How the AI phase is paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiPacing {
    /// Play the whole AI phase at once.
    #[default]
    Batch,
    /// One AI action per `ai_step_interval_ms`.
    Realtime,
}

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output the full state after every applied command.
    pub auto_state_output: bool,
    /// AI phase pacing.
    pub pacing: AiPacing,
}

/// Why the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The encounter reached a result.
    Finished(Outcome),
    /// The controller sent `quit`.
    Quit,
    /// Input closed before the encounter ended.
    InputClosed,
}

/// Headless runner for externally controlled encounters.
pub struct HeadlessRunner {
    encounter: Encounter,
    scenario: String,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a runner with default config.
    pub fn new(encounter: Encounter, scenario: impl Into<String>) -> Self {
        Self::with_config(encounter, scenario, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(
        encounter: Encounter,
        scenario: impl Into<String>,
        config: HeadlessConfig,
    ) -> Self {
        Self {
            encounter,
            scenario: scenario.into(),
            config,
        }
    }

    /// The encounter being played.
    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Run until the encounter ends, the controller quits or input closes.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<RunEnd> {
        tracing::info!(scenario = %self.scenario, pacing = ?self.config.pacing, "Starting session");

        send(&mut output, &Response::ready(&self.scenario, self.encounter.round()))?;
        send(&mut output, &Response::phase(&self.encounter))?;

        for line in input.lines() {
            let line = line?;
            let command = match Command::from_json(&line) {
                Ok(command) => command,
                Err(ProtocolError::Empty) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    send(&mut output, &Response::rejected(e.to_string(), None))?;
                    continue;
                }
            };

            if let Some(end) = self.handle(command, &mut output)? {
                tracing::info!(?end, round = self.encounter.round(), "Session ended");
                return Ok(end);
            }
        }

        Ok(RunEnd::InputClosed)
    }

    fn handle<W: Write>(&mut self, command: Command, output: &mut W) -> io::Result<Option<RunEnd>> {
        let Some(core) = command.to_core() else {
            return match command {
                Command::Quit => Ok(Some(RunEnd::Quit)),
                _ => {
                    send(output, &Response::state(&self.encounter))?;
                    Ok(None)
                }
            };
        };

        let before = self.encounter.state();
        let before_unit = self.encounter.active_unit().map(|u| u.id);
        let before_round = self.encounter.round();

        match self.encounter.apply_command(core) {
            CommandOutcome::Applied(updates) => {
                send(output, &Response::updates(&updates))?;
            }
            CommandOutcome::Rejected(rejection) => {
                send(output, &Response::rejected(rejection.to_string(), Some(command.name())))?;
                return Ok(None);
            }
        }

        if let Some(end) = self.check_game_over(before_round, output)? {
            return Ok(Some(end));
        }

        let after_unit = self.encounter.active_unit().map(|u| u.id);
        let handed_over = before.is_player_phase() != self.encounter.state().is_player_phase()
            || before_unit != after_unit
            || before_round != self.encounter.round();
        if handed_over {
            send(output, &Response::phase(&self.encounter))?;
        }

        if !self.encounter.state().is_player_phase() {
            if let Some(end) = self.play_ai_phase(output)? {
                return Ok(Some(end));
            }
        }

        if self.config.auto_state_output {
            send(output, &Response::state(&self.encounter))?;
        }
        Ok(None)
    }

    /// Play AI steps until control returns to the player or the encounter ends.
    fn play_ai_phase<W: Write>(&mut self, output: &mut W) -> io::Result<Option<RunEnd>> {
        let interval = Duration::from_millis(self.encounter.config().ai_step_interval_ms);
        let mut round = self.encounter.round();

        loop {
            match self.encounter.advance_ai() {
                AiStep::Acted { unit, updates, .. } => {
                    send(output, &Response::ai_updates(unit, &updates))?;
                    if let Some(end) = self.check_game_over(round, output)? {
                        return Ok(Some(end));
                    }
                    if self.config.pacing == AiPacing::Realtime {
                        thread::sleep(interval);
                    }
                }
                AiStep::TurnEnded { .. } => {}
                AiStep::Idle => return Ok(None),
            }

            if self.encounter.round() != round {
                round = self.encounter.round();
                send(output, &Response::phase(&self.encounter))?;
                if self.encounter.state().is_player_phase() {
                    return Ok(None);
                }
            }
        }
    }

    /// Report the result if the encounter is decided; `round` is when the deciding action
    /// happened, since that action may also have closed the round.
    fn check_game_over<W: Write>(&self, round: u32, output: &mut W) -> io::Result<Option<RunEnd>> {
        let result = match outcome(&self.encounter) {
            Outcome::Ongoing => return Ok(None),
            Outcome::Victory => GameResult::Victory,
            Outcome::Defeat => GameResult::Defeat,
        };
        send(output, &Response::GameOver { result, round })?;
        Ok(Some(RunEnd::Finished(outcome(&self.encounter))))
    }
}

fn send<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}
