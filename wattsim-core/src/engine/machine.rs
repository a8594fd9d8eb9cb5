//! The game's phase machine.
//!
//! ```text
//! ┌─────────┐    ┌─────┬───►┌───────┐    ┌───────┐
//! │GameStart├───►│Build│    │Operate├───►│GameEnd│
//! └─────────┘    └─────┘◄───┴───────┘    └───────┘
//! ```
//!
//! Each phase runs to completion and names its successor; the loop in
//! [`GameState::run`] drives phases until one returns `None`.

use crate::engine::state::{GameState, GameStatus, PlayerView};
use crate::engine::{build, operate};
use crate::eventlog::EventKind;
use serde::Serialize;
use tracing::instrument;

/// Phases of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    GameStart,
    Build,
    Operate,
    GameEnd,
}

impl GameState {
    /// Run the game to completion.
    ///
    /// Running an already finished game is a no-op.
    pub fn run(&mut self) {
        if self.status != GameStatus::Ongoing {
            return;
        }
        let mut phase = Some(Phase::GameStart);
        while let Some(current) = phase {
            phase = step(self, current);
        }
    }
}

fn step(game: &mut GameState, phase: Phase) -> Option<Phase> {
    match phase {
        Phase::GameStart => game_start(game),
        Phase::Build => build::build_phase(game),
        Phase::Operate => operate::operate_phase(game),
        Phase::GameEnd => game_end(game),
    }
}

#[instrument(skip_all)]
fn game_start(game: &mut GameState) -> Option<Phase> {
    game.logger
        .child()
        .with("phase", "game_start")
        .event(EventKind::PhaseTransition)
        .field("game_parameters", &game.params)
        .field("num_players", game.players.len())
        .emit();
    Some(Phase::Build)
}

#[instrument(skip_all)]
fn game_end(game: &mut GameState) -> Option<Phase> {
    let players: Vec<PlayerView> = game.players.iter().map(PlayerView::from).collect();
    game.logger
        .child()
        .with("phase", "game_end")
        .event(EventKind::PhaseTransition)
        .field("game_status", game.status)
        .field("loss_reason", game.reason)
        .field("total_emissions", game.carbon_emissions)
        .field("players", players)
        .emit();
    None
}
