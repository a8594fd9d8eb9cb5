//! The game engine: authoritative state, the build and operate phases, and
//! the phase machine that sequences them.

pub mod build;
pub mod machine;
pub mod operate;
pub mod state;

pub use build::{ActionError, ActionKind, ActionProvider, PlayerAction};
pub use machine::Phase;
pub use operate::RiskLevel;
pub use state::{
    GameError, GameState, GameStatus, GameView, LossReason, PlayerState, PlayerStatus, PlayerView,
    Snapshot,
};
