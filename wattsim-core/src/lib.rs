//! # WattSim Core
//!
//! Deterministic engine for a turn-based electricity-market game.
//!
//! Players build, scrap, and take over grid assets, then the market pays or
//! charges them based on the world's aggregate asset mix. The game ends in a
//! shared win when the grid decarbonizes, or in individual and global losses
//! along the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐     ┌───────────────┐     ┌─────────────┐
//! │ ActionProvider │────▶│  build phase  │────▶│operate phase│
//! │   (choose)     │     │ (portfolios)  │     │ (market)    │
//! └────────────────┘     └───────▲───────┘     └──────┬──────┘
//!                                │    next round      │
//!                                └────────────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`GameState`] | Complete game state (players, pool, standings) |
//! | [`Params`] | Rule selections and tunable values, with validation |
//! | [`PlayerAction`] | One build-phase decision (build, scrap, pledge, ...) |
//! | [`ActionProvider`] | Trait through which the engine asks for decisions |
//! | [`AssetMix`] | Aggregate asset counts driving all market calculations |
//! | [`GameLogger`] | Structured JSONL event log of everything that happened |
//!
//! ## Determinism
//!
//! A game is fully determined by its parameters, seed, and the sequence of
//! provider answers. The only randomness is the per-round risk draw from a
//! seeded [`rand::rngs::StdRng`].

pub mod assets;
pub mod engine;
pub mod eventlog;
pub mod mix;
pub mod params;
pub mod providers;
pub mod testing;

pub use assets::{Asset, AssetCategory, OperationMode};
pub use engine::{
    ActionError, ActionKind, ActionProvider, GameError, GameState, GameStatus, GameView,
    LossReason, Phase, PlayerAction, PlayerState, PlayerStatus, PlayerView, RiskLevel, Snapshot,
};
pub use eventlog::{EventKind, GameLogger};
pub use mix::{AssetMix, GridStability, MixWeights, PriceVolatility, RatioCalculation, RatioOutcome};
pub use params::{
    Builder, CapacityRule, CarbonTaxRule, GenerationConstraintRule, Params, PnlTable, TakeoverRule,
    ValidationError, WinConditionRule,
};
pub use providers::{AlwaysFinish, RandomProvider};
