//! Authoritative game state: players, the takeover pool, and terminal status.

use crate::assets::{Asset, AssetCategory};
use crate::engine::build::ActionProvider;
use crate::engine::operate;
use crate::eventlog::GameLogger;
use crate::mix::{AssetMix, GridStability, PriceVolatility};
use crate::params::Params;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether a player is still in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// Still playing.
    Active,
    /// Out of the game due to an individual loss condition.
    Lost,
    /// Survived to a global win.
    Won,
}

/// Whether the game has reached a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing,
    /// The remaining active players won.
    Win,
    /// Everyone lost.
    Loss,
}

/// Closed set of reasons for individual or global losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    // Individual loss reasons.
    PlayerBankrupt,
    LastPlayerWithFossilAssets,

    // Global loss reasons.
    GridUnstable,
    InsufficientGeneration,
    CarbonEmissionsExceeded,

    // Technicality global loss reasons.
    NoActivePlayers,
    UnownedTakeoverAssets,
}

/// Construction-time failures. Everything after construction is encoded in
/// [`GameState`] fields rather than surfaced as errors.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("unsupported player count: {0}")]
    UnsupportedPlayerCount(usize),
}

/// One player's standing within a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub status: PlayerStatus,
    /// Reason for loss; only meaningful while `status` is `Lost`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LossReason>,
    pub money: i64,
    pub assets: Vec<Asset>,
    /// Whether the player still owes a Finished action this build round.
    #[serde(skip)]
    pub(crate) is_building: bool,
}

impl PlayerState {
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Aggregate the player's portfolio into a mix.
    pub fn asset_mix(&self) -> AssetMix {
        AssetMix::from_assets(&self.assets)
    }

    pub fn has_fossil_assets(&self) -> bool {
        self.assets
            .iter()
            .any(|a| a.category() == AssetCategory::Fossil)
    }

    pub(crate) fn reset_asset_modes(&mut self) {
        for a in &mut self.assets {
            a.clear_mode();
        }
    }

    /// Mark the player as lost. Caller handles logging and asset takeover.
    pub(crate) fn mark_lost(&mut self, reason: LossReason) {
        self.status = PlayerStatus::Lost;
        self.reason = Some(reason);
    }
}

/// Summary statistics from the outcome of one Operate phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mix: AssetMix,
    pub price_volatility: PriceVolatility,
    pub grid_stability: GridStability,
}

/// The authoritative state of one game.
///
/// A game is a single sequential control flow; the only suspension point is
/// the injected [`ActionProvider`], which must answer before the engine
/// proceeds. Run it to completion with [`run`](GameState::run).
pub struct GameState {
    pub status: GameStatus,
    /// Reason for a global loss; only meaningful while `status` is `Loss`.
    pub reason: Option<LossReason>,
    pub round: u32,
    /// Total carbon emitted so far across all rounds.
    pub carbon_emissions: i64,
    /// Player index is identity and stays stable for the whole game.
    pub players: Vec<PlayerState>,
    /// Assets orphaned by eliminated players, open to takeover by anyone.
    pub takeover_pool: Vec<Asset>,
    /// Summary of the previous round's Operate phase.
    pub last_snapshot: Snapshot,
    pub params: Params,

    pub(crate) logger: GameLogger,
    pub(crate) provider: Box<dyn ActionProvider>,
    pub(crate) rng: StdRng,
}

// The logger, provider, and rng are runtime plumbing, not game state; they
// stay out of the debug output just as they stay out of serialization.
impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("round", &self.round)
            .field("carbon_emissions", &self.carbon_emissions)
            .field("players", &self.players)
            .field("takeover_pool", &self.takeover_pool)
            .field("last_snapshot", &self.last_snapshot)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Create a game ready to play.
    ///
    /// Fails when `player_count` has no entry in the starting-fossil table.
    /// Each player starts with the configured cash and fossil fleet; an
    /// initial snapshot is computed before any round runs.
    pub fn new(
        player_count: usize,
        params: Params,
        logger: GameLogger,
        provider: Box<dyn ActionProvider>,
        seed: u64,
    ) -> Result<GameState, GameError> {
        let &starting_fossils = params
            .starting_fossils_by_player_count
            .get(&player_count)
            .ok_or(GameError::UnsupportedPlayerCount(player_count))?;

        let players: Vec<PlayerState> = (0..player_count)
            .map(|_| PlayerState {
                status: PlayerStatus::Active,
                reason: None,
                money: params.initial_cash,
                assets: (0..starting_fossils)
                    .map(|_| Asset::new(AssetCategory::Fossil))
                    .collect(),
                is_building: false,
            })
            .collect();

        let initial_mix: AssetMix = players.iter().flat_map(|p| &p.assets).collect();

        Ok(GameState {
            status: GameStatus::Ongoing,
            reason: None,
            round: 0,
            carbon_emissions: 0,
            players,
            takeover_pool: Vec::new(),
            last_snapshot: operate::take_snapshot(initial_mix),
            params,
            logger,
            provider,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Aggregate every asset in play: all portfolios plus the takeover pool.
    pub fn world_mix(&self) -> AssetMix {
        self.players
            .iter()
            .flat_map(|p| &p.assets)
            .chain(&self.takeover_pool)
            .collect()
    }

    pub(crate) fn set_global_loss(&mut self, reason: LossReason) {
        self.status = GameStatus::Loss;
        self.reason = Some(reason);
    }

    /// Move all of a player's assets to the takeover pool.
    pub(crate) fn move_assets_to_pool(&mut self, player: usize) {
        let assets = std::mem::take(&mut self.players[player].assets);
        self.takeover_pool.extend(assets);
    }

    /// The read model a driver (transport layer, CLI) renders to clients.
    pub fn view(&self) -> GameView {
        GameView {
            status: self.status,
            reason: self.reason,
            round: self.round,
            carbon_emissions: self.carbon_emissions,
            players: self.players.iter().map(PlayerView::from).collect(),
            last_snapshot: self.last_snapshot,
        }
    }
}

/// Client-observable summary of one player. Portfolios are exposed as a mix;
/// individual asset instances are not addressable from outside.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub status: PlayerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LossReason>,
    pub money: i64,
    pub assets: AssetMix,
}

impl From<&PlayerState> for PlayerView {
    fn from(p: &PlayerState) -> Self {
        PlayerView {
            status: p.status,
            reason: p.reason,
            money: p.money,
            assets: p.asset_mix(),
        }
    }
}

/// Client-observable summary of one game.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LossReason>,
    pub round: u32,
    pub carbon_emissions: i64,
    pub players: Vec<PlayerView>,
    pub last_snapshot: Snapshot,
}
