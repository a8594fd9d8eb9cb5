//! Test-support builders for constructing game states directly, without
//! playing through the phases that would normally produce them.

use crate::assets::{Asset, AssetCategory, OperationMode};
use crate::engine::build::{ActionProvider, PlayerAction};
use crate::engine::operate;
use crate::engine::state::{GameState, GameStatus, LossReason, PlayerState, PlayerStatus};
use crate::eventlog::GameLogger;
use crate::mix::AssetMix;
use crate::params::Params;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// An asset already pledged to the capacity market.
pub fn pledged(category: AssetCategory) -> Asset {
    let mut a = Asset::new(category);
    a.set_mode(OperationMode::CAPACITY);
    a
}

pub struct GameStateBuilder {
    state: GameState,
}

impl GameStateBuilder {
    pub fn new() -> Self {
        Self {
            state: GameState {
                status: GameStatus::Ongoing,
                reason: None,
                round: 0,
                carbon_emissions: 0,
                players: Vec::new(),
                takeover_pool: Vec::new(),
                last_snapshot: operate::take_snapshot(AssetMix::default()),
                params: Params::default(),
                logger: GameLogger::disabled(),
                // First offered action by default; tests that depend on the
                // choice inject their own provider.
                provider: Box::new(|actions: &[PlayerAction]| actions[0]),
                rng: StdRng::seed_from_u64(0),
            },
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.state.params = params;
        self
    }

    pub fn provider(mut self, provider: Box<dyn ActionProvider>) -> Self {
        self.state.provider = provider;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.state.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Add an active player mid-build, so action enumeration sees them.
    pub fn with_player(mut self, money: i64, assets: Vec<Asset>) -> Self {
        self.state.players.push(PlayerState {
            status: PlayerStatus::Active,
            reason: None,
            money,
            assets,
            is_building: true,
        });
        self
    }

    /// Add an active player that has already finished building.
    pub fn with_idle_player(mut self, money: i64, assets: Vec<Asset>) -> Self {
        self.state.players.push(PlayerState {
            status: PlayerStatus::Active,
            reason: None,
            money,
            assets,
            is_building: false,
        });
        self
    }

    pub fn with_lost_player(mut self, reason: LossReason) -> Self {
        self.state.players.push(PlayerState {
            status: PlayerStatus::Lost,
            reason: Some(reason),
            money: 0,
            assets: Vec::new(),
            is_building: false,
        });
        self
    }

    pub fn with_pool_asset(mut self, asset: Asset) -> Self {
        self.state.takeover_pool.push(asset);
        self
    }

    pub fn build(self) -> GameState {
        self.state
    }
}

impl Default for GameStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let game = GameStateBuilder::default()
            .with_player(30, vec![Asset::new(AssetCategory::Fossil)])
            .with_lost_player(LossReason::PlayerBankrupt)
            .with_pool_asset(pledged(AssetCategory::Battery))
            .build();

        assert_eq!(game.players.len(), 2);
        assert_eq!(game.players[0].money, 30);
        assert!(game.players[0].is_building);
        assert_eq!(game.players[1].status, PlayerStatus::Lost);
        // Pool assets count toward the world mix, pledge state included.
        assert_eq!(game.world_mix().batteries_capacity, 1);
    }
}
