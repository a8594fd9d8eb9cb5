//! Build phase: action enumeration, validation, and application.
//!
//! Each round, every active player repeatedly selects one action from the
//! freshly computed legal set until they select Finished. Actions address
//! categories, not asset instances; two actions with identical fields are the
//! same action, because same-category assets are fungible for decisions.

use crate::assets::{Asset, AssetCategory, OperationMode};
use crate::engine::machine::Phase;
use crate::engine::state::{GameState, LossReason};
use crate::eventlog::EventKind;
use crate::mix::AssetMix;
use crate::params::{CapacityRule, TakeoverRule};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// The closed set of build-phase action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Build a new asset into the player's portfolio.
    BuildAsset,
    /// Scrap an asset from the player's portfolio.
    ScrapAsset,
    /// Take over an asset from the pool into the player's portfolio.
    TakeoverAsset,
    /// Scrap an asset straight out of the takeover pool.
    TakeoverScrapAsset,
    /// Pledge one of the player's assets to the capacity market.
    PledgeCapacity,
    /// The player is done with the build phase.
    Finished,
}

/// One build-phase action. Equality is structural: all fields equal means the
/// same action, regardless of which underlying asset instance it would touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub kind: ActionKind,
    /// Index of the acting player.
    pub player: usize,
    /// Category involved. `None` only for [`ActionKind::Finished`].
    pub category: Option<AssetCategory>,
    /// Deducted from the acting player's money on application.
    pub cost: i64,
}

impl PlayerAction {
    fn finished(player: usize) -> PlayerAction {
        PlayerAction {
            kind: ActionKind::Finished,
            player,
            category: None,
            cost: 0,
        }
    }
}

/// Rejections are recoverable: the caller re-prompts the same player without
/// ending their turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action is not in the current legal set: {0:?}")]
    NotAvailable(PlayerAction),
}

/// The port through which the engine obtains player decisions.
///
/// This is a rendezvous, not a queue: the engine blocks on [`choose`]
/// until exactly one action is returned, and never has two decisions pending
/// within one game. The offered list is non-empty and the returned action must
/// be structurally present in it, or the engine rejects it and asks again.
/// Timeout and cancellation policy belong to the driver, not the core.
///
/// [`choose`]: ActionProvider::choose
pub trait ActionProvider: Send {
    fn choose(&mut self, actions: &[PlayerAction]) -> PlayerAction;
}

impl<F> ActionProvider for F
where
    F: FnMut(&[PlayerAction]) -> PlayerAction + Send,
{
    fn choose(&mut self, actions: &[PlayerAction]) -> PlayerAction {
        self(actions)
    }
}

impl GameState {
    /// Enumerate every legal action for every player still building.
    pub fn possible_actions(&self) -> Vec<PlayerAction> {
        let mut actions = Vec::new();
        let pool_mix = AssetMix::from_assets(&self.takeover_pool);

        for (pi, p) in self.players.iter().enumerate() {
            if !p.is_active() || !p.is_building {
                continue;
            }
            let player_mix = p.asset_mix();

            for category in AssetCategory::ALL {
                let build = self.params.build_cost(category);
                if build <= p.money {
                    actions.push(PlayerAction {
                        kind: ActionKind::BuildAsset,
                        player: pi,
                        category: Some(category),
                        cost: build,
                    });
                }
                let scrap = self.params.scrap_cost(category);
                if scrap <= p.money && player_mix.of_category(category) > 0 {
                    actions.push(PlayerAction {
                        kind: ActionKind::ScrapAsset,
                        player: pi,
                        category: Some(category),
                        cost: scrap,
                    });
                }
                let takeover = self.params.takeover_cost(category);
                if takeover <= p.money && pool_mix.of_category(category) > 0 {
                    actions.push(PlayerAction {
                        kind: ActionKind::TakeoverAsset,
                        player: pi,
                        category: Some(category),
                        cost: takeover,
                    });
                    actions.push(PlayerAction {
                        kind: ActionKind::TakeoverScrapAsset,
                        player: pi,
                        category: Some(category),
                        cost: takeover,
                    });
                }
            }

            if self.params.capacity_rule != CapacityRule::NoCapacityMarket {
                if player_mix.batteries_arbitrage > 0 {
                    actions.push(PlayerAction {
                        kind: ActionKind::PledgeCapacity,
                        player: pi,
                        category: Some(AssetCategory::Battery),
                        cost: 0,
                    });
                }
                if player_mix.fossils_wholesale > 0 {
                    actions.push(PlayerAction {
                        kind: ActionKind::PledgeCapacity,
                        player: pi,
                        category: Some(AssetCategory::Fossil),
                        cost: 0,
                    });
                }
            }

            if pool_mix.total() == 0 || self.params.takeover_rule == TakeoverRule::VirtualOwner {
                actions.push(PlayerAction::finished(pi));
            }
        }
        actions
    }

    /// Validate and apply one action.
    ///
    /// The action is revalidated against the freshly recomputed legal set, so
    /// a choice becomes invalid the instant the state it depended on changes.
    /// On acceptance the mutation is applied and `cost` is deducted
    /// unconditionally from the acting player.
    pub fn apply_action(&mut self, action: PlayerAction) -> Result<(), ActionError> {
        if !self.possible_actions().contains(&action) {
            return Err(ActionError::NotAvailable(action));
        }

        match (action.kind, action.category) {
            (ActionKind::Finished, _) => {
                self.players[action.player].is_building = false;
            }
            (ActionKind::BuildAsset, Some(category)) => {
                self.players[action.player].assets.push(Asset::new(category));
            }
            (ActionKind::ScrapAsset, Some(category)) => {
                let player = &mut self.players[action.player];
                match player.assets.iter().position(|a| a.category() == category) {
                    Some(i) => {
                        player.assets.remove(i);
                    }
                    None => return Err(ActionError::NotAvailable(action)),
                }
            }
            (ActionKind::TakeoverAsset, Some(category)) => {
                match self
                    .takeover_pool
                    .iter()
                    .position(|a| a.category() == category)
                {
                    Some(i) => {
                        let asset = self.takeover_pool.remove(i);
                        self.players[action.player].assets.push(asset);
                    }
                    None => return Err(ActionError::NotAvailable(action)),
                }
            }
            (ActionKind::TakeoverScrapAsset, Some(category)) => {
                match self
                    .takeover_pool
                    .iter()
                    .position(|a| a.category() == category)
                {
                    Some(i) => {
                        self.takeover_pool.remove(i);
                    }
                    None => return Err(ActionError::NotAvailable(action)),
                }
            }
            (ActionKind::PledgeCapacity, Some(category)) => {
                let player = &mut self.players[action.player];
                match player
                    .assets
                    .iter_mut()
                    .find(|a| a.category() == category && !a.is_capacity())
                {
                    Some(asset) => asset.set_mode(OperationMode::CAPACITY),
                    None => return Err(ActionError::NotAvailable(action)),
                }
            }
            // A non-Finished action without a category is never enumerated,
            // so the containment check above already rejected it.
            (_, None) => return Err(ActionError::NotAvailable(action)),
        }

        self.players[action.player].money -= action.cost;
        Ok(())
    }
}

/// One full build round: reset modes, then serve players until everyone has
/// finished, or force a global loss when the takeover pool is stuck unowned.
#[instrument(skip_all)]
pub(crate) fn build_phase(game: &mut GameState) -> Option<Phase> {
    game.round += 1;
    // The round number sticks to all game events from here on.
    game.logger = game.logger.clone().with("round", game.round);
    let logger = game.logger.child().with("phase", "build");
    logger.event(EventKind::PhaseTransition).emit();

    let mut players_building = 0;
    for p in game.players.iter_mut().filter(|p| p.is_active()) {
        p.is_building = true;
        players_building += 1;
        p.reset_asset_modes();
    }

    while players_building > 0 {
        let actions = game.possible_actions();
        if actions.is_empty() {
            // Assets sit in the takeover pool and nobody can afford any of
            // them: no legal moves exist for anyone.
            game.set_global_loss(LossReason::UnownedTakeoverAssets);
            let funds: Vec<i64> = game.players.iter().map(|p| p.money).collect();
            logger
                .event(EventKind::EveryoneLoses)
                .field("loss_reason", game.reason)
                .field("takeover_pool", AssetMix::from_assets(&game.takeover_pool))
                .field("player_funds", funds)
                .emit();
            return Some(Phase::GameEnd);
        }

        let chosen = game.provider.choose(&actions);
        match game.apply_action(chosen) {
            Ok(()) => {
                logger
                    .event(EventKind::PlayerAction)
                    .field("action", chosen)
                    .emit();
            }
            Err(err) => {
                logger
                    .event(EventKind::InvalidPlayerAction)
                    .field("invalid_action", chosen)
                    .field("error", err.to_string())
                    .emit();
                continue;
            }
        }
        if chosen.kind == ActionKind::Finished {
            players_building -= 1;
        }
    }

    Some(Phase::Operate)
}
