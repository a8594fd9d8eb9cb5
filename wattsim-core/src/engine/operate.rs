//! Operate phase: random risk draw, market standings, loss checks, payouts,
//! and the end-of-round win check.

use crate::assets::AssetCategory;
use crate::engine::machine::Phase;
use crate::engine::state::{GameState, GameStatus, LossReason, PlayerStatus, Snapshot};
use crate::eventlog::EventKind;
use crate::mix::{AssetMix, GridStability, MixWeights, PriceVolatility, RatioCalculation};
use crate::params::{CarbonTaxRule, GenerationConstraintRule, WinConditionRule};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Severity of the random event drawn each round. The grid survives when its
/// stability is at least the drawn risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Draw uniformly from the three levels.
    pub(crate) fn draw(rng: &mut impl Rng) -> RiskLevel {
        RiskLevel::ALL[rng.gen_range(0..RiskLevel::ALL.len())]
    }
}

/// Price volatility standing: wholesale fossils and arbitrage batteries push
/// volatility up, renewables and arbitrage batteries push it down.
const PRICE_VOLATILITY: RatioCalculation = RatioCalculation {
    side_a: MixWeights {
        fossils_wholesale: 1,
        batteries_arbitrage: 1,
        ..MixWeights::ZERO
    },
    side_b: MixWeights {
        renewables: 1,
        batteries_arbitrage: -1,
        ..MixWeights::ZERO
    },
    rollover: 3,
};

const PRICE_VOLATILITY_OUTCOMES: [PriceVolatility; 4] = [
    PriceVolatility::Low,
    PriceVolatility::Medium,
    PriceVolatility::High,
    PriceVolatility::Extreme,
];

/// Grid stability standing: dispatchable assets stabilize, renewables
/// destabilize, with capacity pledges counted against the renewable side.
const GRID_STABILITY: RatioCalculation = RatioCalculation {
    side_a: MixWeights {
        batteries_capacity: 1,
        batteries_arbitrage: 1,
        fossils_capacity: 1,
        fossils_wholesale: 1,
        ..MixWeights::ZERO
    },
    side_b: MixWeights {
        renewables: 1,
        fossils_capacity: -1,
        batteries_capacity: -2,
        batteries_arbitrage: -1,
        ..MixWeights::ZERO
    },
    rollover: 3,
};

const GRID_STABILITY_OUTCOMES: [GridStability; 4] = [
    GridStability::Good,
    GridStability::Ok,
    GridStability::Bad,
    GridStability::Dangerous,
];

/// Derive the round's market standings from a world mix.
pub(crate) fn take_snapshot(mix: AssetMix) -> Snapshot {
    Snapshot {
        mix,
        price_volatility: PRICE_VOLATILITY.classify(&mix, PRICE_VOLATILITY_OUTCOMES),
        grid_stability: GRID_STABILITY.classify(&mix, GRID_STABILITY_OUTCOMES),
    }
}

/// Whether the world's generating fleet satisfies the configured constraint.
fn generation_constraint_met(game: &GameState, mix: &AssetMix) -> bool {
    match game.params.generation_constraint_rule {
        GenerationConstraintRule::Minimum => {
            mix.generation_assets() >= game.params.generation_constraint
        }
        GenerationConstraintRule::MaxDecrease => {
            game.last_snapshot.mix.generation_assets() - mix.generation_assets()
                <= game.params.generation_constraint
        }
    }
}

/// Whether the game has been won. Reads the freshly stored snapshot, so it
/// must run after `last_snapshot` is updated for the round.
fn win_condition_met(game: &GameState) -> bool {
    match game.params.win_condition_rule {
        WinConditionRule::RenewablePenetrationThreshold => {
            game.last_snapshot.mix.renewable_penetration() >= game.params.renewable_penetration
        }
        WinConditionRule::LastFossilLoses => {
            // Fossil assets sitting in the takeover pool keep the game going.
            if game
                .takeover_pool
                .iter()
                .any(|a| a.category() == AssetCategory::Fossil)
            {
                return false;
            }
            let fossil_holders = game
                .players
                .iter()
                .filter(|p| p.is_active() && p.has_fossil_assets())
                .count();
            fossil_holders <= 1
        }
    }
}

/// One full operate round. Ordering matters: global loss checks run before
/// payouts, payouts before bankruptcy, bankruptcy before the win check.
#[instrument(skip_all)]
pub(crate) fn operate_phase(game: &mut GameState) -> Option<Phase> {
    let logger = game.logger.child().with("phase", "operate");
    logger.event(EventKind::PhaseTransition).emit();

    let risk = RiskLevel::draw(&mut game.rng);
    logger.event(EventKind::RiskDrawn).field("risk", risk).emit();

    let outcome = take_snapshot(game.world_mix());
    logger
        .event(EventKind::GridOutcome)
        .field("grid_outcome", outcome)
        .field("new_emissions", outcome.mix.emissions())
        .emit();

    if !generation_constraint_met(game, &outcome.mix) {
        game.set_global_loss(LossReason::InsufficientGeneration);
        logger
            .event(EventKind::EveryoneLoses)
            .field("loss_reason", game.reason)
            .field("generation_assets", outcome.mix.generation_assets())
            .emit();
        return Some(Phase::GameEnd);
    }
    if outcome.grid_stability.level() < risk.level() {
        game.set_global_loss(LossReason::GridUnstable);
        logger
            .event(EventKind::EveryoneLoses)
            .field("loss_reason", game.reason)
            .field("grid_stability", outcome.grid_stability)
            .field("risk", risk)
            .emit();
        return Some(Phase::GameEnd);
    }
    game.carbon_emissions += outcome.mix.emissions();
    if game.carbon_emissions > game.params.emissions_cap {
        game.set_global_loss(LossReason::CarbonEmissionsExceeded);
        logger
            .event(EventKind::EveryoneLoses)
            .field("loss_reason", game.reason)
            .field("total_emissions", game.carbon_emissions)
            .field("new_emissions", outcome.mix.emissions())
            .emit();
        return Some(Phase::GameEnd);
    }
    if game.params.carbon_tax_rule == CarbonTaxRule::ApplyCarbonTax
        && game.carbon_emissions > game.params.carbon_tax_threshold
    {
        logger
            .event(EventKind::CarbonTaxApplied)
            .field("total_emissions", game.carbon_emissions)
            .field("tax_per_fossil_asset", game.params.carbon_tax_cost)
            .emit();
    }

    // PnL is computed from the pre-payout standings, then applied per player.
    let capacity_assets = outcome.mix.capacity_assets();
    let payouts: Vec<(usize, i64)> = game
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_active())
        .map(|(pi, p)| {
            let pnl: i64 = p
                .assets
                .iter()
                .map(|a| {
                    game.params.pnl(
                        a,
                        outcome.price_volatility,
                        game.carbon_emissions,
                        capacity_assets,
                    )
                })
                .sum();
            (pi, pnl)
        })
        .collect();

    let mut active_players = 0;
    for (pi, pnl) in payouts {
        active_players += 1;
        let player_logger = logger.child().with("player_index", pi);
        let player = &mut game.players[pi];
        player.money += pnl;
        player_logger
            .event(EventKind::MarketOutcome)
            .field("player_asset_mix", player.asset_mix())
            .field("player_pnl", pnl)
            .field("player_money", player.money)
            .emit();

        if player.money < 0 {
            player.mark_lost(LossReason::PlayerBankrupt);
            let money = player.money;
            game.move_assets_to_pool(pi);
            player_logger
                .event(EventKind::PlayerLoses)
                .field("loss_reason", LossReason::PlayerBankrupt)
                .field("player_money", money)
                .emit();
            active_players -= 1;
        }
    }

    game.last_snapshot = outcome;

    if active_players == 0 {
        game.set_global_loss(LossReason::NoActivePlayers);
        logger
            .event(EventKind::EveryoneLoses)
            .field("loss_reason", LossReason::NoActivePlayers)
            .emit();
        return Some(Phase::GameEnd);
    }

    if !win_condition_met(game) {
        return Some(Phase::Build);
    }

    if game.params.win_condition_rule == WinConditionRule::LastFossilLoses {
        // The last holdout loses on the spot; everyone else shares the win.
        if let Some(pi) = game.players.iter().position(|p| p.has_fossil_assets()) {
            game.players[pi].mark_lost(LossReason::LastPlayerWithFossilAssets);
            logger
                .event(EventKind::PlayerLoses)
                .field("player_index", pi)
                .field("loss_reason", LossReason::LastPlayerWithFossilAssets)
                .emit();

            active_players -= 1;
            if active_players == 0 {
                game.set_global_loss(LossReason::NoActivePlayers);
                logger
                    .event(EventKind::EveryoneLoses)
                    .field("loss_reason", LossReason::NoActivePlayers)
                    .emit();
                return Some(Phase::GameEnd);
            }
        }
    }

    game.status = GameStatus::Win;
    for p in game.players.iter_mut().filter(|p| p.is_active()) {
        p.status = PlayerStatus::Won;
    }
    logger.event(EventKind::GlobalWin).emit();
    Some(Phase::GameEnd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Asset;
    use crate::params::Builder;
    use crate::testing::{pledged, GameStateBuilder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assets_of(categories: &[AssetCategory]) -> Vec<Asset> {
        categories.iter().map(|&c| Asset::new(c)).collect()
    }

    #[test]
    fn test_risk_draw_is_seeded() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(RiskLevel::draw(&mut a), RiskLevel::draw(&mut b));
        }
    }

    #[test]
    fn test_risk_draw_covers_all_levels() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut seen = [false; 3];
        for _ in 0..100 {
            seen[RiskLevel::draw(&mut rng).level() as usize] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn test_snapshot_of_fossil_only_world() {
        // Dispatchable generation keeps both prices and the grid steady.
        let mix = AssetMix {
            fossils_wholesale: 10,
            ..Default::default()
        };
        let snapshot = take_snapshot(mix);
        assert_eq!(snapshot.price_volatility, PriceVolatility::Low);
        assert_eq!(snapshot.grid_stability, GridStability::Good);
    }

    #[test]
    fn test_snapshot_of_renewable_only_world() {
        let mix = AssetMix {
            renewables: 10,
            ..Default::default()
        };
        let snapshot = take_snapshot(mix);
        assert_eq!(snapshot.price_volatility, PriceVolatility::Extreme);
        assert_eq!(snapshot.grid_stability, GridStability::Dangerous);
    }

    #[test]
    fn test_snapshot_of_battery_buffered_world() {
        // Arbitrage batteries count for the steady side of both standings
        // and against the renewables.
        let mix = AssetMix {
            renewables: 4,
            batteries_arbitrage: 4,
            fossils_wholesale: 2,
            ..Default::default()
        };
        let snapshot = take_snapshot(mix);
        // Volatility: A = 2+4 = 6 vs B = 4-4 = 0.
        assert_eq!(snapshot.price_volatility, PriceVolatility::Low);
        // Stability: A = 4+2 = 6 vs B = 4-4 = 0.
        assert_eq!(snapshot.grid_stability, GridStability::Good);
    }

    #[test]
    fn test_generation_minimum_rule() {
        let game = GameStateBuilder::new()
            .with_player(50, assets_of(&[AssetCategory::Fossil; 15]))
            .build();
        assert!(generation_constraint_met(&game, &game.world_mix()));

        let short = GameStateBuilder::new()
            .with_player(50, assets_of(&[AssetCategory::Fossil; 14]))
            .build();
        assert!(!generation_constraint_met(&short, &short.world_mix()));
    }

    #[test]
    fn test_generation_max_decrease_rule() {
        let params = Builder::from(Default::default())
            .generation_constraint(GenerationConstraintRule::MaxDecrease, 3)
            .build();

        let mut game = GameStateBuilder::new()
            .params(params)
            .with_player(50, assets_of(&[AssetCategory::Fossil; 4]))
            .build();
        game.last_snapshot = take_snapshot(AssetMix {
            fossils_wholesale: 7,
            ..Default::default()
        });
        // Dropped from 7 to 4 generating assets, within the allowed 3.
        assert!(generation_constraint_met(&game, &game.world_mix()));

        game.last_snapshot = take_snapshot(AssetMix {
            fossils_wholesale: 8,
            ..Default::default()
        });
        assert!(!generation_constraint_met(&game, &game.world_mix()));
    }

    #[test]
    fn test_generation_max_decrease_allows_growth() {
        let params = Builder::from(Default::default())
            .generation_constraint(GenerationConstraintRule::MaxDecrease, 0)
            .build();
        let game = GameStateBuilder::new()
            .params(params)
            .with_player(50, assets_of(&[AssetCategory::Fossil; 5]))
            .build();
        // last_snapshot starts empty, so generation grew.
        assert!(generation_constraint_met(&game, &game.world_mix()));
    }

    #[test]
    fn test_win_by_renewable_penetration() {
        let params = Builder::from(Default::default())
            .win_condition(WinConditionRule::RenewablePenetrationThreshold, 80)
            .build();
        let mut game = GameStateBuilder::new()
            .params(params)
            .with_player(50, vec![])
            .build();

        game.last_snapshot = take_snapshot(AssetMix {
            renewables: 8,
            fossils_wholesale: 2,
            ..Default::default()
        });
        assert!(win_condition_met(&game));

        game.last_snapshot = take_snapshot(AssetMix {
            renewables: 7,
            fossils_wholesale: 3,
            ..Default::default()
        });
        assert!(!win_condition_met(&game));
    }

    #[test]
    fn test_last_fossil_win_blocked_by_pool_fossils() {
        let game = GameStateBuilder::new()
            .with_player(50, assets_of(&[AssetCategory::Renewable]))
            .with_pool_asset(Asset::new(AssetCategory::Fossil))
            .build();
        assert!(!win_condition_met(&game));
    }

    #[test]
    fn test_last_fossil_win_requires_at_most_one_holder() {
        let two_holders = GameStateBuilder::new()
            .with_player(50, assets_of(&[AssetCategory::Fossil]))
            .with_player(50, assets_of(&[AssetCategory::Fossil]))
            .build();
        assert!(!win_condition_met(&two_holders));

        let one_holder = GameStateBuilder::new()
            .with_player(50, assets_of(&[AssetCategory::Fossil]))
            .with_player(50, assets_of(&[AssetCategory::Renewable]))
            .build();
        assert!(win_condition_met(&one_holder));
    }

    #[test]
    fn test_operate_insufficient_generation_loses() {
        let mut game = GameStateBuilder::new().with_player(50, vec![]).build();

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Loss);
        assert_eq!(game.reason, Some(LossReason::InsufficientGeneration));
    }

    #[test]
    fn test_operate_emissions_cap_loses() {
        let params = Builder::from(Default::default())
            .emissions_cap(10)
            .build();
        let mut game = GameStateBuilder::new()
            .params(params)
            .with_player(500, assets_of(&[AssetCategory::Fossil; 15]))
            .build();
        game.carbon_emissions = 5;

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Loss);
        assert_eq!(game.reason, Some(LossReason::CarbonEmissionsExceeded));
        // Emissions accumulate before the cap check fires.
        assert_eq!(game.carbon_emissions, 20);
    }

    #[test]
    fn test_operate_pays_market_pnl() {
        // All-fossil world: volatility Low, wholesale fossils pay 5 each.
        let mut game = GameStateBuilder::new()
            .with_player(500, assets_of(&[AssetCategory::Fossil; 8]))
            .with_player(500, assets_of(&[AssetCategory::Fossil; 7]))
            .build();

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::Build));
        assert_eq!(game.players[0].money, 540);
        assert_eq!(game.players[1].money, 535);
        assert_eq!(game.carbon_emissions, 15);
        assert_eq!(game.last_snapshot.mix.fossils_wholesale, 15);
    }

    #[test]
    fn test_operate_bankruptcy_moves_assets_to_pool() {
        // A renewable-heavy world puts volatility at Extreme, where
        // renewables lose 5 each. Pledged batteries keep the grid at Good.
        let mut broke = assets_of(&[AssetCategory::Renewable; 15]);
        broke.push(Asset::new(AssetCategory::Fossil));
        let mut rich = assets_of(&[AssetCategory::Renewable; 15]);
        rich.extend(vec![pledged(AssetCategory::Battery); 16]);

        let mut game = GameStateBuilder::new()
            .with_player(10, broke)
            .with_player(500, rich)
            .build();

        // Player 0: 15 * -5 - 1 = -76, well below their 10.
        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::Build));
        assert_eq!(game.players[0].status, PlayerStatus::Lost);
        assert_eq!(game.players[0].reason, Some(LossReason::PlayerBankrupt));
        assert!(game.players[0].assets.is_empty());
        assert_eq!(game.takeover_pool.len(), 16);
        // Player 1: 15 * -5 + 16 * 4 = -11.
        assert_eq!(game.players[1].money, 489);
    }

    #[test]
    fn test_operate_all_bankrupt_is_global_loss() {
        let mut assets = assets_of(&[AssetCategory::Renewable; 15]);
        assets.extend(vec![pledged(AssetCategory::Battery); 13]);
        let mut game = GameStateBuilder::new().with_player(10, assets).build();

        // 15 * -5 + 13 * 4 = -23 against 10 in the bank.
        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Loss);
        assert_eq!(game.reason, Some(LossReason::NoActivePlayers));
    }

    #[test]
    fn test_operate_last_fossil_holder_eliminated_on_win() {
        // Enough renewables for generation, pledged batteries for stability.
        let green = || {
            let mut a = assets_of(&[AssetCategory::Renewable; 8]);
            a.extend(vec![pledged(AssetCategory::Battery); 8]);
            a
        };
        let mut game = GameStateBuilder::new()
            .with_player(500, green())
            .with_player(500, {
                let mut a = green();
                a.push(Asset::new(AssetCategory::Fossil));
                a
            })
            .build();

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Win);
        assert_eq!(game.players[0].status, PlayerStatus::Won);
        assert_eq!(game.players[1].status, PlayerStatus::Lost);
        assert_eq!(
            game.players[1].reason,
            Some(LossReason::LastPlayerWithFossilAssets)
        );
    }

    #[test]
    fn test_operate_win_with_no_fossil_holders_eliminates_nobody() {
        let green = || {
            let mut a = assets_of(&[AssetCategory::Renewable; 8]);
            a.extend(vec![pledged(AssetCategory::Battery); 8]);
            a
        };
        let mut game = GameStateBuilder::new()
            .with_player(500, green())
            .with_player(500, green())
            .build();

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Win);
        assert_eq!(game.players[0].status, PlayerStatus::Won);
        assert_eq!(game.players[1].status, PlayerStatus::Won);
    }

    #[test]
    fn test_operate_sole_fossil_survivor_win_is_no_active_loss() {
        // One player, holding the only fossil asset. The win condition is met
        // (one holder), but eliminating them leaves nobody to win.
        let mut game = GameStateBuilder::new()
            .with_player(500, {
                let mut a = assets_of(&[AssetCategory::Renewable; 14]);
                a.push(Asset::new(AssetCategory::Fossil));
                a.extend(vec![pledged(AssetCategory::Battery); 16]);
                a
            })
            .build();

        let next = operate_phase(&mut game);
        assert_eq!(next, Some(Phase::GameEnd));
        assert_eq!(game.status, GameStatus::Loss);
        assert_eq!(game.reason, Some(LossReason::NoActivePlayers));
        assert_eq!(game.players[0].status, PlayerStatus::Lost);
    }
}
