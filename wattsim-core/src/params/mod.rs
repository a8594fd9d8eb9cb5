//! Rule configuration for a game: rule variants, cost tables, and PnL tables.
//!
//! A [`Params`] value is an immutable bundle of everything that varies between
//! rule sets. The engine only consumes it through the lookup functions here
//! and assumes it has already passed [`Params::validate`].

mod builder;
mod validate;

pub use builder::Builder;
pub use validate::ValidationError;

use crate::assets::{Asset, AssetCategory};
use crate::mix::PriceVolatility;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

/// How capacity-market pledges are rewarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityRule {
    /// Capacity payments are looked up from a per-asset table. Default.
    PaymentPerAsset,
    /// Players cannot pledge assets to the capacity market.
    NoCapacityMarket,
    /// Capacity payments are made from a shared pool, split evenly.
    SharedPaymentPool,
}

/// Whether fossil assets are taxed once emissions pass a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonTaxRule {
    /// Carbon tax is not applied. Default.
    NoCarbonTax,
    /// Fossil assets pay a flat tax after emissions pass the threshold.
    ApplyCarbonTax,
}

/// How the game is won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinConditionRule {
    /// All but one player getting rid of their fossil assets. Default.
    LastFossilLoses,
    /// Reaching a configured renewable-penetration percentage.
    RenewablePenetrationThreshold,
}

/// How the global generation floor is enforced each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationConstraintRule {
    /// A minimum number of generation assets must exist. Default.
    Minimum,
    /// Generation may not shrink by more than the constraint in one round.
    MaxDecrease,
}

/// Whether an unclaimed takeover pool blocks players from finishing a build
/// round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeoverRule {
    /// Players must keep acting until the takeover pool is cleared. Default.
    PoolBlocksFinish,
    /// Pool assets are held by a virtual owner and do not block finishing.
    VirtualOwner,
}

/// Profit/loss values for one asset class, indexed by price volatility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlTable(pub [i64; 4]);

impl Index<PriceVolatility> for PnlTable {
    type Output = i64;

    fn index(&self, volatility: PriceVolatility) -> &i64 {
        &self.0[volatility.index()]
    }
}

/// A cost so high no player can ever afford it.
pub const UNAFFORDABLE: i64 = 1 << 32;

/// Immutable rule configuration for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub capacity_rule: CapacityRule,
    pub carbon_tax_rule: CarbonTaxRule,
    pub win_condition_rule: WinConditionRule,
    pub generation_constraint_rule: GenerationConstraintRule,
    pub takeover_rule: TakeoverRule,

    pub initial_cash: i64,
    /// Starting fossil fleet size per player, keyed by total player count.
    pub starting_fossils_by_player_count: BTreeMap<usize, usize>,

    pub battery_build_cost: i64,
    pub battery_scrap_cost: i64,
    pub renewable_build_cost: i64,
    pub renewable_scrap_cost: i64,
    pub fossil_build_cost: i64,
    pub fossil_scrap_cost: i64,

    pub emissions_cap: i64,
    pub generation_constraint: i64,
    pub carbon_tax_threshold: i64,
    pub carbon_tax_cost: i64,
    /// Win threshold for `RenewablePenetrationThreshold`, in percent.
    pub renewable_penetration: i64,

    pub renewable_pnl: PnlTable,
    pub battery_arbitrage_pnl: PnlTable,
    pub battery_capacity_pnl: PnlTable,
    pub fossil_wholesale_pnl: PnlTable,
    pub fossil_capacity_pnl: PnlTable,
    pub capacity_pool_pnl: PnlTable,
}

impl Params {
    /// The cost to build an asset of the given category.
    pub fn build_cost(&self, category: AssetCategory) -> i64 {
        match category {
            AssetCategory::Battery => self.battery_build_cost,
            AssetCategory::Renewable => self.renewable_build_cost,
            AssetCategory::Fossil => self.fossil_build_cost,
        }
    }

    /// The cost to decommission an asset of the given category.
    pub fn scrap_cost(&self, category: AssetCategory) -> i64 {
        match category {
            AssetCategory::Battery => self.battery_scrap_cost,
            AssetCategory::Renewable => self.renewable_scrap_cost,
            AssetCategory::Fossil => self.fossil_scrap_cost,
        }
    }

    /// The cost to take over a pool asset of the given category.
    pub fn takeover_cost(&self, category: AssetCategory) -> i64 {
        self.scrap_cost(category)
    }

    /// Signed profit/loss for one asset this round.
    ///
    /// `cumulative_emissions` must already include the current round's
    /// emissions; `capacity_asset_count` is the global number of pledged
    /// assets (used to split the shared payment pool).
    pub fn pnl(
        &self,
        asset: &Asset,
        volatility: PriceVolatility,
        cumulative_emissions: i64,
        capacity_asset_count: i64,
    ) -> i64 {
        match asset.category() {
            AssetCategory::Renewable => self.renewable_pnl[volatility],
            AssetCategory::Battery => {
                if asset.is_capacity() {
                    match self.capacity_rule {
                        CapacityRule::PaymentPerAsset => self.battery_capacity_pnl[volatility],
                        CapacityRule::SharedPaymentPool => {
                            self.capacity_pool_pnl[volatility] / capacity_asset_count
                        }
                        // A pledge cannot exist under this rule; make the
                        // contradiction ruinous rather than silently zero.
                        CapacityRule::NoCapacityMarket => -UNAFFORDABLE,
                    }
                } else {
                    self.battery_arbitrage_pnl[volatility]
                }
            }
            AssetCategory::Fossil => {
                let tax = if self.carbon_tax_rule == CarbonTaxRule::ApplyCarbonTax
                    && cumulative_emissions > self.carbon_tax_threshold
                {
                    self.carbon_tax_cost
                } else {
                    0
                };
                if asset.is_capacity() {
                    match self.capacity_rule {
                        CapacityRule::PaymentPerAsset => self.fossil_capacity_pnl[volatility] - tax,
                        CapacityRule::SharedPaymentPool => {
                            self.capacity_pool_pnl[volatility] / capacity_asset_count - tax
                        }
                        CapacityRule::NoCapacityMarket => -UNAFFORDABLE,
                    }
                } else {
                    self.fossil_wholesale_pnl[volatility] - tax
                }
            }
        }
    }
}

impl Default for Params {
    /// The baseline rule set the game is balanced around.
    fn default() -> Self {
        Params {
            capacity_rule: CapacityRule::PaymentPerAsset,
            carbon_tax_rule: CarbonTaxRule::NoCarbonTax,
            win_condition_rule: WinConditionRule::LastFossilLoses,
            generation_constraint_rule: GenerationConstraintRule::Minimum,
            takeover_rule: TakeoverRule::PoolBlocksFinish,

            initial_cash: 50,
            starting_fossils_by_player_count: BTreeMap::from([
                (2, 9),
                (3, 7),
                (4, 5),
                (5, 4),
                (6, 3),
                (7, 3),
            ]),

            battery_build_cost: 40,
            battery_scrap_cost: 5,
            renewable_build_cost: 20,
            renewable_scrap_cost: 5,
            fossil_build_cost: 40,
            fossil_scrap_cost: 20,

            emissions_cap: 100,
            generation_constraint: 15,
            carbon_tax_threshold: 0,
            carbon_tax_cost: 0,
            renewable_penetration: 0,

            renewable_pnl: PnlTable([10, 5, 0, -5]),
            battery_arbitrage_pnl: PnlTable([-1, 2, 5, 8]),
            battery_capacity_pnl: PnlTable([1, 2, 3, 4]),
            fossil_wholesale_pnl: PnlTable([5, 3, 1, -1]),
            fossil_capacity_pnl: PnlTable([1, 1, 2, 3]),
            capacity_pool_pnl: PnlTable([0, 0, 0, 0]),
        }
    }
}
