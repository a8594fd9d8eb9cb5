//! Fluent derivation of [`Params`] values.

use super::{
    CapacityRule, CarbonTaxRule, GenerationConstraintRule, Params, PnlTable, TakeoverRule,
    WinConditionRule,
};
use std::collections::BTreeMap;

/// Derives a new [`Params`] from an existing one, overriding pieces fluently.
///
/// ```
/// use wattsim_core::params::{Builder, CarbonTaxRule, Params};
///
/// let params = Builder::from(Params::default())
///     .carbon_tax(CarbonTaxRule::ApplyCarbonTax, 50, 2)
///     .emissions_cap(120)
///     .build();
/// assert_eq!(params.carbon_tax_threshold, 50);
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    params: Params,
}

impl Builder {
    pub fn from(params: Params) -> Self {
        Self { params }
    }

    pub fn build(self) -> Params {
        self.params
    }

    pub fn capacity(
        mut self,
        rule: CapacityRule,
        battery_pnl: PnlTable,
        fossil_pnl: PnlTable,
        pool_pnl: PnlTable,
    ) -> Self {
        self.params.capacity_rule = rule;
        self.params.battery_capacity_pnl = battery_pnl;
        self.params.fossil_capacity_pnl = fossil_pnl;
        self.params.capacity_pool_pnl = pool_pnl;
        self
    }

    pub fn pnl(
        mut self,
        battery_pnl: PnlTable,
        fossil_pnl: PnlTable,
        renewable_pnl: PnlTable,
    ) -> Self {
        self.params.battery_arbitrage_pnl = battery_pnl;
        self.params.fossil_wholesale_pnl = fossil_pnl;
        self.params.renewable_pnl = renewable_pnl;
        self
    }

    pub fn carbon_tax(mut self, rule: CarbonTaxRule, threshold: i64, cost: i64) -> Self {
        self.params.carbon_tax_rule = rule;
        self.params.carbon_tax_threshold = threshold;
        self.params.carbon_tax_cost = cost;
        self
    }

    pub fn emissions_cap(mut self, cap: i64) -> Self {
        self.params.emissions_cap = cap;
        self
    }

    pub fn generation_constraint(mut self, rule: GenerationConstraintRule, constraint: i64) -> Self {
        self.params.generation_constraint_rule = rule;
        self.params.generation_constraint = constraint;
        self
    }

    pub fn win_condition(mut self, rule: WinConditionRule, penetration: i64) -> Self {
        self.params.win_condition_rule = rule;
        self.params.renewable_penetration = penetration;
        self
    }

    pub fn takeover(mut self, rule: TakeoverRule) -> Self {
        self.params.takeover_rule = rule;
        self
    }

    pub fn renewable_costs(mut self, build: i64, scrap: i64) -> Self {
        self.params.renewable_build_cost = build;
        self.params.renewable_scrap_cost = scrap;
        self
    }

    pub fn fossil_costs(mut self, build: i64, scrap: i64) -> Self {
        self.params.fossil_build_cost = build;
        self.params.fossil_scrap_cost = scrap;
        self
    }

    pub fn battery_costs(mut self, build: i64, scrap: i64) -> Self {
        self.params.battery_build_cost = build;
        self.params.battery_scrap_cost = scrap;
        self
    }

    pub fn initial_cash(mut self, cash: i64) -> Self {
        self.params.initial_cash = cash;
        self
    }

    pub fn starting_assets(mut self, table: BTreeMap<usize, usize>) -> Self {
        self.params.starting_fossils_by_player_count = table;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_only_named_fields() {
        let base = Params::default();
        let derived = Builder::from(base.clone())
            .fossil_costs(60, 30)
            .initial_cash(80)
            .build();

        assert_eq!(derived.fossil_build_cost, 60);
        assert_eq!(derived.fossil_scrap_cost, 30);
        assert_eq!(derived.initial_cash, 80);
        assert_eq!(derived.battery_build_cost, base.battery_build_cost);
        assert_eq!(derived.renewable_pnl, base.renewable_pnl);
    }

    #[test]
    fn test_builder_roundtrip_is_identity() {
        let base = Params::default();
        assert_eq!(Builder::from(base.clone()).build(), base);
    }
}
