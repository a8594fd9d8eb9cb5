//! Sanity checks applied to a [`Params`] value before it is handed to the
//! engine. The engine itself assumes a validated configuration.

use super::{CapacityRule, CarbonTaxRule, Params, PnlTable, WinConditionRule};
use crate::mix::PriceVolatility;
use thiserror::Error;

/// All problems found in a configuration, not just the first.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid parameters: {}", problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

struct Checker {
    problems: Vec<String>,
}

impl Checker {
    fn new() -> Self {
        Self {
            problems: Vec::new(),
        }
    }

    fn adjacent_pairs(table: PnlTable) -> impl Iterator<Item = (PriceVolatility, i64, i64)> {
        (0..3).map(move |i| {
            (
                PriceVolatility::ALL[i],
                table.0[i],
                table.0[i + 1],
            )
        })
    }

    fn is_increasing(&mut self, table: PnlTable, name: &str) {
        for (volatility, current, higher) in Self::adjacent_pairs(table) {
            if current >= higher {
                self.problems.push(format!(
                    "{name}[{volatility:?}] = {current} should be less than the next level's {higher}"
                ));
            }
        }
    }

    fn is_non_decreasing(&mut self, table: PnlTable, name: &str) {
        for (volatility, current, higher) in Self::adjacent_pairs(table) {
            if current > higher {
                self.problems.push(format!(
                    "{name}[{volatility:?}] = {current} should be at most the next level's {higher}"
                ));
            }
        }
    }

    fn is_decreasing(&mut self, table: PnlTable, name: &str) {
        for (volatility, current, higher) in Self::adjacent_pairs(table) {
            if current <= higher {
                self.problems.push(format!(
                    "{name}[{volatility:?}] = {current} should be more than the next level's {higher}"
                ));
            }
        }
    }

    /// Every element of `a` must exceed the corresponding element of `b`.
    fn is_elementwise_greater(&mut self, a: PnlTable, b: PnlTable, name_a: &str, name_b: &str) {
        for (i, volatility) in PriceVolatility::ALL.iter().enumerate() {
            if a.0[i] <= b.0[i] {
                self.problems.push(format!(
                    "{name_a}[{volatility:?}] = {} should be more than {name_b}[{volatility:?}] = {}",
                    a.0[i], b.0[i]
                ));
            }
        }
    }

    /// `a` must beat `b` at some volatility level and lose at another,
    /// otherwise the choice between them is never meaningful.
    fn is_elementwise_greater_and_lesser(
        &mut self,
        a: PnlTable,
        b: PnlTable,
        name_a: &str,
        name_b: &str,
    ) {
        let found_more = a.0.iter().zip(b.0.iter()).any(|(x, y)| x > y);
        let found_less = a.0.iter().zip(b.0.iter()).any(|(x, y)| x < y);
        if !found_more {
            self.problems
                .push(format!("no elements of {name_a} are greater than those of {name_b}"));
        }
        if !found_less {
            self.problems
                .push(format!("no elements of {name_a} are less than those of {name_b}"));
        }
    }
}

impl Params {
    /// Check that the parameters are sensible, collecting every violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Checker::new();
        let zero = PnlTable::default();

        // PnL must respond to volatility the way each asset class is meant to.
        c.is_decreasing(self.renewable_pnl, "renewable_pnl");
        c.is_increasing(self.battery_arbitrage_pnl, "battery_arbitrage_pnl");
        c.is_decreasing(self.fossil_wholesale_pnl, "fossil_wholesale_pnl");
        match self.capacity_rule {
            CapacityRule::PaymentPerAsset => {
                c.is_non_decreasing(self.battery_capacity_pnl, "battery_capacity_pnl");
                c.is_non_decreasing(self.fossil_capacity_pnl, "fossil_capacity_pnl");
                // Pledging must be a meaningful decision, not a dominant one.
                c.is_elementwise_greater_and_lesser(
                    self.battery_arbitrage_pnl,
                    self.battery_capacity_pnl,
                    "battery_arbitrage_pnl",
                    "battery_capacity_pnl",
                );
                c.is_elementwise_greater_and_lesser(
                    self.fossil_wholesale_pnl,
                    self.fossil_capacity_pnl,
                    "fossil_wholesale_pnl",
                    "fossil_capacity_pnl",
                );
            }
            CapacityRule::SharedPaymentPool => {
                c.is_non_decreasing(self.capacity_pool_pnl, "capacity_pool_pnl");
                c.is_elementwise_greater(
                    self.capacity_pool_pnl,
                    zero,
                    "capacity_pool_pnl",
                    "zero",
                );
            }
            CapacityRule::NoCapacityMarket => {}
        }

        // Every ordinary asset class must be able to lose money.
        c.is_elementwise_greater_and_lesser(self.renewable_pnl, zero, "renewable_pnl", "zero");
        c.is_elementwise_greater_and_lesser(
            self.battery_arbitrage_pnl,
            zero,
            "battery_arbitrage_pnl",
            "zero",
        );
        c.is_elementwise_greater_and_lesser(
            self.fossil_wholesale_pnl,
            zero,
            "fossil_wholesale_pnl",
            "zero",
        );

        if self.initial_cash <= 0 {
            c.problems.push(format!(
                "initial cash ({}) should be greater than 0",
                self.initial_cash
            ));
        }

        // Building must cost more than scrapping, and be affordable at start.
        for (name, build, scrap) in [
            ("battery", self.battery_build_cost, self.battery_scrap_cost),
            (
                "renewable",
                self.renewable_build_cost,
                self.renewable_scrap_cost,
            ),
            ("fossil", self.fossil_build_cost, self.fossil_scrap_cost),
        ] {
            if build <= scrap {
                c.problems.push(format!(
                    "{name} build cost ({build}) should be greater than scrap cost ({scrap})"
                ));
            }
            if build > self.initial_cash {
                c.problems.push(format!(
                    "{name} build cost ({build}) should be at most initial cash ({})",
                    self.initial_cash
                ));
            }
        }

        // A player must be able to swap a fossil for a renewable in round one.
        if self.fossil_scrap_cost + self.renewable_build_cost > self.initial_cash {
            c.problems.push(format!(
                "scrapping a fossil ({}) and building a renewable ({}) must be affordable with initial cash ({})",
                self.fossil_scrap_cost, self.renewable_build_cost, self.initial_cash
            ));
        }

        for (&num_players, &num_fossil) in &self.starting_fossils_by_player_count {
            let total = (num_fossil * num_players) as i64;
            if total <= self.generation_constraint {
                c.problems.push(format!(
                    "starting fossil assets ({num_fossil} assets * {num_players} players = {total}) should exceed the generation minimum ({})",
                    self.generation_constraint
                ));
            }

            // Scrapping one fossil per round must be survivable under the cap,
            // but doing nothing must not be survivable for 20 rounds.
            let scrap_down_emissions = (num_fossil * (num_fossil + 1) / 2 * num_players) as i64;
            if scrap_down_emissions >= self.emissions_cap {
                c.problems.push(format!(
                    "emissions cap ({}) would be exceeded by {num_players} players starting with {num_fossil} fossil assets and scrapping one per round; raise the cap",
                    self.emissions_cap
                ));
            }
            if total > 0 && self.emissions_cap / total > 20 {
                c.problems.push(format!(
                    "emissions cap ({}) would allow {num_players} players starting with {num_fossil} fossil assets to do nothing for 20 rounds; lower the cap",
                    self.emissions_cap
                ));
            }
        }

        if self.carbon_tax_rule == CarbonTaxRule::ApplyCarbonTax {
            if self.carbon_tax_threshold <= 0 {
                c.problems.push(format!(
                    "carbon tax threshold ({}) should be greater than 0",
                    self.carbon_tax_threshold
                ));
            }
            if self.carbon_tax_cost <= 0 {
                c.problems.push(format!(
                    "carbon tax cost ({}) should be greater than 0",
                    self.carbon_tax_cost
                ));
            }
            if self.emissions_cap <= self.carbon_tax_threshold {
                c.problems.push(format!(
                    "emissions cap ({}) should be greater than the carbon tax threshold ({})",
                    self.emissions_cap, self.carbon_tax_threshold
                ));
            }
        }

        if self.win_condition_rule == WinConditionRule::RenewablePenetrationThreshold
            && !(1..=100).contains(&self.renewable_penetration)
        {
            c.problems.push(format!(
                "renewable penetration ({}) should be between 1 and 100",
                self.renewable_penetration
            ));
        }

        if c.problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                problems: c.problems,
            })
        }
    }
}
