//! Asset-mix aggregation and the weighted-ratio classifier.
//!
//! [`AssetMix`] folds a collection of assets into five counters (category ×
//! capacity-pledge state). [`RatioCalculation`] compares two weighted sums of
//! those counters and classifies the result into a four-way ordinal outcome,
//! which callers map onto domain metrics such as [`PriceVolatility`] and
//! [`GridStability`] via a fixed lookup table.

use crate::assets::{Asset, AssetCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market price-volatility level, derived from the global asset mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceVolatility {
    Low,
    Medium,
    High,
    Extreme,
}

impl PriceVolatility {
    /// All levels, in increasing order of volatility.
    pub const ALL: [PriceVolatility; 4] = [
        PriceVolatility::Low,
        PriceVolatility::Medium,
        PriceVolatility::High,
        PriceVolatility::Extreme,
    ];

    /// Table index for PnL lookups.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Grid stability level, derived from the global asset mix.
///
/// Ordered from worst to best so that `Ord` reflects "more stable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStability {
    Dangerous,
    Bad,
    Ok,
    Good,
}

impl GridStability {
    /// Numeric level used when comparing stability against a drawn risk.
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Aggregate counts of assets by category and capacity-pledge state.
///
/// Invariant: the sum of the five counters equals the number of assets folded
/// in. The fold is commutative, so aggregation is order-independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMix {
    pub renewables: i64,
    pub batteries_arbitrage: i64,
    pub batteries_capacity: i64,
    pub fossils_wholesale: i64,
    pub fossils_capacity: i64,
}

impl AssetMix {
    /// Fold an iterator of assets into a mix.
    pub fn from_assets<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> AssetMix {
        let mut mix = AssetMix::default();
        for a in assets {
            mix.add(a);
        }
        mix
    }

    /// Count one asset into the mix.
    pub fn add(&mut self, asset: &Asset) {
        match asset.category() {
            AssetCategory::Renewable => self.renewables += 1,
            AssetCategory::Battery => {
                if asset.is_capacity() {
                    self.batteries_capacity += 1;
                } else {
                    self.batteries_arbitrage += 1;
                }
            }
            AssetCategory::Fossil => {
                if asset.is_capacity() {
                    self.fossils_capacity += 1;
                } else {
                    self.fossils_wholesale += 1;
                }
            }
        }
    }

    /// Number of assets of the given category, across pledge states.
    pub fn of_category(&self, category: AssetCategory) -> i64 {
        match category {
            AssetCategory::Renewable => self.renewables,
            AssetCategory::Battery => self.batteries_arbitrage + self.batteries_capacity,
            AssetCategory::Fossil => self.fossils_wholesale + self.fossils_capacity,
        }
    }

    /// Total number of aggregated assets.
    pub fn total(&self) -> i64 {
        self.renewables
            + self.batteries_arbitrage
            + self.batteries_capacity
            + self.fossils_wholesale
            + self.fossils_capacity
    }

    /// Number of electricity-generating assets.
    pub fn generation_assets(&self) -> i64 {
        self.renewables + self.fossils_wholesale + self.fossils_capacity
    }

    /// Number of assets pledged to the capacity market.
    pub fn capacity_assets(&self) -> i64 {
        self.batteries_capacity + self.fossils_capacity
    }

    /// Carbon emissions produced per round by this mix.
    pub fn emissions(&self) -> i64 {
        self.fossils_wholesale + self.fossils_capacity
    }

    /// Percentage of generation assets that are renewable. Zero when there is
    /// no generation at all.
    pub fn renewable_penetration(&self) -> i64 {
        let generation = self.generation_assets();
        if generation == 0 {
            return 0;
        }
        self.renewables * 100 / generation
    }
}

impl<'a> FromIterator<&'a Asset> for AssetMix {
    fn from_iter<I: IntoIterator<Item = &'a Asset>>(iter: I) -> Self {
        AssetMix::from_assets(iter)
    }
}

/// Integer weights applied to each [`AssetMix`] counter when forming one side
/// of a ratio calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixWeights {
    pub renewables: i64,
    pub batteries_arbitrage: i64,
    pub batteries_capacity: i64,
    pub fossils_wholesale: i64,
    pub fossils_capacity: i64,
}

impl MixWeights {
    /// All-zero weights.
    pub const ZERO: MixWeights = MixWeights {
        renewables: 0,
        batteries_arbitrage: 0,
        batteries_capacity: 0,
        fossils_wholesale: 0,
        fossils_capacity: 0,
    };

    /// Weighted sum over the mix counters.
    pub fn dot(&self, mix: &AssetMix) -> i64 {
        self.renewables * mix.renewables
            + self.batteries_arbitrage * mix.batteries_arbitrage
            + self.batteries_capacity * mix.batteries_capacity
            + self.fossils_wholesale * mix.fossils_wholesale
            + self.fossils_capacity * mix.fossils_capacity
    }
}

impl fmt::Display for MixWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let mut push = |name: &str, value: i64| match value {
            0 => {}
            1 => parts.push(name.to_string()),
            -1 => parts.push(format!("-{name}")),
            v => parts.push(format!("{v}*{name}")),
        };
        push("Renewables", self.renewables);
        push("BatteriesArbitrage", self.batteries_arbitrage);
        push("BatteriesCapacity", self.batteries_capacity);
        push("FossilsWholesale", self.fossils_wholesale);
        push("FossilsCapacity", self.fossils_capacity);
        if parts.is_empty() {
            f.write_str("0")
        } else {
            f.write_str(&parts.join(" + "))
        }
    }
}

/// Four-way ordinal outcome of a ratio calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioOutcome {
    /// Side A exceeds side B by at least the rollover factor.
    ADominates,
    /// The two sides are equal, or A holds a lead below the rollover factor.
    Balanced,
    /// Side B leads, but by less than the rollover factor.
    BLeads,
    /// Side B exceeds side A by at least the rollover factor.
    BDominates,
}

impl RatioOutcome {
    /// Index into a caller-supplied four-entry outcome table.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A stateless weighted-ratio comparison over an [`AssetMix`].
///
/// Both weighted sums are clamped at zero before comparison, so negative
/// pressure on one side never counts as an advantage for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioCalculation {
    pub side_a: MixWeights,
    pub side_b: MixWeights,
    /// Multiplicative margin one side must exceed the other by to "dominate".
    /// Should be at least 2.
    pub rollover: i64,
}

impl RatioCalculation {
    /// Classify the mix into one of the four ordinal outcomes.
    ///
    /// Equality always classifies as [`RatioOutcome::Balanced`], regardless of
    /// the rollover factor.
    pub fn evaluate(&self, mix: &AssetMix) -> RatioOutcome {
        let a = self.side_a.dot(mix).max(0);
        let b = self.side_b.dot(mix).max(0);

        if a == b {
            RatioOutcome::Balanced
        } else if a * self.rollover <= b {
            RatioOutcome::BDominates
        } else if a >= b * self.rollover {
            RatioOutcome::ADominates
        } else if a < b {
            RatioOutcome::BLeads
        } else {
            RatioOutcome::Balanced
        }
    }

    /// Evaluate the mix and map the outcome through a fixed lookup table.
    pub fn classify<T: Copy>(&self, mix: &AssetMix, outcomes: [T; 4]) -> T {
        outcomes[self.evaluate(mix).index()]
    }
}

impl fmt::Display for RatioCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} : {})[{}]", self.side_a, self.side_b, self.rollover)
    }
}
