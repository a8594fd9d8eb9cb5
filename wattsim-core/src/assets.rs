//! Grid asset model: categories, operating-mode flags, and asset instances.
//!
//! Every asset belongs to exactly one owner at a time (a player portfolio or
//! the shared takeover pool) and moves between owners by value, never by copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of grid asset categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetCategory {
    Renewable,
    Fossil,
    Battery,
}

impl AssetCategory {
    /// Enumeration order used when listing build-phase actions.
    pub const ALL: [AssetCategory; 3] = [
        AssetCategory::Battery,
        AssetCategory::Renewable,
        AssetCategory::Fossil,
    ];

    /// Whether assets of this category produce electricity.
    pub fn is_generation(self) -> bool {
        matches!(self, AssetCategory::Renewable | AssetCategory::Fossil)
    }

    /// Whether assets of this category may be pledged to the capacity market.
    pub fn can_pledge_capacity(self) -> bool {
        matches!(self, AssetCategory::Fossil | AssetCategory::Battery)
    }

    /// The operating-mode flags this category permits.
    fn allowed_modes(self) -> OperationMode {
        match self {
            AssetCategory::Renewable => OperationMode::NONE,
            AssetCategory::Fossil | AssetCategory::Battery => OperationMode::CAPACITY,
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetCategory::Renewable => "Renewable",
            AssetCategory::Fossil => "Fossil",
            AssetCategory::Battery => "Battery",
        };
        f.write_str(name)
    }
}

/// Independent per-asset operating-mode flags.
///
/// Categories carry an allow-mask; setting a flag a category does not permit
/// is silently masked to a no-op rather than rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationMode {
    /// Pledged to the capacity market instead of wholesale/arbitrage operation.
    pub capacity: bool,
}

impl OperationMode {
    /// No flags set. The default mode for every freshly built asset.
    pub const NONE: OperationMode = OperationMode { capacity: false };
    /// Capacity-market pledge flag.
    pub const CAPACITY: OperationMode = OperationMode { capacity: true };

    fn masked_by(self, allowed: OperationMode) -> OperationMode {
        OperationMode {
            capacity: self.capacity && allowed.capacity,
        }
    }

    fn union(self, other: OperationMode) -> OperationMode {
        OperationMode {
            capacity: self.capacity || other.capacity,
        }
    }
}

/// One grid asset instance: its category plus currently active mode flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    category: AssetCategory,
    mode: OperationMode,
}

impl Asset {
    /// Create an asset in the default operating mode.
    pub fn new(category: AssetCategory) -> Self {
        Self {
            category,
            mode: OperationMode::NONE,
        }
    }

    pub fn category(&self) -> AssetCategory {
        self.category
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Whether the asset is currently pledged to the capacity market.
    pub fn is_capacity(&self) -> bool {
        self.mode.capacity
    }

    /// Set the given mode flags, masked by what the category permits.
    pub fn set_mode(&mut self, mode: OperationMode) {
        self.mode = self.mode.union(mode.masked_by(self.category.allowed_modes()));
    }

    /// Reset the asset to its default operating mode.
    pub fn clear_mode(&mut self) {
        self.mode = OperationMode::NONE;
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode.capacity {
            write!(f, "{}Asset{{Capacity}}", self.category)
        } else {
            write!(f, "{}Asset{{}}", self.category)
        }
    }
}
