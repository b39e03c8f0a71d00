use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

// ============================================================================
// Structures - Buildings that occupy land in the colony
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum StructureKind {
    SolarArray,
    DataCenter,
    O2Scrubber,
    HabModule,
}

impl StructureKind {
    /// Returns an iterator over all structure kinds
    pub fn all() -> impl Iterator<Item = StructureKind> {
        [
            StructureKind::SolarArray,
            StructureKind::DataCenter,
            StructureKind::O2Scrubber,
            StructureKind::HabModule,
        ]
        .into_iter()
    }

    pub fn label(self) -> &'static str {
        match self {
            StructureKind::SolarArray => "Solar Array",
            StructureKind::DataCenter => "Data Center",
            StructureKind::O2Scrubber => "O2 Scrubber",
            StructureKind::HabModule => "Hab Module",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a structure contributes to the grid and to production each sol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum StructureRole {
    /// Produces energy, scaled by engineer coverage.
    PowerSource,
    /// Drains energy, produces compute scaled by scientists.
    ConsumerCompute,
    /// Drains energy, produces oxygen.
    ConsumerLifeSupport,
    /// Drains energy only.
    ConsumerHousing,
}

// ============================================================================
// Upgrades - One-way research unlocks
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum UpgradeId {
    PerovskiteCells,
    QuantumAsics,
    NuclearReactor,
    Terraforming,
}

impl UpgradeId {
    /// Returns an iterator over all upgrade ids
    pub fn all() -> impl Iterator<Item = UpgradeId> {
        [
            UpgradeId::PerovskiteCells,
            UpgradeId::QuantumAsics,
            UpgradeId::NuclearReactor,
            UpgradeId::Terraforming,
        ]
        .into_iter()
    }

    pub fn label(self) -> &'static str {
        match self {
            UpgradeId::PerovskiteCells => "Perovskite Cells",
            UpgradeId::QuantumAsics => "Quantum ASICs",
            UpgradeId::NuclearReactor => "Nuclear Reactor",
            UpgradeId::Terraforming => "Terraforming",
        }
    }
}

impl fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The part of the turn an upgrade effect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Mechanic {
    SolarOutput,
    ComputeYield,
    EnergyProduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(tag = "type")]
pub enum UpgradeEffect {
    Multiplier { mechanic: Mechanic, factor: f64 },
    FlatBonus { mechanic: Mechanic, amount: f64 },
}

/// Research state of a single upgrade relative to the unlocked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub enum UpgradeState {
    Researched,
    Available,
    Locked,
}

// ============================================================================
// Turn policy and colony status
// ============================================================================

/// Whether generated compute is sold for cash each sol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Strategy {
    #[default]
    Sell,
    /// Hold compute. No stockpile exists, so nothing is gained.
    Hodl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum ColonyStatus {
    #[default]
    Active,
    Lost,
    Won,
}

impl ColonyStatus {
    pub fn is_terminal(self) -> bool {
        self != ColonyStatus::Active
    }
}

impl fmt::Display for ColonyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColonyStatus::Active => f.write_str("active"),
            ColonyStatus::Lost => f.write_str("lost"),
            ColonyStatus::Won => f.write_str("won"),
        }
    }
}
