//! Static colony configuration: rules tables, starting values and limits.
//!
//! Configuration is supplied once at initialization and never reloaded
//! mid-game. The built-in tables are embedded as JSON; anything that fails
//! validation is refused before a colony can be created.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{StructureCatalog, StructureSpec, UpgradeGraph, UpgradeSpec};
use crate::types::{StructureKind, UpgradeId};

pub const BUILTIN_COLONY_CONFIG: &str = include_str!("../data/colony.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    pub structures: Vec<StructureSpec>,
    pub upgrades: Vec<UpgradeSpec>,
    pub start: StartingLedger,
    pub limits: Limits,
    pub market: MarketConfig,
}

/// Validated, read-only tables the turn engine and controller consult.
#[derive(Debug, Clone)]
pub struct Rules {
    pub catalog: StructureCatalog,
    pub upgrades: UpgradeGraph,
    pub limits: Limits,
}

/// Values a fresh ledger is seeded with on game start and on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartingLedger {
    pub day: u32,
    pub cash: f64,
    pub oxygen: f64,
    pub energy: f64,
    pub population: u32,
    pub engineers: u32,
    pub structures: BTreeMap<StructureKind, u32>,
    #[serde(default)]
    pub unlocked: BTreeSet<UpgradeId>,
    pub land_capacity: u32,
    pub market_price: f64,
    pub opening_log: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Upper clamp for stored energy. The lower clamp is always zero.
    pub energy_cap: f64,
}

/// Fallback used when the external price feed cannot be read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketConfig {
    pub default_price: f64,
    /// Fallback is `default_price` plus a uniform integer in `[-spread, spread]`.
    pub spread: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse colony config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("structure catalog has no entry for {0}")]
    MissingStructure(StructureKind),
    #[error("duplicate structure catalog entry for {0}")]
    DuplicateStructure(StructureKind),
    #[error("upgrade graph has no node for {0}")]
    MissingUpgrade(UpgradeId),
    #[error("duplicate upgrade node {0}")]
    DuplicateUpgrade(UpgradeId),
    #[error("upgrade {upgrade} names unknown parent {parent}")]
    UnknownParent { upgrade: UpgradeId, parent: UpgradeId },
    #[error("prerequisite cycle through {0}")]
    PrerequisiteCycle(UpgradeId),
    #[error("upgrade graph has no victory condition")]
    NoVictoryCondition,
    #[error("multiple victory conditions: {first} and {second}")]
    MultipleVictoryConditions { first: UpgradeId, second: UpgradeId },
    #[error("{item} must have a positive cost, got {cost}")]
    NonPositiveCost { item: String, cost: f64 },
    #[error("{kind} has invalid rate {rate}")]
    InvalidRate { kind: StructureKind, rate: f64 },
    #[error("upgrade {upgrade} has invalid effect: {reason}")]
    InvalidEffect {
        upgrade: UpgradeId,
        reason: &'static str,
    },
    #[error("invalid starting ledger: {0}")]
    InvalidStart(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

impl ColonyConfig {
    /// The built-in ruleset.
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_COLONY_CONFIG).expect("builtin colony config should validate")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ColonyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the rules tables, rejecting anything with undefined mechanics.
    pub fn compile(&self) -> Result<Rules, ConfigError> {
        let catalog = StructureCatalog::from_specs(&self.structures)?;
        let graph = UpgradeGraph::from_specs(&self.upgrades)?;

        if !(self.limits.energy_cap.is_finite() && self.limits.energy_cap > 0.0) {
            return Err(ConfigError::InvalidLimit(format!(
                "energy_cap must be positive, got {}",
                self.limits.energy_cap
            )));
        }
        if !(self.market.default_price.is_finite()
            && self.market.default_price > f64::from(self.market.spread))
        {
            return Err(ConfigError::InvalidLimit(format!(
                "default_price {} must exceed spread {}",
                self.market.default_price, self.market.spread
            )));
        }

        self.validate_start(&graph)?;
        Ok(Rules {
            catalog,
            upgrades: graph,
            limits: self.limits,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    fn validate_start(&self, graph: &UpgradeGraph) -> Result<(), ConfigError> {
        let start = &self.start;
        let invalid = |msg: String| Err(ConfigError::InvalidStart(msg));

        if start.day == 0 {
            return invalid("day starts at 1".into());
        }
        for (name, value) in [
            ("cash", start.cash),
            ("oxygen", start.oxygen),
            ("energy", start.energy),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        if start.energy > self.limits.energy_cap {
            return invalid(format!(
                "energy {} exceeds cap {}",
                start.energy, self.limits.energy_cap
            ));
        }
        if !(start.market_price.is_finite() && start.market_price > 0.0) {
            return invalid(format!(
                "market_price must be positive, got {}",
                start.market_price
            ));
        }
        if start.population == 0 {
            return invalid("population must be positive".into());
        }
        if start.engineers > start.population {
            return invalid(format!(
                "{} engineers exceed population {}",
                start.engineers, start.population
            ));
        }
        let Some(built) = start
            .structures
            .values()
            .try_fold(0u32, |total, n| total.checked_add(*n))
        else {
            return invalid("structure counts overflow".into());
        };
        if built > start.land_capacity {
            return invalid(format!(
                "{built} structures exceed land capacity {}",
                start.land_capacity
            ));
        }
        for id in &start.unlocked {
            if graph.is_victory(*id) {
                return invalid(format!("{id} cannot be unlocked at start"));
            }
            if !graph.is_unlockable(*id, &start.unlocked) {
                return invalid(format!("{id} unlocked without its prerequisite"));
            }
        }
        Ok(())
    }
}
