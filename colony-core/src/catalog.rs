//! Read-only rules tables: the structure catalog and the upgrade graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::ConfigError;
use crate::types::{Mechanic, StructureKind, StructureRole, UpgradeEffect, UpgradeId, UpgradeState};

// ============================================================================
// StructureCatalog
// ============================================================================

/// One buildable structure kind. `output` is the per-unit base yield for the
/// role (energy, compute or oxygen); `drain` is per-unit energy drawn each sol.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct StructureSpec {
    pub kind: StructureKind,
    pub cost: f64,
    pub role: StructureRole,
    pub output: f64,
    pub drain: f64,
}

#[derive(Debug, Clone)]
pub struct StructureCatalog {
    entries: BTreeMap<StructureKind, StructureSpec>,
}

impl StructureCatalog {
    /// Every kind must appear exactly once, with a positive cost and
    /// non-negative rates.
    pub fn from_specs(specs: &[StructureSpec]) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for spec in specs {
            if !(spec.cost.is_finite() && spec.cost > 0.0) {
                return Err(ConfigError::NonPositiveCost {
                    item: spec.kind.to_string(),
                    cost: spec.cost,
                });
            }
            for rate in [spec.output, spec.drain] {
                if !(rate.is_finite() && rate >= 0.0) {
                    return Err(ConfigError::InvalidRate {
                        kind: spec.kind,
                        rate,
                    });
                }
            }
            if spec.role == StructureRole::PowerSource && spec.drain > 0.0 {
                return Err(ConfigError::InvalidRate {
                    kind: spec.kind,
                    rate: spec.drain,
                });
            }
            if entries.insert(spec.kind, spec.clone()).is_some() {
                return Err(ConfigError::DuplicateStructure(spec.kind));
            }
        }

        if let Some(missing) = StructureKind::all().find(|k| !entries.contains_key(k)) {
            return Err(ConfigError::MissingStructure(missing));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, kind: StructureKind) -> &StructureSpec {
        &self.entries[&kind]
    }

    pub fn cost(&self, kind: StructureKind) -> f64 {
        self.get(kind).cost
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructureSpec> {
        self.entries.values()
    }

    /// Total units of a role across the given structure counts.
    pub fn units_with_role(&self, counts: &BTreeMap<StructureKind, u32>, role: StructureRole) -> u32 {
        counts
            .iter()
            .filter(|(kind, _)| self.get(**kind).role == role)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Sum of `count * output` over structures with the given role.
    pub fn base_output(&self, counts: &BTreeMap<StructureKind, u32>, role: StructureRole) -> f64 {
        counts
            .iter()
            .map(|(kind, count)| (self.get(*kind), *count))
            .filter(|(spec, _)| spec.role == role)
            .map(|(spec, count)| f64::from(count) * spec.output)
            .sum()
    }

    /// Energy drawn by all structures in one sol.
    pub fn energy_drain(&self, counts: &BTreeMap<StructureKind, u32>) -> f64 {
        counts
            .iter()
            .map(|(kind, count)| f64::from(*count) * self.get(*kind).drain)
            .sum()
    }
}

// ============================================================================
// UpgradeGraph
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct UpgradeSpec {
    pub id: UpgradeId,
    pub cost: f64,
    /// `None` marks a root.
    pub parent: Option<UpgradeId>,
    #[serde(default)]
    pub effect: Option<UpgradeEffect>,
    #[serde(default)]
    pub victory: bool,
}

/// Forest of upgrades linked by single-parent prerequisite edges.
#[derive(Debug, Clone)]
pub struct UpgradeGraph {
    nodes: BTreeMap<UpgradeId, UpgradeSpec>,
    victory: UpgradeId,
}

impl UpgradeGraph {
    pub fn from_specs(specs: &[UpgradeSpec]) -> Result<Self, ConfigError> {
        let mut nodes = BTreeMap::new();
        let mut victory: Option<UpgradeId> = None;

        for spec in specs {
            if !(spec.cost.is_finite() && spec.cost > 0.0) {
                return Err(ConfigError::NonPositiveCost {
                    item: spec.id.to_string(),
                    cost: spec.cost,
                });
            }
            validate_effect(spec)?;
            if spec.victory {
                if let Some(first) = victory {
                    return Err(ConfigError::MultipleVictoryConditions {
                        first,
                        second: spec.id,
                    });
                }
                victory = Some(spec.id);
            }
            if nodes.insert(spec.id, spec.clone()).is_some() {
                return Err(ConfigError::DuplicateUpgrade(spec.id));
            }
        }

        if let Some(missing) = UpgradeId::all().find(|id| !nodes.contains_key(id)) {
            return Err(ConfigError::MissingUpgrade(missing));
        }
        for spec in nodes.values() {
            if let Some(parent) = spec.parent {
                if !nodes.contains_key(&parent) {
                    return Err(ConfigError::UnknownParent {
                        upgrade: spec.id,
                        parent,
                    });
                }
            }
        }
        // A chain longer than the node count must revisit a node.
        for start in nodes.keys() {
            let mut cursor = nodes[start].parent;
            let mut steps = 0;
            while let Some(id) = cursor {
                steps += 1;
                if steps > nodes.len() {
                    return Err(ConfigError::PrerequisiteCycle(*start));
                }
                cursor = nodes[&id].parent;
            }
        }

        let victory = victory.ok_or(ConfigError::NoVictoryCondition)?;
        Ok(Self { nodes, victory })
    }

    pub fn node(&self, id: UpgradeId) -> &UpgradeSpec {
        &self.nodes[&id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpgradeSpec> {
        self.nodes.values()
    }

    /// True iff the node is a root or its parent is already unlocked.
    pub fn is_unlockable(&self, id: UpgradeId, unlocked: &BTreeSet<UpgradeId>) -> bool {
        match self.node(id).parent {
            None => true,
            Some(parent) => unlocked.contains(&parent),
        }
    }

    pub fn availability(&self, id: UpgradeId, unlocked: &BTreeSet<UpgradeId>) -> UpgradeState {
        if unlocked.contains(&id) {
            UpgradeState::Researched
        } else if self.is_unlockable(id, unlocked) {
            UpgradeState::Available
        } else {
            UpgradeState::Locked
        }
    }

    pub fn victory_condition(&self) -> UpgradeId {
        self.victory
    }

    pub fn is_victory(&self, id: UpgradeId) -> bool {
        id == self.victory
    }

    /// Effects carried by the unlocked nodes.
    pub fn effects<'a>(
        &'a self,
        unlocked: &'a BTreeSet<UpgradeId>,
    ) -> impl Iterator<Item = UpgradeEffect> + 'a {
        unlocked.iter().filter_map(|id| self.node(*id).effect)
    }
}

/// Multipliers scale solar output or compute yield; flat bonuses add energy.
fn validate_effect(spec: &UpgradeSpec) -> Result<(), ConfigError> {
    let invalid = |reason| {
        Err(ConfigError::InvalidEffect {
            upgrade: spec.id,
            reason,
        })
    };
    match spec.effect {
        None => Ok(()),
        Some(UpgradeEffect::Multiplier { mechanic, factor }) => {
            if mechanic == Mechanic::EnergyProduction {
                invalid("energy production only takes a flat bonus")
            } else if !(factor.is_finite() && factor > 0.0) {
                invalid("multiplier must be positive")
            } else {
                Ok(())
            }
        }
        Some(UpgradeEffect::FlatBonus { mechanic, amount }) => {
            if mechanic != Mechanic::EnergyProduction {
                invalid("only energy production takes a flat bonus")
            } else if !(amount.is_finite() && amount >= 0.0) {
                invalid("flat bonus must be non-negative")
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColonyConfig;

    fn builtin_upgrades() -> Vec<UpgradeSpec> {
        ColonyConfig::builtin().upgrades
    }

    #[test]
    fn root_is_unlockable_from_nothing() {
        let graph = UpgradeGraph::from_specs(&builtin_upgrades()).unwrap();
        let none = BTreeSet::new();
        assert!(graph.is_unlockable(UpgradeId::PerovskiteCells, &none));
        assert!(!graph.is_unlockable(UpgradeId::NuclearReactor, &none));
        assert!(!graph.is_unlockable(UpgradeId::Terraforming, &none));
    }

    #[test]
    fn availability_follows_parents() {
        let graph = UpgradeGraph::from_specs(&builtin_upgrades()).unwrap();
        let unlocked: BTreeSet<_> = [UpgradeId::PerovskiteCells].into_iter().collect();

        assert_eq!(
            graph.availability(UpgradeId::PerovskiteCells, &unlocked),
            UpgradeState::Researched
        );
        assert_eq!(
            graph.availability(UpgradeId::QuantumAsics, &unlocked),
            UpgradeState::Available
        );
        assert_eq!(
            graph.availability(UpgradeId::NuclearReactor, &unlocked),
            UpgradeState::Available
        );
        assert_eq!(
            graph.availability(UpgradeId::Terraforming, &unlocked),
            UpgradeState::Locked
        );
    }

    #[test]
    fn missing_victory_is_rejected() {
        let mut specs = builtin_upgrades();
        for spec in &mut specs {
            spec.victory = false;
        }
        let err = UpgradeGraph::from_specs(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::NoVictoryCondition), "got {err}");
    }

    #[test]
    fn cycle_is_rejected() {
        let mut specs = builtin_upgrades();
        specs[0].parent = Some(UpgradeId::Terraforming);
        let err = UpgradeGraph::from_specs(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::PrerequisiteCycle(_)), "got {err}");
    }

    #[test]
    fn duplicate_structure_is_rejected() {
        let mut specs = ColonyConfig::builtin().structures;
        specs.push(specs[0].clone());
        let err = StructureCatalog::from_specs(&specs).unwrap_err();
        assert!(
            matches!(err, ConfigError::DuplicateStructure(StructureKind::SolarArray)),
            "got {err}"
        );
    }

    #[test]
    fn missing_structure_is_rejected() {
        let mut specs = ColonyConfig::builtin().structures;
        specs.retain(|s| s.kind != StructureKind::HabModule);
        let err = StructureCatalog::from_specs(&specs).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingStructure(StructureKind::HabModule)),
            "got {err}"
        );
    }

    #[test]
    fn flat_bonus_on_solar_is_rejected() {
        let mut specs = builtin_upgrades();
        specs[0].effect = Some(UpgradeEffect::FlatBonus {
            mechanic: Mechanic::SolarOutput,
            amount: 10.0,
        });
        let err = UpgradeGraph::from_specs(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEffect { .. }), "got {err}");
    }

    #[test]
    fn drain_sums_over_builtin_start() {
        let config = ColonyConfig::builtin();
        let catalog = StructureCatalog::from_specs(&config.structures).unwrap();
        // 1 data center (100) + 1 scrubber (50) + 1 hab (20)
        assert_eq!(catalog.energy_drain(&config.start.structures), 170.0);
        assert_eq!(
            catalog.units_with_role(&config.start.structures, StructureRole::PowerSource),
            2
        );
        assert_eq!(
            catalog.base_output(&config.start.structures, StructureRole::PowerSource),
            300.0
        );
    }
}
