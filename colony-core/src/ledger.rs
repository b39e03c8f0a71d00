use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::StartingLedger;
use crate::types::{ColonyStatus, StructureKind, UpgradeId};

/// Oxygen each colonist breathes per sol.
pub const OXYGEN_PER_COLONIST: f64 = 2.0;

// ============================================================================
// ResourceLedger - The full mutable state of one colony
// ============================================================================

/// Owned by exactly one session. Mutated only by the controller and the
/// turn engine; replaced wholesale on restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ResourceLedger {
    pub day: u32,
    pub cash: f64,
    pub oxygen: f64,
    pub energy: f64,
    pub population: u32,
    pub engineers: u32,
    pub scientists: u32,
    pub structures: BTreeMap<StructureKind, u32>,
    pub unlocked: BTreeSet<UpgradeId>,
    pub land_capacity: u32,
    pub market_price: f64,
    pub event_log: Vec<String>,
    pub status: ColonyStatus,
}

impl ResourceLedger {
    pub fn new(start: &StartingLedger) -> Self {
        let mut structures: BTreeMap<StructureKind, u32> =
            StructureKind::all().map(|k| (k, 0)).collect();
        structures.extend(start.structures.iter().map(|(k, n)| (*k, *n)));

        let engineers = start.engineers.min(start.population);
        let mut ledger = Self {
            day: start.day,
            cash: start.cash,
            oxygen: start.oxygen,
            energy: start.energy,
            population: start.population,
            engineers,
            scientists: start.population - engineers,
            structures,
            unlocked: start.unlocked.clone(),
            land_capacity: start.land_capacity,
            market_price: start.market_price,
            event_log: Vec::new(),
            status: ColonyStatus::Active,
        };
        ledger.log(start.day, &start.opening_log);
        if ledger.population == 0 {
            ledger.status = ColonyStatus::Lost;
        }
        ledger
    }

    pub fn count(&self, kind: StructureKind) -> u32 {
        self.structures.get(&kind).copied().unwrap_or(0)
    }

    /// Saturates at `u32::MAX`, which no valid land capacity exceeds.
    pub fn total_structures(&self) -> u32 {
        self.structures
            .values()
            .fold(0u32, |total, n| total.saturating_add(*n))
    }

    pub fn is_active(&self) -> bool {
        self.status == ColonyStatus::Active
    }

    /// Reassign the workforce. Clamped to the current population.
    pub fn assign_engineers(&mut self, engineers: u32) {
        self.engineers = engineers.min(self.population);
        self.scientists = self.population - self.engineers;
    }

    /// Remove up to `count` colonists, keeping the engineer assignment where
    /// possible. Returns how many were actually removed.
    pub fn remove_colonists(&mut self, count: u32) -> u32 {
        let removed = count.min(self.population);
        self.population -= removed;
        self.assign_engineers(self.engineers);
        removed
    }

    /// Append a `Sol {day}: {message}` line.
    pub fn log(&mut self, day: u32, message: impl fmt::Display) {
        self.event_log.push(format!("Sol {day}: {message}"));
    }

    /// The entry surfaced live by the ticker.
    pub fn last_event(&self) -> Option<&str> {
        self.event_log.last().map(String::as_str)
    }

    /// Oxygen remaining after one sol of breathing with no production.
    pub fn oxygen_delta(&self) -> f64 {
        self.oxygen - f64::from(self.population) * OXYGEN_PER_COLONIST
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColonyConfig;

    fn fresh() -> ResourceLedger {
        ResourceLedger::new(&ColonyConfig::builtin().start)
    }

    #[test]
    fn new_ledger_is_seeded_from_start() {
        let ledger = fresh();
        assert_eq!(ledger.day, 1);
        assert_eq!(ledger.population, 10);
        assert_eq!(ledger.engineers + ledger.scientists, ledger.population);
        assert_eq!(ledger.count(StructureKind::SolarArray), 2);
        assert_eq!(ledger.total_structures(), 5);
        assert!(ledger.is_active());
        assert_eq!(
            ledger.last_event(),
            Some("Sol 1: Colony Established. Systems Nominal.")
        );
    }

    #[test]
    fn assign_engineers_clamps_to_population() {
        let mut ledger = fresh();
        ledger.assign_engineers(25);
        assert_eq!(ledger.engineers, 10);
        assert_eq!(ledger.scientists, 0);

        ledger.assign_engineers(0);
        assert_eq!(ledger.engineers, 0);
        assert_eq!(ledger.scientists, 10);
    }

    #[test]
    fn removing_colonists_keeps_split_consistent() {
        let mut ledger = fresh();
        ledger.assign_engineers(9);
        assert_eq!(ledger.remove_colonists(3), 3);
        assert_eq!(ledger.population, 7);
        assert_eq!(ledger.engineers, 7);
        assert_eq!(ledger.scientists, 0);

        assert_eq!(ledger.remove_colonists(10), 7);
        assert_eq!(ledger.population, 0);
        assert_eq!(ledger.engineers + ledger.scientists, 0);
    }

    #[test]
    fn total_structures_saturates() {
        let mut ledger = fresh();
        ledger.structures.insert(StructureKind::SolarArray, u32::MAX);
        assert_eq!(ledger.total_structures(), u32::MAX);
    }

    #[test]
    fn oxygen_delta_counts_breathing() {
        let ledger = fresh();
        assert_eq!(ledger.oxygen_delta(), 800.0 - 20.0);
    }
}
