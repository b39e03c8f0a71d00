//! Sol resolution: the turn engine.
//!
//! One sol runs in a fixed order, each step consuming the previous step's
//! output: modifiers, energy production, energy drain, power gate,
//! compute and oxygen production, life support, loss check, economics.
//! A batch of sols is a strict sequential chain and halts early on loss.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;

use crate::catalog::UpgradeGraph;
use crate::config::Rules;
use crate::ledger::{OXYGEN_PER_COLONIST, ResourceLedger};
use crate::mortality::roll_suffocation_deaths;
use crate::types::{ColonyStatus, Mechanic, Strategy, StructureRole, UpgradeEffect, UpgradeId};

// === CONSTANTS ===

/// Grid efficiency with no engineers on the arrays.
pub const GRID_BASE_EFFICIENCY: f64 = 0.5;
/// Efficiency added at full engineer coverage.
pub const ENGINEER_TRIM: f64 = 0.7;
/// Compute bonus per assigned scientist.
pub const SCIENTIST_BONUS: f64 = 0.1;
/// Market price is quoted per this many compute units.
pub const PRICE_SCALE: f64 = 1e8;
/// Cash earned per compute unit at a price of `PRICE_SCALE`.
pub const REVENUE_PER_UNIT: f64 = 1000.0;

// === MODIFIERS ===

/// Upgrade effects in force for one sol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub solar_mult: f64,
    pub crypto_mult: f64,
    pub energy_bonus: f64,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            solar_mult: 1.0,
            crypto_mult: 1.0,
            energy_bonus: 0.0,
        }
    }
}

/// Look up the effects of the unlocked upgrades. Each mechanic has at most
/// one effect-bearing node in a valid graph.
pub fn resolve_modifiers(graph: &UpgradeGraph, unlocked: &BTreeSet<UpgradeId>) -> Modifiers {
    graph
        .effects(unlocked)
        .fold(Modifiers::default(), |mut mods, effect| {
            match effect {
                UpgradeEffect::Multiplier {
                    mechanic: Mechanic::SolarOutput,
                    factor,
                } => mods.solar_mult *= factor,
                UpgradeEffect::Multiplier {
                    mechanic: Mechanic::ComputeYield,
                    factor,
                } => mods.crypto_mult *= factor,
                UpgradeEffect::FlatBonus { amount, .. } => mods.energy_bonus += amount,
                // Rejected when the graph is built.
                UpgradeEffect::Multiplier {
                    mechanic: Mechanic::EnergyProduction,
                    ..
                } => {}
            }
            mods
        })
}

/// Efficiency of the solar grid given engineer coverage of the arrays.
///
/// Coverage is `min(1, engineers / arrays)`, or 1 with no arrays, so the
/// result lies in `[0.5, 1.2]`.
pub fn grid_efficiency(engineers: u32, arrays: u32) -> f64 {
    let coverage = if arrays > 0 {
        (f64::from(engineers) / f64::from(arrays)).min(1.0)
    } else {
        1.0
    };
    GRID_BASE_EFFICIENCY + ENGINEER_TRIM * coverage
}

// === EVENTS ===

/// Notable things that happen during a sol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnEvent {
    Blackout,
    Suffocation { deaths: u32 },
    ColonyLost,
    ComputeSold { revenue: f64 },
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::Blackout => f.write_str("BLACKOUT! Systems offline."),
            TurnEvent::Suffocation { deaths } => {
                write!(f, "CRITICAL FAILURE: {deaths} colonists suffocated.")
            }
            TurnEvent::ColonyLost => f.write_str("MISSION FAILED: Colony lost."),
            TurnEvent::ComputeSold { revenue } => {
                write!(f, "Sold compute for ${}", whole_dollars(*revenue))
            }
        }
    }
}

/// Truncate to whole dollars with thousands separators.
pub fn whole_dollars(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if whole < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// === SOL RESOLUTION ===

/// Figures from one resolved sol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolReport {
    pub day: u32,
    pub energy_produced: f64,
    pub energy_drain: f64,
    pub net_energy: f64,
    pub has_power: bool,
    pub compute: f64,
    pub oxygen_generated: f64,
    pub oxygen_consumed: f64,
    pub deaths: u32,
    pub revenue: f64,
    pub lost: bool,
}

/// Resolve one sol against the ledger.
///
/// `verbose` controls whether blackout, suffocation and sale events are
/// written to the event log; batches pass `false` to keep the log readable.
/// Colony loss is always logged.
pub fn resolve_sol<R: Rng>(
    ledger: &mut ResourceLedger,
    rules: &Rules,
    strategy: Strategy,
    verbose: bool,
    rng: &mut R,
) -> SolReport {
    let catalog = &rules.catalog;
    let sol = ledger.day + 1;
    let mut report = SolReport {
        day: sol,
        ..SolReport::default()
    };

    // 1. Modifiers
    let mods = resolve_modifiers(&rules.upgrades, &ledger.unlocked);

    // 2. Energy production
    let arrays = catalog.units_with_role(&ledger.structures, StructureRole::PowerSource);
    let efficiency = grid_efficiency(ledger.engineers, arrays);
    let solar_output = catalog.base_output(&ledger.structures, StructureRole::PowerSource)
        * efficiency
        * mods.solar_mult;
    report.energy_produced = solar_output + mods.energy_bonus;

    // 3. Energy drain
    report.energy_drain = catalog.energy_drain(&ledger.structures);
    report.net_energy = report.energy_produced - report.energy_drain;
    ledger.energy = (ledger.energy + report.net_energy).clamp(0.0, rules.limits.energy_cap);

    // 4. Power gate
    report.has_power = ledger.energy > 0.0;
    if !report.has_power && verbose {
        ledger.log(sol, TurnEvent::Blackout);
    }
    let ops_mult = if report.has_power { 1.0 } else { 0.0 };

    // 5. Compute and oxygen production
    let scientist_bonus = 1.0 + SCIENTIST_BONUS * f64::from(ledger.scientists);
    report.compute = catalog.base_output(&ledger.structures, StructureRole::ConsumerCompute)
        * scientist_bonus
        * ops_mult;
    report.oxygen_generated =
        catalog.base_output(&ledger.structures, StructureRole::ConsumerLifeSupport) * ops_mult;

    // 6. Life support
    report.oxygen_consumed = f64::from(ledger.population) * OXYGEN_PER_COLONIST;
    ledger.oxygen += report.oxygen_generated - report.oxygen_consumed;
    if ledger.oxygen <= 0.0 {
        ledger.oxygen = 0.0;
        let rolled = roll_suffocation_deaths(rng);
        report.deaths = ledger.remove_colonists(rolled);
        if verbose {
            ledger.log(
                sol,
                TurnEvent::Suffocation {
                    deaths: report.deaths,
                },
            );
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "suffocation",
            day = sol,
            rolled = rolled,
            deaths = report.deaths,
            population = ledger.population,
        );
    }

    // 7. Loss check
    if ledger.population == 0 {
        ledger.status = ColonyStatus::Lost;
        ledger.log(sol, TurnEvent::ColonyLost);
        ledger.day = sol;
        report.lost = true;

        #[cfg(feature = "instrument")]
        tracing::info!(target: "colony_lost", day = sol);

        return report;
    }

    // 8. Economics
    if strategy == Strategy::Sell {
        report.revenue =
            report.compute * (ledger.market_price / PRICE_SCALE) * REVENUE_PER_UNIT * mods.crypto_mult;
        ledger.cash += report.revenue;
        if verbose {
            ledger.log(
                sol,
                TurnEvent::ComputeSold {
                    revenue: report.revenue,
                },
            );
        }
    }

    // 9. Advance the calendar
    ledger.day = sol;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "sol",
        day = sol,
        energy = ledger.energy,
        net_energy = report.net_energy,
        has_power = report.has_power,
        oxygen = ledger.oxygen,
        population = ledger.population,
        compute = report.compute,
        revenue = report.revenue,
        cash = ledger.cash,
    );

    report
}

/// Advance the ledger by up to `days` sols at its current market price.
///
/// Returns the number of sols actually resolved: zero if the colony is
/// already lost or won, fewer than `days` if it is lost mid-batch.
pub fn advance<R: Rng>(
    ledger: &mut ResourceLedger,
    rules: &Rules,
    days: u32,
    strategy: Strategy,
    rng: &mut R,
) -> u32 {
    if !ledger.is_active() {
        return 0;
    }

    let verbose = days == 1;
    let mut processed = 0;
    for _ in 0..days {
        resolve_sol(ledger, rules, strategy, verbose, rng);
        processed += 1;
        if !ledger.is_active() {
            break;
        }
    }
    processed
}
