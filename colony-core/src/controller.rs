//! Player actions against a single colony.
//!
//! Every action either applies fully or is rejected with an [`ActionError`]
//! and leaves the ledger untouched. Numeric turn work is delegated to
//! [`crate::turn`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsify_next::Tsify;

use crate::catalog::StructureSpec;
use crate::config::{ColonyConfig, ConfigError, Rules};
use crate::ledger::ResourceLedger;
use crate::market::{MarketFeed, sample_price};
use crate::turn;
use crate::types::{ColonyStatus, Strategy, StructureKind, UpgradeId, UpgradeState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("insufficient funds: need ${needed:.0}, have ${available:.0}")]
    InsufficientFunds { needed: f64, available: f64 },
    #[error("not enough land: all {capacity} plots are built")]
    CapacityExceeded { capacity: u32 },
    #[error("prerequisites not met: {upgrade} requires {requires}")]
    PrerequisiteUnmet {
        upgrade: UpgradeId,
        requires: UpgradeId,
    },
    #[error("{0} is already researched")]
    AlreadyResearched(UpgradeId),
    #[error("colony is {0}; no further actions")]
    ColonyInactive(ColonyStatus),
}

/// What a batch of sols did, for the caller to render.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TurnBatchResult {
    pub ledger: ResourceLedger,
    /// Log lines appended during this batch, oldest first.
    pub events: Vec<String>,
    pub turns_processed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct UpgradeStatus {
    pub id: UpgradeId,
    pub cost: f64,
    pub parent: Option<UpgradeId>,
    pub state: UpgradeState,
    pub victory: bool,
}

/// Owns one colony's ledger for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct ColonyController {
    config: ColonyConfig,
    rules: Rules,
    ledger: ResourceLedger,
    rng: StdRng,
}

impl ColonyController {
    /// Validate the configuration and seed a fresh colony. A malformed
    /// configuration is refused here, before any turn can run.
    pub fn new(config: ColonyConfig, seed: u64) -> Result<Self, ConfigError> {
        let rules = config.compile()?;
        let ledger = ResourceLedger::new(&config.start);
        Ok(Self {
            config,
            rules,
            ledger,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn with_builtin_rules(seed: u64) -> Self {
        Self::new(ColonyConfig::builtin(), seed).expect("builtin colony config should validate")
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// The structure catalog in kind order, for build menus.
    pub fn structure_specs(&self) -> Vec<StructureSpec> {
        self.rules.catalog.iter().cloned().collect()
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// Buy one structure. Takes effect from the next sol.
    pub fn construct(&mut self, kind: StructureKind) -> Result<(), ActionError> {
        self.ensure_active()?;

        let capacity = self.ledger.land_capacity;
        if self.ledger.total_structures() >= capacity {
            return Err(ActionError::CapacityExceeded { capacity });
        }
        let cost = self.rules.catalog.cost(kind);
        self.ensure_funds(cost)?;

        self.ledger.cash -= cost;
        *self.ledger.structures.entry(kind).or_insert(0) += 1;
        self.ledger.log(self.ledger.day, format_args!("Constructed {kind}"));

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "action",
            day = self.ledger.day,
            action = "construct",
            subject = kind.label(),
            cash = self.ledger.cash,
        );

        Ok(())
    }

    /// Unlock an upgrade. Unlocking the victory node wins immediately.
    pub fn research(&mut self, id: UpgradeId) -> Result<(), ActionError> {
        self.ensure_active()?;

        if self.ledger.unlocked.contains(&id) {
            return Err(ActionError::AlreadyResearched(id));
        }
        let node = self.rules.upgrades.node(id);
        if let Some(parent) = node.parent {
            if !self.ledger.unlocked.contains(&parent) {
                return Err(ActionError::PrerequisiteUnmet {
                    upgrade: id,
                    requires: parent,
                });
            }
        }
        let cost = node.cost;
        self.ensure_funds(cost)?;

        self.ledger.cash -= cost;
        self.ledger.unlocked.insert(id);
        let day = self.ledger.day;
        self.ledger.log(day, format_args!("Researched {id}"));
        if self.rules.upgrades.is_victory(id) {
            self.ledger.status = ColonyStatus::Won;
            self.ledger.log(day, format_args!("{id} complete. Colony self-sufficient."));
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "action",
            day = day,
            action = "research",
            subject = id.label(),
            cash = self.ledger.cash,
        );

        Ok(())
    }

    /// Assign `engineers` colonists to the arrays (clamped to the
    /// population); everyone else becomes a scientist.
    pub fn set_workforce_split(&mut self, engineers: u32) {
        self.ledger.assign_engineers(engineers);
    }

    /// Sample the market once, then resolve up to `days` sols in order.
    /// A lost or won colony is left untouched and reports zero sols.
    pub fn advance_turns<F>(&mut self, days: u32, strategy: Strategy, feed: &mut F) -> TurnBatchResult
    where
        F: MarketFeed + ?Sized,
    {
        let log_start = self.ledger.event_log.len();
        let turns_processed = if self.ledger.is_active() {
            self.ledger.market_price = sample_price(feed, &self.config.market, &mut self.rng);
            turn::advance(&mut self.ledger, &self.rules, days, strategy, &mut self.rng)
        } else {
            0
        };

        TurnBatchResult {
            ledger: self.ledger.clone(),
            events: self.ledger.event_log[log_start..].to_vec(),
            turns_processed,
        }
    }

    /// Every upgrade with its research state, in graph order.
    pub fn upgrade_states(&self) -> Vec<UpgradeStatus> {
        self.rules
            .upgrades
            .iter()
            .map(|node| UpgradeStatus {
                id: node.id,
                cost: node.cost,
                parent: node.parent,
                state: self.rules.upgrades.availability(node.id, &self.ledger.unlocked),
                victory: node.victory,
            })
            .collect()
    }

    /// Discard the colony and start over from the configured seed values.
    pub fn restart(&mut self) {
        self.ledger = ResourceLedger::new(&self.config.start);
    }

    fn ensure_active(&self) -> Result<(), ActionError> {
        match self.ledger.status {
            ColonyStatus::Active => Ok(()),
            status => Err(ActionError::ColonyInactive(status)),
        }
    }

    fn ensure_funds(&self, cost: f64) -> Result<(), ActionError> {
        if self.ledger.cash < cost {
            return Err(ActionError::InsufficientFunds {
                needed: cost,
                available: self.ledger.cash,
            });
        }
        Ok(())
    }
}
