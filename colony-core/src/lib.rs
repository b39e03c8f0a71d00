use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod config;
pub mod controller;
pub mod ledger;
pub mod market;
pub mod mortality;
pub mod turn;
pub mod types;

pub use catalog::{StructureCatalog, StructureSpec, UpgradeGraph, UpgradeSpec};
pub use config::{ColonyConfig, ConfigError, Limits, MarketConfig, Rules, StartingLedger};
pub use controller::{ActionError, ColonyController, TurnBatchResult, UpgradeStatus};
pub use ledger::ResourceLedger;
pub use market::{FixedPrice, MarketFeed, MarketFetchError, OfflineFeed, sample_price};
pub use turn::{SolReport, TurnEvent};
pub use types::*;

// ============================================================================
// WASM API - Colony
// ============================================================================

/// One colony session as seen from the page. The page re-renders from
/// whatever these calls return; nothing here schedules work on its own.
#[wasm_bindgen]
pub struct Colony {
    controller: ColonyController,
}

#[wasm_bindgen]
impl Colony {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            controller: ColonyController::with_builtin_rules(seed),
        }
    }

    #[wasm_bindgen]
    pub fn construct(&mut self, kind: StructureKind) -> Result<(), JsError> {
        self.controller
            .construct(kind)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn research(&mut self, id: UpgradeId) -> Result<(), JsError> {
        self.controller
            .research(id)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn set_workforce_split(&mut self, engineers: u32) {
        self.controller.set_workforce_split(engineers);
    }

    /// Advance `days` sols. `price_feed` is called once for the batch and
    /// should return the latest reference price as a number.
    #[wasm_bindgen]
    pub fn advance(
        &mut self,
        days: u32,
        strategy: Strategy,
        price_feed: Option<js_sys::Function>,
    ) -> TurnBatchResult {
        let mut feed = JsPriceFeed(price_feed);
        self.controller.advance_turns(days, strategy, &mut feed)
    }

    /// Get a snapshot of the current ledger for rendering
    #[wasm_bindgen]
    pub fn snapshot(&self) -> ResourceLedger {
        self.controller.ledger().clone()
    }

    /// Most recent log line, for the live ticker.
    #[wasm_bindgen]
    pub fn last_event(&self) -> Option<String> {
        self.controller.ledger().last_event().map(str::to_owned)
    }

    /// Oxygen left after one sol of breathing with no production.
    #[wasm_bindgen]
    pub fn oxygen_delta(&self) -> f64 {
        self.controller.ledger().oxygen_delta()
    }

    /// Every buildable structure with its cost, role and rates, as an array.
    #[wasm_bindgen]
    pub fn structure_specs(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.controller.structure_specs())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Every upgrade with its cost and research state, as an array.
    #[wasm_bindgen]
    pub fn upgrade_states(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.controller.upgrade_states())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn restart(&mut self) {
        self.controller.restart();
    }
}

// ============================================================================
// Market feed backed by a page callback
// ============================================================================

struct JsPriceFeed(Option<js_sys::Function>);

impl MarketFeed for JsPriceFeed {
    fn latest_price(&mut self) -> Result<f64, MarketFetchError> {
        let callback = self.0.as_ref().ok_or(MarketFetchError::Unavailable)?;
        let value = callback.call0(&JsValue::NULL).map_err(|e| {
            MarketFetchError::Source(e.as_string().unwrap_or_else(|| "callback threw".into()))
        })?;
        serde_wasm_bindgen::from_value::<f64>(value)
            .map_err(|e| MarketFetchError::Source(e.to_string()))
    }
}
