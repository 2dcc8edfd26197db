//! # Truncated Oracle Service
//!
//! Owns the per-market state and enforces the call discipline around it:
//! - Every mutating entry point of a market runs inside that market's write
//!   section. Writers from other threads wait on the market's gate, a
//!   re-entrant call from the same call stack is rejected.
//! - Collaborators are called before the market state lock is taken and
//!   notifications are delivered after it is released, so a provider or sink
//!   may always read the oracle.
//! - Every check runs before the first mutation; a failed call leaves the
//!   market untouched.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use crate::config::OracleConfig;
use crate::constants::{MAX_TICK, MIN_TICK};
use crate::error::{OracleError, OracleResult};
use crate::events::{EventSink, OracleEvent, TracingEventSink};
use crate::interfaces::{Clock, Identity, MarketId, MarketStateProvider, PolicyStore};
use crate::state::{
    CachedPolicy, ControllerState, MarketState, Observation, ObservationState, ReentrancyStatus,
    ScopedReentrancyGuard,
};

/// Storage of one enabled market
pub(crate) struct MarketSlot {
    write_gate: ReentrantMutex<Cell<ReentrancyStatus>>,
    pub(crate) state: RwLock<MarketState>,
}

impl MarketSlot {
    pub(crate) fn new(state: MarketState) -> Self {
        Self {
            write_gate: ReentrantMutex::new(Cell::new(ReentrancyStatus::Unlocked)),
            state: RwLock::new(state),
        }
    }
}

/// Multi-market truncated oracle
pub struct TruncOracle {
    pub(crate) config: OracleConfig,
    pub(crate) markets: RwLock<HashMap<MarketId, Arc<MarketSlot>>>,
    pub(crate) provider: Arc<dyn MarketStateProvider>,
    pub(crate) policy_store: Arc<dyn PolicyStore>,
    pub(crate) clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl TruncOracle {
    /// Create an oracle that logs its notifications through `tracing`
    pub fn new(
        config: OracleConfig,
        provider: Arc<dyn MarketStateProvider>,
        policy_store: Arc<dyn PolicyStore>,
        clock: Arc<dyn Clock>,
    ) -> OracleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            markets: RwLock::new(HashMap::new()),
            provider,
            policy_store,
            clock,
            events: Arc::new(TracingEventSink),
        })
    }

    /// Deliver notifications to `events` instead
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_enabled(&self, market: &MarketId) -> bool {
        self.markets.read().contains_key(market)
    }

    /// Markets enabled so far, in no particular order
    pub fn markets(&self) -> Vec<MarketId> {
        self.markets.read().keys().copied().collect()
    }

    pub fn latest_observation(&self, market: &MarketId) -> OracleResult<Observation> {
        self.read_state(market, |state| state.book.latest())
    }

    pub fn max_ticks_per_block(&self, market: &MarketId) -> OracleResult<u32> {
        self.read_state(market, |state| Ok(state.controller.max_ticks_per_block))
    }

    pub fn observation_state(&self, market: &MarketId) -> OracleResult<ObservationState> {
        self.read_state(market, |state| Ok(state.book.state()))
    }

    pub fn cached_policy(&self, market: &MarketId) -> OracleResult<CachedPolicy> {
        self.read_state(market, |state| Ok(state.policy))
    }

    /// Current value of the capping frequency accumulator
    pub fn cap_frequency(&self, market: &MarketId) -> OracleResult<u64> {
        self.read_state(market, |state| Ok(state.controller.cap_freq))
    }

    pub fn controller_state(&self, market: &MarketId) -> OracleResult<ControllerState> {
        self.read_state(market, |state| Ok(state.controller))
    }

    /// Borsh snapshot of a market's persisted state
    pub fn export_market(&self, market: &MarketId) -> OracleResult<Vec<u8>> {
        self.read_state(market, |state| state.to_snapshot())
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    pub(crate) fn slot(&self, market: &MarketId) -> OracleResult<Arc<MarketSlot>> {
        self.markets
            .read()
            .get(market)
            .cloned()
            .ok_or(OracleError::MarketNotEnabled(*market))
    }

    /// Run `read` against a consistent snapshot of the market
    pub(crate) fn read_state<T>(
        &self,
        market: &MarketId,
        read: impl FnOnce(&MarketState) -> OracleResult<T>,
    ) -> OracleResult<T> {
        let slot = self.slot(market)?;
        let state = slot.state.read();
        read(&state)
    }

    /// Run `body` inside the market's write section and deliver the
    /// notifications it returns once the section's state lock is released.
    pub(crate) fn write_section<T>(
        &self,
        market: &MarketId,
        body: impl FnOnce(&RwLock<MarketState>) -> OracleResult<(T, Vec<OracleEvent>)>,
    ) -> OracleResult<T> {
        let slot = self.slot(market)?;
        let gate = slot.write_gate.lock();
        let mut guard = ScopedReentrancyGuard::new(&gate, market)?;

        let (value, events) = body(&slot.state)?;

        guard.enter_notify_phase()?;
        self.emit_all(&events);
        Ok(value)
    }

    pub(crate) fn emit_all(&self, events: &[OracleEvent]) {
        for event in events {
            self.events.emit(event);
        }
    }

    pub(crate) fn ensure_update_source(&self, caller: &Identity) -> OracleResult<()> {
        if caller != &self.config.update_source {
            tracing::warn!(%caller, "rejected call from non update source");
            return Err(OracleError::NotUpdateSource {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_governance(&self, caller: &Identity) -> OracleResult<()> {
        if caller != &self.config.governance {
            tracing::warn!(%caller, "rejected governance call");
            return Err(OracleError::NotGovernance {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn now(&self) -> u32 {
        self.clock.block_timestamp()
    }
}

pub(crate) fn validate_tick(tick: i32) -> OracleResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(OracleError::TickOutOfRange(tick));
    }
    Ok(())
}
