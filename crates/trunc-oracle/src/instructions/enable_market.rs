//! Bootstrap a market

use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::error::{OracleError, OracleResult};
use crate::events::OracleEvent;
use crate::interfaces::{Identity, MarketId};
use crate::oracle::{validate_tick, MarketSlot, TruncOracle};
use crate::state::{CachedPolicy, ControllerState, MarketState, ObservationBook};

impl TruncOracle {
    /// Enable `market`: load and validate its policy, write the bootstrap
    /// observation from the live market state and set the initial cap.
    ///
    /// Fails with `MarketAlreadyEnabled` on every call after the first.
    pub fn enable_market(&self, caller: &Identity, market: &MarketId) -> OracleResult<()> {
        self.ensure_update_source(caller)?;
        if self.is_enabled(market) {
            return Err(OracleError::MarketAlreadyEnabled(*market));
        }

        let now = self.now();
        let live = self.provider.live_state(market)?;
        validate_tick(live.tick)?;

        let policy = CachedPolicy::load(
            self.policy_store.as_ref(),
            market,
            &self.config.policy_defaults,
            0,
        )?;
        let cap = policy.clamp_cap(policy.initial_cap);

        let mut book = ObservationBook::new();
        book.initialize(now, live.tick, live.liquidity)?;
        let cardinality_next = book.grow(self.config.initial_cardinality_next as u32)?;

        let state = MarketState {
            book,
            policy,
            controller: ControllerState::new(cap, now),
        };

        match self.markets.write().entry(*market) {
            Entry::Occupied(_) => return Err(OracleError::MarketAlreadyEnabled(*market)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(MarketSlot::new(state)));
            }
        }

        tracing::info!(
            %market,
            tick = live.tick,
            liquidity = live.liquidity,
            cap,
            cardinality_next,
            "market enabled"
        );
        self.emit_all(&[OracleEvent::OracleConfigured {
            market: *market,
            timestamp: now,
            tick: live.tick,
            liquidity: live.liquidity,
            max_ticks_per_block: cap,
            cardinality_next,
        }]);

        Ok(())
    }
}
