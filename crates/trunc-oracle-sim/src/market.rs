//! In-memory market driven by a scenario

use parking_lot::RwLock;
use trunc_oracle::constants::{MAX_TICK, MIN_TICK};
use trunc_oracle::{LiveMarketState, MarketId, MarketStateProvider, OracleResult};

/// Pool stand-in whose tick and liquidity the scenario sets directly
#[derive(Debug, Default)]
pub struct SimulatedMarket {
    live: RwLock<LiveMarketState>,
}

impl SimulatedMarket {
    pub fn new(tick: i32, liquidity: u128) -> Self {
        Self {
            live: RwLock::new(LiveMarketState { tick, liquidity }),
        }
    }

    pub fn tick(&self) -> i32 {
        self.live.read().tick
    }

    pub fn liquidity(&self) -> u128 {
        self.live.read().liquidity
    }

    /// Move the price to `tick`, clamped to the valid tick range
    pub fn set_tick(&self, tick: i32) {
        self.live.write().tick = tick.clamp(MIN_TICK, MAX_TICK);
    }

    /// Move the price by `delta` ticks
    pub fn move_by(&self, delta: i32) {
        let mut live = self.live.write();
        live.tick = live.tick.saturating_add(delta).clamp(MIN_TICK, MAX_TICK);
    }

    pub fn set_liquidity(&self, liquidity: u128) {
        self.live.write().liquidity = liquidity;
    }
}

impl MarketStateProvider for SimulatedMarket {
    fn live_state(&self, _market: &MarketId) -> OracleResult<LiveMarketState> {
        Ok(*self.live.read())
    }
}
