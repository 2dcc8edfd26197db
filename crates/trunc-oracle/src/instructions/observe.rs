//! Read-only TWAP queries

use crate::error::OracleResult;
use crate::interfaces::MarketId;
use crate::logic::twap::{self, ConsultResult, ObserveResult};
use crate::oracle::TruncOracle;

impl TruncOracle {
    /// Tick and seconds-per-liquidity cumulatives `seconds_agos[i]` seconds
    /// before the current block time
    pub fn observe(&self, market: &MarketId, seconds_agos: &[u32]) -> OracleResult<ObserveResult> {
        let slot = self.slot(market)?;
        let live = self.provider.live_state(market)?;

        let state = slot.state.read();
        let now = self.now();
        twap::observe(&state.book, now, seconds_agos, live.tick, live.liquidity)
    }

    /// Arithmetic mean tick and harmonic mean liquidity over the last
    /// `seconds_ago` seconds
    pub fn consult(&self, market: &MarketId, seconds_ago: u32) -> OracleResult<ConsultResult> {
        let slot = self.slot(market)?;
        let live = self.provider.live_state(market)?;

        let state = slot.state.read();
        let now = self.now();
        twap::consult(&state.book, now, seconds_ago, live.tick, live.liquidity)
    }
}
