//! Governance entry points

use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::error::{OracleError, OracleResult};
use crate::events::{CapUpdateReason, OracleEvent};
use crate::interfaces::{Identity, MarketId};
use crate::oracle::{MarketSlot, TruncOracle};
use crate::state::{CachedPolicy, MarketState};

impl TruncOracle {
    /// Re-read the market's policy from the store and re-clamp the cap into
    /// the new bounds. Returns the new snapshot.
    pub fn refresh_policy(&self, caller: &Identity, market: &MarketId) -> OracleResult<CachedPolicy> {
        self.ensure_governance(caller)?;

        self.write_section(market, |state| {
            let version = state.read().policy.version.wrapping_add(1);
            let policy = CachedPolicy::load(
                self.policy_store.as_ref(),
                market,
                &self.config.policy_defaults,
                version,
            )?;

            let mut state = state.write();
            state.policy = policy;
            let old_cap = state.controller.max_ticks_per_block;
            let new_cap = policy.clamp_cap(old_cap);
            state.controller.max_ticks_per_block = new_cap;
            drop(state);

            tracing::info!(
                %market,
                version,
                min_cap = policy.min_cap,
                max_cap = policy.max_cap,
                "policy refreshed"
            );

            let mut events = vec![OracleEvent::PolicyRefreshed {
                market: *market,
                version,
                min_cap: policy.min_cap,
                max_cap: policy.max_cap,
            }];
            if new_cap != old_cap {
                events.push(OracleEvent::CapUpdated {
                    market: *market,
                    old_cap,
                    new_cap,
                    reason: CapUpdateReason::PolicyClamp,
                });
            }
            Ok((policy, events))
        })
    }

    /// Pause or resume automatic retuning. The frequency accumulator keeps
    /// counting while paused.
    pub fn set_auto_tune_paused(
        &self,
        caller: &Identity,
        market: &MarketId,
        paused: bool,
    ) -> OracleResult<()> {
        self.ensure_governance(caller)?;

        self.write_section(market, |state| {
            state.write().controller.auto_tune_paused = paused;
            tracing::info!(%market, paused, "auto-tune pause changed");
            Ok(((), vec![OracleEvent::AutoTunePaused {
                market: *market,
                paused,
            }]))
        })
    }

    /// Override the cap. The value must lie inside the cached policy bounds.
    /// Returns the previous cap.
    pub fn set_max_ticks_per_block(
        &self,
        caller: &Identity,
        market: &MarketId,
        cap: u32,
    ) -> OracleResult<u32> {
        self.ensure_governance(caller)?;

        self.write_section(market, |state| {
            let now = self.now();
            let mut state = state.write();
            let policy = state.policy;
            if cap < policy.min_cap || cap > policy.max_cap {
                return Err(OracleError::CapOutOfBounds {
                    cap,
                    min_cap: policy.min_cap,
                    max_cap: policy.max_cap,
                });
            }

            let old_cap = state.controller.max_ticks_per_block;
            state.controller.max_ticks_per_block = cap;
            // The override holds for at least one update interval
            state.controller.last_cap_update_ts = now;
            drop(state);

            tracing::info!(%market, old_cap, new_cap = cap, "cap overridden");

            let mut events = Vec::new();
            if old_cap != cap {
                events.push(OracleEvent::CapUpdated {
                    market: *market,
                    old_cap,
                    new_cap: cap,
                    reason: CapUpdateReason::ManualOverride,
                });
            }
            Ok((old_cap, events))
        })
    }

    /// Grow the market's observation capacity. Returns the resulting
    /// `cardinality_next`.
    pub fn increase_cardinality_next(
        &self,
        caller: &Identity,
        market: &MarketId,
        requested: u32,
    ) -> OracleResult<u16> {
        self.ensure_governance(caller)?;

        self.write_section(market, |state| {
            let mut state = state.write();
            let old = state.book.state().cardinality_next;
            let new = state.book.grow(requested)?;
            drop(state);

            let mut events = Vec::new();
            if new != old {
                tracing::info!(%market, old, new, "cardinality_next increased");
                events.push(OracleEvent::CardinalityNextIncreased {
                    market: *market,
                    old_cardinality_next: old,
                    new_cardinality_next: new,
                });
            }
            Ok((new, events))
        })
    }

    /// Restore a market from an exported snapshot. The market must not be
    /// enabled yet.
    pub fn import_market(
        &self,
        caller: &Identity,
        market: &MarketId,
        snapshot: &[u8],
    ) -> OracleResult<()> {
        self.ensure_governance(caller)?;
        let state = MarketState::from_snapshot(snapshot)?;
        let latest = state.book.latest()?;

        match self.markets.write().entry(*market) {
            Entry::Occupied(_) => return Err(OracleError::MarketAlreadyEnabled(*market)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(MarketSlot::new(state)));
            }
        }

        tracing::info!(%market, latest = latest.timestamp, "market imported");
        Ok(())
    }
}
