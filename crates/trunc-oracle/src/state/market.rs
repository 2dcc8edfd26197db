//! Per-market oracle state and its snapshot encoding

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};
use crate::state::{CachedPolicy, ControllerState, ObservationBook};

/// Everything the oracle persists for one market
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MarketState {
    pub book: ObservationBook,
    pub policy: CachedPolicy,
    pub controller: ControllerState,
}

impl MarketState {
    /// Encode as a borsh snapshot
    pub fn to_snapshot(&self) -> OracleResult<Vec<u8>> {
        Ok(self.try_to_vec()?)
    }

    /// Decode and validate a borsh snapshot
    pub fn from_snapshot(bytes: &[u8]) -> OracleResult<Self> {
        let state = Self::try_from_slice(bytes)?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> OracleResult<()> {
        self.book.validate()?;
        self.policy.validate()?;
        let cap = self.controller.max_ticks_per_block;
        if cap != self.policy.clamp_cap(cap) {
            return Err(OracleError::InvalidSnapshot("cap outside policy bounds"));
        }
        Ok(())
    }
}
