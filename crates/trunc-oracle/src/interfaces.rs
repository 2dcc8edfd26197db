//! Collaborator interfaces and identifier types.
//!
//! The oracle never owns market state or governance parameters. It reads the
//! live tick and liquidity through [`MarketStateProvider`], the governed
//! parameters through [`PolicyStore`] and block time through [`Clock`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use borsh::{BorshDeserialize, BorshSerialize};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::OracleResult;
use crate::state::PolicyParam;
use crate::utils::block_timestamp;

// ============================================================================
// Identifiers
// ============================================================================

/// 32-byte market (pool) identifier
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct MarketId(pub [u8; 32]);

impl MarketId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<u64> for MarketId {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Caller identity used for authorization checks
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Live Market State
// ============================================================================

/// Tick and in-range liquidity of a market at call time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMarketState {
    pub tick: i32,
    pub liquidity: u128,
}

/// Source of live market state, typically the AMM pool itself
pub trait MarketStateProvider: Send + Sync {
    fn live_state(&self, market: &MarketId) -> OracleResult<LiveMarketState>;
}

// ============================================================================
// Governance Policy Store
// ============================================================================

/// Keyed governance table. `None` means the parameter was never set and the
/// configured default applies.
pub trait PolicyStore: Send + Sync {
    fn get(&self, market: &MarketId, param: PolicyParam) -> Option<u64>;
}

/// In-memory governance table
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    values: RwLock<HashMap<(MarketId, PolicyParam), u64>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, market: MarketId, param: PolicyParam, value: u64) {
        self.values.write().insert((market, param), value);
    }

    pub fn unset(&self, market: &MarketId, param: PolicyParam) -> Option<u64> {
        self.values.write().remove(&(*market, param))
    }

    /// Builder-style setter
    pub fn with(self, market: MarketId, param: PolicyParam, value: u64) -> Self {
        self.set(market, param, value);
        self
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, market: &MarketId, param: PolicyParam) -> Option<u64> {
        self.values.read().get(&(*market, param)).copied()
    }
}

// ============================================================================
// Block Time
// ============================================================================

/// Source of the 32-bit block timestamp
pub trait Clock: Send + Sync {
    fn block_timestamp(&self) -> u32;
}

/// Wall-clock time truncated to 32 bits
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn block_timestamp(&self) -> u32 {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        block_timestamp(unix)
    }
}

/// Clock driven by the caller
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(now: u32) -> Self {
        Self {
            now: AtomicU32::new(now),
        }
    }

    pub fn set(&self, now: u32) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`, wrapping with the 32-bit clock
    pub fn advance(&self, seconds: u32) -> u32 {
        self.now
            .fetch_add(seconds, Ordering::SeqCst)
            .wrapping_add(seconds)
    }
}

impl Clock for ManualClock {
    fn block_timestamp(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
