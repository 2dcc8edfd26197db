//! Reentrancy protection for market write paths.
//! Each market carries a status flag behind its writer gate. A write path
//! acquires the flag before calling out to collaborators (market state
//! provider, event sink); any call that re-enters a write path of the same
//! market from within that call stack finds the flag held and is rejected.
use std::cell::Cell;

use crate::error::{OracleError, OracleResult};
use crate::interfaces::MarketId;

// ============================================================================
// Reentrancy Status Types
// ============================================================================

/// Reentrancy guard status flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReentrancyStatus {
    /// Market is ready for a write
    #[default]
    Unlocked = 0,
    /// A write is in progress
    Locked = 1,
    /// A write is delivering its notifications
    Notifying = 2,
}

// ============================================================================
// Reentrancy Guard Manager
// ============================================================================

/// Reentrancy guard manager
pub struct ReentrancyGuard;

impl ReentrancyGuard {
    /// Acquire the lock for a write
    pub fn acquire(status: &Cell<ReentrancyStatus>, market: &MarketId) -> OracleResult<()> {
        match status.get() {
            ReentrancyStatus::Unlocked => {
                status.set(ReentrancyStatus::Locked);
                Ok(())
            }
            _ => {
                tracing::warn!(%market, "rejected reentrant write");
                Err(OracleError::ReentrancyDetected(*market))
            }
        }
    }

    /// Move a held lock into the notification phase
    pub fn enter_notify_phase(
        status: &Cell<ReentrancyStatus>,
        market: &MarketId,
    ) -> OracleResult<()> {
        match status.get() {
            ReentrancyStatus::Locked => {
                status.set(ReentrancyStatus::Notifying);
                Ok(())
            }
            _ => Err(OracleError::ReentrancyDetected(*market)),
        }
    }

    /// Release the lock after the write completes
    pub fn release(status: &Cell<ReentrancyStatus>) {
        match status.get() {
            ReentrancyStatus::Locked | ReentrancyStatus::Notifying => {
                status.set(ReentrancyStatus::Unlocked);
            }
            ReentrancyStatus::Unlocked => {
                tracing::warn!("releasing an already unlocked market");
            }
        }
    }
}

/// RAII-style guard that releases on drop
pub struct ScopedReentrancyGuard<'a> {
    status: &'a Cell<ReentrancyStatus>,
    market: MarketId,
}

impl<'a> ScopedReentrancyGuard<'a> {
    pub fn new(status: &'a Cell<ReentrancyStatus>, market: &MarketId) -> OracleResult<Self> {
        ReentrancyGuard::acquire(status, market)?;
        Ok(Self {
            status,
            market: *market,
        })
    }

    /// Transition to the notification phase
    pub fn enter_notify_phase(&mut self) -> OracleResult<()> {
        ReentrancyGuard::enter_notify_phase(self.status, &self.market)
    }
}

impl<'a> Drop for ScopedReentrancyGuard<'a> {
    fn drop(&mut self) {
        ReentrancyGuard::release(self.status);
    }
}

// ============================================================================
// Tests
// ============================================================================
