//! Event definitions
//!
//! Notifications are advisory. They are delivered after the state change
//! they describe has been committed and never carry information that cannot
//! also be read back through the query API.

use parking_lot::Mutex;
use serde::Serialize;

use crate::interfaces::MarketId;

/// Source of a cap change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CapUpdateReason {
    /// Controller retune
    AutoTune,
    /// Re-clamp after a policy refresh narrowed the bounds
    PolicyClamp,
    /// Governance override
    ManualOverride,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum OracleEvent {
    /// Market enabled and bootstrap observation written
    OracleConfigured {
        market: MarketId,
        timestamp: u32,
        tick: i32,
        liquidity: u128,
        max_ticks_per_block: u32,
        cardinality_next: u16,
    },
    /// An observation was clamped by the capping guard
    TickCapped {
        market: MarketId,
        timestamp: u32,
        live_tick: i32,
        recorded_tick: i32,
        max_ticks_per_block: u32,
    },
    CapUpdated {
        market: MarketId,
        old_cap: u32,
        new_cap: u32,
        reason: CapUpdateReason,
    },
    PolicyRefreshed {
        market: MarketId,
        version: u64,
        min_cap: u32,
        max_cap: u32,
    },
    AutoTunePaused {
        market: MarketId,
        paused: bool,
    },
    CardinalityNextIncreased {
        market: MarketId,
        old_cardinality_next: u16,
        new_cardinality_next: u16,
    },
}

impl OracleEvent {
    pub fn market(&self) -> &MarketId {
        match self {
            Self::OracleConfigured { market, .. }
            | Self::TickCapped { market, .. }
            | Self::CapUpdated { market, .. }
            | Self::PolicyRefreshed { market, .. }
            | Self::AutoTunePaused { market, .. }
            | Self::CardinalityNextIncreased { market, .. } => market,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OracleConfigured { .. } => "OracleConfigured",
            Self::TickCapped { .. } => "TickCapped",
            Self::CapUpdated { .. } => "CapUpdated",
            Self::PolicyRefreshed { .. } => "PolicyRefreshed",
            Self::AutoTunePaused { .. } => "AutoTunePaused",
            Self::CardinalityNextIncreased { .. } => "CardinalityNextIncreased",
        }
    }
}

/// Receiver of oracle notifications
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &OracleEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &OracleEvent) {
        match event {
            OracleEvent::TickCapped {
                market,
                live_tick,
                recorded_tick,
                max_ticks_per_block,
                ..
            } => {
                tracing::debug!(
                    %market,
                    live_tick,
                    recorded_tick,
                    max_ticks_per_block,
                    "tick capped"
                );
            }
            other => {
                tracing::info!(market = %other.market(), event = ?other, "{}", other.name());
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<OracleEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<OracleEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<OracleEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &OracleEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &OracleEvent) {}
}
