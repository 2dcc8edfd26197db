//! # Truncated Oracle
//!
//! Per-market tick and liquidity history for an AMM. Every recorded update is
//! passed through a capping guard that limits how far the stored tick may move
//! in a single observation, and an adaptive controller retunes that limit so
//! that capping happens at a governed daily frequency.
//!
//! - `state`: observation pages, cached policy, controller and market state
//! - `logic`: capping guard, TWAP query engine, cap controller
//! - `instructions`: the authorized entry points of [`TruncOracle`]
//! - `interfaces`: collaborators the oracle reads from (live market state,
//!   governance policy table, block time)

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod interfaces;
pub mod logic;
pub mod oracle;
pub mod state;
pub mod utils;

pub use config::{OracleConfig, PolicyDefaults};
pub use error::{ErrorKind, OracleError, OracleResult};
pub use events::{
    CapUpdateReason, EventSink, NoopEventSink, OracleEvent, RecordingEventSink, TracingEventSink,
};
pub use instructions::{ConsultResult, ObservationOutcome, ObserveResult};
pub use interfaces::{
    Clock, Identity, InMemoryPolicyStore, LiveMarketState, ManualClock, MarketId,
    MarketStateProvider, PolicyStore, SystemClock,
};
pub use logic::{cap_tick, CapAdjustment, CapDecision};
pub use oracle::TruncOracle;
pub use state::{
    CachedPolicy, ControllerState, MarketState, Observation, ObservationBook, ObservationState,
    PolicyParam,
};
