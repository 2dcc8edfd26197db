//! Simulation framework for the truncated oracle
//!
//! Provides utilities for:
//! - Driving a simulated market's tick and liquidity
//! - Tracking capping episodes and the cap over time
//! - Running calm, volatile and random-walk scenarios end to end

pub mod market;
pub mod scenario;
pub mod tracker;

pub use market::SimulatedMarket;
pub use scenario::{Scenario, ScenarioKind, ScenarioReport, ScenarioRunner};
pub use tracker::{CapEdge, CapEpisode, CapEventTracker};

use trunc_oracle::OracleError;

/// Simulation error type
#[derive(thiserror::Error, Debug)]
pub enum SimulationError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Simulation result type
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
