//! # Oracle Error Types
//!
//! Every failure aborts the current call before any state is mutated. Hot-path
//! controller arithmetic saturates and never produces an error.

use thiserror::Error;

use crate::interfaces::{Identity, MarketId};
use crate::state::PolicyParam;

/// Errors surfaced by the oracle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("Caller {caller} is not the authorized update source")]
    NotUpdateSource { caller: Identity },

    #[error("Caller {caller} is not the governance identity")]
    NotGovernance { caller: Identity },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    #[error("Market {0} is not enabled")]
    MarketNotEnabled(MarketId),

    #[error("Market {0} is already enabled")]
    MarketAlreadyEnabled(MarketId),

    #[error("Observation book is not initialized")]
    NotInitialized,

    #[error("Observation book is already initialized")]
    AlreadyInitialized,

    // ========================================================================
    // Range Errors
    // ========================================================================
    #[error("Invalid policy parameter {param:?}: {reason}")]
    InvalidPolicy {
        param: PolicyParam,
        reason: &'static str,
    },

    #[error("Lookback target {target} predates oldest observation {oldest}")]
    TargetTooOld { target: u32, oldest: u32 },

    #[error("Requested cardinality {requested} exceeds maximum {max}")]
    CardinalityTooLarge { requested: u32, max: u16 },

    #[error("Tick {0} outside the supported tick range")]
    TickOutOfRange(i32),

    #[error("Cap {cap} outside policy bounds [{min_cap}, {max_cap}]")]
    CapOutOfBounds { cap: u32, min_cap: u32, max_cap: u32 },

    #[error("Lookback window must be non-zero")]
    ZeroLookback,

    #[error("Corrupt market snapshot: {0}")]
    InvalidSnapshot(&'static str),

    // ========================================================================
    // Arithmetic Errors
    // ========================================================================
    #[error("Math overflow in {0}")]
    MathOverflow(&'static str),

    // ========================================================================
    // Concurrency Errors
    // ========================================================================
    #[error("Reentrant call detected on market {0}")]
    ReentrancyDetected(MarketId),

    // ========================================================================
    // Configuration and Collaborator Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Market state unavailable: {0}")]
    MarketStateUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error taxonomy used by callers to decide on retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Uninitialized,
    AlreadyInitialized,
    Range,
    ArithmeticOverflow,
    Reentrancy,
    Configuration,
    External,
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotUpdateSource { .. } | Self::NotGovernance { .. } => ErrorKind::Authorization,
            Self::MarketNotEnabled(_) | Self::NotInitialized => ErrorKind::Uninitialized,
            Self::MarketAlreadyEnabled(_) | Self::AlreadyInitialized => {
                ErrorKind::AlreadyInitialized
            }
            Self::InvalidPolicy { .. }
            | Self::TargetTooOld { .. }
            | Self::CardinalityTooLarge { .. }
            | Self::TickOutOfRange(_)
            | Self::CapOutOfBounds { .. }
            | Self::ZeroLookback
            | Self::InvalidSnapshot(_) => ErrorKind::Range,
            Self::MathOverflow(_) => ErrorKind::ArithmeticOverflow,
            Self::ReentrancyDetected(_) => ErrorKind::Reentrancy,
            Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::MarketStateUnavailable(_) | Self::Serialization(_) => ErrorKind::External,
        }
    }

    /// Create an invalid policy error
    pub fn invalid_policy(param: PolicyParam, reason: &'static str) -> Self {
        Self::InvalidPolicy { param, reason }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        OracleError::Serialization(err.to_string())
    }
}

/// Result type using oracle errors
pub type OracleResult<T> = Result<T, OracleError>;
