//! Entry points of [`TruncOracle`](crate::TruncOracle), grouped by caller.
//! The update source bootstraps markets and records observations, governance
//! maintains policy and history capacity, and anyone may query.

pub mod enable_market;
pub mod governance;
pub mod observe;
pub mod record_observation;

pub use crate::logic::twap::{ConsultResult, ObserveResult};
pub use record_observation::ObservationOutcome;
