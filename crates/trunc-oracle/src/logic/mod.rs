pub mod cap_controller;
pub mod capping;
pub mod twap;

pub use cap_controller::CapAdjustment;
pub use capping::{cap_tick, CapDecision};
pub use twap::{ConsultResult, CumulativePoint, ObserveResult};
