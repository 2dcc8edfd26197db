pub mod controller;
pub mod market;
pub mod oracle;
pub mod policy;
pub mod reentrancy;

pub use controller::*;
pub use market::*;
pub use oracle::*;
pub use policy::*;
pub use reentrancy::*;
