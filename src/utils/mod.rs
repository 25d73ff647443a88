//! Utility modules

pub mod performance;

pub use performance::*;
