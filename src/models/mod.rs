//! Document model for recognized scores
//!
//! Parts, measures, clefs, time signatures, tempo directions and notes as
//! the normalizer understood them.

pub mod pitch;
pub mod score;

// Re-export commonly used types
pub use pitch::{Accidental, Pitch};
pub use score::*;
