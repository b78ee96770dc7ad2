//! Low-level utilities shared across the crate.

pub mod linalg;
pub mod rng;

pub use rng::SimpleRng;
