//! FSRS-6 spaced repetition scheduling.
//!
//! DSR memory model:
//! - Difficulty (D): card difficulty 1-10
//! - Stability (S): days until retention drops to 90%
//! - Retrievability (R): probability of recall at a given moment

pub mod fuzz;
pub mod model;
pub mod scheduler;

pub use model::{next_interval, MemoryModel, MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY};
pub use scheduler::Scheduler;
