//! Spaced repetition scheduling engine shared by the backend.
//!
//! Provides:
//! - FSRS-6 memory model (stability, difficulty, retrievability)
//! - Scheduler state machine with step ladders, fuzzing, and history replay
//! - Per-notebook scheduler configuration and validation
//! - Rating previews for study listings

pub mod algorithm;
pub mod config;
pub mod error;
pub mod preview;
pub mod types;

pub use algorithm::{MemoryModel, Scheduler};
pub use config::SchedulerConfig;
pub use error::{ParseError, Result, SchedulerError};
pub use preview::{format_interval, IntervalPreview};
pub use types::{
    CardState, CardStatus, Memory, Rating, ReviewEntry, ReviewMode, ReviewOutcome, ScheduleState,
};
