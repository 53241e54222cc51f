//! Core types for the scheduling engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Rating for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// All ratings in ascending order.
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl FromStr for Rating {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            other => Err(ParseError::InvalidRating(other.to_string())),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a review updates the card schedule or is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    #[default]
    Scheduled,
    Practice,
}

impl ReviewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Practice => "practice",
        }
    }

    /// Parse an optional client value; an absent or empty mode means scheduled.
    pub fn parse_or_default(value: Option<&str>) -> Result<Self, ParseError> {
        match value {
            None | Some("") => Ok(Self::Scheduled),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for ReviewMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "practice" => Ok(Self::Practice),
            other => Err(ParseError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling state of a card as seen by the algorithm.
///
/// Steps only exist on the stepped states, so a reviewed card can never
/// carry a stale step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CardState {
    Learning { step: u32 },
    Review,
    Relearning { step: u32 },
}

impl CardState {
    /// Step index for stepped states.
    pub fn step(&self) -> Option<u32> {
        match self {
            Self::Learning { step } | Self::Relearning { step } => Some(*step),
            Self::Review => None,
        }
    }

    pub fn status(&self) -> CardStatus {
        match self {
            Self::Learning { .. } => CardStatus::Learning,
            Self::Review => CardStatus::Review,
            Self::Relearning { .. } => CardStatus::Relearning,
        }
    }
}

impl Default for CardState {
    fn default() -> Self {
        Self::Learning { step: 0 }
    }
}

/// Card state label as persisted. `New` marks a card that was never reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    New,
    Learning,
    Review,
    Relearning,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }

    /// A lapse can only happen on a card that had already graduated.
    pub fn is_graduated(&self) -> bool {
        matches!(self, Self::Review | Self::Relearning)
    }
}

impl FromStr for CardStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "review" => Ok(Self::Review),
            "relearning" => Ok(Self::Relearning),
            other => Err(ParseError::InvalidCardState(other.to_string())),
        }
    }
}

/// Memory strength of a reviewed card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Days until recall probability decays to 90%.
    pub stability: f64,
    /// Resistance to stability growth, within 1-10.
    pub difficulty: f64,
}

/// Per-card scheduling state.
///
/// `memory` is `None` only before the first review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(flatten)]
    pub state: CardState,
    pub memory: Option<Memory>,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
}

impl ScheduleState {
    /// State of a card that has never been reviewed, due at `due`.
    pub fn new(due: DateTime<Utc>) -> Self {
        Self {
            state: CardState::default(),
            memory: None,
            due,
            last_review: None,
        }
    }

    pub fn stability(&self) -> Option<f64> {
        self.memory.map(|m| m.stability)
    }

    pub fn difficulty(&self) -> Option<f64> {
        self.memory.map(|m| m.difficulty)
    }
}

/// Result of a single scheduling call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub card: ScheduleState,
    /// Interval actually chosen, in whole days (post-fuzz).
    pub scheduled_days: i64,
    /// Whole days since the previous review, 0 if none.
    pub elapsed_days: i64,
    /// Recall probability against the updated state.
    pub retrievability: f64,
}

/// Minimal review record used for history replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}
