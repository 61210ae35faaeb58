//! Urgency levels and display categories
//!
//! The ESI-like level runs from 1 (most critical) to 5 (least urgent).
//! Escalation always moves towards 1.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An urgency level in the range 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct TriageLevel(u8);

impl TriageLevel {
    /// Most critical level
    pub const MOST_CRITICAL: Self = Self(1);
    /// Least urgent level
    pub const LEAST_URGENT: Self = Self(5);

    /// Create a level, returning `None` outside 1..=5
    #[must_use]
    pub const fn new(level: i32) -> Option<Self> {
        if level >= 1 && level <= 5 {
            Some(Self(level as u8))
        } else {
            None
        }
    }

    /// Numeric value of the level
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0 as i32
    }

    /// Raise urgency by one step, never going below level 1
    #[must_use]
    pub const fn escalate(self) -> Self {
        if self.0 > 1 { Self(self.0 - 1) } else { self }
    }

    /// Whether this level belongs to the critical band (1 or 2)
    #[must_use]
    pub const fn is_critical(self) -> bool {
        self.0 <= 2
    }
}

impl TryFrom<i32> for TriageLevel {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("triage level {value} outside 1..=5"))
    }
}

impl From<TriageLevel> for i32 {
    fn from(level: TriageLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-facing urgency category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Levels 1 and 2
    Critical,
    /// Level 3
    Urgent,
    /// Level 4
    #[serde(rename = "Semi-Urgent")]
    SemiUrgent,
    /// Level 5 and anything unmapped
    Routine,
}

impl Category {
    /// Map a raw classifier level to a category.
    ///
    /// Levels outside 1..=5 map to `Routine`.
    #[must_use]
    pub const fn from_level(level: i32) -> Self {
        match level {
            1 | 2 => Self::Critical,
            3 => Self::Urgent,
            4 => Self::SemiUrgent,
            _ => Self::Routine,
        }
    }

    /// Display label used in responses
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Urgent => "Urgent",
            Self::SemiUrgent => "Semi-Urgent",
            Self::Routine => "Routine",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display score (0-100) for a raw classifier level.
///
/// The score is for UI display only; unmapped levels score 10.
#[must_use]
pub const fn urgency_score(level: i32) -> u8 {
    match level {
        1 => 95,
        2 => 85,
        3 => 65,
        4 => 40,
        5 => 15,
        _ => 10,
    }
}
