//! Core domain types for the ICD-11 transition trainer.
//!
//! This module defines the fundamental types used throughout the system:
//! - Learning styles
//! - Training sessions (the history record)
//! - Training modules and the catalog
//! - The derived training pattern

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Learning Style
// ============================================================================

/// A user's inferred preferred training mode
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Practical,
    Theoretical,
    Interactive,
}

impl LearningStyle {
    /// Classify an average session length (seconds) into a learning style.
    ///
    /// Cut-points are 1200, 2400 and 3600 seconds; each bound belongs to
    /// the next band up.
    pub fn from_average_duration(seconds: f64) -> Self {
        if seconds < 1200.0 {
            LearningStyle::Practical
        } else if seconds < 2400.0 {
            LearningStyle::Visual
        } else if seconds < 3600.0 {
            LearningStyle::Interactive
        } else {
            LearningStyle::Theoretical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Practical => "practical",
            LearningStyle::Theoretical => "theoretical",
            LearningStyle::Interactive => "interactive",
        }
    }

    /// Short explanation shown alongside learning insights
    pub fn description(&self) -> &'static str {
        match self {
            LearningStyle::Visual => {
                "You learn best through visual aids and diagrams. Modules with visual content are prioritized."
            }
            LearningStyle::Practical => {
                "You excel with hands-on practice. Exercises and real-world applications come first."
            }
            LearningStyle::Theoretical => {
                "You prefer understanding underlying concepts. In-depth theoretical content comes first."
            }
            LearningStyle::Interactive => {
                "You thrive in collaborative learning. Interactive modules and group exercises come first."
            }
        }
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningStyle {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "visual" => Ok(LearningStyle::Visual),
            "practical" => Ok(LearningStyle::Practical),
            "theoretical" => Ok(LearningStyle::Theoretical),
            "interactive" => Ok(LearningStyle::Interactive),
            other => Err(crate::Error::Other(format!(
                "Unknown learning style: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// A training session on one module
///
/// A session with `completed_at == None` is still in progress. Once closed
/// it is appended to the session log and never modified again.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrainingSession {
    pub id: Uuid,
    pub module_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress_fraction: f64,
}

impl TrainingSession {
    /// Open a new in-progress session
    pub fn start(module_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            module_id: module_id.into(),
            started_at,
            completed_at: None,
            progress_fraction: 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Wall-clock length of a closed session in seconds
    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Category key derived from the module id (text before the first `-`)
    pub fn category_key(&self) -> &str {
        module_prefix(&self.module_id)
    }

    /// Check the record before it is allowed into history
    ///
    /// The fraction must lie within [0, 1] and a closed session cannot end
    /// before it started.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.progress_fraction) {
            return Err(crate::Error::InvalidSession(format!(
                "{} has progress {} outside [0, 1]",
                self.id, self.progress_fraction
            )));
        }
        if let Some(completed_at) = self.completed_at {
            if completed_at < self.started_at {
                return Err(crate::Error::InvalidSession(format!(
                    "{} completed at {} before it started at {}",
                    self.id, completed_at, self.started_at
                )));
            }
        }
        Ok(())
    }
}

/// Text of a module id before the first hyphen, or the whole id
pub fn module_prefix(module_id: &str) -> &str {
    module_id.split('-').next().unwrap_or(module_id)
}

// ============================================================================
// Module and Catalog Types
// ============================================================================

/// A training module definition with the user's current progress
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrainingModule {
    pub id: String,
    pub title: String,
    pub duration_label: String,
    #[serde(rename = "type")]
    pub kind: LearningStyle,
    pub category: String,
    pub difficulty: u8,
    pub prerequisites: Vec<String>,
    pub estimated_completion_seconds: u32,
    pub skills: Vec<String>,
    #[serde(default)]
    pub progress: f64,
}

impl TrainingModule {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// The ordered catalog of training modules
///
/// Order is significant: it is the display order and the tie-break order
/// for recommendations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub modules: Vec<TrainingModule>,
}

// ============================================================================
// Derived Pattern
// ============================================================================

/// Aggregate profile of a user's historical training behavior
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrainingPattern {
    pub preferred_time_of_day: NaiveTime,
    pub average_session_seconds: f64,
    pub completion_rate: f64,
    pub learning_style: LearningStyle,
    pub strengths: BTreeSet<String>,
    pub weaknesses: BTreeSet<String>,
}

/// Study time accumulated on one calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyStudyTime {
    pub date: NaiveDate,
    pub label: String,
    pub hours: f64,
}
