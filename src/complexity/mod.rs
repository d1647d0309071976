//! Pattern Complexity Scorer
//!
//! Turns a gesture into a difficulty tier so weak patterns can be
//! refused at creation time. Each gesture type has its own weighted sum
//! and its own pair of thresholds; see [`scorers`]. Scoring is total:
//! it never fails, and an empty gesture is always `Easy`.

pub mod geometry;
pub mod scorers;

pub use scorers::{score_chess, score_dots, score_piano, score_pixel};

use crate::gesture::{Gesture, PatternType};
use serde::{Deserialize, Serialize};

/// How hard a pattern is to guess; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Easy,
    Normal,
    Hard,
}

/// Two ascending score thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThresholds {
    pub normal: i32,
    pub hard: i32,
}

impl TierThresholds {
    pub fn tier_for(&self, score: i32) -> DifficultyTier {
        if score >= self.hard {
            DifficultyTier::Hard
        } else if score >= self.normal {
            DifficultyTier::Normal
        } else {
            DifficultyTier::Easy
        }
    }
}

pub const DOTS_THRESHOLDS: TierThresholds = TierThresholds { normal: 25, hard: 50 };
pub const PIANO_THRESHOLDS: TierThresholds = TierThresholds { normal: 25, hard: 55 };
pub const CHESS_THRESHOLDS: TierThresholds = TierThresholds { normal: 25, hard: 50 };
pub const PIXEL_THRESHOLDS: TierThresholds = TierThresholds { normal: 30, hard: 60 };

pub fn thresholds(pattern_type: PatternType) -> TierThresholds {
    match pattern_type {
        PatternType::Dots => DOTS_THRESHOLDS,
        PatternType::Piano => PIANO_THRESHOLDS,
        PatternType::Chess => CHESS_THRESHOLDS,
        PatternType::Pixel => PIXEL_THRESHOLDS,
    }
}

/// One term of the weighted sum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreFactor {
    pub name: &'static str,
    pub points: i32,
}

/// Breakdown of a score, for display next to the drawing widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexityReport {
    pub pattern_type: PatternType,
    pub score: i32,
    pub tier: DifficultyTier,
    pub factors: Vec<ScoreFactor>,
}

impl ComplexityReport {
    pub(crate) fn from_factors(pattern_type: PatternType, factors: Vec<ScoreFactor>) -> Self {
        let score = factors.iter().map(|f| f.points).sum();
        Self {
            pattern_type,
            score,
            tier: thresholds(pattern_type).tier_for(score),
            factors,
        }
    }
}

/// Score any gesture
pub fn assess(gesture: &Gesture) -> ComplexityReport {
    match gesture {
        Gesture::Dots(g) => score_dots(g),
        Gesture::Piano(g) => score_piano(g),
        Gesture::Chess(g) => score_chess(g),
        Gesture::Pixel(g) => score_pixel(g),
    }
}
