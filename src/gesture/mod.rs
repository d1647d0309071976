//! Gestures
//!
//! The drawable patterns a user replays instead of typing a master
//! password. Every gesture canonicalizes to a single string that is only
//! ever used as key material: it is handed out as a `SecretString` and
//! must be dropped right after key derivation.

pub mod chess;
pub mod dots;
pub mod piano;
pub mod pixel;

pub use chess::{ChessGesture, Piece, PieceColor, PieceKind, Square};
pub use dots::DotGesture;
pub use piano::{PianoGesture, PianoNote};
pub use pixel::PixelGesture;

use crate::error::{GestureVaultError, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which drawing widget produced a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Dots,
    Piano,
    Chess,
    Pixel,
}

impl PatternType {
    pub const ALL: [PatternType; 4] = [
        PatternType::Dots,
        PatternType::Piano,
        PatternType::Chess,
        PatternType::Pixel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Dots => "dots",
            PatternType::Piano => "piano",
            PatternType::Chess => "chess",
            PatternType::Pixel => "pixel",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = GestureVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dots" | "dot" => Ok(PatternType::Dots),
            "piano" => Ok(PatternType::Piano),
            "chess" => Ok(PatternType::Chess),
            "pixel" | "pixels" => Ok(PatternType::Pixel),
            other => Err(GestureVaultError::InvalidGesture(format!(
                "unknown pattern type '{}'",
                other
            ))),
        }
    }
}

/// A captured gesture of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Dots(DotGesture),
    Piano(PianoGesture),
    Chess(ChessGesture),
    Pixel(PixelGesture),
}

impl Gesture {
    pub fn pattern_type(&self) -> PatternType {
        match self {
            Gesture::Dots(_) => PatternType::Dots,
            Gesture::Piano(_) => PatternType::Piano,
            Gesture::Chess(_) => PatternType::Chess,
            Gesture::Pixel(_) => PatternType::Pixel,
        }
    }

    /// Number of tokens drawn
    pub fn len(&self) -> usize {
        match self {
            Gesture::Dots(g) => g.sequence.len(),
            Gesture::Piano(g) => g.notes.len(),
            Gesture::Chess(g) => g.placements.len(),
            Gesture::Pixel(g) => g.cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical key material for this gesture
    pub fn canonical_key(&self) -> SecretString {
        let body = match self {
            Gesture::Dots(g) => g.canonical(),
            Gesture::Piano(g) => g.canonical(),
            Gesture::Chess(g) => g.canonical(),
            Gesture::Pixel(g) => g.canonical(),
        };
        SecretString::from(format!("{}:{}", self.pattern_type(), body))
    }

    /// Parse the textual form used by the CLI
    ///
    /// - dots: `0-4-8-5` (3x3) or `4x4:0-5-10-15`
    /// - piano: `C4,D#4,G4`
    /// - chess: `wQ@d4;bK@e8`
    /// - pixel: `8x8:1.1;1.2;2.2`
    pub fn parse(pattern_type: PatternType, text: &str) -> Result<Self> {
        match pattern_type {
            PatternType::Dots => DotGesture::parse(text).map(Gesture::Dots),
            PatternType::Piano => PianoGesture::parse(text).map(Gesture::Piano),
            PatternType::Chess => ChessGesture::parse(text).map(Gesture::Chess),
            PatternType::Pixel => PixelGesture::parse(text).map(Gesture::Pixel),
        }
    }
}

/// Parse a `WxH` board size prefix
pub(crate) fn parse_dimensions(text: &str) -> Result<(u8, u8)> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| GestureVaultError::InvalidGesture(format!("bad size '{}'", text)))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u8>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| GestureVaultError::InvalidGesture(format!("bad size '{}'", text)))
    };
    Ok((parse(w)?, parse(h)?))
}
