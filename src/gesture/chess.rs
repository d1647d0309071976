//! Chess-piece placements on an 8x8 board
//!
//! Placement order does not matter: the board is a map from square to
//! piece, so two users placing the same pieces in a different order
//! produce the same key.

use crate::error::{GestureVaultError, Result};
use std::collections::BTreeMap;

pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    /// Material value used by the complexity scorer
    pub fn value(&self) -> u32 {
        match self {
            PieceKind::King => 4,
            PieceKind::Queen => 9,
            PieceKind::Rook => 5,
            PieceKind::Bishop => 3,
            PieceKind::Knight => 3,
            PieceKind::Pawn => 1,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'Q' => Some(PieceKind::Queen),
            'R' => Some(PieceKind::Rook),
            'B' => Some(PieceKind::Bishop),
            'N' => Some(PieceKind::Knight),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceColor {
    White,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

impl Piece {
    pub fn new(color: PieceColor, kind: PieceKind) -> Self {
        Self { kind, color }
    }
}

/// Board square; file 0 = `a`, rank 0 = `1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < BOARD_SIZE && rank < BOARD_SIZE).then_some(Self { file, rank })
    }

    pub fn name(&self) -> String {
        format!("{}{}", (b'a' + self.file) as char, self.rank + 1)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.trim().chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !('a'..='h').contains(&file) || rank == 0 {
            return None;
        }
        Square::new(file as u8 - b'a', rank as u8 - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChessGesture {
    pub placements: BTreeMap<Square, Piece>,
}

impl ChessGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a piece, replacing whatever stood on the square
    pub fn place(&mut self, square: Square, piece: Piece) {
        self.placements.insert(square, piece);
    }

    pub(crate) fn canonical(&self) -> String {
        let tokens: Vec<String> = self
            .placements
            .iter()
            .map(|(square, piece)| {
                let color = match piece.color {
                    PieceColor::White => 'w',
                    PieceColor::Black => 'b',
                };
                format!("{}{}@{}", color, piece.kind.letter(), square.name())
            })
            .collect();
        tokens.join(";")
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut gesture = Self::new();

        for token in text.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            let bad = || GestureVaultError::InvalidGesture(format!("bad placement '{}'", token));
            let (piece, square) = token.split_once('@').ok_or_else(bad)?;
            let mut chars = piece.chars();
            let color = match chars.next() {
                Some('w') | Some('W') => PieceColor::White,
                Some('b') | Some('B') => PieceColor::Black,
                _ => return Err(bad()),
            };
            let kind = chars.next().and_then(PieceKind::from_letter).ok_or_else(bad)?;
            let square = Square::parse(square).ok_or_else(bad)?;
            gesture.place(square, Piece::new(color, kind));
        }

        Ok(gesture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_names() {
        let d4 = Square::parse("d4").unwrap();
        assert_eq!((d4.file, d4.rank), (3, 3));
        assert_eq!(d4.name(), "d4");
        assert!(Square::parse("i1").is_none());
        assert!(Square::parse("a9").is_none());
        assert!(Square::parse("a0").is_none());
    }

    #[test]
    fn test_canonical_ignores_placement_order() {
        let a = ChessGesture::parse("wQ@d4;bK@e8").unwrap();
        let b = ChessGesture::parse("bK@e8;wQ@d4").unwrap();
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_later_placement_replaces_earlier() {
        let g = ChessGesture::parse("wQ@d4;bN@d4").unwrap();
        assert_eq!(g.placements.len(), 1);
        assert_eq!(g.canonical(), "bN@d4");
    }
}
