//! Per-gesture scoring functions
//!
//! Every scorer is a fixed weighted sum. The weights and the bucket
//! tables below are part of the tier contract: changing them moves
//! existing patterns between tiers.

use super::geometry::{bucket, connected_regions, edge_ratio, is_mirror_symmetric, Point};
use super::{ComplexityReport, ScoreFactor};
use crate::gesture::chess::{ChessGesture, Square, BOARD_SIZE};
use crate::gesture::{DotGesture, PatternType, PianoGesture, PixelGesture};
use std::collections::BTreeSet;

fn factor(name: &'static str, points: i32) -> ScoreFactor {
    ScoreFactor { name, points }
}

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

// ----------------------------------------------------------------------------
// Dots
// ----------------------------------------------------------------------------

const DOTS_LENGTH: [(usize, i32); 4] = [(1, 5), (4, 15), (6, 25), (8, 35)];
const DOTS_DIRECTIONS: [(usize, i32); 2] = [(2, 10), (4, 20)];
const DOTS_SYMMETRY_PENALTY: i32 = -15;
const DOTS_LONG_STROKE: i32 = 5;
const DOTS_LONG_STROKE_MAX: usize = 3;
const DOTS_EDGE_MIX: i32 = 5;

pub fn score_dots(gesture: &DotGesture) -> ComplexityReport {
    let path: Vec<Point> = gesture
        .sequence
        .iter()
        .map(|dot| gesture.position(*dot))
        .collect();
    let visited: BTreeSet<Point> = path.iter().copied().collect();
    let (width, height) = (gesture.columns as i32, gesture.rows as i32);

    let mut directions = BTreeSet::new();
    let mut long_strokes = 0;
    for step in path.windows(2) {
        let (dx, dy) = (step[1].0 - step[0].0, step[1].1 - step[0].1);
        let div = gcd(dx.abs(), dy.abs()).max(1);
        directions.insert((dx / div, dy / div));
        if dx.abs().max(dy.abs()) > 1 {
            long_strokes += 1;
        }
    }

    let edge = edge_ratio(&visited, width, height);
    let factors = vec![
        factor("length", bucket(path.len(), &DOTS_LENGTH)),
        factor("directions", bucket(directions.len(), &DOTS_DIRECTIONS)),
        factor(
            "symmetry",
            if is_mirror_symmetric(&visited, width, height) {
                DOTS_SYMMETRY_PENALTY
            } else {
                0
            },
        ),
        factor(
            "long_strokes",
            DOTS_LONG_STROKE * long_strokes.min(DOTS_LONG_STROKE_MAX) as i32,
        ),
        factor(
            "edge_center_mix",
            if edge > 0.0 && edge < 1.0 { DOTS_EDGE_MIX } else { 0 },
        ),
    ];

    ComplexityReport::from_factors(PatternType::Dots, factors)
}

// ----------------------------------------------------------------------------
// Piano
// ----------------------------------------------------------------------------

const PIANO_LENGTH: [(usize, i32); 4] = [(1, 5), (4, 15), (6, 25), (9, 35)];
const PIANO_DISTINCT: [(usize, i32); 2] = [(3, 10), (5, 20)];
const PIANO_INTERVALS: [(usize, i32); 1] = [(3, 10)];
const PIANO_KEY_MIX: i32 = 10;
const PIANO_BLACK_KEYS: i32 = 5;
const PIANO_SYMMETRY_PENALTY: i32 = -15;

pub fn score_piano(gesture: &PianoGesture) -> ComplexityReport {
    let notes = &gesture.notes;
    let distinct: BTreeSet<_> = notes.iter().collect();
    let black = notes.iter().filter(|n| n.is_black()).count();
    let white = notes.len() - black;
    let intervals: BTreeSet<i32> = notes
        .windows(2)
        .map(|w| w[1].0 as i32 - w[0].0 as i32)
        .collect();
    let palindrome = notes.len() >= 2 && notes.iter().eq(notes.iter().rev());

    let mut key_colors = 0;
    if black > 0 && white > 0 {
        key_colors += PIANO_KEY_MIX;
    }
    if black >= 2 {
        key_colors += PIANO_BLACK_KEYS;
    }

    let factors = vec![
        factor("length", bucket(notes.len(), &PIANO_LENGTH)),
        factor("distinct_notes", bucket(distinct.len(), &PIANO_DISTINCT)),
        factor("key_colors", key_colors),
        factor(
            "symmetry",
            if palindrome { PIANO_SYMMETRY_PENALTY } else { 0 },
        ),
        factor("intervals", bucket(intervals.len(), &PIANO_INTERVALS)),
    ];

    ComplexityReport::from_factors(PatternType::Piano, factors)
}

// ----------------------------------------------------------------------------
// Chess
// ----------------------------------------------------------------------------

const CHESS_PIECES: [(usize, i32); 4] = [(1, 5), (3, 15), (5, 25), (8, 30)];
const CHESS_KINDS: [(usize, i32); 3] = [(2, 5), (3, 10), (5, 20)];
const CHESS_MATERIAL: [(usize, i32); 2] = [(10, 5), (20, 10)];
const CHESS_BOTH_COLORS: i32 = 5;
const CHESS_SYMMETRY_PENALTY: i32 = -15;
const CHESS_SPREAD: i32 = 5;
const CHESS_CENTER: i32 = 5;

fn flip_file(square: &Square) -> Square {
    Square {
        file: BOARD_SIZE - 1 - square.file,
        rank: square.rank,
    }
}

fn flip_rank(square: &Square) -> Square {
    Square {
        file: square.file,
        rank: BOARD_SIZE - 1 - square.rank,
    }
}

/// Same piece kinds on mirrored squares, ignoring colour
fn chess_symmetric(gesture: &ChessGesture) -> bool {
    if gesture.placements.is_empty() {
        return false;
    }
    let mirrored = |flip: fn(&Square) -> Square| {
        gesture.placements.iter().all(|(square, piece)| {
            gesture
                .placements
                .get(&flip(square))
                .map(|other| other.kind == piece.kind)
                .unwrap_or(false)
        })
    };
    mirrored(flip_file) || mirrored(flip_rank)
}

pub fn score_chess(gesture: &ChessGesture) -> ComplexityReport {
    let squares: BTreeSet<Point> = gesture
        .placements
        .keys()
        .map(|s| (s.file as i32, s.rank as i32))
        .collect();
    let kinds: BTreeSet<_> = gesture.placements.values().map(|p| p.kind).collect();
    let colors: BTreeSet<_> = gesture.placements.values().map(|p| p.color).collect();
    let material: u32 = gesture.placements.values().map(|p| p.kind.value()).sum();

    let central = squares
        .iter()
        .filter(|(f, r)| (2..=5).contains(f) && (2..=5).contains(r))
        .count();
    let center_heavy = !squares.is_empty() && central * 2 >= squares.len();

    let factors = vec![
        factor("pieces", bucket(squares.len(), &CHESS_PIECES)),
        factor("piece_kinds", bucket(kinds.len(), &CHESS_KINDS)),
        factor("material", bucket(material as usize, &CHESS_MATERIAL)),
        factor(
            "colors",
            if colors.len() > 1 { CHESS_BOTH_COLORS } else { 0 },
        ),
        factor(
            "symmetry",
            if chess_symmetric(gesture) {
                CHESS_SYMMETRY_PENALTY
            } else {
                0
            },
        ),
        factor(
            "spread",
            if connected_regions(&squares, true) >= 2 {
                CHESS_SPREAD
            } else {
                0
            },
        ),
        factor("center", if center_heavy { CHESS_CENTER } else { 0 }),
    ];

    ComplexityReport::from_factors(PatternType::Chess, factors)
}

// ----------------------------------------------------------------------------
// Pixel
// ----------------------------------------------------------------------------

const PIXEL_CELLS: [(usize, i32); 4] = [(1, 10), (8, 20), (15, 30), (20, 40)];
const PIXEL_REGIONS: [(usize, i32); 2] = [(1, 5), (2, 20)];
const PIXEL_SYMMETRY_PENALTY: i32 = -20;
const PIXEL_EDGE_MIX: i32 = 10;

pub fn score_pixel(gesture: &PixelGesture) -> ComplexityReport {
    let cells: BTreeSet<Point> = gesture
        .cells
        .iter()
        .map(|&(x, y)| (x as i32, y as i32))
        .collect();
    let (width, height) = (gesture.width as i32, gesture.height as i32);
    let edge = edge_ratio(&cells, width, height);

    let factors = vec![
        factor("cells", bucket(cells.len(), &PIXEL_CELLS)),
        factor(
            "regions",
            bucket(connected_regions(&cells, false), &PIXEL_REGIONS),
        ),
        factor(
            "symmetry",
            if is_mirror_symmetric(&cells, width, height) {
                PIXEL_SYMMETRY_PENALTY
            } else {
                0
            },
        ),
        factor(
            "edge_center_mix",
            if (0.25..=0.75).contains(&edge) {
                PIXEL_EDGE_MIX
            } else {
                0
            },
        ),
    ];

    ComplexityReport::from_factors(PatternType::Pixel, factors)
}
