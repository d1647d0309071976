//! Board geometry shared by the scorers

use std::collections::{BTreeSet, VecDeque};

pub type Point = (i32, i32);

/// Mirror-symmetric about the vertical or horizontal centre line of a
/// `width` x `height` board. An empty set is not symmetric.
pub fn is_mirror_symmetric(points: &BTreeSet<Point>, width: i32, height: i32) -> bool {
    if points.is_empty() {
        return false;
    }
    let vertical = points
        .iter()
        .all(|&(x, y)| points.contains(&(width - 1 - x, y)));
    let horizontal = points
        .iter()
        .all(|&(x, y)| points.contains(&(x, height - 1 - y)));
    vertical || horizontal
}

/// Number of connected groups; 4-neighbourhood, or 8 with `diagonal`
pub fn connected_regions(points: &BTreeSet<Point>, diagonal: bool) -> usize {
    let mut seen: BTreeSet<Point> = BTreeSet::new();
    let mut regions = 0;

    for &start in points {
        if seen.contains(&start) {
            continue;
        }
        regions += 1;
        let mut queue = VecDeque::from([start]);
        seen.insert(start);

        while let Some((x, y)) = queue.pop_front() {
            for (dx, dy) in neighbour_offsets(diagonal) {
                let next = (x + dx, y + dy);
                if points.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    regions
}

fn neighbour_offsets(diagonal: bool) -> Vec<Point> {
    let mut offsets = vec![(1, 0), (-1, 0), (0, 1), (0, -1)];
    if diagonal {
        offsets.extend([(1, 1), (1, -1), (-1, 1), (-1, -1)]);
    }
    offsets
}

/// Share of points on the outer ring of the board, 0.0 for no points
pub fn edge_ratio(points: &BTreeSet<Point>, width: i32, height: i32) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let on_edge = points
        .iter()
        .filter(|&&(x, y)| x == 0 || y == 0 || x == width - 1 || y == height - 1)
        .count();
    on_edge as f64 / points.len() as f64
}

/// Pick the points of a bucket table: the last entry whose lower bound
/// `value` reaches wins
pub fn bucket(value: usize, table: &[(usize, i32)]) -> i32 {
    table
        .iter()
        .rev()
        .find(|(min, _)| value >= *min)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}
