//! Pixel-grid drawings

use super::parse_dimensions;
use crate::error::{GestureVaultError, Result};
use std::collections::BTreeSet;

pub const DEFAULT_PIXEL_GRID: u8 = 8;

/// A set of selected cells on a `width` x `height` grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGesture {
    pub width: u8,
    pub height: u8,
    pub cells: BTreeSet<(u8, u8)>,
}

impl PixelGesture {
    pub fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            cells: BTreeSet::new(),
        }
    }

    /// Build from `(x, y)` cells, silently dropping cells off the grid
    pub fn with_cells(width: u8, height: u8, cells: impl IntoIterator<Item = (u8, u8)>) -> Self {
        let mut gesture = Self::new(width, height);
        for (x, y) in cells {
            gesture.toggle_on(x, y);
        }
        gesture
    }

    /// Select a cell; returns false when it lies outside the grid
    pub fn toggle_on(&mut self, x: u8, y: u8) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells.insert((x, y));
        true
    }

    pub(crate) fn canonical(&self) -> String {
        let cells: Vec<String> = self
            .cells
            .iter()
            .map(|(x, y)| format!("{}.{}", x, y))
            .collect();
        format!("{}x{}:{}", self.width, self.height, cells.join(";"))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let (dims, body) = match text.split_once(':') {
            Some((dims, body)) => (parse_dimensions(dims)?, body),
            None => ((DEFAULT_PIXEL_GRID, DEFAULT_PIXEL_GRID), text),
        };
        let mut gesture = Self::new(dims.0, dims.1);

        for token in body.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            let bad = || GestureVaultError::InvalidGesture(format!("bad cell '{}'", token));
            let (x, y) = token.split_once('.').ok_or_else(bad)?;
            let x: u8 = x.trim().parse().map_err(|_| bad())?;
            let y: u8 = y.trim().parse().map_err(|_| bad())?;
            if !gesture.toggle_on(x, y) {
                return Err(bad());
            }
        }

        Ok(gesture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_grid_cells_are_dropped() {
        let g = PixelGesture::with_cells(4, 4, [(0, 0), (3, 3), (4, 0)]);
        assert_eq!(g.cells.len(), 2);
    }

    #[test]
    fn test_parse_default_grid() {
        let g = PixelGesture::parse("1.2;0.0").unwrap();
        assert_eq!((g.width, g.height), (8, 8));
        assert_eq!(g.canonical(), "8x8:0.0;1.2");
    }

    #[test]
    fn test_parse_rejects_off_grid() {
        assert!(PixelGesture::parse("2x2:2.0").is_err());
        assert!(PixelGesture::parse("2x2:a.0").is_err());
    }
}
