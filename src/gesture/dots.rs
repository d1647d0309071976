//! Dot-connecting gestures on a rectangular grid of dots

use super::parse_dimensions;
use crate::error::{GestureVaultError, Result};

/// An ordered path through dots numbered row-major from the top-left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotGesture {
    pub columns: u8,
    pub rows: u8,
    pub sequence: Vec<u8>,
}

impl DotGesture {
    /// A gesture on a square grid
    pub fn on_grid(size: u8, sequence: Vec<u8>) -> Self {
        Self {
            columns: size,
            rows: size,
            sequence,
        }
    }

    /// Column/row of a dot id
    pub fn position(&self, dot: u8) -> (i32, i32) {
        let columns = self.columns.max(1) as i32;
        (dot as i32 % columns, dot as i32 / columns)
    }

    pub(crate) fn canonical(&self) -> String {
        let ids: Vec<String> = self.sequence.iter().map(|d| d.to_string()).collect();
        ids.join("-")
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let (size, path) = match text.split_once(':') {
            Some((dims, path)) => (parse_dimensions(dims)?, path),
            None => ((3, 3), text),
        };

        let mut gesture = Self {
            columns: size.0,
            rows: size.1,
            sequence: Vec::new(),
        };
        let dot_count = size.0 as u16 * size.1 as u16;

        for token in path.split('-').map(str::trim).filter(|t| !t.is_empty()) {
            let dot: u8 = token
                .parse()
                .map_err(|_| GestureVaultError::InvalidGesture(format!("bad dot '{}'", token)))?;
            if dot as u16 >= dot_count {
                return Err(GestureVaultError::InvalidGesture(format!(
                    "dot {} outside {}x{} grid",
                    dot, size.0, size.1
                )));
            }
            if gesture.sequence.contains(&dot) {
                return Err(GestureVaultError::InvalidGesture(format!(
                    "dot {} visited twice",
                    dot
                )));
            }
            gesture.sequence.push(dot);
        }

        Ok(gesture)
    }
}
