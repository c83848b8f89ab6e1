//! 8x8 board coordinates and per-cell color grids.

use boardwatch_core::LabColor;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const BOARD_SIZE: usize = 8;

/// Board cell, row 0 = rank 8, column 0 = file a.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    pub fn new(row: usize, col: usize) -> Self {
        debug_assert!(row < BOARD_SIZE && col < BOARD_SIZE);
        Self { row, col }
    }

    /// Parse `"e2"` style names.
    pub fn from_algebraic(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)? as usize;
        if chars.next().is_some() || !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
            return None;
        }
        Some(Self {
            row: BOARD_SIZE - rank,
            col: (file as u8 - b'a') as usize,
        })
    }

    pub fn file(&self) -> char {
        (b'a' + self.col as u8) as char
    }

    pub fn rank(&self) -> usize {
        BOARD_SIZE - self.row
    }

    /// All 64 squares in row-major order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Square { row, col }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

/// Mean Lab color of every board cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardColorGrid {
    pub cells: [[LabColor; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for BoardColorGrid {
    fn default() -> Self {
        Self::filled([0.0; 3])
    }
}

impl BoardColorGrid {
    pub fn filled(color: LabColor) -> Self {
        Self {
            cells: [[color; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    #[inline]
    pub fn get(&self, sq: Square) -> LabColor {
        self.cells[sq.row][sq.col]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, color: LabColor) {
        self.cells[sq.row][sq.col] = color;
    }

    /// Per-channel `self - other`.
    pub fn difference(&self, other: &BoardColorGrid) -> BoardColorGrid {
        let mut out = *self;
        for sq in Square::all() {
            let (a, b) = (self.get(sq), other.get(sq));
            out.set(sq, [a[0] - b[0], a[1] - b[1], a[2] - b[2]]);
        }
        out
    }

    /// Per-channel mean over all cells.
    pub fn mean(&self) -> LabColor {
        let mut acc = [0.0_f64; 3];
        for row in &self.cells {
            for c in row {
                for k in 0..3 {
                    acc[k] += c[k] as f64;
                }
            }
        }
        let n = (BOARD_SIZE * BOARD_SIZE) as f64;
        acc.map(|v| (v / n) as f32)
    }

    /// `alpha * self + (1 - alpha) * prev`.
    pub fn blend(&self, prev: &BoardColorGrid, alpha: f32) -> BoardColorGrid {
        let mut out = *self;
        for sq in Square::all() {
            let (a, b) = (self.get(sq), prev.get(sq));
            out.set(sq, std::array::from_fn(|k| alpha * a[k] + (1.0 - alpha) * b[k]));
        }
        out
    }
}

/// Cell-wise arithmetic mean; `None` for an empty slice.
pub fn average_grids(grids: &[BoardColorGrid]) -> Option<BoardColorGrid> {
    if grids.is_empty() {
        return None;
    }
    let mut acc = [[[0.0_f64; 3]; BOARD_SIZE]; BOARD_SIZE];
    for g in grids {
        for sq in Square::all() {
            let c = g.get(sq);
            for k in 0..3 {
                acc[sq.row][sq.col][k] += c[k] as f64;
            }
        }
    }
    let n = grids.len() as f64;
    let mut out = BoardColorGrid::default();
    for sq in Square::all() {
        out.set(sq, acc[sq.row][sq.col].map(|v| (v / n) as f32));
    }
    Some(out)
}
