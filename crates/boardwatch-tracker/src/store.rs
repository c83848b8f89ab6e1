//! JSON-file persistence for the baseline, the board model and manual corners.

use crate::board::{BoardModel, Piece, Pieces, Side};
use crate::grid::{BoardColorGrid, BOARD_SIZE};
use boardwatch_core::{Point2, Quad};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{what}: {detail}")]
    Shape { what: &'static str, detail: String },
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// `Ok(None)` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reference colors as an 8x8x3 Lab array.
#[derive(Clone, Debug)]
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<BoardColorGrid>, StoreError> {
        let Some(raw) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let nested: Vec<Vec<Vec<f32>>> = serde_json::from_str(&raw)?;
        grid_from_nested(&nested).map(Some)
    }

    pub fn save(&self, grid: &BoardColorGrid) -> Result<(), StoreError> {
        write_pretty(&self.path, grid)
    }
}

fn shape_err(what: &'static str, detail: impl Into<String>) -> StoreError {
    StoreError::Shape {
        what,
        detail: detail.into(),
    }
}

fn grid_from_nested(nested: &[Vec<Vec<f32>>]) -> Result<BoardColorGrid, StoreError> {
    if nested.len() != BOARD_SIZE {
        return Err(shape_err("baseline", format!("{} rows", nested.len())));
    }
    let mut grid = BoardColorGrid::default();
    for (r, row) in nested.iter().enumerate() {
        if row.len() != BOARD_SIZE {
            return Err(shape_err("baseline", format!("row {r} has {} cells", row.len())));
        }
        for (c, cell) in row.iter().enumerate() {
            let lab: [f32; 3] = cell.as_slice().try_into().map_err(|_| {
                shape_err("baseline", format!("cell ({r},{c}) has {} channels", cell.len()))
            })?;
            grid.cells[r][c] = lab;
        }
    }
    Ok(grid)
}

#[derive(Serialize, Deserialize)]
struct BoardFile {
    pieces: Vec<Vec<String>>,
    #[serde(default)]
    turn: Side,
    #[serde(default)]
    move_history: Vec<String>,
}

/// A full board file, or a bare 8x8 code array (white to move, empty log).
#[derive(Deserialize)]
#[serde(untagged)]
enum BoardRepr {
    Full(BoardFile),
    Bare(Vec<Vec<String>>),
}

#[derive(Clone, Debug)]
pub struct BoardStore {
    path: PathBuf,
}

impl BoardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<BoardModel>, StoreError> {
        let Some(raw) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let file = match serde_json::from_str::<BoardRepr>(&raw)? {
            BoardRepr::Full(f) => f,
            BoardRepr::Bare(pieces) => BoardFile {
                pieces,
                turn: Side::White,
                move_history: Vec::new(),
            },
        };
        Ok(Some(BoardModel {
            pieces: pieces_from_codes(&file.pieces)?,
            turn: file.turn,
            move_history: file.move_history,
        }))
    }

    pub fn save(&self, board: &BoardModel) -> Result<(), StoreError> {
        let file = BoardFile {
            pieces: board.piece_codes(),
            turn: board.turn,
            move_history: board.move_history.clone(),
        };
        write_pretty(&self.path, &file)
    }
}

fn pieces_from_codes(codes: &[Vec<String>]) -> Result<Pieces, StoreError> {
    if codes.len() != BOARD_SIZE {
        return Err(shape_err("board", format!("{} rows", codes.len())));
    }
    let mut pieces: Pieces = [[None; BOARD_SIZE]; BOARD_SIZE];
    for (r, row) in codes.iter().enumerate() {
        if row.len() != BOARD_SIZE {
            return Err(shape_err("board", format!("row {r} has {} cells", row.len())));
        }
        for (c, code) in row.iter().enumerate() {
            if code.is_empty() {
                continue;
            }
            let piece = Piece::from_code(code)
                .ok_or_else(|| shape_err("board", format!("unknown piece code {code:?}")))?;
            pieces[r][c] = Some(piece);
        }
    }
    Ok(pieces)
}

/// Operator-supplied board corners for the manual localizer.
#[derive(Clone, Debug)]
pub struct CornerStore {
    path: PathBuf,
}

impl CornerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Quad>, StoreError> {
        let Some(raw) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let pts: Vec<[f32; 2]> = serde_json::from_str(&raw)?;
        let pts: Vec<Point2<f32>> = pts.iter().map(|p| Point2::new(p[0], p[1])).collect();
        Quad::from_points(&pts)
            .map(Some)
            .ok_or_else(|| shape_err("corners", format!("{} points", pts.len())))
    }

    pub fn save(&self, quad: &Quad) -> Result<(), StoreError> {
        write_pretty(&self.path, &quad.to_array())
    }

    /// Remove the file; a missing file is not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
