//! Logical board: piece array, side to move and move log.

use crate::grid::{Square, BOARD_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    fn code(self) -> char {
        match self {
            Side::White => 'W',
            Side::Black => 'B',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::White => "white",
            Side::Black => "black",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            'P' => PieceKind::Pawn,
            'N' => PieceKind::Knight,
            'B' => PieceKind::Bishop,
            'R' => PieceKind::Rook,
            'Q' => PieceKind::Queen,
            'K' => PieceKind::King,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub side: Side,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(side: Side, kind: PieceKind) -> Self {
        Self { side, kind }
    }

    /// Two-letter code, e.g. `"WP"` or `"BK"`.
    pub fn code(&self) -> String {
        format!("{}{}", self.side.code(), self.kind.letter())
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let side = match chars.next()? {
            'W' | 'w' => Side::White,
            'B' | 'b' => Side::Black,
            _ => return None,
        };
        let kind = PieceKind::from_letter(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self { side, kind })
    }

    /// FEN letter: uppercase for white, lowercase for black.
    pub fn fen(&self) -> char {
        match self.side {
            Side::White => self.kind.letter(),
            Side::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }
}

pub type Pieces = [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE];

/// Outcome of applying a resolved square pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    pub notation: String,
    pub ambiguous: bool,
    /// Squares in the direction the piece actually travelled.
    pub from: Square,
    pub to: Square,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardModel {
    pub pieces: Pieces,
    pub turn: Side,
    pub move_history: Vec<String>,
}

impl Default for BoardModel {
    fn default() -> Self {
        Self::standard()
    }
}

impl BoardModel {
    /// Standard starting position, white to move.
    pub fn standard() -> Self {
        use PieceKind::*;
        const BACK: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        let mut pieces: Pieces = [[None; BOARD_SIZE]; BOARD_SIZE];
        for col in 0..BOARD_SIZE {
            pieces[0][col] = Some(Piece::new(Side::Black, BACK[col]));
            pieces[1][col] = Some(Piece::new(Side::Black, Pawn));
            pieces[6][col] = Some(Piece::new(Side::White, Pawn));
            pieces[7][col] = Some(Piece::new(Side::White, BACK[col]));
        }
        Self {
            pieces,
            turn: Side::White,
            move_history: Vec::new(),
        }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.pieces[sq.row][sq.col]
    }

    #[inline]
    pub fn set_piece(&mut self, sq: Square, piece: Option<Piece>) {
        self.pieces[sq.row][sq.col] = piece;
    }

    /// Relocate a piece along the resolved pair.
    ///
    /// An occupied `src` with empty `dst` moves forward; an empty `src` with
    /// occupied `dst` is read as the detection order being swapped. Anything
    /// else is ambiguous: the `src` piece (if any) still lands on `dst`.
    pub fn apply_move(&mut self, src: Square, dst: Square) -> MoveRecord {
        match (self.piece_at(src), self.piece_at(dst)) {
            (Some(p), None) => {
                self.set_piece(dst, Some(p));
                self.set_piece(src, None);
                MoveRecord {
                    notation: format!("{} {}-{}", p.fen(), src, dst),
                    ambiguous: false,
                    from: src,
                    to: dst,
                }
            }
            (None, Some(p)) => {
                self.set_piece(src, Some(p));
                self.set_piece(dst, None);
                MoveRecord {
                    notation: format!("{} {}-{}", p.fen(), dst, src),
                    ambiguous: false,
                    from: dst,
                    to: src,
                }
            }
            (moving, _) => {
                if let Some(p) = moving {
                    if src != dst {
                        self.set_piece(dst, Some(p));
                        self.set_piece(src, None);
                    }
                }
                MoveRecord {
                    notation: format!("? {}<->{}", src, dst),
                    ambiguous: true,
                    from: src,
                    to: dst,
                }
            }
        }
    }

    /// Log the move and hand the turn to the other side.
    pub fn record_turn(&mut self, record: &MoveRecord) {
        self.move_history.push(record.notation.clone());
        self.turn = self.turn.opponent();
    }

    /// Two-letter codes, `""` for empty squares.
    pub fn piece_codes(&self) -> Vec<Vec<String>> {
        self.pieces
            .iter()
            .map(|row| {
                row.iter()
                    .map(|p| p.map(|p| p.code()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.pieces.iter().enumerate() {
            write!(f, "{} ", BOARD_SIZE - row)?;
            for p in cells {
                let c = p.map(|p| p.fen()).unwrap_or('.');
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {}", (b'a' + col as u8) as char)?;
        }
        Ok(())
    }
}
