//! Board-state tracking and move inference from a fixed overhead camera.
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardwatch_tracker::{BoardTrackingSession, Camera, TrackerParams};
//! use boardwatch_core::RgbImage;
//!
//! let camera = Camera::new(|| Some(RgbImage::filled(640, 480, [128, 128, 128])));
//! let mut session = BoardTrackingSession::in_dir(".boardwatch", TrackerParams::default());
//! session.new_game(&camera)?;
//! // ... a move is played on the physical board ...
//! let outcome = session.complete_turn(&camera)?;
//! println!("{}", outcome.record.notation);
//! # Ok::<(), boardwatch_tracker::SessionError>(())
//! ```
//!
//! Pipeline per turn transition:
//! 1. Localize the board quad (manual corners or four colored markers).
//! 2. Stabilize it over time (median of history, EMA, debounce).
//! 3. Rectify each frame of a short burst into a square top-down image.
//! 4. Average per-cell Lab colors over the burst.
//! 5. Detrend against the baseline and pick an adaptive threshold.
//! 6. Pair the strongest cells into a source/destination move.
//! 7. Update the board, then adopt the same burst as the new baseline.

mod board;
mod capture;
mod change;
mod grid;
mod localizer;
mod overlay;
mod params;
mod rectify;
mod resolver;
mod sampler;
mod session;
mod stabilizer;
mod store;

pub use board::{BoardModel, MoveRecord, Piece, PieceKind, Pieces, Side};
pub use capture::{spawn_reader, Camera, FrameSource, LatestFrame, ReaderHandle};
pub use change::{detect_changes, ChangeReport, MoveCandidate};
pub use grid::{average_grids, BoardColorGrid, Square, BOARD_SIZE};
pub use localizer::{
    close3, dedup_points, detect_marker_quad, label_blobs, marker_mask, open3, Blob,
    BoardLocalizer, LocalizerStrategy, Mask,
};
pub use overlay::render_overlay;
pub use params::{
    ChangeParams, DeviationNorm, MarkerParams, ParamsError, RectifyParams, ResolverParams,
    SamplerParams, StabilizerParams, TrackerParams,
};
pub use rectify::{RectifiedBoard, Rectifier, RectifySource};
pub use resolver::{resolve_move, ResolvedMove};
pub use sampler::{cell_bounds, sample_average, sample_board, GridSmoother};
pub use session::{BoardTrackingSession, SessionError, SessionPaths, SharedSession, TurnOutcome};
pub use stabilizer::{CornerStabilizer, StabilizerEvent};
pub use store::{BaselineStore, BoardStore, CornerStore, StoreError};
