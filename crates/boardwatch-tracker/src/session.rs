//! The owned tracking session: pipeline state, baseline, board and turn transitions.

use crate::board::{BoardModel, MoveRecord, Side};
use crate::capture::{Camera, FrameSource};
use crate::change::{detect_changes, ChangeReport};
use crate::grid::{average_grids, BoardColorGrid};
use crate::localizer::{BoardLocalizer, LocalizerStrategy};
use crate::params::TrackerParams;
use crate::rectify::{RectifiedBoard, Rectifier};
use crate::resolver::{resolve_move, ResolvedMove};
use crate::sampler::{sample_board, GridSmoother};
use crate::stabilizer::CornerStabilizer;
use crate::store::{BaselineStore, BoardStore, CornerStore, StoreError};
use boardwatch_core::{validate_points, validate_quad, Point2, Quad, QuadRejection, RgbImageView};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("camera produced no usable frame out of {requested}")]
    CaptureFailed { requested: usize },
    #[error("no baseline captured yet")]
    MissingBaseline,
    #[error("invalid board corners: {0}")]
    InvalidCorners(#[from] QuadRejection),
}

/// Where the session keeps its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPaths {
    pub baseline: PathBuf,
    pub board: PathBuf,
    pub corners: PathBuf,
}

impl SessionPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            baseline: dir.join("baseline.json"),
            board: dir.join("board.json"),
            corners: dir.join("corners.json"),
        }
    }
}

/// Everything one completed turn produced.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub mover: Side,
    pub resolved: ResolvedMove,
    pub record: MoveRecord,
    pub report: ChangeReport,
    /// Frames that made it into the averaged sample.
    pub frames: usize,
}

/// Session shared between request handlers; the lock serializes transitions.
pub type SharedSession = Arc<Mutex<BoardTrackingSession>>;

pub struct BoardTrackingSession {
    params: TrackerParams,
    localizer: BoardLocalizer,
    stabilizer: CornerStabilizer,
    rectifier: Rectifier,
    live: GridSmoother,
    baseline: Option<BoardColorGrid>,
    board: BoardModel,
    baseline_store: BaselineStore,
    board_store: BoardStore,
    corner_store: CornerStore,
}

/// Log a persistence failure and carry on with the in-memory state.
fn keep_going<T>(what: &str, res: Result<T, StoreError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("session: {what} failed: {e}");
            None
        }
    }
}

impl BoardTrackingSession {
    /// Open a session, restoring whatever state files exist.
    ///
    /// Missing or unreadable files fall back to defaults: no baseline, the
    /// standard starting position and automatic corner detection.
    pub fn open(paths: SessionPaths, params: TrackerParams) -> Self {
        let baseline_store = BaselineStore::new(paths.baseline);
        let board_store = BoardStore::new(paths.board);
        let corner_store = CornerStore::new(paths.corners);

        let baseline = keep_going("loading baseline", baseline_store.load()).flatten();
        let board = keep_going("loading board", board_store.load())
            .flatten()
            .unwrap_or_else(BoardModel::standard);
        let corners = keep_going("loading corners", corner_store.load()).flatten();

        let mut session = Self {
            localizer: BoardLocalizer::new(LocalizerStrategy::Markers, params.localizer.clone()),
            stabilizer: CornerStabilizer::new(params.stabilizer.clone()),
            rectifier: Rectifier::new(params.rectify.clone()),
            live: GridSmoother::new(params.sampler.live_ema_alpha),
            params,
            baseline,
            board,
            baseline_store,
            board_store,
            corner_store,
        };

        if let Some(q) = corners {
            match validate_quad(&q, &session.params.quad) {
                Ok(_) => session.use_manual_quad(q),
                Err(e) => log::warn!("session: ignoring stored corners: {e}"),
            }
        }

        log::info!(
            "session: opened (baseline: {}, turn: {}, moves: {}, manual corners: {})",
            session.baseline.is_some(),
            session.board.turn,
            session.board.move_history.len(),
            session.localizer.manual_quad().is_some()
        );
        session
    }

    /// [`Self::open`] with the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, params: TrackerParams) -> Self {
        Self::open(SessionPaths::in_dir(dir), params)
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    pub fn baseline(&self) -> Option<&BoardColorGrid> {
        self.baseline.as_ref()
    }

    pub fn turn(&self) -> Side {
        self.board.turn
    }

    pub fn manual_corners(&self) -> Option<Quad> {
        self.localizer.manual_quad()
    }

    /// Current confident board quad, if any.
    pub fn board_quad(&self) -> Option<Quad> {
        self.stabilizer.get()
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    fn use_manual_quad(&mut self, quad: Quad) {
        self.localizer.set_strategy(LocalizerStrategy::Manual(quad));
        self.stabilizer.seed(quad);
        self.rectifier.reset();
    }

    /// Order, validate and store four operator-picked corners.
    pub fn set_manual_corners(&mut self, points: &[Point2<f32>]) -> Result<Quad, SessionError> {
        let quad = Quad::from_points(points).ok_or(QuadRejection::WrongPointCount {
            got: points.len(),
        })?;
        validate_points(&quad.corners, &self.params.quad)?;

        self.use_manual_quad(quad);
        keep_going("saving corners", self.corner_store.save(&quad));
        log::info!("session: manual corners set to {:?}", quad.to_array());
        Ok(quad)
    }

    /// Go back to automatic marker detection.
    pub fn clear_manual_corners(&mut self) {
        self.localizer.set_strategy(LocalizerStrategy::Markers);
        self.stabilizer.reset();
        self.rectifier.reset();
        keep_going("removing corners", self.corner_store.clear());
        log::info!("session: manual corners cleared");
    }

    /// Per-frame tick: localize, stabilize, rectify.
    pub fn observe(&mut self, frame: &RgbImageView<'_>) -> RectifiedBoard {
        let candidate = self.localizer.detect_quad(frame).and_then(|q| {
            match validate_quad(&q, &self.params.quad) {
                Ok(_) => Some(q),
                Err(reason) => {
                    log::debug!("session: quad rejected: {reason}");
                    None
                }
            }
        });
        let stable = self.stabilizer.update(candidate);
        let rectified = self.rectifier.rectify(frame, stable);
        if rectified.is_fallback() {
            log::debug!("session: no board quad, using full-frame fallback");
        }
        rectified
    }

    /// Live single-frame sample smoothed over time and compared to the baseline.
    pub fn monitor(&mut self, frame: &RgbImageView<'_>) -> (RectifiedBoard, Option<ChangeReport>) {
        let rectified = self.observe(frame);
        let sample = sample_board(&rectified.image.view(), &self.params.sampler);
        let smoothed = self.live.push(sample);
        let report = self
            .baseline
            .as_ref()
            .map(|b| detect_changes(&smoothed, b, &self.params.change));
        (rectified, report)
    }

    /// Burst-capture, rectify and average one color grid.
    pub fn capture_grid<S: FrameSource>(
        &mut self,
        camera: &Camera<S>,
    ) -> Result<BoardColorGrid, SessionError> {
        self.capture_burst(camera).map(|(grid, _)| grid)
    }

    fn capture_burst<S: FrameSource>(
        &mut self,
        camera: &Camera<S>,
    ) -> Result<(BoardColorGrid, usize), SessionError> {
        let requested = self.params.sampler.frames.max(1);
        let delay = Duration::from_millis(self.params.sampler.frame_delay_ms);
        let frames = camera.burst(requested, delay);

        // fallback samples only count when no frame was rectified with a quad
        let mut rectified = Vec::with_capacity(frames.len());
        let mut fallback = Vec::new();
        for frame in &frames {
            let board = self.observe(&frame.view());
            let grid = sample_board(&board.image.view(), &self.params.sampler);
            if board.is_fallback() {
                fallback.push(grid);
            } else {
                rectified.push(grid);
            }
        }
        let grids = if rectified.is_empty() {
            fallback
        } else {
            rectified
        };

        log::debug!(
            "session: sampled {}/{} frames ({} read)",
            grids.len(),
            requested,
            frames.len()
        );
        let grid = average_grids(&grids).ok_or(SessionError::CaptureFailed { requested })?;
        Ok((grid, grids.len()))
    }

    fn replace_baseline(&mut self, grid: BoardColorGrid) {
        self.baseline = Some(grid);
        self.live.reset();
        keep_going("saving baseline", self.baseline_store.save(&grid));
    }

    /// Capture the current board appearance as the new baseline.
    pub fn set_reference<S: FrameSource>(
        &mut self,
        camera: &Camera<S>,
    ) -> Result<BoardColorGrid, SessionError> {
        let grid = self.capture_grid(camera)?;
        self.replace_baseline(grid);
        log::info!("session: reference captured");
        Ok(grid)
    }

    /// Capture a baseline and reset the board to the starting position.
    pub fn new_game<S: FrameSource>(
        &mut self,
        camera: &Camera<S>,
    ) -> Result<BoardColorGrid, SessionError> {
        let grid = self.capture_grid(camera)?;
        self.board = BoardModel::standard();
        self.replace_baseline(grid);
        keep_going("saving board", self.board_store.save(&self.board));
        log::info!("session: new game");
        Ok(grid)
    }

    /// Resolve the move just played and advance the turn.
    ///
    /// Nothing is committed unless the capture succeeds. The averaged grid
    /// of the same burst becomes the next baseline.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn complete_turn<S: FrameSource>(
        &mut self,
        camera: &Camera<S>,
    ) -> Result<TurnOutcome, SessionError> {
        let baseline = self.baseline.ok_or(SessionError::MissingBaseline)?;
        let (grid, frames) = self.capture_burst(camera)?;

        let report = detect_changes(&grid, &baseline, &self.params.change);
        let mover = self.board.turn;
        let resolved = resolve_move(&report, &self.board.pieces, mover, &self.params.resolver);

        let record = self.board.apply_move(resolved.src, resolved.dst);
        self.board.record_turn(&record);
        if record.ambiguous {
            log::warn!("session: ambiguous move {}", record.notation);
        } else {
            log::info!("session: {} played {}", mover, record.notation);
        }

        keep_going("saving board", self.board_store.save(&self.board));
        self.replace_baseline(grid);

        Ok(TurnOutcome {
            mover,
            resolved,
            record,
            report,
            frames,
        })
    }
}
