//! Per-cell mean Lab color of a rectified board image.

use crate::grid::{average_grids, BoardColorGrid, Square, BOARD_SIZE};
use crate::params::SamplerParams;
use boardwatch_core::{srgb8_to_lab, RgbImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Pixel bounds `[x0, x1) x [y0, y1)` of the sampled region of one cell.
pub fn cell_bounds(
    width: usize,
    height: usize,
    sq: Square,
    margin_ratio: f32,
) -> (usize, usize, usize, usize) {
    let cw = width / BOARD_SIZE;
    let ch = height / BOARD_SIZE;
    let mx = (cw as f32 * margin_ratio) as usize;
    let my = (ch as f32 * margin_ratio) as usize;

    let (x0, y0) = (sq.col * cw, sq.row * ch);
    let (x1, y1) = (x0 + cw, y0 + ch);
    if x1 - x0 > 2 * mx && y1 - y0 > 2 * my {
        (x0 + mx, y0 + my, x1 - mx, y1 - my)
    } else {
        (x0, y0, x1, y1)
    }
}

/// Mean Lab color of each margin-inset cell.
///
/// Works on any image size; a non-square (fallback) image is split into
/// 8x8 equal rectangles. An image smaller than 8x8 yields an all-zero grid.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(width = img.width, height = img.height))
)]
pub fn sample_board(img: &RgbImageView<'_>, params: &SamplerParams) -> BoardColorGrid {
    let mut grid = BoardColorGrid::default();
    if img.width < BOARD_SIZE || img.height < BOARD_SIZE {
        log::warn!("sampler: image {}x{} too small", img.width, img.height);
        return grid;
    }

    for sq in Square::all() {
        let (x0, y0, x1, y1) = cell_bounds(img.width, img.height, sq, params.margin_ratio);
        let mut acc = [0.0_f64; 3];
        for y in y0..y1 {
            for x in x0..x1 {
                let lab = srgb8_to_lab(img.pixel(x, y));
                for k in 0..3 {
                    acc[k] += lab[k] as f64;
                }
            }
        }
        let n = ((x1 - x0) * (y1 - y0)) as f64;
        grid.set(sq, acc.map(|v| (v / n) as f32));
    }
    grid
}

/// Sample several rectified images and average the grids.
pub fn sample_average<'a>(
    images: impl IntoIterator<Item = RgbImageView<'a>>,
    params: &SamplerParams,
) -> Option<BoardColorGrid> {
    let grids: Vec<BoardColorGrid> = images
        .into_iter()
        .map(|img| sample_board(&img, params))
        .collect();
    average_grids(&grids)
}

/// Exponential moving average over single-frame samples.
#[derive(Clone, Debug)]
pub struct GridSmoother {
    alpha: f32,
    state: Option<BoardColorGrid>,
}

impl GridSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    /// Blend `sample` into the running value; the first sample initializes it.
    pub fn push(&mut self, sample: BoardColorGrid) -> BoardColorGrid {
        let next = match &self.state {
            None => sample,
            Some(prev) => sample.blend(prev, self.alpha),
        };
        self.state = Some(next);
        next
    }

    pub fn current(&self) -> Option<&BoardColorGrid> {
        self.state.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
