//! Debug rendering on top of a rectified board image.

use crate::change::ChangeReport;
use crate::grid::{Square, BOARD_SIZE};
use crate::resolver::ResolvedMove;
use boardwatch_core::RgbImage;

const SIGNIFICANT: [u8; 3] = [230, 40, 40];
const QUIET: [u8; 3] = [240, 200, 40];
const SOURCE: [u8; 3] = [40, 200, 60];
const DESTINATION: [u8; 3] = [40, 120, 240];

/// Copy of `rectified` with a deviation bar per cell and the resolved pair outlined.
///
/// Bars run along the bottom of each cell, their length scaled to the
/// largest deviation on the board. Cells at or above the threshold get a
/// red bar, the rest yellow.
pub fn render_overlay(
    rectified: &RgbImage,
    report: &ChangeReport,
    highlight: Option<&ResolvedMove>,
) -> RgbImage {
    let mut out = rectified.clone();
    let cw = out.width / BOARD_SIZE;
    let ch = out.height / BOARD_SIZE;
    if cw < 4 || ch < 4 {
        return out;
    }

    let max_dev = report
        .deviations
        .iter()
        .flatten()
        .copied()
        .fold(report.threshold, f32::max)
        .max(f32::EPSILON);

    let bar_h = (ch / 8).max(2);
    for sq in Square::all() {
        let d = report.deviation(sq);
        let len = ((d / max_dev).clamp(0.0, 1.0) * (cw - 2) as f32).round() as usize;
        if len == 0 {
            continue;
        }
        let color = if report.is_significant(sq) {
            SIGNIFICANT
        } else {
            QUIET
        };
        let x0 = sq.col * cw + 1;
        let y1 = (sq.row + 1) * ch - 1;
        out.fill_rect(x0, y1 - bar_h, x0 + len, y1, color);
    }

    if let Some(m) = highlight {
        outline(&mut out, m.src, cw, ch, SOURCE);
        outline(&mut out, m.dst, cw, ch, DESTINATION);
    }
    out
}

fn outline(img: &mut RgbImage, sq: Square, cw: usize, ch: usize, color: [u8; 3]) {
    let t = 2;
    let (x0, y0) = (sq.col * cw, sq.row * ch);
    let (x1, y1) = (x0 + cw, y0 + ch);
    img.fill_rect(x0, y0, x1, y0 + t, color);
    img.fill_rect(x0, y1 - t, x1, y1, color);
    img.fill_rect(x0, y0, x0 + t, y1, color);
    img.fill_rect(x1 - t, y0, x1, y1, color);
}
