//! Baseline-relative per-cell change detection.

use crate::grid::{BoardColorGrid, Square, BOARD_SIZE};
use crate::params::{ChangeParams, DeviationNorm};
use boardwatch_core::{chroma_norm, lab_norm, LabColor};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A cell and how far it moved away from the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MoveCandidate {
    pub square: Square,
    pub deviation: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChangeReport {
    /// Detrended per-channel deltas, zero-mean over the board.
    pub deltas: BoardColorGrid,
    pub deviations: [[f32; BOARD_SIZE]; BOARD_SIZE],
    pub threshold: f32,
    pub mean: f32,
    pub stddev: f32,
}

impl ChangeReport {
    #[inline]
    pub fn deviation(&self, sq: Square) -> f32 {
        self.deviations[sq.row][sq.col]
    }

    pub fn is_significant(&self, sq: Square) -> bool {
        self.deviation(sq) >= self.threshold
    }

    /// All 64 cells ordered by deviation, largest first; ties keep row-major order.
    pub fn ranked(&self) -> Vec<MoveCandidate> {
        let mut out: Vec<MoveCandidate> = Square::all()
            .map(|square| MoveCandidate {
                square,
                deviation: self.deviation(square),
            })
            .collect();
        out.sort_by(|a, b| b.deviation.total_cmp(&a.deviation));
        out
    }

    pub fn significant(&self) -> Vec<MoveCandidate> {
        self.ranked()
            .into_iter()
            .filter(|c| c.deviation >= self.threshold)
            .collect()
    }

    /// No cell clears the threshold.
    pub fn is_static(&self) -> bool {
        Square::all().all(|sq| !self.is_significant(sq))
    }
}

fn norm_of(v: &LabColor, norm: DeviationNorm) -> f32 {
    match norm {
        DeviationNorm::Chroma => chroma_norm(v),
        DeviationNorm::Full => lab_norm(v),
    }
}

/// Compare `current` against `baseline` and derive the adaptive threshold.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn detect_changes(
    current: &BoardColorGrid,
    baseline: &BoardColorGrid,
    params: &ChangeParams,
) -> ChangeReport {
    let raw = current.difference(baseline);
    let trend = raw.mean();

    let mut deltas = raw;
    for sq in Square::all() {
        let d = raw.get(sq);
        deltas.set(sq, std::array::from_fn(|k| d[k] - trend[k]));
    }

    let mut deviations = [[0.0_f32; BOARD_SIZE]; BOARD_SIZE];
    for sq in Square::all() {
        deviations[sq.row][sq.col] = norm_of(&deltas.get(sq), params.norm);
    }

    let (mean, stddev) = mean_std(deviations.iter().flatten().copied());
    let threshold = params.floor.max(mean + params.k * stddev);

    log::debug!(
        "change: trend=({:.2},{:.2},{:.2}) mean={:.2} std={:.2} tau={:.2}",
        trend[0],
        trend[1],
        trend[2],
        mean,
        stddev,
        threshold
    );

    ChangeReport {
        deltas,
        deviations,
        threshold,
        mean,
        stddev,
    }
}

/// Population mean and standard deviation.
fn mean_std(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let v: Vec<f64> = values.map(f64::from).collect();
    if v.is_empty() {
        return (0.0, 0.0);
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let var = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
    (mean as f32, var.sqrt() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pseudo_random_grid(seed: u32) -> BoardColorGrid {
        let mut g = BoardColorGrid::default();
        let mut s = seed;
        for sq in Square::all() {
            let mut next = || {
                s = s.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (s >> 8) as f32 / (1u32 << 24) as f32
            };
            g.set(sq, [100.0 * next(), 60.0 * next() - 30.0, 60.0 * next() - 30.0]);
        }
        g
    }

    #[test]
    fn detrended_deltas_are_zero_mean() {
        for seed in [1, 7, 42, 1234] {
            let r = detect_changes(
                &pseudo_random_grid(seed),
                &pseudo_random_grid(seed + 100),
                &ChangeParams::default(),
            );
            let m = r.deltas.mean();
            for k in 0..3 {
                assert_abs_diff_eq!(m[k], 0.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn global_shift_is_not_a_change() {
        let base = pseudo_random_grid(3);
        let mut cur = base;
        for sq in Square::all() {
            let c = cur.get(sq);
            cur.set(sq, [c[0] + 12.0, c[1] + 5.0, c[2] - 4.0]);
        }
        let r = detect_changes(&cur, &base, &ChangeParams::default());
        assert!(r.is_static());
        assert_abs_diff_eq!(r.threshold, 3.0);
    }

    #[test]
    fn identical_grids_have_zero_deviation_and_floor_threshold() {
        let g = pseudo_random_grid(5);
        let r = detect_changes(&g, &g, &ChangeParams::default());
        assert!(r.deviations.iter().flatten().all(|&d| d == 0.0));
        assert_eq!(r.threshold, 3.0);
        assert!(r.is_static());
    }

    #[test]
    fn two_changed_cells_rank_first() {
        let base = BoardColorGrid::filled([50.0, 0.0, 0.0]);
        let mut cur = base;
        cur.set(Square::new(6, 4), [50.0, 25.0, 10.0]);
        cur.set(Square::new(4, 4), [50.0, -20.0, 15.0]);
        let r = detect_changes(&cur, &base, &ChangeParams::default());
        let sig = r.significant();
        assert_eq!(sig.len(), 2);
        let mut squares: Vec<Square> = sig.iter().map(|c| c.square).collect();
        squares.sort();
        assert_eq!(squares, vec![Square::new(4, 4), Square::new(6, 4)]);
    }

    #[test]
    fn chroma_norm_ignores_lightness() {
        let base = BoardColorGrid::filled([50.0, 0.0, 0.0]);
        let mut cur = base;
        cur.set(Square::new(0, 0), [90.0, 0.0, 0.0]);
        let chroma = detect_changes(&cur, &base, &ChangeParams::default());
        let full = detect_changes(
            &cur,
            &base,
            &ChangeParams {
                norm: DeviationNorm::Full,
                ..ChangeParams::default()
            },
        );
        assert!(chroma.is_static());
        assert!(full.is_significant(Square::new(0, 0)));
    }

    #[test]
    fn threshold_does_not_drop_when_spread_grows() {
        // deviations 10 +/- s around a fixed mean, built directly in the a channel
        let base = BoardColorGrid::default();
        let mut last = 0.0;
        for spread in [0.0_f32, 2.0, 4.0, 8.0] {
            let mut cur = BoardColorGrid::default();
            for (i, sq) in Square::all().enumerate() {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                let dev = 10.0 + sign * spread;
                // alternate direction so the board-wide mean delta stays zero
                let dir = if (i / 2) % 2 == 0 { 1.0 } else { -1.0 };
                cur.set(sq, [0.0, dir * dev, 0.0]);
            }
            let r = detect_changes(&cur, &base, &ChangeParams::default());
            assert_abs_diff_eq!(r.mean, 10.0, epsilon = 1e-3);
            assert!(r.threshold >= last, "{} < {}", r.threshold, last);
            last = r.threshold;
        }
    }
}
