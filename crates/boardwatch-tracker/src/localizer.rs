//! Raw per-frame board quad candidates.
//!
//! Two strategies sit behind [`BoardLocalizer::detect_quad`]:
//! - `Manual`: an operator-supplied quad reused for every frame,
//! - `Markers`: four colored corner markers found by HSV segmentation,
//!   blob labelling and centroid deduplication.
//!
//! The localizer never guesses: anything other than exactly four marker
//! centroids is reported as `None`.

use crate::params::MarkerParams;
use boardwatch_core::{srgb8_to_hsv, Point2, Quad, RgbImageView};
use std::collections::VecDeque;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq)]
pub enum LocalizerStrategy {
    Manual(Quad),
    Markers,
}

#[derive(Clone, Debug)]
pub struct BoardLocalizer {
    strategy: LocalizerStrategy,
    markers: MarkerParams,
}

impl BoardLocalizer {
    pub fn new(strategy: LocalizerStrategy, markers: MarkerParams) -> Self {
        Self { strategy, markers }
    }

    pub fn strategy(&self) -> &LocalizerStrategy {
        &self.strategy
    }

    pub fn set_strategy(&mut self, strategy: LocalizerStrategy) {
        self.strategy = strategy;
    }

    pub fn manual_quad(&self) -> Option<Quad> {
        match self.strategy {
            LocalizerStrategy::Manual(q) => Some(q),
            LocalizerStrategy::Markers => None,
        }
    }

    /// Candidate board quad for this frame, ordered TL, TR, BR, BL.
    pub fn detect_quad(&self, frame: &RgbImageView<'_>) -> Option<Quad> {
        match &self.strategy {
            LocalizerStrategy::Manual(q) => Some(*q),
            LocalizerStrategy::Markers => detect_marker_quad(frame, &self.markers),
        }
    }
}

/// Connected region of the marker mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blob {
    pub area: usize,
    pub centroid: Point2<f32>,
}

/// Binary mask, row-major, `true` = marker colored.
#[derive(Clone, Debug)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl Mask {
    #[inline]
    fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    pub fn fill_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().filter(|&&v| v).count() as f32 / self.data.len() as f32
    }
}

/// Find the four corner markers and order them.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(frame, params),
        fields(width = frame.width, height = frame.height)
    )
)]
pub fn detect_marker_quad(frame: &RgbImageView<'_>, params: &MarkerParams) -> Option<Quad> {
    let mut mask = marker_mask(frame, params);
    if params.morphology {
        mask = close3(&open3(&mask));
    }

    let mut blobs = label_blobs(&mask);
    blobs.sort_by(|a, b| b.area.cmp(&a.area));
    blobs.truncate(params.max_blobs);

    let centers: Vec<Point2<f32>> = blobs
        .iter()
        .filter(|b| b.area >= params.min_blob_area)
        .map(|b| b.centroid)
        .collect();
    let centers = dedup_points(&centers, params.dedup_distance);

    log::debug!(
        "markers: fill={:.3} blobs={} centers={}",
        mask.fill_ratio(),
        blobs.len(),
        centers.len()
    );

    Quad::from_points(&centers)
}

/// Threshold the frame in HSV against the marker band.
pub fn marker_mask(frame: &RgbImageView<'_>, params: &MarkerParams) -> Mask {
    let mut data = Vec::with_capacity(frame.width * frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let hsv = srgb8_to_hsv(frame.pixel(x, y));
            let inside = (params.hue_min..=params.hue_max).contains(&hsv.hue)
                && (params.saturation_min..=params.saturation_max).contains(&hsv.saturation)
                && (params.value_min..=params.value_max).contains(&hsv.value);
            data.push(inside);
        }
    }
    Mask {
        width: frame.width,
        height: frame.height,
        data,
    }
}

fn morph3(mask: &Mask, dilate: bool) -> Mask {
    let mut data = vec![false; mask.data.len()];
    for y in 0..mask.height as i64 {
        for x in 0..mask.width as i64 {
            let mut hit = !dilate;
            'window: for dy in -1..=1 {
                for dx in -1..=1 {
                    let v = mask.get(x + dx, y + dy);
                    if dilate && v {
                        hit = true;
                        break 'window;
                    }
                    if !dilate && !v {
                        hit = false;
                        break 'window;
                    }
                }
            }
            data[y as usize * mask.width + x as usize] = hit;
        }
    }
    Mask {
        width: mask.width,
        height: mask.height,
        data,
    }
}

/// 3x3 erosion followed by dilation: drops speckles.
pub fn open3(mask: &Mask) -> Mask {
    morph3(&morph3(mask, false), true)
}

/// 3x3 dilation followed by erosion: fills pinholes.
pub fn close3(mask: &Mask) -> Mask {
    morph3(&morph3(mask, true), false)
}

/// 8-connected components with pixel-count area and centroid.
pub fn label_blobs(mask: &Mask) -> Vec<Blob> {
    let mut seen = vec![false; mask.data.len()];
    let mut blobs = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..mask.data.len() {
        if !mask.data[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);

        let mut area = 0usize;
        let mut sx = 0.0_f64;
        let mut sy = 0.0_f64;

        while let Some(idx) = queue.pop_front() {
            let x = (idx % mask.width) as i64;
            let y = (idx / mask.width) as i64;
            area += 1;
            sx += x as f64 + 0.5;
            sy += y as f64 + 0.5;

            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if !mask.get(nx, ny) {
                        continue;
                    }
                    let n = ny as usize * mask.width + nx as usize;
                    if !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }

        blobs.push(Blob {
            area,
            centroid: Point2::new((sx / area as f64) as f32, (sy / area as f64) as f32),
        });
    }

    blobs
}

/// Keep the first of every group of points closer than `min_dist`.
pub fn dedup_points(pts: &[Point2<f32>], min_dist: f32) -> Vec<Point2<f32>> {
    let mut out: Vec<Point2<f32>> = Vec::with_capacity(pts.len());
    for p in pts {
        if out.iter().all(|q| (p - q).norm() > min_dist) {
            out.push(*p);
        }
    }
    out
}
