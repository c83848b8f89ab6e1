//! Tunable parameters for every pipeline stage, loadable from JSON.

use boardwatch_core::QuadValidationParams;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ParamsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Temporal smoothing of detected board corners.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// Ring buffer length for the element-wise median.
    pub history: usize,
    /// Blend factor of the fresh median into the running estimate.
    pub ema_alpha: f32,
    /// Mean per-corner displacement (px) above which a candidate is an outlier.
    pub max_jump: f32,
    /// Consecutive accepted updates before the estimate is emitted.
    pub need_good: u32,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            history: 7,
            ema_alpha: 0.3,
            max_jump: 50.0,
            need_good: 3,
        }
    }
}

/// Color band and blob filters for the automatic corner-marker strategy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerParams {
    /// Inclusive hue band in degrees.
    pub hue_min: f32,
    pub hue_max: f32,
    /// Inclusive saturation band in `[0, 1]`.
    pub saturation_min: f32,
    pub saturation_max: f32,
    /// Inclusive value band in `[0, 1]`.
    pub value_min: f32,
    pub value_max: f32,
    /// Minimal blob area in pixels.
    pub min_blob_area: usize,
    /// Only the largest `max_blobs` blobs are considered.
    pub max_blobs: usize,
    /// Blob centroids closer than this (px) are merged into the first one.
    pub dedup_distance: f32,
    /// Apply a 3x3 opening then closing to the mask.
    pub morphology: bool,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            hue_min: 70.0,
            hue_max: 170.0,
            saturation_min: 0.2,
            saturation_max: 1.0,
            value_min: 0.2,
            value_max: 1.0,
            min_blob_area: 50,
            max_blobs: 10,
            dedup_distance: 15.0,
            morphology: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyParams {
    /// Side of the canonical rectified square in pixels.
    pub size: usize,
    /// Frames the last confident quad is reused once the stabilizer drops out.
    pub hold_frames: u32,
}

impl Default for RectifyParams {
    fn default() -> Self {
        Self {
            size: 400,
            hold_frames: 20,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// Fraction of a cell side skipped on every border (seams, shadows).
    pub margin_ratio: f32,
    /// Frames averaged per capture burst.
    pub frames: usize,
    /// Pause between burst frames.
    pub frame_delay_ms: u64,
    /// EMA factor of the newest sample for live monitoring.
    pub live_ema_alpha: f32,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            margin_ratio: 0.08,
            frames: 8,
            frame_delay_ms: 20,
            live_ema_alpha: 0.6,
        }
    }
}

/// Which Lab channels enter the per-cell deviation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationNorm {
    /// `a` and `b` only; ignores lightness changes from shadows and glare.
    #[default]
    Chroma,
    /// All of `L`, `a`, `b`.
    Full,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeParams {
    pub norm: DeviationNorm,
    /// Threshold is `mean + k * stddev` of the deviations.
    pub k: f32,
    /// Absolute lower bound of the threshold.
    pub floor: f32,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self {
            norm: DeviationNorm::Chroma,
            k: 0.75,
            floor: 3.0,
        }
    }
}

/// Weights of the source/destination pairing score.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverParams {
    /// Number of highest-deviation cells considered.
    pub top_k: usize,
    pub source_weight: f32,
    pub destination_weight: f32,
    /// Added when the source holds a piece of the moving side.
    pub mover_bonus: f32,
    /// Added when the destination is empty or holds an opposing piece.
    pub target_bonus: f32,
    /// Subtracted when source and destination coincide.
    pub same_cell_penalty: f32,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            top_k: 6,
            source_weight: 1.0,
            destination_weight: 0.8,
            mover_bonus: 2.0,
            target_bonus: 1.0,
            same_cell_penalty: 100.0,
        }
    }
}

/// Full pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    pub quad: QuadValidationParams,
    pub stabilizer: StabilizerParams,
    pub localizer: MarkerParams,
    pub rectify: RectifyParams,
    pub sampler: SamplerParams,
    pub change: ChangeParams,
    pub resolver: ResolverParams,
}

impl TrackerParams {
    /// Load a JSON config from disk; missing sections fall back to defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
