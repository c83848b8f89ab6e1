//! Perceptual color conversions for cell statistics and marker segmentation.
//!
//! Lab values use the D65 white point with `L` in `0..=100`; `a`/`b` are in
//! the usual signed range (roughly `-128..=127`).

use palette::{FromColor, Hsv, Lab, Srgb};

/// CIE Lab triple `[L, a, b]`.
pub type LabColor = [f32; 3];

/// Convert one sRGB8 pixel to Lab.
#[inline]
pub fn srgb8_to_lab(rgb: [u8; 3]) -> LabColor {
    let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let lab: Lab = Lab::from_color(srgb);
    [lab.l, lab.a, lab.b]
}

/// HSV with hue in degrees `[0, 360)` and saturation/value in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HsvColor {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

#[inline]
pub fn srgb8_to_hsv(rgb: [u8; 3]) -> HsvColor {
    let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let hsv: Hsv = Hsv::from_color(srgb);
    HsvColor {
        hue: hsv.hue.into_positive_degrees(),
        saturation: hsv.saturation,
        value: hsv.value,
    }
}

/// Euclidean norm over all three Lab channels.
#[inline]
pub fn lab_norm(v: &LabColor) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Euclidean norm over the chroma channels (a, b) only.
#[inline]
pub fn chroma_norm(v: &LabColor) -> f32 {
    (v[1] * v[1] + v[2] * v[2]).sqrt()
}
