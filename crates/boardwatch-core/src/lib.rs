//! Core types and utilities for overhead chessboard tracking.
//!
//! This crate is intentionally small and stateless: RGB image views, bilinear
//! sampling, the 4-point homography used to rectify the board, board-boundary
//! quads with their validity check, and the color conversions the cell
//! statistics are computed in. It does *not* own any camera or pipeline state.

mod color;
mod homography;
mod image;
mod logger;
mod quad;

pub use color::{chroma_norm, lab_norm, srgb8_to_hsv, srgb8_to_lab, HsvColor, LabColor};
pub use homography::{
    homography_from_4pt, homography_img_from_square, square_corners, warp_perspective_rgb,
    Homography,
};
pub use image::{
    resize_bilinear, sample_bilinear_rgb, sample_bilinear_rgb_u8, RgbImage, RgbImageView,
};
pub use quad::{
    polygon_area, validate_points, validate_quad, Quad, QuadCheck, QuadRejection,
    QuadValidationParams,
};

pub use logger::init_with_level;

pub use nalgebra::Point2;
