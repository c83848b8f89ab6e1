//! Canonical top-down board images from camera frames.

use crate::params::RectifyParams;
use boardwatch_core::{
    homography_img_from_square, resize_bilinear, warp_perspective_rgb, Homography, Quad, RgbImage,
    RgbImageView,
};

/// Where the quad behind a rectified image came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RectifySource {
    /// Stabilizer was confident on this frame.
    Fresh,
    /// Last confident quad reused `age` frames after it was lost.
    Held { age: u32 },
    /// No usable quad: the whole frame was resized instead.
    Fallback,
}

#[derive(Clone, Debug)]
pub struct RectifiedBoard {
    /// `size x size` image, row 0 = rank 8, column 0 = file a.
    pub image: RgbImage,
    pub source: RectifySource,
    /// Quad used for the warp, absent on fallback.
    pub quad: Option<Quad>,
    pub h_img_from_rect: Option<Homography>,
}

impl RectifiedBoard {
    pub fn is_fallback(&self) -> bool {
        self.source == RectifySource::Fallback
    }
}

/// Warps frames with the stabilized quad and bridges short detection gaps.
#[derive(Clone, Debug)]
pub struct Rectifier {
    params: RectifyParams,
    last_good: Option<(Quad, Homography)>,
    misses: u32,
}

impl Rectifier {
    pub fn new(params: RectifyParams) -> Self {
        Self {
            params,
            last_good: None,
            misses: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.params.size
    }

    /// Drop the held quad.
    pub fn reset(&mut self) {
        self.last_good = None;
        self.misses = 0;
    }

    /// Rectify `frame` given the stabilizer output for it.
    ///
    /// A stable quad that admits no homography counts as a miss, so the
    /// held quad survives it.
    pub fn rectify(&mut self, frame: &RgbImageView<'_>, stable: Option<Quad>) -> RectifiedBoard {
        let size = self.params.size;
        let fresh = stable.and_then(|q| match homography_img_from_square(&q, size) {
            Some(h) => Some((q, h)),
            None => {
                log::warn!("rectify: degenerate quad {:?}, ignoring", q.to_array());
                None
            }
        });

        let warp = match fresh {
            Some((q, h)) => {
                self.last_good = Some((q, h));
                self.misses = 0;
                Some((q, h, RectifySource::Fresh))
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                match self.last_good {
                    Some((q, h)) if self.misses <= self.params.hold_frames => {
                        Some((q, h, RectifySource::Held { age: self.misses }))
                    }
                    _ => {
                        if self.misses == self.params.hold_frames.saturating_add(1) {
                            log::info!(
                                "rectify: no board for {} frames, using full frame",
                                self.misses
                            );
                        }
                        None
                    }
                }
            }
        };

        match warp {
            Some((q, h, source)) => RectifiedBoard {
                image: warp_perspective_rgb(frame, h, size, size),
                source,
                quad: Some(q),
                h_img_from_rect: Some(h),
            },
            None => RectifiedBoard {
                image: resize_bilinear(frame, size, size),
                source: RectifySource::Fallback,
                quad: None,
                h_img_from_rect: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardwatch_core::Point2;

    fn params() -> RectifyParams {
        RectifyParams {
            size: 64,
            hold_frames: 2,
        }
    }

    fn quad() -> Quad {
        Quad::new([
            Point2::new(16.0, 16.0),
            Point2::new(144.0, 16.0),
            Point2::new(144.0, 144.0),
            Point2::new(16.0, 144.0),
        ])
    }

    fn frame() -> RgbImage {
        let mut img = RgbImage::filled(160, 160, [0, 0, 255]);
        img.fill_rect(16, 16, 144, 144, [200, 40, 40]);
        img
    }

    #[test]
    fn fresh_quad_warps_board_only() {
        let img = frame();
        let mut r = Rectifier::new(params());
        let out = r.rectify(&img.view(), Some(quad()));
        assert_eq!(out.source, RectifySource::Fresh);
        assert_eq!((out.image.width, out.image.height), (64, 64));
        assert_eq!(out.image.pixel(1, 1), [200, 40, 40]);
        assert_eq!(out.image.pixel(62, 62), [200, 40, 40]);
    }

    #[test]
    fn holds_then_falls_back() {
        let img = frame();
        let mut r = Rectifier::new(params());
        r.rectify(&img.view(), Some(quad()));

        assert_eq!(r.rectify(&img.view(), None).source, RectifySource::Held { age: 1 });
        assert_eq!(r.rectify(&img.view(), None).source, RectifySource::Held { age: 2 });

        let out = r.rectify(&img.view(), None);
        assert!(out.is_fallback());
        assert!(out.quad.is_none());
        // plain resize keeps the border color
        assert_eq!(out.image.pixel(0, 0), [0, 0, 255]);

        assert_eq!(r.rectify(&img.view(), Some(quad())).source, RectifySource::Fresh);
    }

    #[test]
    fn unwarpable_quad_keeps_the_held_one() {
        let img = frame();
        let mut r = Rectifier::new(params());
        r.rectify(&img.view(), Some(quad()));

        let c = quad().corners;
        let collapsed = Quad::new([c[0], c[1], c[1], c[3]]);
        let out = r.rectify(&img.view(), Some(collapsed));
        assert_eq!(out.source, RectifySource::Held { age: 1 });
        assert_eq!(out.quad, Some(quad()));

        assert_eq!(r.rectify(&img.view(), None).source, RectifySource::Held { age: 2 });
    }

    #[test]
    fn no_quad_ever_is_fallback() {
        let img = frame();
        let mut r = Rectifier::new(params());
        let out = r.rectify(&img.view(), None);
        assert!(out.is_fallback());
        assert_eq!((out.image.width, out.image.height), (64, 64));
    }
}
