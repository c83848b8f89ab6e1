//! Interop with the `image` crate and a file-backed frame source.

use crate::core::{RgbImage, RgbImageView};
use crate::tracker::FrameSource;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum FramesError {
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    #[error("image dimensions {width}x{height} do not fit the buffer")]
    InvalidDimensions { width: usize, height: usize },
    #[error("no frames given")]
    Empty,
}

/// Borrow an `image::RgbImage` as a core view.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Take ownership of an `image::RgbImage` buffer.
pub fn from_image(img: ::image::RgbImage) -> RgbImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    RgbImage {
        width: w,
        height: h,
        data: img.into_raw(),
    }
}

/// Copy a core image into an `image::RgbImage`.
pub fn to_image(img: &RgbImage) -> Result<::image::RgbImage, FramesError> {
    let invalid = || FramesError::InvalidDimensions {
        width: img.width,
        height: img.height,
    };
    let w = u32::try_from(img.width).map_err(|_| invalid())?;
    let h = u32::try_from(img.height).map_err(|_| invalid())?;
    ::image::RgbImage::from_raw(w, h, img.data.clone()).ok_or_else(invalid)
}

/// Decode any format supported by `image` into RGB8.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, FramesError> {
    let path = path.as_ref();
    let img = ::image::open(path).map_err(|source| FramesError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(from_image(img.to_rgb8()))
}

/// Encode by file extension.
pub fn save_rgb(img: &RgbImage, path: impl AsRef<Path>) -> Result<(), FramesError> {
    let path = path.as_ref();
    to_image(img)?
        .save(path)
        .map_err(|source| FramesError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Frames decoded from files, replayed in order.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    frames: Vec<RgbImage>,
    next: usize,
    cycle: bool,
}

impl ImageSequenceSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            next: 0,
            cycle: false,
        }
    }

    /// Decode every path up front.
    pub fn open<I, P>(paths: I) -> Result<Self, FramesError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let frames = paths
            .into_iter()
            .map(load_rgb)
            .collect::<Result<Vec<_>, _>>()?;
        if frames.is_empty() {
            return Err(FramesError::Empty);
        }
        log::debug!("frames: loaded {} images", frames.len());
        Ok(Self::new(frames))
    }

    /// Start over after the last frame instead of running dry.
    pub fn cycled(mut self) -> Self {
        self.cycle = true;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Option<RgbImage> {
        if self.next >= self.frames.len() {
            if !self.cycle || self.frames.is_empty() {
                return None;
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].clone();
        self.next += 1;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_round_trip_keeps_pixels() {
        let mut img = RgbImage::filled(3, 2, [1, 2, 3]);
        img.put_pixel(2, 1, [200, 100, 50]);
        let converted = to_image(&img).expect("fits");
        assert_eq!(converted.get_pixel(2, 1).0, [200, 100, 50]);
        assert_eq!(rgb_view(&converted).pixel(2, 1), [200, 100, 50]);
        assert_eq!(from_image(converted), img);
    }

    #[test]
    fn sequence_runs_dry_unless_cycled() {
        let frames = vec![
            RgbImage::filled(1, 1, [1, 0, 0]),
            RgbImage::filled(1, 1, [2, 0, 0]),
        ];
        let mut once = ImageSequenceSource::new(frames.clone());
        assert!(once.read().is_some());
        assert!(once.read().is_some());
        assert!(once.read().is_none());

        let mut looped = ImageSequenceSource::new(frames).cycled();
        let reds: Vec<u8> = (0..5)
            .filter_map(|_| looped.read())
            .map(|f| f.pixel(0, 0)[0])
            .collect();
        assert_eq!(reds, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn files_load_through_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        save_rgb(&RgbImage::filled(4, 4, [9, 8, 7]), &path).expect("save");
        let src = ImageSequenceSource::open([&path]).expect("open");
        assert_eq!(src.len(), 1);
        assert!(matches!(
            ImageSequenceSource::open(Vec::<PathBuf>::new()),
            Err(FramesError::Empty)
        ));
        assert!(matches!(
            load_rgb(dir.path().join("missing.png")),
            Err(FramesError::Image { .. })
        ));
    }
}
