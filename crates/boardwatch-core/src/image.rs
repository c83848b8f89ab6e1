/// Borrowed interleaved RGB8 image.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

/// Owned interleaved RGB8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// Image of the given size filled with one color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap a raw buffer; `None` if the length does not match `width * height * 3`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(3)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.view().pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Fill the axis-aligned rectangle `[x0, x1) x [y0, y1)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, rgb: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.put_pixel(x, y, rgb);
            }
        }
    }
}

impl<'a> RgbImageView<'a> {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[inline]
fn get_rgb(src: &RgbImageView<'_>, x: i32, y: i32) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return [0.0; 3];
    }
    let p = src.pixel(x as usize, y as usize);
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

/// Bilinear RGB sample at continuous coordinates.
///
/// Pixel `(i, j)` covers `[i, i+1) x [j, j+1)` and its value sits at the
/// pixel center `(i + 0.5, j + 0.5)`. Samples outside the image read black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImageView<'_>, x: f32, y: f32) -> [f32; 3] {
    let x = x - 0.5;
    let y = y - 0.5;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

#[inline]
pub fn sample_bilinear_rgb_u8(src: &RgbImageView<'_>, x: f32, y: f32) -> [u8; 3] {
    sample_bilinear_rgb(src, x, y).map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Plain bilinear resize, used when no board quad is available.
pub fn resize_bilinear(src: &RgbImageView<'_>, out_w: usize, out_h: usize) -> RgbImage {
    let mut out = RgbImage::filled(out_w, out_h, [0, 0, 0]);
    if src.is_empty() || out_w == 0 || out_h == 0 {
        return out;
    }
    let sx = src.width as f32 / out_w as f32;
    let sy = src.height as f32 / out_h as f32;

    for y in 0..out_h {
        // clamp so that border pixels never blend with the black outside
        let fy = ((y as f32 + 0.5) * sy).clamp(0.5, src.height as f32 - 0.5);
        for x in 0..out_w {
            let fx = ((x as f32 + 0.5) * sx).clamp(0.5, src.width as f32 - 0.5);
            out.put_pixel(x, y, sample_bilinear_rgb_u8(src, fx, fy));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> RgbImage {
        let mut img = RgbImage::filled(w, h, [0, 0, 0]);
        for y in 0..h {
            for x in 0..w {
                img.put_pixel(x, y, [(x * 10) as u8, (y * 10) as u8, 7]);
            }
        }
        img
    }

    #[test]
    fn sampling_at_pixel_centers_is_exact() {
        let img = gradient(6, 5);
        let view = img.view();
        for y in 0..5 {
            for x in 0..6 {
                let s = sample_bilinear_rgb_u8(&view, x as f32 + 0.5, y as f32 + 0.5);
                assert_eq!(s, img.pixel(x, y));
            }
        }
    }

    #[test]
    fn sampling_between_centers_interpolates() {
        let img = gradient(4, 4);
        let s = sample_bilinear_rgb(&img.view(), 1.0, 0.5);
        assert!((s[0] - 5.0).abs() < 1e-4);
        assert!((s[1] - 0.0).abs() < 1e-4);
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let img = gradient(8, 8);
        let out = resize_bilinear(&img.view(), 8, 8);
        assert_eq!(out, img);
    }

    #[test]
    fn resize_of_uniform_image_stays_uniform() {
        let img = RgbImage::filled(30, 17, [12, 200, 99]);
        let out = resize_bilinear(&img.view(), 11, 40);
        assert!(out.data.chunks(3).all(|p| p == [12, 200, 99]));
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(RgbImage::from_raw(2, 2, vec![0; 12]).is_some());
        assert!(RgbImage::from_raw(2, 2, vec![0; 11]).is_none());
    }
}
