//! Bar-chart rendering of response curves via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::curve::ResponseCurve;
use crate::util::{MirrorCalError, MirrorCalResult};
use image::{GrayImage, Luma};
use std::path::Path;

const BACKGROUND: Luma<u8> = Luma([255]);
const BAR: Luma<u8> = Luma([0]);

/// Renders `curve` as a grayscale bar chart of `width` x `height` pixels.
///
/// Each column shows the largest response among the bins it covers, scaled
/// so the curve maximum reaches the top row.
pub fn render_histogram(
    curve: &ResponseCurve,
    width: u32,
    height: u32,
) -> MirrorCalResult<GrayImage> {
    if width == 0 || height == 0 {
        return Err(MirrorCalError::InvalidArgument(
            "image dimensions must be positive",
        ));
    }
    let responses = curve.responses();
    let peak = responses.iter().copied().fold(0.0, f64::max);
    let mut img = GrayImage::from_pixel(width, height, BACKGROUND);
    if peak <= 0.0 {
        return Ok(img);
    }

    let n = responses.len();
    let cols = width as usize;
    for col in 0..cols {
        let start = col * n / cols;
        let end = ((col + 1) * n / cols).max(start + 1).min(n);
        let value = responses[start..end].iter().copied().fold(0.0, f64::max);
        let bar = ((value / peak) * height as f64).round() as u32;
        for row in height - bar.min(height)..height {
            img.put_pixel(col as u32, row, BAR);
        }
    }
    Ok(img)
}

/// Renders `curve` and writes it to `path` as PNG.
pub fn save_histogram_png<P: AsRef<Path>>(
    curve: &ResponseCurve,
    path: P,
    width: u32,
    height: u32,
) -> MirrorCalResult<()> {
    let img = render_histogram(curve, width, height)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| MirrorCalError::ImageIo {
            reason: err.to_string(),
        })
}
