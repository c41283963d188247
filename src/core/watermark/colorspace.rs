use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;

use crate::models::WatermarkError;

/// Y/Cr/Cb planes of a color image as f64 matrices
///
/// Only the luma plane is touched by the embedding; the two chroma planes
/// ride along unchanged and are recombined at the output boundary.
#[derive(Debug, Clone)]
pub struct YCrCbPlanes {
    pub y: Array2<f64>,
    pub cr: Array2<f64>,
    pub cb: Array2<f64>,
}

// BT.601 full-range YCrCb with delta 128, matching the converter the
// embedding pipeline was calibrated against.

fn rgb_to_ycrcb(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    (y, cr, cb)
}

fn ycrcb_to_rgb(y: f64, cr: f64, cb: f64) -> (f64, f64, f64) {
    let cr2 = cr - 128.0;
    let cb2 = cb - 128.0;
    let r = y + 1.403 * cr2;
    let g = y - 0.714 * cr2 - 0.344 * cb2;
    let b = y + 1.773 * cb2;
    (r, g, b)
}

/// Split an RGB image into Y, Cr and Cb planes
pub fn planes_from_rgb(image: &RgbImage) -> YCrCbPlanes {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut y_plane = Array2::zeros((h, w));
    let mut cr_plane = Array2::zeros((h, w));
    let mut cb_plane = Array2::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let px = image.get_pixel(col as u32, row as u32);
            let (y, cr, cb) = rgb_to_ycrcb(px[0] as f64, px[1] as f64, px[2] as f64);
            y_plane[[row, col]] = y;
            cr_plane[[row, col]] = cr;
            cb_plane[[row, col]] = cb;
        }
    }

    YCrCbPlanes {
        y: y_plane,
        cr: cr_plane,
        cb: cb_plane,
    }
}

/// Recombine Y, Cr and Cb planes into an RGB image
///
/// Values are clamped to [0, 255] and rounded here, the single quantization
/// boundary of the pipeline.
///
/// # Errors
/// Returns `WatermarkError::Dimension` when the three planes do not share
/// one shape.
pub fn rgb_from_planes(planes: &YCrCbPlanes) -> Result<RgbImage, WatermarkError> {
    let (h, w) = planes.y.dim();
    if planes.cr.dim() != (h, w) || planes.cb.dim() != (h, w) {
        return Err(WatermarkError::Dimension(format!(
            "Plane shapes differ: y={:?} cr={:?} cb={:?}",
            planes.y.dim(),
            planes.cr.dim(),
            planes.cb.dim()
        )));
    }

    let mut image = RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let (r, g, b) = ycrcb_to_rgb(
                planes.y[[row, col]],
                planes.cr[[row, col]],
                planes.cb[[row, col]],
            );
            image.put_pixel(
                col as u32,
                row as u32,
                Rgb([
                    r.round().clamp(0.0, 255.0) as u8,
                    g.round().clamp(0.0, 255.0) as u8,
                    b.round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }
    Ok(image)
}

/// Convert a grayscale image to an f64 matrix
pub fn plane_from_gray(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        image.get_pixel(col as u32, row as u32)[0] as f64
    })
}

/// Convert an f64 matrix to a grayscale image, clamping to [0, 255]
pub fn gray_from_plane(plane: &Array2<f64>) -> GrayImage {
    let (h, w) = plane.dim();
    let mut image = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let v = plane[[row, col]].round().clamp(0.0, 255.0) as u8;
            image.put_pixel(col as u32, row as u32, Luma([v]));
        }
    }
    image
}
