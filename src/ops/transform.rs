// ============================================================================
// TRANSFORM OPERATIONS — rotate / scale lifted pixel snapshots
// ============================================================================

use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

/// Resampling used when a snapshot is scaled.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl Interpolation {
    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
        }
    }
}

/// Size of the axis-aligned box that holds a `w`×`h` image rotated by
/// `degrees`.
pub fn rotated_bounds(w: u32, h: u32, degrees: i32) -> (u32, u32) {
    let (s, c) = (degrees as f32).to_radians().sin_cos();
    let (s, c) = (s.abs(), c.abs());
    let nw = (w as f32 * c + h as f32 * s - 1e-3).ceil().max(1.0) as u32;
    let nh = (w as f32 * s + h as f32 * c - 1e-3).ceil().max(1.0) as u32;
    (nw, nh)
}

/// Rotate `src` clockwise (y-down) by `degrees` about its centre.
///
/// The result is enlarged to hold the whole rotated image and the original
/// centre lands on the centre of the result.  Quarter turns are exact; other
/// angles are bilinearly resampled against a transparent background.
pub fn rotate_about_center(src: &RgbaImage, degrees: i32) -> RgbaImage {
    match degrees.rem_euclid(360) {
        0 => return src.clone(),
        90 => return imageops::rotate90(src),
        180 => return imageops::rotate180(src),
        270 => return imageops::rotate270(src),
        _ => {}
    }

    let (dst_w, dst_h) = rotated_bounds(src.width(), src.height(), degrees);
    let mut dst = RgbaImage::new(dst_w, dst_h);

    let (sin, cos) = (degrees as f32).to_radians().sin_cos();
    let src_cx = src.width() as f32 * 0.5;
    let src_cy = src.height() as f32 * 0.5;
    let dst_cx = dst_w as f32 * 0.5;
    let dst_cy = dst_h as f32 * 0.5;

    let row_bytes = dst_w as usize * 4;
    dst.par_chunks_mut(row_bytes).enumerate().for_each(|(dy, row)| {
        let v = dy as f32 + 0.5 - dst_cy;
        for dx in 0..dst_w as usize {
            let u = dx as f32 + 0.5 - dst_cx;
            // Inverse rotation maps the destination pixel centre back into the source.
            let sx = u * cos + v * sin + src_cx - 0.5;
            let sy = -u * sin + v * cos + src_cy - 0.5;
            let p = bilinear_sample(src, sx, sy);
            row[dx * 4..dx * 4 + 4].copy_from_slice(&p.0);
        }
    });
    dst
}

/// Uniformly scale `src` by `factor`.  Each side is truncated to whole
/// pixels but never drops below 1.
pub fn scale_uniform(src: &RgbaImage, factor: f32, interp: Interpolation) -> RgbaImage {
    let new_w = ((src.width() as f32 * factor) as u32).max(1);
    let new_h = ((src.height() as f32 * factor) as u32).max(1);
    if new_w == src.width() && new_h == src.height() {
        return src.clone();
    }
    imageops::resize(src, new_w, new_h, interp.to_filter())
}

/// Bilinear interpolation sampling from an RgbaImage.
fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= img.width() as i32 || sy >= img.height() as i32 {
            [0.0; 4]
        } else {
            let p = img.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
