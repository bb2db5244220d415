use image::RgbaImage;

use crate::canvas::{PixelPos, PixelRect, RasterBuffer};
use crate::ops::transform::{self, Interpolation};

/// Smallest uniform scale a floating selection may take.
pub const MIN_SCALE_FACTOR: f32 = 0.01;

// ============================================================================
// FLOATING SELECTION
// ============================================================================

/// A rectangular region lifted out of the canvas, waiting to be moved,
/// rotated and scaled before it is committed back.
///
/// The pixel snapshot is owned; once lifted it no longer aliases the canvas.
#[derive(Clone, Debug)]
pub struct FloatingSelection {
    source_rect: PixelRect,
    pixels: RgbaImage,
    pub move_offset: PixelPos,
    /// Always in `0..360`.
    pub rotation_degrees: i32,
    pub scale_factor: f32,
}

impl FloatingSelection {
    /// Copy `rect` out of `canvas` and clear the source to transparent.
    /// Returns `None` (canvas untouched) for a degenerate rectangle.
    pub fn lift(canvas: &mut RasterBuffer, rect: PixelRect) -> Option<Self> {
        if rect.is_empty() {
            return None;
        }
        let pixels = canvas.copy_region(rect);
        canvas.clear_region(rect);
        Some(Self {
            source_rect: rect,
            pixels,
            move_offset: PixelPos::ZERO,
            rotation_degrees: 0,
            scale_factor: 1.0,
        })
    }

    pub fn source_rect(&self) -> PixelRect {
        self.source_rect
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Where the untransformed region sits after the current move offset.
    pub fn destination_rect(&self) -> PixelRect {
        self.source_rect.translated(self.move_offset)
    }

    pub fn translate_by(&mut self, delta: PixelPos) {
        self.move_offset += delta;
    }

    /// Set the rotation from a drag point: the sum of the point's offsets
    /// from the source rectangle's centre, wrapped to `0..360`.
    pub fn rotate_towards(&mut self, point: PixelPos) {
        let d = point - self.source_rect.center();
        self.rotation_degrees = (d.x as i64 + d.y as i64).rem_euclid(360) as i32;
    }

    /// Set a uniform scale from a drag point measured against the source
    /// rectangle's top-left corner.  The smaller of the width and height
    /// ratios wins; each distance is floored at one pixel.
    pub fn scale_towards(&mut self, point: PixelPos) {
        let rect = self.source_rect;
        let d = point - PixelPos::new(rect.left(), rect.top());
        let width = d.x.max(1) as f32;
        let height = d.y.max(1) as f32;
        let sx = width / rect.width.max(1) as f32;
        let sy = height / rect.height.max(1) as f32;
        self.scale_factor = sx.min(sy).max(MIN_SCALE_FACTOR);
    }

    /// Snapshot with rotation applied first, then the scale.
    pub fn transformed_pixels(&self) -> RgbaImage {
        let rotated = transform::rotate_about_center(&self.pixels, self.rotation_degrees);
        transform::scale_uniform(&rotated, self.scale_factor, Interpolation::Bilinear)
    }

    /// Transformed snapshot together with the image-space position of its
    /// top-left corner.  Rotation pivots on the destination's centre; the
    /// scale is anchored at the rotated image's top-left corner.
    pub fn placement(&self) -> (PixelPos, RgbaImage) {
        let dest = self.destination_rect();
        let rotated = transform::rotate_about_center(&self.pixels, self.rotation_degrees);
        let origin = PixelPos::new(
            dest.x + (dest.width - rotated.width() as i32).div_euclid(2),
            dest.y + (dest.height - rotated.height() as i32).div_euclid(2),
        );
        let scaled = transform::scale_uniform(&rotated, self.scale_factor, Interpolation::Bilinear);
        (origin, scaled)
    }

    /// Merge into `canvas`: clear the destination rectangle, then draw the
    /// transformed snapshot over it.
    pub fn commit(self, canvas: &mut RasterBuffer) {
        let (origin, pixels) = self.placement();
        canvas.clear_region(self.destination_rect());
        canvas.blit_over(&pixels, origin.x, origin.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 200, 0, 255]);

    fn patterned() -> RasterBuffer {
        let mut buf = RasterBuffer::new_filled(12, 12, WHITE);
        for y in 0..12u32 {
            for x in 0..12u32 {
                if (x + y) % 3 == 0 {
                    buf.put_pixel(x, y, Rgba([x as u8 * 20, y as u8 * 20, 7, 255]));
                }
            }
        }
        buf
    }

    #[test]
    fn degenerate_rect_lifts_nothing() {
        let mut buf = patterned();
        let before = buf.clone();
        assert!(FloatingSelection::lift(&mut buf, PixelRect::new(3, 3, 0, 4)).is_none());
        assert_eq!(buf, before);
    }

    #[test]
    fn lift_clears_source_and_keeps_pixels() {
        let mut buf = patterned();
        let before = buf.clone();
        let rect = PixelRect::new(2, 3, 4, 5);
        let sel = FloatingSelection::lift(&mut buf, rect).unwrap();
        assert_eq!(sel.pixels().dimensions(), (4, 5));
        assert_eq!(*sel.pixels().get_pixel(0, 0), before.get_pixel(2, 3));
        assert_eq!(buf.get_pixel(2, 3)[3], 0);
        assert_eq!(buf.get_pixel(5, 7)[3], 0);
        assert_eq!(buf.get_pixel(6, 7), before.get_pixel(6, 7));
    }

    #[test]
    fn commit_without_transform_restores_canvas() {
        let mut buf = patterned();
        let before = buf.clone();
        let sel = FloatingSelection::lift(&mut buf, PixelRect::new(1, 2, 6, 4)).unwrap();
        sel.commit(&mut buf);
        assert_eq!(buf, before);
    }

    #[test]
    fn commit_after_move_translates_content() {
        let mut buf = RasterBuffer::new_filled(10, 10, WHITE);
        for y in 1..3 {
            for x in 1..3 {
                buf.put_pixel(x, y, GREEN);
            }
        }
        let mut sel = FloatingSelection::lift(&mut buf, PixelRect::new(1, 1, 2, 2)).unwrap();
        sel.translate_by(PixelPos::new(4, 5));
        sel.commit(&mut buf);
        assert_eq!(buf.get_pixel(1, 1)[3], 0);
        assert_eq!(buf.get_pixel(5, 6), GREEN);
        assert_eq!(buf.get_pixel(6, 7), GREEN);
        assert_eq!(buf.get_pixel(7, 7), WHITE);
    }

    #[test]
    fn rotation_uses_linear_offset_sum() {
        let mut buf = patterned();
        let mut sel = FloatingSelection::lift(&mut buf, PixelRect::new(0, 0, 10, 10)).unwrap();
        // Centre is (4, 4).
        sel.rotate_towards(PixelPos::new(34, 4));
        assert_eq!(sel.rotation_degrees, 30);
        sel.rotate_towards(PixelPos::new(0, 0));
        assert_eq!(sel.rotation_degrees, 352);
        sel.rotate_towards(PixelPos::new(400, 4));
        assert_eq!(sel.rotation_degrees, 36);
        sel.rotate_towards(PixelPos::new(i32::MAX, i32::MAX));
        assert!((0..360).contains(&sel.rotation_degrees));
    }

    #[test]
    fn scale_takes_smaller_ratio_and_floors() {
        let mut buf = patterned();
        let mut sel = FloatingSelection::lift(&mut buf, PixelRect::new(2, 2, 4, 8)).unwrap();
        sel.scale_towards(PixelPos::new(10, 10));
        assert_eq!(sel.scale_factor, 1.0);
        sel.scale_towards(PixelPos::new(4, 100));
        assert_eq!(sel.scale_factor, 0.5);
        sel.scale_towards(PixelPos::new(-50, -50));
        assert_eq!(sel.scale_factor, 0.125);
    }

    #[test]
    fn scaled_commit_anchors_top_left() {
        let mut buf = RasterBuffer::new_filled(10, 10, WHITE);
        for y in 2..6 {
            for x in 2..6 {
                buf.put_pixel(x, y, GREEN);
            }
        }
        let mut sel = FloatingSelection::lift(&mut buf, PixelRect::new(2, 2, 4, 4)).unwrap();
        sel.scale_factor = 0.5;
        sel.commit(&mut buf);
        for (x, y) in [(2, 2), (3, 3)] {
            let p = buf.get_pixel(x, y);
            assert_eq!(p[3], 255);
            assert!(p[1] >= 195 && p[0] <= 5, "pixel ({x},{y}) = {p:?}");
        }
        assert_eq!(buf.get_pixel(4, 4)[3], 0);
    }
}
