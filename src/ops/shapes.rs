// ============================================================================
// SHAPE RASTERISATION — brush stamps, lines, rectangle and ellipse outlines
// ============================================================================
//
// All primitives are hard-edged, clip to the buffer, and overwrite pixels
// with the given colour.

use egui::Pos2;
use image::Rgba;

use crate::canvas::{PixelPos, PixelRect, RasterBuffer};

/// Stamp a filled disc of `diameter` pixels centred on `center`
/// (pixel-grid coordinates).  Diameter 1 stamps the nearest pixel.
pub fn stamp_disc(buffer: &mut RasterBuffer, center: Pos2, diameter: u32, color: Rgba<u8>) {
    if diameter <= 1 {
        buffer.put_pixel_clipped(center.x.round() as i32, center.y.round() as i32, color);
        return;
    }
    let radius = diameter as f32 / 2.0;
    let radius_sq = radius * radius;
    let min_x = (center.x - radius).floor() as i32;
    let max_x = (center.x + radius).ceil() as i32;
    let min_y = (center.y - radius).floor() as i32;
    let max_y = (center.y + radius).ceil() as i32;
    for y in min_y..=max_y {
        let dy = y as f32 - center.y;
        for x in min_x..=max_x {
            let dx = x as f32 - center.x;
            if dx * dx + dy * dy <= radius_sq {
                buffer.put_pixel_clipped(x, y, color);
            }
        }
    }
}

/// Round-capped line of width `size` from `from` to `to`, stamped densely
/// (one stamp per pixel step along the major axis).  Only the stretch of the
/// segment that can reach the buffer is stamped.
pub fn draw_line(buffer: &mut RasterBuffer, from: PixelPos, to: PixelPos, size: u32, color: Rgba<u8>) {
    let (x0, y0) = (from.x as f64, from.y as f64);
    let dx = to.x as f64 - x0;
    let dy = to.y as f64 - y0;
    let steps = dx.abs().max(dy.abs()).ceil();

    if steps == 0.0 {
        stamp_disc(buffer, from.to_pos2(), size, color);
        return;
    }

    let margin = size as f64 / 2.0 + 1.0;
    let Some((t0, t1)) = visible_span(buffer, (x0, y0), (dx, dy), margin) else {
        return;
    };
    let first = (t0 * steps).floor() as u64;
    let last = (t1 * steps).ceil().min(steps) as u64;
    for i in first..=last {
        let t = i as f64 / steps;
        let p = Pos2::new((x0 + dx * t) as f32, (y0 + dy * t) as f32);
        stamp_disc(buffer, p, size, color);
    }
}

/// Parameter range `t0..=t1` (within `0..=1`) of `start + t·delta` that lies
/// inside the buffer grown by `margin` on every side.
fn visible_span(buffer: &RasterBuffer, start: (f64, f64), delta: (f64, f64), margin: f64) -> Option<(f64, f64)> {
    let axes = [
        (start.0, delta.0, buffer.width() as f64),
        (start.1, delta.1, buffer.height() as f64),
    ];
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, d, extent) in axes {
        let (lo, hi) = (-margin, extent + margin);
        if d == 0.0 {
            if p < lo || p > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - p) / d, (hi - p) / d);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }
    (t0 <= t1).then_some((t0, t1))
}

/// Axis-aligned rectangle outline with corners `a` and `b` (both inclusive).
/// The band is `stroke` pixels thick and centred on the corner pixels.
pub fn draw_rect_outline(buffer: &mut RasterBuffer, a: PixelPos, b: PixelPos, stroke: u32, color: Rgba<u8>) {
    let stroke = stroke.max(1) as i32;
    let half = (stroke - 1) / 2;
    let inner = PixelRect::spanning_inclusive(a, b);

    let outer = PixelRect::new(
        inner.x - half,
        inner.y - half,
        inner.width + stroke - 1,
        inner.height + stroke - 1,
    );
    let hole = PixelRect::new(
        outer.x + stroke,
        outer.y + stroke,
        outer.width - 2 * stroke,
        outer.height - 2 * stroke,
    );

    let Some((min_x, min_y, max_x, max_y)) = outer.clamp_to(buffer.width(), buffer.height()) else {
        return;
    };
    for y in min_y..max_y {
        for x in min_x..max_x {
            if !hole.contains(PixelPos::new(x as i32, y as i32)) {
                buffer.put_pixel(x, y, color);
            }
        }
    }
}

/// Outline of the ellipse inscribed in the box with corners `a` and `b`
/// (both inclusive), stroked with discs of diameter `stroke`.
pub fn draw_ellipse_outline(buffer: &mut RasterBuffer, a: PixelPos, b: PixelPos, stroke: u32, color: Rgba<u8>) {
    let bounds = PixelRect::spanning_inclusive(a, b);
    let rx = (bounds.width - 1) as f32 / 2.0;
    let ry = (bounds.height - 1) as f32 / 2.0;
    if rx < 0.5 || ry < 0.5 {
        // Collapsed to a line (or a point).
        draw_line(buffer, a, b, stroke, color);
        return;
    }

    let cx = bounds.x as f32 + rx;
    let cy = bounds.y as f32 + ry;
    // Enough samples that consecutive stamps are less than a pixel apart.
    let segments = ((rx + ry) * 4.0).ceil().max(16.0) as usize;
    for i in 0..segments {
        let angle = std::f32::consts::TAU * i as f32 / segments as f32;
        let p = Pos2::new(cx + rx * angle.cos(), cy + ry * angle.sin());
        stamp_disc(buffer, p, stroke, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn black_count(buf: &RasterBuffer) -> usize {
        buf.as_rgba_image().pixels().filter(|p| **p == BLACK).count()
    }

    #[test]
    fn thin_rect_outline_covers_exact_border() {
        let mut buf = RasterBuffer::new_filled(10, 10, WHITE);
        draw_rect_outline(&mut buf, PixelPos::new(7, 7), PixelPos::new(2, 2), 1, BLACK);
        for y in 0..10 {
            for x in 0..10 {
                let on_border = (2..=7).contains(&x)
                    && (2..=7).contains(&y)
                    && (x == 2 || x == 7 || y == 2 || y == 7);
                let expected = if on_border { BLACK } else { WHITE };
                assert_eq!(buf.get_pixel(x, y), expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn thick_rect_outline_band_width() {
        let mut buf = RasterBuffer::new_filled(20, 20, WHITE);
        draw_rect_outline(&mut buf, PixelPos::new(5, 5), PixelPos::new(14, 14), 3, BLACK);
        // Band spans 4..=6 on the left edge, interior starts at 7.
        assert_eq!(buf.get_pixel(3, 10), WHITE);
        assert_eq!(buf.get_pixel(4, 10), BLACK);
        assert_eq!(buf.get_pixel(6, 10), BLACK);
        assert_eq!(buf.get_pixel(7, 10), WHITE);
        assert_eq!(buf.get_pixel(15, 10), BLACK);
        assert_eq!(buf.get_pixel(16, 10), WHITE);
    }

    #[test]
    fn thin_diagonal_line_is_connected() {
        let mut buf = RasterBuffer::new_filled(8, 8, WHITE);
        draw_line(&mut buf, PixelPos::new(0, 0), PixelPos::new(7, 7), 1, BLACK);
        for i in 0..8 {
            assert_eq!(buf.get_pixel(i, i), BLACK);
        }
        assert_eq!(black_count(&buf), 8);
    }

    #[test]
    fn zero_length_line_stamps_one_disc() {
        let mut buf = RasterBuffer::new_filled(9, 9, WHITE);
        draw_line(&mut buf, PixelPos::new(4, 4), PixelPos::new(4, 4), 3, BLACK);
        assert_eq!(black_count(&buf), 9);
        assert_eq!(buf.get_pixel(3, 3), BLACK);
        assert_eq!(buf.get_pixel(2, 4), WHITE);
    }

    #[test]
    fn line_clips_outside_buffer() {
        let mut buf = RasterBuffer::new_filled(4, 4, WHITE);
        draw_line(&mut buf, PixelPos::new(-10, 1), PixelPos::new(10, 1), 1, BLACK);
        assert_eq!(black_count(&buf), 4);
    }

    #[test]
    fn ellipse_touches_box_edges_and_leaves_center() {
        let mut buf = RasterBuffer::new_filled(21, 21, WHITE);
        draw_ellipse_outline(&mut buf, PixelPos::new(0, 0), PixelPos::new(20, 20), 1, BLACK);
        assert_eq!(buf.get_pixel(10, 0), BLACK);
        assert_eq!(buf.get_pixel(0, 10), BLACK);
        assert_eq!(buf.get_pixel(20, 10), BLACK);
        assert_eq!(buf.get_pixel(10, 20), BLACK);
        assert_eq!(buf.get_pixel(10, 10), WHITE);
        assert_eq!(buf.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn flat_ellipse_degrades_to_line() {
        let mut buf = RasterBuffer::new_filled(10, 3, WHITE);
        draw_ellipse_outline(&mut buf, PixelPos::new(1, 1), PixelPos::new(8, 1), 1, BLACK);
        assert_eq!(black_count(&buf), 8);
    }

    #[test]
    fn extreme_endpoints_only_stamp_the_visible_stretch() {
        let mut buf = RasterBuffer::new_filled(4, 4, WHITE);
        draw_line(&mut buf, PixelPos::new(i32::MIN, 2), PixelPos::new(i32::MAX, 2), 1, BLACK);
        assert_eq!(black_count(&buf), 4);
        assert_eq!(buf.get_pixel(0, 2), BLACK);
        assert_eq!(buf.get_pixel(3, 2), BLACK);

        let mut untouched = RasterBuffer::new_filled(4, 4, WHITE);
        draw_line(&mut untouched, PixelPos::new(i32::MIN, -50), PixelPos::new(i32::MAX, -50), 3, BLACK);
        assert_eq!(black_count(&untouched), 0);
    }
}
