use std::ops::{Add, AddAssign, Sub};

use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Zoom limits shared by the viewport and every zoom command.
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 16.0;

/// How far beyond the image (in image sizes) a pointer position is tracked.
const POINTER_REACH: f32 = 4.0;
const MIN_POINTER_MARGIN: f32 = 64.0;

// ============================================================================
// PIXEL GEOMETRY
// ============================================================================

/// Integer position on the image pixel grid.  May lie outside the buffer
/// (pointer drags routinely leave the canvas).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelPos {
    pub x: i32,
    pub y: i32,
}

impl PixelPos {
    pub const ZERO: PixelPos = PixelPos { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Snap a sub-pixel image-space position to the pixel that contains it.
    pub fn from_image_pos(pos: Pos2) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
        }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x as f32, self.y as f32)
    }
}

impl Add for PixelPos {
    type Output = PixelPos;
    fn add(self, rhs: PixelPos) -> PixelPos {
        PixelPos::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl AddAssign for PixelPos {
    fn add_assign(&mut self, rhs: PixelPos) {
        *self = *self + rhs;
    }
}

impl Sub for PixelPos {
    type Output = PixelPos;
    fn sub(self, rhs: PixelPos) -> PixelPos {
        PixelPos::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

/// Axis-aligned pixel rectangle covering `x..x+width` × `y..y+height`.
/// A rectangle with a non-positive side is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanned by two drag points.  The far corner is
    /// exclusive, so a click without movement spans nothing.
    pub fn spanning(a: PixelPos, b: PixelPos) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x).min(i32::MAX as u32) as i32,
            height: a.y.abs_diff(b.y).min(i32::MAX as u32) as i32,
        }
    }

    /// Normalized rectangle that includes both corner pixels.
    pub fn spanning_inclusive(a: PixelPos, b: PixelPos) -> Self {
        let r = Self::spanning(a, b);
        Self::new(r.x, r.y, r.width.saturating_add(1), r.height.saturating_add(1))
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Centre pixel, rounding towards the top-left for even sizes.
    pub fn center(&self) -> PixelPos {
        PixelPos::new(
            self.x + (self.width - 1).max(0) / 2,
            self.y + (self.height - 1).max(0) / 2,
        )
    }

    pub fn translated(&self, by: PixelPos) -> Self {
        let origin = PixelPos::new(self.x, self.y) + by;
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    pub fn contains(&self, p: PixelPos) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// The same rectangle as an image-space float rect (pixel edges).
    pub fn to_image_rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.x as f32, self.y as f32),
            Vec2::new(self.width as f32, self.height as f32),
        )
    }

    /// Clip to a `width`×`height` grid, returning `(min_x, min_y, max_x, max_y)`
    /// with exclusive maxima, or `None` when nothing overlaps.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.is_empty() {
            return None;
        }
        let min_x = self.x.max(0);
        let min_y = self.y.max(0);
        let max_x = self.right().min(width as i32);
        let max_y = self.bottom().min(height as i32);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some((min_x as u32, min_y as u32, max_x as u32, max_y as u32))
    }
}

// ============================================================================
// RASTER BUFFER – fixed-size RGBA pixel grid
// ============================================================================

/// The editable image.  Dimensions are fixed at creation; every drawing
/// operation clips to them.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBuffer {
    pixels: RgbaImage,
}

impl RasterBuffer {
    /// Create a buffer filled with `color`.  Zero dimensions are bumped to 1.
    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            pixels: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn from_rgba_image(pixels: RgbaImage) -> Self {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Self::new_filled(1, 1, TRANSPARENT);
        }
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Pixel at an image-space position, `None` outside the buffer.
    pub fn pixel_at(&self, p: PixelPos) -> Option<Rgba<u8>> {
        if self.in_bounds(p.x, p.y) {
            Some(self.get_pixel(p.x as u32, p.y as u32))
        } else {
            None
        }
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        self.pixels.put_pixel(x, y, pixel);
    }

    /// Write a pixel if it falls inside the buffer; ignore it otherwise.
    pub fn put_pixel_clipped(&mut self, x: i32, y: i32, pixel: Rgba<u8>) {
        if self.in_bounds(x, y) {
            self.pixels.put_pixel(x as u32, y as u32, pixel);
        }
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for p in self.pixels.pixels_mut() {
            *p = color;
        }
    }

    /// Set every in-bounds pixel of `rect` to fully transparent.
    pub fn clear_region(&mut self, rect: PixelRect) {
        let Some((min_x, min_y, max_x, max_y)) = rect.clamp_to(self.width(), self.height()) else {
            return;
        };
        for y in min_y..max_y {
            for x in min_x..max_x {
                self.pixels.put_pixel(x, y, TRANSPARENT);
            }
        }
    }

    /// Copy `rect` out into an owned image.  Parts outside the buffer come
    /// back transparent.
    pub fn copy_region(&self, rect: PixelRect) -> RgbaImage {
        let w = rect.width.max(0) as u32;
        let h = rect.height.max(0) as u32;
        let mut out = RgbaImage::from_pixel(w, h, TRANSPARENT);
        if let Some((min_x, min_y, max_x, max_y)) = rect.clamp_to(self.width(), self.height()) {
            for y in min_y..max_y {
                for x in min_x..max_x {
                    let lx = (x as i32 - rect.x) as u32;
                    let ly = (y as i32 - rect.y) as u32;
                    out.put_pixel(lx, ly, *self.pixels.get_pixel(x, y));
                }
            }
        }
        out
    }

    /// Composite `src` over the buffer with its top-left at `(dst_x, dst_y)`
    /// (straight-alpha source-over).  Fully transparent destination pixels
    /// take the source verbatim.
    pub fn blit_over(&mut self, src: &RgbaImage, dst_x: i32, dst_y: i32) {
        let rect = PixelRect::new(dst_x, dst_y, src.width() as i32, src.height() as i32);
        let Some((min_x, min_y, max_x, max_y)) = rect.clamp_to(self.width(), self.height()) else {
            return;
        };
        for y in min_y..max_y {
            for x in min_x..max_x {
                let s = *src.get_pixel((x as i32 - dst_x) as u32, (y as i32 - dst_y) as u32);
                let d = self.pixels.get_pixel_mut(x, y);
                *d = blend_over(s, *d);
            }
        }
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Flattened copy of the buffer for export.
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

/// Straight-alpha source-over of one pixel.
fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if src[3] == 255 || dst[3] == 0 {
        return src;
    }
    if src[3] == 0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

// ============================================================================
// VIEWPORT – view-space ↔ image-space mapping
// ============================================================================

/// Pan/zoom state of the interactive surface.  The zoomed image is centred
/// in `view_size`, then shifted by `pan_offset` (view pixels).
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_offset: Vec2,
    pub view_size: Vec2,
    image_size: Vec2,
}

impl Viewport {
    /// Viewport for an image of the given size, shown 1:1 in a surface of
    /// the same size.
    pub fn new(image_width: u32, image_height: u32) -> Self {
        let image_size = Vec2::new(image_width as f32, image_height as f32);
        Self {
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            view_size: image_size,
            image_size,
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn set_view_size(&mut self, size: Vec2) {
        if size.x.is_finite() && size.y.is_finite() {
            self.view_size = size.max(Vec2::ZERO);
        }
    }

    pub fn zoomed_size(&self) -> Vec2 {
        self.image_size * self.zoom
    }

    /// Offset that centres the zoomed image inside the view.
    pub fn centering_offset(&self) -> Vec2 {
        (self.view_size - self.zoomed_size()) / 2.0
    }

    /// View-space position of the image's top-left corner.
    pub fn origin(&self) -> Pos2 {
        Pos2::ZERO + self.centering_offset() + self.pan_offset
    }

    pub fn to_image(&self, view_pos: Pos2) -> Pos2 {
        Pos2::ZERO + (view_pos - self.origin()) / self.zoom
    }

    /// Pixel under a view-space point.  Points far outside the image are
    /// pulled in to within `POINTER_REACH` image sizes of it, so pixel
    /// arithmetic on drags stays small.
    pub fn to_image_pixel(&self, view_pos: Pos2) -> PixelPos {
        let p = self.to_image(view_pos);
        let reach = (self.image_size * POINTER_REACH).max(Vec2::splat(MIN_POINTER_MARGIN));
        PixelPos::from_image_pos(Pos2::new(
            p.x.clamp(-reach.x, self.image_size.x + reach.x),
            p.y.clamp(-reach.y, self.image_size.y + reach.y),
        ))
    }

    pub fn to_view(&self, image_pos: Pos2) -> Pos2 {
        self.origin() + image_pos.to_vec2() * self.zoom
    }

    pub fn to_view_rect(&self, rect: PixelRect) -> Rect {
        let r = rect.to_image_rect();
        Rect::from_min_max(self.to_view(r.min), self.to_view(r.max))
    }

    /// Change zoom while keeping the image point under `anchor` fixed.
    pub fn zoom_around_view_point(&mut self, zoom: f32, anchor: Pos2) {
        let before = self.to_image(anchor);
        self.set_zoom(zoom);
        let after = self.to_image(anchor);
        self.pan_offset += (after - before) * self.zoom;
    }

    pub fn zoom_in(&mut self, step: f32) {
        self.set_zoom(self.zoom * step);
    }

    pub fn zoom_out(&mut self, step: f32) {
        self.set_zoom(self.zoom / step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanning_normalizes_and_excludes_far_corner() {
        let r = PixelRect::spanning(PixelPos::new(7, 9), PixelPos::new(2, 3));
        assert_eq!(r, PixelRect::new(2, 3, 5, 6));
        assert!(PixelRect::spanning(PixelPos::new(4, 4), PixelPos::new(4, 9)).is_empty());
    }

    #[test]
    fn copy_region_pads_outside_with_transparent() {
        let buf = RasterBuffer::new_filled(4, 4, Rgba([255, 255, 255, 255]));
        let part = buf.copy_region(PixelRect::new(-1, -1, 3, 3));
        assert_eq!(*part.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*part.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
        assert_eq!(*part.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn clear_then_blit_restores_region() {
        let mut buf = RasterBuffer::new_filled(6, 6, Rgba([10, 20, 30, 255]));
        buf.put_pixel(2, 2, Rgba([200, 0, 0, 128]));
        let original = buf.clone();
        let rect = PixelRect::new(1, 1, 3, 3);
        let lifted = buf.copy_region(rect);
        buf.clear_region(rect);
        assert_eq!(buf.get_pixel(2, 2), TRANSPARENT);
        buf.blit_over(&lifted, 1, 1);
        assert_eq!(buf, original);
    }

    #[test]
    fn blend_over_half_alpha_on_opaque() {
        let out = blend_over(Rgba([255, 0, 0, 128]), Rgba([0, 0, 255, 255]));
        assert_eq!(out[3], 255);
        assert!(out[0] > 120 && out[0] < 135);
        assert!(out[2] > 120 && out[2] < 135);
    }

    #[test]
    fn centered_zoom_maps_press_to_expected_pixel() {
        let mut vp = Viewport::new(100, 100);
        vp.set_view_size(Vec2::new(300.0, 300.0));
        vp.set_zoom(2.0);
        assert_eq!(vp.centering_offset(), Vec2::new(50.0, 50.0));
        assert_eq!(vp.to_image_pixel(Pos2::new(100.0, 100.0)), PixelPos::new(25, 25));
    }

    #[test]
    fn round_trip_within_one_unit() {
        let mut vp = Viewport::new(640, 480);
        vp.set_view_size(Vec2::new(1024.0, 768.0));
        for &zoom in &[0.1_f32, 0.37, 1.0, 2.5, 16.0] {
            vp.set_zoom(zoom);
            for &pan in &[Vec2::ZERO, Vec2::new(-133.0, 71.5), Vec2::new(900.0, -420.0)] {
                vp.pan_offset = pan;
                for &(x, y) in &[(0.0, 0.0), (13.0, 700.0), (512.5, 384.25), (-50.0, 2000.0)] {
                    let p = Pos2::new(x, y);
                    let back = vp.to_view(vp.to_image(p));
                    assert!((back - p).length() <= 1.0, "zoom {zoom} pan {pan:?} p {p:?} -> {back:?}");
                }
            }
        }
    }

    #[test]
    fn zoom_clamps_and_ignores_nan() {
        let mut vp = Viewport::new(10, 10);
        vp.set_zoom(100.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.set_zoom(0.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
        vp.set_zoom(f32::NAN);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn zoom_around_point_keeps_point_fixed() {
        let mut vp = Viewport::new(200, 100);
        vp.set_view_size(Vec2::new(800.0, 600.0));
        vp.pan_offset = Vec2::new(37.0, -12.0);
        let anchor = Pos2::new(333.0, 250.0);
        let before = vp.to_image(anchor);
        vp.zoom_around_view_point(3.3, anchor);
        let after = vp.to_image(anchor);
        assert!((after - before).length() < 1e-3);
    }

    #[test]
    fn far_pointer_positions_are_pulled_in() {
        let vp = Viewport::new(100, 50);
        assert_eq!(vp.to_image_pixel(Pos2::new(-1e10, 1e10)), PixelPos::new(-400, 250));
        assert_eq!(vp.to_image_pixel(Pos2::new(f32::MAX, -f32::MAX)), PixelPos::new(500, -200));
        assert_eq!(vp.to_image_pixel(Pos2::new(120.5, -3.5)), PixelPos::new(120, -4));
    }

    #[test]
    fn pixel_arithmetic_saturates() {
        let far = PixelPos::new(i32::MIN, i32::MAX);
        assert_eq!(far - PixelPos::new(1, -1), far);
        assert_eq!(far + PixelPos::new(-1, 1), far);
    }

    #[test]
    fn center_rounds_towards_top_left() {
        assert_eq!(PixelRect::new(4, 4, 6, 4).center(), PixelPos::new(6, 5));
        assert_eq!(PixelRect::new(0, 0, 5, 1).center(), PixelPos::new(2, 0));
    }
}
