// ============================================================================
// PREVIEW OVERLAY – view-space shapes painted over the canvas, never into it
// ============================================================================

use egui::{Color32, Pos2, Rect, Shape, Stroke};

pub const DASH_LEN: f32 = 6.0;
pub const GAP_LEN: f32 = 4.0;

/// Border colour drawn around a floating selection.
pub const FLOATING_BORDER: Color32 = Color32::from_rgb(0, 120, 255);
pub const FLOATING_BORDER_WIDTH: f32 = 2.0;

/// Dashed segment from `a` to `b`.  Degenerate segments produce nothing.
pub fn dashed_line(a: Pos2, b: Pos2, stroke: Stroke, out: &mut Vec<Shape>) {
    let line_vec = b - a;
    let line_len = line_vec.length();
    if line_len < 1e-3 {
        return;
    }
    let dir = line_vec / line_len;
    let mut d = 0.0;
    while d < line_len {
        let seg_start = a + dir * d;
        let seg_end = a + dir * (d + DASH_LEN).min(line_len);
        out.push(Shape::line_segment([seg_start, seg_end], stroke));
        d += DASH_LEN + GAP_LEN;
    }
}

pub fn dashed_rect(rect: Rect, stroke: Stroke, out: &mut Vec<Shape>) {
    let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
    for i in 0..4 {
        dashed_line(corners[i], corners[(i + 1) % 4], stroke, out);
    }
}

/// Ellipse inscribed in `rect`, traced as a polyline with every other
/// segment skipped.
pub fn dashed_ellipse(rect: Rect, stroke: Stroke, out: &mut Vec<Shape>) {
    let center = rect.center();
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    if rx < 0.5 || ry < 0.5 {
        dashed_line(rect.left_top(), rect.right_bottom(), stroke, out);
        return;
    }
    // Roughly one dash per DASH_LEN + GAP_LEN of circumference.
    let circumference = std::f32::consts::PI * (rx + ry);
    let segments = ((circumference / (DASH_LEN + GAP_LEN)) as usize * 2).max(16);
    let point = |i: usize| {
        let t = std::f32::consts::TAU * i as f32 / segments as f32;
        Pos2::new(center.x + rx * t.cos(), center.y + ry * t.sin())
    };
    for i in (0..segments).step_by(2) {
        out.push(Shape::line_segment([point(i), point(i + 1)], stroke));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke() -> Stroke {
        Stroke::new(1.0, Color32::BLACK)
    }

    #[test]
    fn dashed_line_splits_into_dashes() {
        let mut out = Vec::new();
        dashed_line(Pos2::new(0.0, 0.0), Pos2::new(25.0, 0.0), stroke(), &mut out);
        // Dashes start at 0, 10 and 20.
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn zero_length_line_is_empty() {
        let mut out = Vec::new();
        dashed_line(Pos2::new(3.0, 3.0), Pos2::new(3.0, 3.0), stroke(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn dashed_rect_covers_all_sides() {
        let mut out = Vec::new();
        dashed_rect(Rect::from_min_max(Pos2::ZERO, Pos2::new(5.0, 5.0)), stroke(), &mut out);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn dashed_ellipse_emits_segments() {
        let mut out = Vec::new();
        dashed_ellipse(Rect::from_min_max(Pos2::ZERO, Pos2::new(100.0, 40.0)), stroke(), &mut out);
        assert!(out.len() >= 8);
    }
}
