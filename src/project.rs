use std::path::{Path, PathBuf};

use egui::{Color32, PointerButton, Pos2, Shape, Stroke, Vec2};
use image::{Rgba, RgbaImage};

use crate::canvas::{PixelPos, PixelRect, RasterBuffer, Viewport};
use crate::components::history::HistoryManager;
use crate::components::overlay;
use crate::components::selection::FloatingSelection;
use crate::components::tools::{
    PointerEvent, ShapeKind, Tool, ToolProperties, ToolState, ToolsPanel, clamp_tool_size,
};
use crate::io::{self, SaveError};
use crate::ops::fill::Connectivity;
use crate::settings::EditorSettings;

/// Middle-button pan gesture in progress.
#[derive(Clone, Copy, Debug)]
struct PanDrag {
    origin: Vec2,
    press_pos: Pos2,
}

/// The editing session: the single owner of the canvas, its history, the
/// viewport and the tool state.  Commands and pointer events are the only
/// way in; none of them fail on bad input.
pub struct Project {
    canvas: RasterBuffer,
    history: HistoryManager,
    viewport: Viewport,
    tools: ToolsPanel,
    settings: EditorSettings,
    pan_drag: Option<PanDrag>,
    /// Last successful save destination.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Project {
    pub fn new(settings: EditorSettings) -> Self {
        let canvas = RasterBuffer::new_filled(
            settings.canvas_width,
            settings.canvas_height,
            settings.background,
        );
        Self {
            viewport: Viewport::new(canvas.width(), canvas.height()),
            history: HistoryManager::new(settings.max_undo_steps),
            tools: ToolsPanel::new(settings.tool_properties()),
            canvas,
            settings,
            pan_drag: None,
            path: None,
            is_dirty: false,
        }
    }

    /// Session sized `width`×`height` with every other setting at its default.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(EditorSettings {
            canvas_width: width,
            canvas_height: height,
            ..Default::default()
        })
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn canvas(&self) -> &RasterBuffer {
        &self.canvas
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn active_tool(&self) -> Tool {
        self.tools.active_tool
    }

    pub fn properties(&self) -> &ToolProperties {
        &self.tools.properties
    }

    pub fn tool_state(&self) -> ToolState {
        self.tools.state()
    }

    pub fn floating_selection(&self) -> Option<&FloatingSelection> {
        self.tools.floating()
    }

    pub fn is_panning(&self) -> bool {
        self.pan_drag.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.history.undo_history()
    }

    pub fn memory_usage(&self) -> usize {
        self.history.memory_usage()
    }

    /// Flattened copy of the canvas.  An uncommitted floating selection is
    /// not part of it.
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.canvas.to_rgba_image()
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tools.active_tool == tool {
            return;
        }
        self.tools.change_tool(tool);
        log_info!("Mode: {}", tool);
    }

    pub fn set_brush_color(&mut self, color: Rgba<u8>) {
        self.tools.properties.brush_color = color;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.tools.properties.brush_size = clamp_tool_size(size);
    }

    pub fn set_stroke_size(&mut self, size: u32) {
        self.tools.properties.stroke_size = clamp_tool_size(size);
    }

    /// Accepts 4 or 8; anything else is ignored.  Returns whether the value
    /// was accepted.
    pub fn set_fill_connectivity(&mut self, neighbours: u8) -> bool {
        match Connectivity::from_count(neighbours) {
            Some(c) => {
                self.tools.properties.fill_connectivity = c;
                true
            }
            None => false,
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.settings.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.settings.zoom_step);
    }

    pub fn set_view_size(&mut self, size: Vec2) {
        self.viewport.set_view_size(size);
    }

    /// Step back one history entry.  Any floating selection is dropped first;
    /// with nothing to undo the session is left untouched.
    pub fn undo(&mut self) -> Option<String> {
        if !self.history.can_undo() {
            return None;
        }
        self.tools.discard_floating();
        let description = self.history.undo(&mut self.canvas)?;
        log_info!("Undo: {}", description);
        self.mark_dirty();
        Some(description)
    }

    pub fn redo(&mut self) -> Option<String> {
        if !self.history.can_redo() {
            return None;
        }
        self.tools.discard_floating();
        let description = self.history.redo(&mut self.canvas)?;
        log_info!("Redo: {}", description);
        self.mark_dirty();
        Some(description)
    }

    /// Fill the canvas with the background colour as one undoable step.
    pub fn clear(&mut self) {
        self.tools.discard_floating();
        self.history.push("Clear", &self.canvas);
        self.canvas.fill(self.settings.background);
        log_info!("Canvas cleared");
        self.mark_dirty();
    }

    /// Merge the floating selection into the canvas.  Returns `false` when
    /// there was nothing to commit.
    pub fn commit_floating_selection(&mut self) -> bool {
        let committed = self.tools.commit_floating(&mut self.canvas, &mut self.history);
        if committed {
            log_info!("Selection committed");
            self.mark_dirty();
        }
        committed
    }

    /// Write the flattened canvas to `path` as PNG.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();
        match io::save_png(self.canvas.as_rgba_image(), path) {
            Ok(()) => {
                log_info!("Saved {}", path.display());
                self.path = Some(path.to_path_buf());
                self.mark_clean();
                Ok(())
            }
            Err(e) => {
                log_err!("Save to '{}' failed: {}", path.display(), e);
                Err(e)
            }
        }
    }

    // ========================================================================
    // POINTER INPUT (view space)
    // ========================================================================

    pub fn press(&mut self, pos: Pos2, button: PointerButton) {
        match button {
            PointerButton::Primary => {
                if self.pan_drag.is_some() {
                    return;
                }
                let p = self.viewport.to_image_pixel(pos);
                self.dispatch(PointerEvent::Press(p));
            }
            PointerButton::Middle => {
                if self.tools.state().is_dragging() {
                    return;
                }
                self.pan_drag = Some(PanDrag {
                    origin: self.viewport.pan_offset,
                    press_pos: pos,
                });
            }
            _ => {}
        }
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        if let Some(pan) = self.pan_drag {
            self.viewport.pan_offset = pan.origin + (pos - pan.press_pos);
            return;
        }
        let p = self.viewport.to_image_pixel(pos);
        self.dispatch(PointerEvent::Move(p));
    }

    pub fn release(&mut self, pos: Pos2, button: PointerButton) {
        match button {
            PointerButton::Primary => {
                if self.pan_drag.is_some() {
                    return;
                }
                let p = self.viewport.to_image_pixel(pos);
                self.dispatch(PointerEvent::Release(p));
            }
            PointerButton::Middle => {
                if let Some(pan) = self.pan_drag.take() {
                    self.viewport.pan_offset = pan.origin + (pos - pan.press_pos);
                }
            }
            _ => {}
        }
    }

    /// One zoom step per wheel notch, keeping the image point under `pos`
    /// fixed.  Positive `delta` zooms in.
    pub fn wheel(&mut self, pos: Pos2, delta: f32) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        let step = self.settings.zoom_step;
        let zoom = if delta > 0.0 {
            self.viewport.zoom * step
        } else {
            self.viewport.zoom / step
        };
        self.viewport.zoom_around_view_point(zoom, pos);
    }

    fn dispatch(&mut self, event: PointerEvent) {
        let before = self.tools.active_tool;
        if self.tools.handle_event(event, &mut self.canvas, &mut self.history) {
            self.mark_dirty();
        }
        if self.tools.active_tool != before {
            log_info!("Mode: {}", self.tools.active_tool);
        }
    }

    // ========================================================================
    // PREVIEW OVERLAY
    // ========================================================================

    /// Transformed floating pixels and the image-space position of their
    /// top-left corner.
    pub fn floating_preview(&self) -> Option<(PixelPos, RgbaImage)> {
        self.tools.floating().map(FloatingSelection::placement)
    }

    /// View-space shapes for the shell to paint over the canvas: the draft
    /// primitive of an active drag, the live selection rectangle and the
    /// border of the floating selection.
    pub fn preview_shapes(&self) -> Vec<Shape> {
        let mut out = Vec::new();
        let zoom = self.viewport.zoom;
        let props = &self.tools.properties;
        let [r, g, b, a] = props.brush_color.0;
        let draft = Stroke::new(
            props.stroke_size as f32 * zoom,
            Color32::from_rgba_unmultiplied(r, g, b, a),
        );

        match self.tools.state() {
            ToolState::Drafting { shape, anchor, current } => {
                let bounds = self
                    .viewport
                    .to_view_rect(PixelRect::spanning_inclusive(anchor, current));
                match shape {
                    ShapeKind::Line => {
                        let centre = Vec2::splat(0.5);
                        let from = self.viewport.to_view(anchor.to_pos2() + centre);
                        let to = self.viewport.to_view(current.to_pos2() + centre);
                        overlay::dashed_line(from, to, draft, &mut out);
                    }
                    ShapeKind::Rectangle => overlay::dashed_rect(bounds, draft, &mut out),
                    ShapeKind::Ellipse => overlay::dashed_ellipse(bounds, draft, &mut out),
                }
            }
            ToolState::Selecting { anchor, current } => {
                let rect = self.viewport.to_view_rect(PixelRect::spanning(anchor, current));
                overlay::dashed_rect(rect, Stroke::new(1.0, Color32::DARK_GRAY), &mut out);
            }
            _ => {}
        }

        if let Some((origin, pixels)) = self.floating_preview() {
            let placed = PixelRect::new(
                origin.x,
                origin.y,
                pixels.width() as i32,
                pixels.height() as i32,
            );
            let border = Stroke::new(overlay::FLOATING_BORDER_WIDTH, overlay::FLOATING_BORDER);
            overlay::dashed_rect(self.viewport.to_view_rect(placed), border, &mut out);
        }
        out
    }

    // ========================================================================
    // KEYBOARD SHORTCUTS
    // ========================================================================

    /// Run a shortcut.  `Save` needs a destination from the shell and is not
    /// handled here; returns `false` for it.
    pub fn apply_shortcut(&mut self, shortcut: Shortcut) -> bool {
        match shortcut {
            Shortcut::Tool(tool) => self.set_tool(tool),
            Shortcut::Undo => {
                self.undo();
            }
            Shortcut::Redo => {
                self.redo();
            }
            Shortcut::Clear => self.clear(),
            Shortcut::ZoomIn => self.zoom_in(),
            Shortcut::ZoomOut => self.zoom_out(),
            Shortcut::Save => return false,
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    Tool(Tool),
    Undo,
    Redo,
    Clear,
    Save,
    ZoomIn,
    ZoomOut,
}

/// Default single-key bindings (case-insensitive).
pub fn shortcut_for_key(key: char) -> Option<Shortcut> {
    Some(match key.to_ascii_lowercase() {
        'b' => Shortcut::Tool(Tool::Brush),
        'l' => Shortcut::Tool(Tool::Line),
        'r' => Shortcut::Tool(Tool::Rectangle),
        'c' => Shortcut::Tool(Tool::Ellipse),
        'f' => Shortcut::Tool(Tool::Fill),
        's' => Shortcut::Tool(Tool::Select),
        'm' => Shortcut::Tool(Tool::Move),
        't' => Shortcut::Tool(Tool::Rotate),
        'e' => Shortcut::Tool(Tool::Scale),
        'z' => Shortcut::Undo,
        'y' => Shortcut::Redo,
        'x' => Shortcut::Clear,
        'p' => Shortcut::Save,
        '+' | '=' => Shortcut::ZoomIn,
        '-' => Shortcut::ZoomOut,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcut_keys_map_to_commands() {
        assert_eq!(shortcut_for_key('B'), Some(Shortcut::Tool(Tool::Brush)));
        assert_eq!(shortcut_for_key('c'), Some(Shortcut::Tool(Tool::Ellipse)));
        assert_eq!(shortcut_for_key('+'), Some(Shortcut::ZoomIn));
        assert_eq!(shortcut_for_key('q'), None);
    }

    #[test]
    fn sizes_and_connectivity_are_validated() {
        let mut project = Project::with_size(4, 4);
        project.set_brush_size(0);
        project.set_stroke_size(99);
        assert_eq!(project.properties().brush_size, 1);
        assert_eq!(project.properties().stroke_size, 50);
        assert!(!project.set_fill_connectivity(6));
        assert_eq!(project.properties().fill_connectivity, Connectivity::Four);
        assert!(project.set_fill_connectivity(8));
        assert_eq!(project.properties().fill_connectivity, Connectivity::Eight);
    }

    #[test]
    fn middle_drag_pans_without_painting() {
        let mut project = Project::with_size(20, 20);
        project.press(Pos2::new(5.0, 5.0), PointerButton::Middle);
        project.pointer_move(Pos2::new(12.0, 2.0));
        project.release(Pos2::new(15.0, 9.0), PointerButton::Middle);
        assert_eq!(project.viewport().pan_offset, Vec2::new(10.0, 4.0));
        assert!(!project.is_panning());
        assert!(!project.can_undo());
    }

    #[test]
    fn zoom_commands_step_and_clamp() {
        let mut project = Project::with_size(10, 10);
        project.zoom_in();
        assert!((project.viewport().zoom - 1.1).abs() < 1e-6);
        project.set_zoom(40.0);
        assert_eq!(project.viewport().zoom, crate::canvas::MAX_ZOOM);
        project.zoom_in();
        assert_eq!(project.viewport().zoom, crate::canvas::MAX_ZOOM);
    }

    #[test]
    fn drafting_preview_uses_stroke_width_times_zoom() {
        let mut project = Project::with_size(50, 50);
        project.set_tool(Tool::Line);
        project.set_stroke_size(4);
        project.set_zoom(2.0);
        project.press(Pos2::new(0.0, 0.0), PointerButton::Primary);
        project.pointer_move(Pos2::new(60.0, 0.0));
        let shapes = project.preview_shapes();
        assert!(!shapes.is_empty());
        for shape in &shapes {
            match shape {
                Shape::LineSegment { stroke, .. } => assert_eq!(stroke.width, 8.0),
                other => panic!("unexpected shape {other:?}"),
            }
        }
        // Still only a preview.
        assert_eq!(project.canvas().get_pixel(10, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn floating_selection_has_border_preview() {
        let mut project = Project::with_size(20, 20);
        project.set_tool(Tool::Select);
        project.press(Pos2::new(2.0, 2.0), PointerButton::Primary);
        project.pointer_move(Pos2::new(8.0, 8.0));
        project.release(Pos2::new(8.0, 8.0), PointerButton::Primary);
        assert_eq!(project.active_tool(), Tool::Move);
        let (origin, pixels) = project.floating_preview().unwrap();
        assert_eq!(origin, PixelPos::new(2, 2));
        assert_eq!(pixels.dimensions(), (6, 6));
        assert!(!project.preview_shapes().is_empty());
    }

    #[test]
    fn undo_drops_floating_selection() {
        let mut project = Project::with_size(20, 20);
        project.set_tool(Tool::Select);
        project.press(Pos2::new(2.0, 2.0), PointerButton::Primary);
        project.release(Pos2::new(8.0, 8.0), PointerButton::Primary);
        assert!(project.floating_selection().is_some());
        assert_eq!(project.undo().as_deref(), Some("Lift Selection"));
        assert!(project.floating_selection().is_none());
        assert_eq!(project.tool_state(), ToolState::Idle);
        assert_eq!(project.canvas().get_pixel(3, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn empty_stack_undo_and_redo_keep_floating_selection() {
        let mut project = Project::with_size(20, 20);
        project.set_tool(Tool::Select);
        project.press(Pos2::new(2.0, 2.0), PointerButton::Primary);
        project.release(Pos2::new(8.0, 8.0), PointerButton::Primary);

        assert_eq!(project.redo(), None);
        assert!(project.floating_selection().is_some());
        assert_eq!(project.tool_state(), ToolState::FloatingIdle);

        let mut fresh = Project::with_size(20, 20);
        assert_eq!(fresh.undo(), None);
        assert!(!fresh.is_dirty);
    }
}
