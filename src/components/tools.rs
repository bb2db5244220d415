use image::Rgba;

use crate::canvas::{PixelPos, PixelRect, RasterBuffer};
use crate::components::history::HistoryManager;
use crate::components::selection::FloatingSelection;
use crate::ops::fill::{self, Connectivity};
use crate::ops::shapes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Brush,
    Line,
    Rectangle,
    Ellipse,
    Fill,
    Select,
    Move,
    Rotate,
    Scale,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Line => "Line",
            Tool::Rectangle => "Rectangle",
            Tool::Ellipse => "Ellipse",
            Tool::Fill => "Fill",
            Tool::Select => "Select",
            Tool::Move => "Move",
            Tool::Rotate => "Rotate",
            Tool::Scale => "Scale",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Brush,
            Tool::Line,
            Tool::Rectangle,
            Tool::Ellipse,
            Tool::Fill,
            Tool::Select,
            Tool::Move,
            Tool::Rotate,
            Tool::Scale,
        ]
    }

    /// Case-insensitive lookup by label.
    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.label().eq_ignore_ascii_case(name.trim()))
    }

    /// Tools that operate on the floating selection.
    pub fn is_transform(&self) -> bool {
        matches!(self, Tool::Move | Tool::Rotate | Tool::Scale)
    }

    /// Tools that write to the canvas directly.  Selecting one of these
    /// drops any floating selection.
    pub fn is_painting(&self) -> bool {
        matches!(
            self,
            Tool::Brush | Tool::Line | Tool::Rectangle | Tool::Ellipse | Tool::Fill
        )
    }

    fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Ellipse => Some(ShapeKind::Ellipse),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Primitive drawn by an anchor-to-release drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Ellipse,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Line => "Line",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Ellipse => "Ellipse",
        }
    }

    /// Rasterise onto `buffer` with both corners inclusive.
    pub fn draw(&self, buffer: &mut RasterBuffer, a: PixelPos, b: PixelPos, stroke: u32, color: Rgba<u8>) {
        match self {
            ShapeKind::Line => shapes::draw_line(buffer, a, b, stroke, color),
            ShapeKind::Rectangle => shapes::draw_rect_outline(buffer, a, b, stroke, color),
            ShapeKind::Ellipse => shapes::draw_ellipse_outline(buffer, a, b, stroke, color),
        }
    }
}

// ============================================================================
// TOOL PROPERTIES
// ============================================================================

pub const MIN_TOOL_SIZE: u32 = 1;
pub const MAX_TOOL_SIZE: u32 = 50;

pub fn clamp_tool_size(size: u32) -> u32 {
    size.clamp(MIN_TOOL_SIZE, MAX_TOOL_SIZE)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub brush_color: Rgba<u8>,
    /// Brush stroke diameter in pixels.
    pub brush_size: u32,
    /// Line / rectangle / ellipse outline width in pixels.
    pub stroke_size: u32,
    pub fill_connectivity: Connectivity,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            brush_color: Rgba([0, 0, 0, 255]),
            brush_size: 3,
            stroke_size: 3,
            fill_connectivity: Connectivity::Four,
        }
    }
}

// ============================================================================
// INTERACTION STATE MACHINE
// ============================================================================

/// Per-gesture interaction state.  Coordinates are image-space pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ToolState {
    #[default]
    Idle,
    /// Brush drag; `last` is where the previous segment ended.
    Painting { last: PixelPos },
    /// Line / rectangle / ellipse drag, previewed until release.
    Drafting {
        shape: ShapeKind,
        anchor: PixelPos,
        current: PixelPos,
    },
    Selecting { anchor: PixelPos, current: PixelPos },
    /// A floating selection exists and no drag is in progress.
    FloatingIdle,
    FloatingMoving { last: PixelPos },
    FloatingRotating,
    FloatingScaling,
}

impl ToolState {
    pub fn is_dragging(&self) -> bool {
        !matches!(self, ToolState::Idle | ToolState::FloatingIdle)
    }

    /// Live selection rectangle while a selection drag is in progress.
    pub fn selection_rect(&self) -> Option<PixelRect> {
        match *self {
            ToolState::Selecting { anchor, current } => Some(PixelRect::spanning(anchor, current)),
            _ => None,
        }
    }
}

/// Left-button pointer input, already mapped to image space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Press(PixelPos),
    Move(PixelPos),
    Release(PixelPos),
}

/// Side effect requested by a state transition.  Effects are applied in
/// order, so a `PushHistory` always lands before the mutation it guards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolEffect {
    PushHistory(&'static str),
    BrushSegment { from: PixelPos, to: PixelPos },
    DrawShape {
        shape: ShapeKind,
        anchor: PixelPos,
        end: PixelPos,
    },
    /// Pushes its own history entry, and only when the fill changes a pixel.
    FloodFill(PixelPos),
    DiscardFloating,
    Lift(PixelRect),
    TranslateFloating(PixelPos),
    RotateFloating(PixelPos),
    ScaleFloating(PixelPos),
    SelectTool(Tool),
}

/// The interaction protocol as a pure function of the current state, the
/// active tool and one pointer event.  Returns the next state together with
/// the effects that take the canvas there.
pub fn transition(
    state: ToolState,
    tool: Tool,
    event: PointerEvent,
    has_floating: bool,
) -> (ToolState, Vec<ToolEffect>) {
    use ToolEffect as E;
    use ToolState as S;

    match (state, event) {
        // ---- press: only accepted while no drag is active ----
        (S::Idle | S::FloatingIdle, PointerEvent::Press(p)) => {
            if tool.is_transform() {
                return match (has_floating, tool) {
                    (false, _) => (state, Vec::new()),
                    (true, Tool::Move) => (S::FloatingMoving { last: p }, Vec::new()),
                    (true, Tool::Rotate) => (S::FloatingRotating, Vec::new()),
                    (true, _) => (S::FloatingScaling, Vec::new()),
                };
            }

            let mut effects = Vec::new();
            if has_floating {
                effects.push(E::DiscardFloating);
            }
            let next = match tool {
                Tool::Brush => {
                    effects.push(E::PushHistory("Brush"));
                    S::Painting { last: p }
                }
                Tool::Fill => {
                    effects.push(E::FloodFill(p));
                    S::Idle
                }
                Tool::Select => S::Selecting { anchor: p, current: p },
                _ => match tool.shape_kind() {
                    Some(shape) => {
                        effects.push(E::PushHistory(shape.label()));
                        S::Drafting {
                            shape,
                            anchor: p,
                            current: p,
                        }
                    }
                    None => state,
                },
            };
            (next, effects)
        }
        (_, PointerEvent::Press(_)) => (state, Vec::new()),

        // ---- move ----
        (S::Painting { last }, PointerEvent::Move(p)) => {
            (S::Painting { last: p }, vec![E::BrushSegment { from: last, to: p }])
        }
        (S::Drafting { shape, anchor, .. }, PointerEvent::Move(p)) => (
            S::Drafting {
                shape,
                anchor,
                current: p,
            },
            Vec::new(),
        ),
        (S::Selecting { anchor, .. }, PointerEvent::Move(p)) => {
            (S::Selecting { anchor, current: p }, Vec::new())
        }
        (S::FloatingMoving { last }, PointerEvent::Move(p)) => {
            (S::FloatingMoving { last: p }, vec![E::TranslateFloating(p - last)])
        }
        (S::FloatingRotating, PointerEvent::Move(p)) => (state, vec![E::RotateFloating(p)]),
        (S::FloatingScaling, PointerEvent::Move(p)) => (state, vec![E::ScaleFloating(p)]),
        (_, PointerEvent::Move(_)) => (state, Vec::new()),

        // ---- release ----
        (S::Painting { last }, PointerEvent::Release(p)) => {
            let effects = if p != last {
                vec![E::BrushSegment { from: last, to: p }]
            } else {
                Vec::new()
            };
            (S::Idle, effects)
        }
        (S::Drafting { shape, anchor, .. }, PointerEvent::Release(p)) => {
            (S::Idle, vec![E::DrawShape { shape, anchor, end: p }])
        }
        (S::Selecting { anchor, .. }, PointerEvent::Release(p)) => {
            let rect = PixelRect::spanning(anchor, p);
            if rect.is_empty() {
                (S::Idle, Vec::new())
            } else {
                (
                    S::FloatingIdle,
                    vec![
                        E::PushHistory("Lift Selection"),
                        E::Lift(rect),
                        E::SelectTool(Tool::Move),
                    ],
                )
            }
        }
        (S::FloatingMoving { last }, PointerEvent::Release(p)) => {
            let effects = if p != last {
                vec![E::TranslateFloating(p - last)]
            } else {
                Vec::new()
            };
            (S::FloatingIdle, effects)
        }
        (S::FloatingRotating | S::FloatingScaling, PointerEvent::Release(_)) => {
            (S::FloatingIdle, Vec::new())
        }
        (_, PointerEvent::Release(_)) => (state, Vec::new()),
    }
}

// ============================================================================
// TOOLS PANEL – owns tool config, gesture state and the floating selection
// ============================================================================

#[derive(Default)]
pub struct ToolsPanel {
    pub active_tool: Tool,
    pub properties: ToolProperties,
    tool_state: ToolState,
    floating: Option<FloatingSelection>,
}

impl ToolsPanel {
    pub fn new(properties: ToolProperties) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    pub fn state(&self) -> ToolState {
        self.tool_state
    }

    pub fn floating(&self) -> Option<&FloatingSelection> {
        self.floating.as_ref()
    }

    pub fn has_floating(&self) -> bool {
        self.floating.is_some()
    }

    /// Switch tools.  An active drag is cancelled; switching to a painting
    /// tool also drops the floating selection.  Returns `true` when a
    /// floating selection was discarded.
    pub fn change_tool(&mut self, new_tool: Tool) -> bool {
        if self.active_tool == new_tool {
            return false;
        }
        self.active_tool = new_tool;
        self.cancel_drag();
        if new_tool.is_painting() {
            return self.discard_floating();
        }
        false
    }

    /// Abandon the current gesture.  Work already applied to the canvas
    /// stays; previews are dropped.
    pub fn cancel_drag(&mut self) {
        self.tool_state = self.rest_state();
    }

    /// Drop the floating selection without merging it and return to `Idle`.
    pub fn discard_floating(&mut self) -> bool {
        self.tool_state = ToolState::Idle;
        self.take_floating()
    }

    fn take_floating(&mut self) -> bool {
        let had = self.floating.take().is_some();
        if had {
            log_warn!("Floating selection discarded without commit");
        }
        had
    }

    /// Feed one pointer event through the state machine and apply its
    /// effects to `canvas`.  Returns `true` when canvas pixels changed.
    pub fn handle_event(
        &mut self,
        event: PointerEvent,
        canvas: &mut RasterBuffer,
        history: &mut HistoryManager,
    ) -> bool {
        let (next, effects) =
            transition(self.tool_state, self.active_tool, event, self.floating.is_some());
        self.tool_state = next;
        let mut changed = false;
        for effect in effects {
            changed |= self.apply(effect, canvas, history);
        }
        changed
    }

    /// Merge the floating selection into `canvas` as one undoable step.
    /// No-op without a floating selection.
    pub fn commit_floating(&mut self, canvas: &mut RasterBuffer, history: &mut HistoryManager) -> bool {
        let Some(sel) = self.floating.take() else {
            return false;
        };
        history.push("Commit Selection", canvas);
        sel.commit(canvas);
        self.tool_state = ToolState::Idle;
        true
    }

    fn rest_state(&self) -> ToolState {
        if self.floating.is_some() {
            ToolState::FloatingIdle
        } else {
            ToolState::Idle
        }
    }

    fn apply(&mut self, effect: ToolEffect, canvas: &mut RasterBuffer, history: &mut HistoryManager) -> bool {
        let props = &self.properties;
        match effect {
            ToolEffect::PushHistory(description) => {
                history.push(description, canvas);
                false
            }
            ToolEffect::BrushSegment { from, to } => {
                shapes::draw_line(canvas, from, to, props.brush_size, props.brush_color);
                true
            }
            ToolEffect::DrawShape { shape, anchor, end } => {
                shape.draw(canvas, anchor, end, props.stroke_size, props.brush_color);
                true
            }
            ToolEffect::FloodFill(start) => {
                if !fill::fill_applies(canvas, start, props.brush_color) {
                    return false;
                }
                history.push("Fill", canvas);
                match fill::flood_fill(canvas, start, props.brush_color, props.fill_connectivity) {
                    Some(bbox) => {
                        log_info!(
                            "Fill at ({}, {}) covered {}x{} px",
                            start.x,
                            start.y,
                            bbox.width,
                            bbox.height
                        );
                        true
                    }
                    None => false,
                }
            }
            ToolEffect::DiscardFloating => {
                self.take_floating();
                false
            }
            ToolEffect::Lift(rect) => {
                self.floating = FloatingSelection::lift(canvas, rect);
                self.tool_state = self.rest_state();
                if self.floating.is_none() {
                    return false;
                }
                log_info!("Lifted selection {}x{} at ({}, {})", rect.width, rect.height, rect.x, rect.y);
                true
            }
            ToolEffect::TranslateFloating(delta) => {
                if let Some(sel) = self.floating.as_mut() {
                    sel.translate_by(delta);
                }
                false
            }
            ToolEffect::RotateFloating(point) => {
                if let Some(sel) = self.floating.as_mut() {
                    sel.rotate_towards(point);
                }
                false
            }
            ToolEffect::ScaleFloating(point) => {
                if let Some(sel) = self.floating.as_mut() {
                    sel.scale_towards(point);
                }
                false
            }
            ToolEffect::SelectTool(tool) => {
                self.active_tool = tool;
                false
            }
        }
    }
}
