use std::collections::VecDeque;

use crate::canvas::RasterBuffer;

/// Default number of undo steps kept before the oldest is evicted.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// CANVAS SNAPSHOT
// ============================================================================

/// A full, independently owned copy of the raster buffer.  `description`
/// names the operation that moved the canvas away from this state.
#[derive(Clone)]
pub struct CanvasSnapshot {
    pub description: String,
    pub pixels: RasterBuffer,
}

impl CanvasSnapshot {
    pub fn capture(description: &str, canvas: &RasterBuffer) -> Self {
        Self {
            description: description.to_string(),
            pixels: canvas.clone(),
        }
    }

    fn memory_bytes(&self) -> usize {
        self.pixels.memory_bytes() + self.description.len()
    }
}

// ============================================================================
// HISTORY MANAGER - snapshot undo/redo with a bounded undo stack
// ============================================================================

/// Undo/redo history.  The undo stack is capped at `max_history_size`
/// (oldest evicted first); the redo stack is cleared by every new push.
pub struct HistoryManager {
    undo_stack: VecDeque<CanvasSnapshot>,
    redo_stack: Vec<CanvasSnapshot>,
    max_history_size: usize,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        let max_history_size = max_history_size.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_history_size + 1),
            redo_stack: Vec::new(),
            max_history_size,
            total_memory: 0,
        }
    }

    /// Record `canvas` as it is *before* the operation about to mutate it.
    pub fn push(&mut self, description: &str, canvas: &RasterBuffer) {
        for snap in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(snap.memory_bytes());
        }

        let snap = CanvasSnapshot::capture(description, canvas);
        self.total_memory += snap.memory_bytes();
        self.undo_stack.push_back(snap);

        self.prune();
    }

    /// Restore the previous state.  Returns the description of the undone
    /// step, or `None` when there is nothing to undo.
    pub fn undo(&mut self, canvas: &mut RasterBuffer) -> Option<String> {
        let snap = self.undo_stack.pop_back()?;
        let description = snap.description.clone();
        let displaced = std::mem::replace(canvas, snap.pixels);
        self.redo_stack.push(CanvasSnapshot {
            description: description.clone(),
            pixels: displaced,
        });
        Some(description)
    }

    /// Re-apply the most recently undone step.
    pub fn redo(&mut self, canvas: &mut RasterBuffer) -> Option<String> {
        let snap = self.redo_stack.pop()?;
        let description = snap.description.clone();
        let displaced = std::mem::replace(canvas, snap.pixels);
        self.undo_stack.push_back(CanvasSnapshot {
            description: description.clone(),
            pixels: displaced,
        });
        self.prune();
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.description.as_str())
    }

    /// All undo descriptions (most recent first).
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.description.clone()).collect()
    }

    /// Bytes held by both stacks (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
