//! Raster editing engine: a fixed-size RGBA canvas with brush, line,
//! rectangle, ellipse and flood-fill tools, a lift/move/rotate/scale
//! floating selection, bounded snapshot undo/redo and a pan/zoom viewport.
//!
//! [`project::Project`] is the editing session and the only entry point a
//! shell needs: it accepts commands and view-space pointer events and hands
//! back preview shapes and the flattened image.

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{PixelPos, PixelRect, RasterBuffer, Viewport};
pub use components::tools::Tool;
pub use io::SaveError;
pub use project::Project;
pub use settings::EditorSettings;
