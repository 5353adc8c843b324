//! Editing session
//!
//! This module contains:
//! - The scene (fixed layers, layout and annotation objects)
//! - The bounded undo/redo history
//! - Zoom and auto fit
//! - Export of the flattened raster
//! - Keyboard shortcuts and listener lifetime
//! - The [`Editor`] facade tying them together

pub mod editor;
pub mod export;
pub mod history;
pub mod lifecycle;
pub mod scene;
pub mod shortcuts;
pub mod view;

pub use editor::Editor;
pub use history::{History, HistoryEntry, HistoryPhase, MAX_HISTORY_SIZE};
pub use lifecycle::{ListenerGuard, ListenerHandle, ListenerKind, ListenerRegistry, Liveness};
pub use scene::{Scene, SceneItem};
