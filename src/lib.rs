//! Annotation scene, history and export engine for screenshot editing
//!
//! The [`Editor`](session::Editor) owns a [`Scene`](session::Scene) built
//! around a decoded screenshot, turns pointer gestures into annotation objects,
//! keeps a bounded undo/redo log of the object set and flattens everything into
//! a PNG on export.

pub mod annotations;
pub mod capture;
pub mod config;
pub mod domain;
pub mod render;
pub mod session;

pub use config::EditorConfig;
pub use session::Editor;
