//! Annotation creation and editing
//!
//! This module provides the tool state machine that turns pointer gestures
//! into scene objects (rectangles, ellipses, lines, arrows, text and blur
//! regions).

pub mod tools;

pub use tools::{BlurRequest, TEXT_PLACEHOLDER, ToolMachine, ToolOutcome, ToolSettings, ToolState};
