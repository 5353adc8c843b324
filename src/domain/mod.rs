//! Pure domain types with minimal dependencies
//!
//! This module contains the value types and the annotation object model used
//! throughout the engine. Nothing here knows about rendering or history.

pub mod annotation;
pub mod geometry;
pub mod style;
pub mod tool;

pub use annotation::*;
pub use geometry::*;
pub use style::*;
pub use tool::*;
