//! Source image handling
//!
//! This module contains:
//! - The decoded source raster the scene is built around (image.rs)
//! - Asynchronous decoding guarded by the session's liveness flag (loader.rs)

pub mod image;
pub mod loader;
