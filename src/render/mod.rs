//! Rendering module
//!
//! This module contains:
//! - Geometry calculations shared between the tools and the rasterizer
//! - Background gradient resolution
//! - Blur region pixelation
//! - Scene rasterization using tiny-skia

pub mod geometry;
pub mod gradient;
pub mod image;
pub mod pixelate;
