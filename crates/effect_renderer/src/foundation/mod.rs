//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the renderer:
//! - Math types, packed colors and UV rectangles
//! - Logging initialization

pub mod math;
pub mod logging;
