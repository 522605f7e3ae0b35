//! Rendering primitives
//!
//! Plain data shared by every part of the renderer: vertex records with
//! their input layout descriptors and the per-frame camera state.

pub mod camera;
pub mod vertex;

pub use camera::CameraState;
pub use vertex::{GpuVertex, Vertex, VertexAttribute, VertexDistortion, VertexFormat, VertexLayout};
