//! Model loader
//!
//! The host turns the model bytes into its own mesh asset. The loader only
//! walks the frame table so animated models can be drawn one frame's face
//! range at a time.
//!
//! Model file layout (little-endian `i32` fields):
//!
//! ```text
//! version
//! scale                       (version >= 2)
//! model_count
//! frame_count                 (version >= 5, otherwise 1)
//! per frame:
//!     vertex_count, vertex_count * vertex record (56 bytes, 60 from version 1)
//!     face_count,   face_count * 3 indices
//! ```

use std::path::Path;

use crate::assets::{AssetError, FileInterface, StdFileInterface};
use crate::render::api::{MeshHandle, RenderBackend};

/// A host mesh plus its per-frame face table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    mesh: MeshHandle,
    animation_face_offsets: Vec<u32>,
    animation_face_counts: Vec<u32>,
}

impl ModelAsset {
    /// Build from a mesh and per-frame `(offset, count)` face ranges
    pub fn new(mesh: MeshHandle, frames: &[(u32, u32)]) -> Self {
        Self {
            mesh,
            animation_face_offsets: frames.iter().map(|f| f.0).collect(),
            animation_face_counts: frames.iter().map(|f| f.1).collect(),
        }
    }

    /// Host mesh
    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    /// First face of each frame
    pub fn animation_face_offsets(&self) -> &[u32] {
        &self.animation_face_offsets
    }

    /// Face count of each frame
    pub fn animation_face_counts(&self) -> &[u32] {
        &self.animation_face_counts
    }

    /// Number of animation frames
    pub fn frame_count(&self) -> usize {
        self.animation_face_counts.len()
    }

    /// Face range to draw at `time`, `None` for the whole mesh
    ///
    /// Time wraps around the frame count, negative times included.
    pub fn face_range(&self, time: i32) -> Option<(u32, u32)> {
        if self.frame_count() <= 1 {
            return None;
        }
        let frame = time.rem_euclid(self.frame_count() as i32) as usize;
        Some((self.animation_face_offsets[frame], self.animation_face_counts[frame]))
    }
}

/// Loads models through a [`FileInterface`]
pub struct ModelLoader {
    files: Box<dyn FileInterface>,
}

impl ModelLoader {
    /// Create a loader; `None` reads from the standard file system
    pub fn new(files: Option<Box<dyn FileInterface>>) -> Self {
        Self {
            files: files.unwrap_or_else(|| Box::new(StdFileInterface::new())),
        }
    }

    /// Read a model file and create its host mesh
    pub fn load(&self, backend: &mut dyn RenderBackend, path: &Path) -> Result<ModelAsset, AssetError> {
        let bytes = self.files.read(path)?;
        let model = self.load_from_bytes(backend, &bytes)?;
        log::info!("Loaded model {:?} ({} frames) from {:?}", model.mesh, model.frame_count(), path);
        Ok(model)
    }

    /// Create a model from file bytes
    pub fn load_from_bytes(&self, backend: &mut dyn RenderBackend, bytes: &[u8]) -> Result<ModelAsset, AssetError> {
        let frames = parse_frame_table(bytes)?;
        let mesh = backend.create_model(bytes)?;
        Ok(ModelAsset::new(mesh, &frames))
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader").finish_non_exhaustive()
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl Reader<'_> {
    fn i32(&mut self) -> Result<i32, AssetError> {
        let end = self.position + 4;
        let field = self
            .bytes
            .get(self.position..end)
            .ok_or_else(|| AssetError::Decode(format!("model truncated at byte {}", self.position)))?;
        self.position = end;
        Ok(i32::from_le_bytes([field[0], field[1], field[2], field[3]]))
    }

    fn count(&mut self, what: &str) -> Result<usize, AssetError> {
        let value = self.i32()?;
        usize::try_from(value).map_err(|_| AssetError::Decode(format!("negative {what} count {value}")))
    }

    fn skip(&mut self, len: usize) -> Result<(), AssetError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| AssetError::Decode(format!("model truncated at byte {}", self.position)))?;
        self.position = end;
        Ok(())
    }
}

/// Walk the model file and collect `(face_offset, face_count)` per frame
fn parse_frame_table(bytes: &[u8]) -> Result<Vec<(u32, u32)>, AssetError> {
    let mut reader = Reader { bytes, position: 0 };

    let version = reader.i32()?;
    if version >= 2 {
        reader.i32()?;
    }
    reader.i32()?;
    let frame_count = if version >= 5 { reader.count("frame")? } else { 1 };
    let vertex_size = if version >= 1 { 60 } else { 56 };

    let mut frames = Vec::with_capacity(frame_count.min(1024));
    let mut offset = 0u32;
    for _ in 0..frame_count {
        let vertices = reader.count("vertex")?;
        reader.skip(vertices.saturating_mul(vertex_size))?;
        let faces = reader.count("face")?;
        reader.skip(faces.saturating_mul(12))?;

        let faces = u32::try_from(faces).map_err(|_| AssetError::Decode("face count overflow".into()))?;
        frames.push((offset, faces));
        offset = offset.saturating_add(faces);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingBackend;

    fn model_bytes(version: i32, frames: &[(i32, i32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut push = |v: i32| out.extend_from_slice(&v.to_le_bytes());
        push(version);
        if version >= 2 {
            push(1);
        }
        push(1);
        if version >= 5 {
            push(frames.len() as i32);
        }
        let vertex_size = if version >= 1 { 60 } else { 56 };
        for &(vertices, faces) in frames {
            out.extend_from_slice(&vertices.to_le_bytes());
            out.extend(std::iter::repeat(0u8).take(vertices as usize * vertex_size));
            out.extend_from_slice(&faces.to_le_bytes());
            out.extend(std::iter::repeat(0u8).take(faces as usize * 12));
        }
        out
    }

    #[test]
    fn test_animated_face_table() {
        let bytes = model_bytes(5, &[(3, 1), (4, 2), (6, 4)]);
        assert_eq!(parse_frame_table(&bytes).unwrap(), vec![(0, 1), (1, 2), (3, 4)]);
    }

    #[test]
    fn test_static_model_has_one_frame() {
        let bytes = model_bytes(1, &[(3, 1)]);
        let mut backend = RecordingBackend::new();
        let model = ModelLoader::new(None).load_from_bytes(&mut backend, &bytes).unwrap();
        assert_eq!(model.frame_count(), 1);
        assert_eq!(model.face_range(7), None);
    }

    #[test]
    fn test_face_range_wraps_time() {
        let model = ModelAsset::new(MeshHandle(1), &[(0, 1), (1, 2), (3, 4)]);
        assert_eq!(model.face_range(0), Some((0, 1)));
        assert_eq!(model.face_range(4), Some((1, 2)));
        assert_eq!(model.face_range(-1), Some((3, 4)));
    }

    #[test]
    fn test_truncated_model_rejected() {
        let mut bytes = model_bytes(5, &[(3, 1)]);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(parse_frame_table(&bytes), Err(AssetError::Decode(_))));
    }

    #[test]
    fn test_load_through_file_interface() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.efkmodel"), model_bytes(5, &[(3, 1), (3, 1)])).unwrap();

        let loader = ModelLoader::new(Some(Box::new(StdFileInterface::with_root(dir.path()))));
        let mut backend = RecordingBackend::new();
        let model = loader.load(&mut backend, Path::new("m.efkmodel")).unwrap();
        assert_eq!(model.animation_face_offsets(), &[0, 1]);
    }
}
