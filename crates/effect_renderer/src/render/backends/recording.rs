//! Headless backend that records every call
//!
//! Used by the test suites and the viewer to inspect exactly what the
//! renderer asked the host to do. Vertex uploads are kept so they can be
//! read back.

use std::collections::HashMap;

use crate::render::api::{
    BackendResult, BufferHandle, MaterialHandle, MeshHandle, MeshSubmission,
    ModelMaterialParameters, RenderBackend, ShaderProgramHandle, TextureHandle,
};
use crate::render::primitives::VertexLayout;
use crate::render::resources::{
    AlphaBlendMode, CullingMode, MaterialKey, RenderMode, ShaderKind, TextureFilter, TextureWrap,
};
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum BackendCommand {
    CreateVertexBuffer { buffer: BufferHandle, size: usize },
    CreateIndexBuffer { buffer: BufferHandle, index_count: usize },
    UploadVertices { buffer: BufferHandle, offset: usize, len: usize, discard: bool },
    ReleaseBuffer(BufferHandle),
    CreateShader { program: ShaderProgramHandle, kind: ShaderKind },
    ReleaseShader(ShaderProgramHandle),
    BindShader { program: ShaderProgramHandle, stride: usize },
    UnbindShader(ShaderProgramHandle),
    SetVertexConstants { program: ShaderProgramHandle, data: Vec<u8> },
    SetPixelConstants { program: ShaderProgramHandle, data: Vec<u8> },
    SetBlend(AlphaBlendMode),
    SetDepth { test: bool, write: bool },
    SetCull(CullingMode),
    SetRenderMode(RenderMode),
    SetSampler { slot: usize, filter: TextureFilter, wrap: TextureWrap },
    SetTextures(Vec<TextureHandle>),
    BindGeometry { vertex_buffer: BufferHandle, stride: usize, index_buffer: BufferHandle },
    DrawSprites { sprite_count: usize, vertex_offset: usize },
    CreateMaterialInstance { material: MaterialHandle, key: MaterialKey, view_index: usize },
    SetMaterialParameters { material: MaterialHandle, params: ModelMaterialParameters },
    SubmitMesh(MeshSubmission),
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    CreateModel { mesh: MeshHandle, len: usize },
    SaveHostState,
    RestoreHostState,
    LostDevice,
    ResetDevice,
}

/// [`RenderBackend`] that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<BackendCommand>,
    next_handle: u64,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    device_lost: bool,
    fail_uploads: bool,
    fail_shaders: bool,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Drain the recorded calls
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Forget the recorded calls
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&BackendCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// `(sprite_count, vertex_offset)` of every draw, in order
    pub fn draw_calls(&self) -> Vec<(usize, usize)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::DrawSprites { sprite_count, vertex_offset } => Some((*sprite_count, *vertex_offset)),
                _ => None,
            })
            .collect()
    }

    /// Mesh submissions, in order
    pub fn submissions(&self) -> Vec<&MeshSubmission> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::SubmitMesh(submission) => Some(submission),
                _ => None,
            })
            .collect()
    }

    /// Contents of a vertex buffer as uploaded so far
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Make every later upload fail as if the device vanished
    pub fn set_fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    /// Make shader creation fail until switched back
    pub fn set_fail_shaders(&mut self, fail: bool) {
        self.fail_shaders = fail;
    }

    /// Whether the recorder considers the device lost
    pub fn is_device_lost(&self) -> bool {
        self.device_lost
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_device(&self) -> BackendResult<()> {
        if self.device_lost {
            Err(RenderError::DeviceLost)
        } else {
            Ok(())
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn create_vertex_buffer(&mut self, size_bytes: usize) -> BackendResult<BufferHandle> {
        self.check_device()?;
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer, vec![0; size_bytes]);
        self.commands.push(BackendCommand::CreateVertexBuffer { buffer, size: size_bytes });
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> BackendResult<BufferHandle> {
        self.check_device()?;
        let buffer = BufferHandle(self.allocate());
        self.commands.push(BackendCommand::CreateIndexBuffer {
            buffer,
            index_count: indices.len(),
        });
        Ok(buffer)
    }

    fn upload_vertices(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        bytes: &[u8],
        discard: bool,
    ) -> BackendResult<()> {
        self.check_device()?;
        if self.fail_uploads {
            return Err(RenderError::DeviceLost);
        }

        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::BackendError(format!("unknown buffer {buffer:?}")))?;
        let target = storage
            .get_mut(offset..offset + bytes.len())
            .ok_or_else(|| RenderError::BackendError(format!("upload past the end of {buffer:?}")))?;
        target.copy_from_slice(bytes);

        self.commands.push(BackendCommand::UploadVertices {
            buffer,
            offset,
            len: bytes.len(),
            discard,
        });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.commands.push(BackendCommand::ReleaseBuffer(buffer));
    }

    fn create_shader(&mut self, kind: ShaderKind, _layout: &VertexLayout) -> BackendResult<ShaderProgramHandle> {
        self.check_device()?;
        if self.fail_shaders {
            return Err(RenderError::BackendError(format!("cannot compile the {kind:?} shader")));
        }
        let program = ShaderProgramHandle(self.allocate());
        self.commands.push(BackendCommand::CreateShader { program, kind });
        Ok(program)
    }

    fn release_shader(&mut self, program: ShaderProgramHandle) {
        self.commands.push(BackendCommand::ReleaseShader(program));
    }

    fn bind_shader(&mut self, program: ShaderProgramHandle, layout: &VertexLayout) {
        self.commands.push(BackendCommand::BindShader {
            program,
            stride: layout.stride,
        });
    }

    fn unbind_shader(&mut self, program: ShaderProgramHandle) {
        self.commands.push(BackendCommand::UnbindShader(program));
    }

    fn set_vertex_constants(&mut self, program: ShaderProgramHandle, data: &[u8]) {
        self.commands.push(BackendCommand::SetVertexConstants {
            program,
            data: data.to_vec(),
        });
    }

    fn set_pixel_constants(&mut self, program: ShaderProgramHandle, data: &[u8]) {
        self.commands.push(BackendCommand::SetPixelConstants {
            program,
            data: data.to_vec(),
        });
    }

    fn set_blend(&mut self, mode: AlphaBlendMode) {
        self.commands.push(BackendCommand::SetBlend(mode));
    }

    fn set_depth(&mut self, test: bool, write: bool) {
        self.commands.push(BackendCommand::SetDepth { test, write });
    }

    fn set_cull(&mut self, mode: CullingMode) {
        self.commands.push(BackendCommand::SetCull(mode));
    }

    fn set_render_mode(&mut self, mode: RenderMode) {
        self.commands.push(BackendCommand::SetRenderMode(mode));
    }

    fn set_sampler(&mut self, slot: usize, filter: TextureFilter, wrap: TextureWrap) {
        self.commands.push(BackendCommand::SetSampler { slot, filter, wrap });
    }

    fn set_textures(&mut self, textures: &[TextureHandle]) {
        self.commands.push(BackendCommand::SetTextures(textures.to_vec()));
    }

    fn bind_geometry(&mut self, vertex_buffer: BufferHandle, stride: usize, index_buffer: BufferHandle) {
        self.commands.push(BackendCommand::BindGeometry {
            vertex_buffer,
            stride,
            index_buffer,
        });
    }

    fn draw_sprites(&mut self, sprite_count: usize, vertex_offset: usize) -> BackendResult<()> {
        self.check_device()?;
        self.commands.push(BackendCommand::DrawSprites {
            sprite_count,
            vertex_offset,
        });
        Ok(())
    }

    fn create_material_instance(&mut self, key: &MaterialKey, view_index: usize) -> BackendResult<MaterialHandle> {
        self.check_device()?;
        let material = MaterialHandle(self.allocate());
        self.commands.push(BackendCommand::CreateMaterialInstance {
            material,
            key: *key,
            view_index,
        });
        Ok(material)
    }

    fn set_material_parameters(&mut self, material: MaterialHandle, params: &ModelMaterialParameters) {
        self.commands.push(BackendCommand::SetMaterialParameters {
            material,
            params: params.clone(),
        });
    }

    fn submit_mesh(&mut self, submission: &MeshSubmission) -> BackendResult<()> {
        self.check_device()?;
        self.commands.push(BackendCommand::SubmitMesh(submission.clone()));
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle> {
        self.check_device()?;
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(RenderError::BackendError(format!(
                "{} bytes do not describe a {width}x{height} RGBA8 texture",
                rgba.len()
            )));
        }
        let texture = TextureHandle(self.allocate());
        self.commands.push(BackendCommand::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn create_model(&mut self, data: &[u8]) -> BackendResult<MeshHandle> {
        self.check_device()?;
        let mesh = MeshHandle(self.allocate());
        self.commands.push(BackendCommand::CreateModel { mesh, len: data.len() });
        Ok(mesh)
    }

    fn save_host_state(&mut self) {
        self.commands.push(BackendCommand::SaveHostState);
    }

    fn restore_host_state(&mut self) {
        self.commands.push(BackendCommand::RestoreHostState);
    }

    fn on_lost_device(&mut self) {
        self.device_lost = true;
        self.buffers.clear();
        self.commands.push(BackendCommand::LostDevice);
    }

    fn on_reset_device(&mut self) -> BackendResult<()> {
        self.device_lost = false;
        self.fail_uploads = false;
        self.commands.push(BackendCommand::ResetDevice);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_vertex_buffer(16).unwrap();
        let b = backend.create_index_buffer(&[0, 1, 2]).unwrap();
        let t = backend.create_texture(1, 1, &[0; 4]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a.0, t.0);
    }

    #[test]
    fn test_lost_device_rejects_creation_until_reset() {
        let mut backend = RecordingBackend::new();
        backend.on_lost_device();
        assert_eq!(backend.create_vertex_buffer(16), Err(RenderError::DeviceLost));

        backend.on_reset_device().unwrap();
        assert!(backend.create_vertex_buffer(16).is_ok());
    }

    #[test]
    fn test_upload_bounds_checked() {
        let mut backend = RecordingBackend::new();
        let buffer = backend.create_vertex_buffer(8).unwrap();
        assert!(backend.upload_vertices(buffer, 4, &[1; 8], false).is_err());
        backend.upload_vertices(buffer, 4, &[1; 4], false).unwrap();
        assert_eq!(backend.buffer_contents(buffer).unwrap(), &[0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn test_texture_size_validated() {
        let mut backend = RecordingBackend::new();
        assert!(backend.create_texture(2, 2, &[0; 4]).is_err());
    }
}
