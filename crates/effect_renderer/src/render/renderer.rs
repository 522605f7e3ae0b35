//! Renderer facade
//!
//! [`Renderer`] is what the simulation talks to. It owns the backend, the
//! geometry buffers, the render state, both shaders, the material cache and
//! an arena of sub-renderers, and it brackets each frame. Sub-renderers are
//! addressed by [`RendererKey`] and only ever see the facade's resources
//! through a [`FrameContext`] built for the duration of one call.

use std::collections::HashMap;
use std::path::Path;

use slotmap::{new_key_type, SlotMap};

use crate::assets::{FileInterface, ModelAsset, ModelLoader, TextureLoader};
use crate::foundation::math::{Color, Mat4, Vec3};
use crate::render::api::{
    Diagnostic, Diagnostics, DistortingCallback, MaterialHandle, ProtocolViolation, RenderBackend,
    RendererConfig, TextureHandle,
};
use crate::render::primitives::{CameraState, GpuVertex, VertexDistortion};
use crate::render::resources::{
    GeometryBuffer, MaterialCache, MaterialKey, QuadIndexBuffer, RenderMode, RenderStateTracker,
    ShaderSelector, MAX_VIEW_SLOTS,
};
use crate::render::systems::{
    DrawStats, FrameContext, FrameSettings, InstanceParameter, NodeParameter, PrimitiveFamily,
    PrimitiveRenderer, StandardRenderer,
};
use crate::render::{RenderError, RenderResult};

new_key_type! {
    /// Key of a sub-renderer in the facade's registry
    pub struct RendererKey;
}

/// Device lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Resources are valid
    Active,
    /// Every GPU resource is invalid until [`Renderer::on_reset_device`]
    Lost,
}

/// Frame-level renderer facade
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    square_max_count: usize,

    geometry: GeometryBuffer,
    indices: QuadIndexBuffer,
    shaders: ShaderSelector,
    state: RenderStateTracker,
    materials: MaterialCache,
    batcher: StandardRenderer,

    camera: CameraState,
    frame: FrameSettings,

    renderers: SlotMap<RendererKey, PrimitiveRenderer>,
    by_family: HashMap<PrimitiveFamily, RendererKey>,
    open_group: Option<RendererKey>,

    device: DeviceState,
    in_frame: bool,
    restore_states: bool,
    distorting: Option<Box<dyn DistortingCallback>>,
    diagnostics: Diagnostics,
    stats: DrawStats,
}

impl Renderer {
    /// Create a renderer drawing through `backend`
    ///
    /// Allocates the geometry buffer, the quad index buffer and both shader
    /// programs on the host.
    pub fn new(mut backend: Box<dyn RenderBackend>, config: RendererConfig) -> RenderResult<Self> {
        let square_max_count = config.square_max_count.max(1);
        log::info!("Initializing effect renderer for {} quads per draw", square_max_count);

        let init = |err: RenderError| {
            log::error!("Renderer initialization failed: {}", err);
            RenderError::InitializationFailed(err.to_string())
        };

        let capacity = square_max_count * 4 * VertexDistortion::LAYOUT.stride;
        let geometry = GeometryBuffer::allocate(backend.as_mut(), capacity).map_err(init)?;
        let indices = QuadIndexBuffer::create(backend.as_mut(), square_max_count).map_err(init)?;
        let shaders = ShaderSelector::create(backend.as_mut()).map_err(init)?;

        let frame = FrameSettings {
            render_mode: config.render_mode,
            distortion_intensity: config.distortion_intensity,
            ..FrameSettings::default()
        };

        Ok(Self {
            backend,
            square_max_count,
            geometry,
            indices,
            shaders,
            state: RenderStateTracker::new(),
            materials: MaterialCache::new(),
            batcher: StandardRenderer::new(square_max_count),
            camera: CameraState::new(),
            frame,
            renderers: SlotMap::with_key(),
            by_family: HashMap::new(),
            open_group: None,
            device: DeviceState::Active,
            in_frame: false,
            restore_states: config.restore_host_state,
            distorting: None,
            diagnostics: Diagnostics::new(),
            stats: DrawStats::default(),
        })
    }

    // === Frame ===

    /// Start a frame
    ///
    /// Rewinds the geometry buffer and forces the next state apply to emit
    /// every field. A frame that is still active is ended first.
    pub fn begin_rendering(&mut self) -> RenderResult<()> {
        self.check_device()?;

        if self.in_frame {
            self.diagnostics.protocol(ProtocolViolation::FrameAlreadyActive);
            if let Err(err) = self.end_rendering() {
                log::error!("Failed to close the previous frame: {}", err);
            }
        }

        if self.restore_states {
            self.backend.save_host_state();
        }
        self.geometry.begin_frame();
        self.state.reset();
        self.in_frame = true;
        log::trace!("Frame begun");
        Ok(())
    }

    /// End the frame
    ///
    /// A group left open is reported and force-closed so its draw does not
    /// leak into the next frame.
    pub fn end_rendering(&mut self) -> RenderResult<()> {
        self.check_device()?;
        if !self.in_frame {
            self.diagnostics.protocol(ProtocolViolation::CallOutsideFrame);
            return Err(RenderError::FrameNotActive);
        }

        let mut result = Ok(());
        if self.open_group.is_some() {
            self.diagnostics.protocol(ProtocolViolation::GroupLeftOpen);
            result = self.close_open_group();
        }

        let (mut ctx, batcher, _) = self.parts();
        result = result.and(batcher.flush(&mut ctx));

        self.shaders.end_any(self.backend.as_mut());
        self.geometry.end_frame();
        if self.restore_states {
            self.backend.restore_host_state();
        }
        self.in_frame = false;

        if let Err(err) = &result {
            log::error!("Frame ended with an error, skip it: {}", err);
        }
        result
    }

    /// Whether a frame is active
    pub fn is_frame_active(&self) -> bool {
        self.in_frame
    }

    // === Group protocol ===

    /// `BeginRendering` of one group of `count` instances
    pub fn begin_group(&mut self, key: RendererKey, node: &NodeParameter<'_>, count: usize) -> RenderResult<()> {
        self.check_frame()?;
        let family = self.family_of(key)?;

        if self.open_group.is_some() {
            self.diagnostics.protocol(ProtocolViolation::NestedGroup(family));
            if let Err(err) = self.close_open_group() {
                log::error!("Failed to close the open group: {}", err);
            }
        }

        log::debug!("Begin {} group of {} instances", family, count);
        let (mut ctx, batcher, renderers) = self.parts();
        let result = match renderers.get_mut(key) {
            Some(renderer) => renderer.begin_group(&mut ctx, batcher, node, count),
            None => Err(ProtocolViolation::UnknownRenderer.into()),
        };

        if result.is_ok() {
            self.open_group = Some(key);
        }
        self.observe(result)
    }

    /// `Rendering` of one instance
    ///
    /// An instance arriving outside its group is reported and its group is
    /// opened implicitly.
    pub fn render_instance(
        &mut self,
        key: RendererKey,
        node: &NodeParameter<'_>,
        instance: &InstanceParameter<'_>,
    ) -> RenderResult<()> {
        self.check_frame()?;
        let family = self.family_of(key)?;

        if self.open_group != Some(key) {
            self.diagnostics.protocol(ProtocolViolation::RenderingOutsideGroup(family));
            if self.open_group.is_some() {
                if let Err(err) = self.close_open_group() {
                    log::error!("Failed to close the open group: {}", err);
                }
            }
            self.begin_group(key, node, 1)?;
        }

        let (mut ctx, batcher, renderers) = self.parts();
        let result = match renderers.get_mut(key) {
            Some(renderer) => renderer.render(&mut ctx, batcher, node, instance),
            None => Err(ProtocolViolation::UnknownRenderer.into()),
        };
        self.observe(result)
    }

    /// `EndRendering` of the open group
    pub fn end_group(&mut self, key: RendererKey, node: &NodeParameter<'_>) -> RenderResult<()> {
        self.check_frame()?;
        let family = self.family_of(key)?;

        if self.open_group != Some(key) {
            self.diagnostics.protocol(ProtocolViolation::EndWithoutBegin(family));
            return Ok(());
        }
        if node.family() != family {
            // The group is still closed so it cannot leak.
            let result = self.close_open_group();
            let mismatch = ProtocolViolation::ParameterMismatch {
                expected: family,
                received: node.family(),
            };
            return self.observe(result.and(Err(mismatch.into())));
        }

        log::debug!("End {} group", family);
        let result = self.close_open_group();
        self.observe(result)
    }

    // === Sub-renderer factories ===

    /// Sprite renderer key
    pub fn create_sprite_renderer(&mut self) -> RendererKey {
        self.renderer_for(PrimitiveFamily::Sprite)
    }

    /// Ribbon renderer key
    pub fn create_ribbon_renderer(&mut self) -> RendererKey {
        self.renderer_for(PrimitiveFamily::Ribbon)
    }

    /// Ring renderer key
    pub fn create_ring_renderer(&mut self) -> RendererKey {
        self.renderer_for(PrimitiveFamily::Ring)
    }

    /// Track renderer key
    pub fn create_track_renderer(&mut self) -> RendererKey {
        self.renderer_for(PrimitiveFamily::Track)
    }

    /// Model renderer key
    pub fn create_model_renderer(&mut self) -> RendererKey {
        self.renderer_for(PrimitiveFamily::Model)
    }

    /// Family of a registered sub-renderer
    pub fn renderer_family(&self, key: RendererKey) -> Option<PrimitiveFamily> {
        self.renderers.get(key).map(PrimitiveRenderer::family)
    }

    /// Texture loader reading through `files`, or the file system when `None`
    pub fn create_texture_loader(&self, files: Option<Box<dyn FileInterface>>) -> TextureLoader {
        TextureLoader::new(files)
    }

    /// Model loader reading through `files`, or the file system when `None`
    pub fn create_model_loader(&self, files: Option<Box<dyn FileInterface>>) -> ModelLoader {
        ModelLoader::new(files)
    }

    /// Load a texture on this renderer's backend
    pub fn load_texture(&mut self, loader: &TextureLoader, path: impl AsRef<Path>) -> RenderResult<TextureHandle> {
        self.check_device()?;
        Ok(loader.load(self.backend.as_mut(), path.as_ref())?)
    }

    /// Load a model on this renderer's backend
    pub fn load_model(&mut self, loader: &ModelLoader, path: impl AsRef<Path>) -> RenderResult<ModelAsset> {
        self.check_device()?;
        Ok(loader.load(self.backend.as_mut(), path.as_ref())?)
    }

    // === Device lifecycle ===

    /// The device was lost; every GPU resource is dropped
    ///
    /// Until [`Self::on_reset_device`] succeeds every frame and group call
    /// fails with [`RenderError::DeviceLost`].
    pub fn on_lost_device(&mut self) {
        if self.device == DeviceState::Lost {
            return;
        }
        log::info!("Device lost, dropping GPU resources");

        self.device = DeviceState::Lost;
        self.batcher.abandon();
        self.open_group = None;
        if self.in_frame && self.restore_states {
            self.backend.restore_host_state();
        }
        self.in_frame = false;

        self.geometry.invalidate();
        self.indices.invalidate();
        self.shaders.invalidate();
        self.state.reset();
        self.materials.clear();

        self.backend.on_lost_device();
        self.diagnostics.report(Diagnostic::DeviceLost);
    }

    /// The device is back; recreate every GPU resource
    pub fn on_reset_device(&mut self) -> RenderResult<()> {
        if self.device == DeviceState::Active {
            return Ok(());
        }

        self.backend.on_reset_device()?;
        if let Err(err) = self.recreate_resources() {
            log::warn!("Device reset failed: {}", err);
            self.shaders.release(self.backend.as_mut());
            self.indices.release(self.backend.as_mut());
            self.geometry.release(self.backend.as_mut());
            return Err(err);
        }

        self.device = DeviceState::Active;
        log::info!("Device reset, GPU resources recreated");
        self.diagnostics.report(Diagnostic::DeviceReset);
        Ok(())
    }

    /// Device lifecycle state
    pub fn device_state(&self) -> DeviceState {
        self.device
    }

    fn recreate_resources(&mut self) -> RenderResult<()> {
        self.geometry.recreate(self.backend.as_mut())?;
        self.indices.recreate(self.backend.as_mut())?;
        self.shaders.recreate(self.backend.as_mut())
    }

    // === Camera ===

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        self.camera.projection_matrix()
    }

    /// Set the projection matrix
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.camera.set_projection_matrix(projection);
    }

    /// View matrix
    pub fn camera_matrix(&self) -> &Mat4 {
        self.camera.camera_matrix()
    }

    /// Set the view matrix; clears a manual camera parameter override
    pub fn set_camera_matrix(&mut self, camera: Mat4) {
        self.camera.set_camera_matrix(camera);
    }

    /// `projection * camera`
    pub fn camera_projection_matrix(&self) -> &Mat4 {
        self.camera.camera_projection_matrix()
    }

    /// Direction the camera looks in
    pub fn camera_front_direction(&self) -> Vec3 {
        self.camera.front_direction()
    }

    /// Camera position
    pub fn camera_position(&self) -> Vec3 {
        self.camera.position()
    }

    /// Override front direction and position until the next camera matrix
    pub fn set_camera_parameter(&mut self, front: Vec3, position: Vec3) {
        self.camera.set_camera_parameter(front, position);
    }

    /// Camera state
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    // === Light ===

    /// Light direction
    pub fn light_direction(&self) -> Vec3 {
        self.frame.light.direction
    }

    /// Set the light direction
    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.frame.light.direction = direction;
    }

    /// Light color
    pub fn light_color(&self) -> Color {
        self.frame.light.color
    }

    /// Set the light color
    pub fn set_light_color(&mut self, color: Color) {
        self.frame.light.color = color;
    }

    /// Ambient color
    pub fn light_ambient_color(&self) -> Color {
        self.frame.light.ambient
    }

    /// Set the ambient color
    pub fn set_light_ambient_color(&mut self, color: Color) {
        self.frame.light.ambient = color;
    }

    // === Host context ===

    /// Transform applied on top of every effect
    pub fn set_local_to_world(&mut self, local_to_world: Mat4) {
        self.frame.local_to_world = local_to_world;
    }

    /// Select the view slot being rendered
    pub fn set_view_index(&mut self, view_index: usize) -> RenderResult<()> {
        if view_index >= MAX_VIEW_SLOTS {
            return Err(RenderError::InvalidViewIndex(view_index));
        }
        self.frame.view_index = view_index;
        Ok(())
    }

    /// View slot being rendered
    pub fn view_index(&self) -> usize {
        self.frame.view_index
    }

    /// Enable lighting of model materials
    pub fn set_is_lighting(&mut self, lighting: bool) {
        self.frame.lighting = lighting;
    }

    /// Enable distortion; when off, distortion primitives are skipped
    pub fn set_is_distorting(&mut self, distorting: bool) {
        self.frame.distorting = distorting;
    }

    /// Global distortion strength multiplier
    pub fn set_distortion_intensity(&mut self, intensity: f32) {
        self.frame.distortion_intensity = intensity;
    }

    /// Pre-seed the material cache of a view slot with host-owned instances
    pub fn set_materials(
        &mut self,
        view_index: usize,
        materials: impl IntoIterator<Item = (MaterialKey, MaterialHandle)>,
    ) -> RenderResult<()> {
        self.materials.seed(view_index, materials)
    }

    /// Material cache
    pub fn material_cache(&self) -> &MaterialCache {
        &self.materials
    }

    // === Render state ===

    /// Maximum quads per draw
    pub fn square_max_count(&self) -> usize {
        self.square_max_count
    }

    /// Force the next draw to re-emit every pipeline state field
    ///
    /// Call after the host changed GPU state behind the renderer's back.
    pub fn reset_render_state(&mut self) {
        self.state.reset();
    }

    /// Polygon mode
    pub fn render_mode(&self) -> RenderMode {
        self.frame.render_mode
    }

    /// Set the polygon mode
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.frame.render_mode = mode;
    }

    /// Save and restore host pipeline state around each frame
    pub fn set_restoration_of_states_flag(&mut self, restore: bool) {
        self.restore_states = restore;
    }

    /// Background texture for distortion draws
    pub fn background(&self) -> Option<TextureHandle> {
        self.frame.background
    }

    /// Set the background texture for distortion draws
    pub fn set_background(&mut self, background: Option<TextureHandle>) {
        self.frame.background = background;
    }

    /// Distorting callback
    pub fn distorting_callback(&self) -> Option<&dyn DistortingCallback> {
        self.distorting.as_deref()
    }

    /// Set or clear the distorting callback
    pub fn set_distorting_callback(&mut self, callback: Option<Box<dyn DistortingCallback>>) {
        self.distorting = callback;
    }

    /// Observe recovered protocol violations, capacity flushes and device events
    pub fn set_diagnostic_callback(&mut self, callback: Option<Box<dyn FnMut(&Diagnostic)>>) {
        self.diagnostics.set_callback(callback);
    }

    // === Statistics ===

    /// Draw calls since the last reset
    pub fn draw_call_count(&self) -> u64 {
        self.stats.draw_calls
    }

    /// Reset the draw call counter
    pub fn reset_draw_call_count(&mut self) {
        self.stats.draw_calls = 0;
    }

    /// Vertices drawn since the last reset
    pub fn draw_vertex_count(&self) -> u64 {
        self.stats.vertices
    }

    /// Reset the vertex counter
    pub fn reset_draw_vertex_count(&mut self) {
        self.stats.vertices = 0;
    }

    /// All counters
    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    // === Backend ===

    /// Host backend
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Host backend, mutable
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    // === Internals ===

    fn check_device(&self) -> RenderResult<()> {
        match self.device {
            DeviceState::Active => Ok(()),
            DeviceState::Lost => Err(RenderError::DeviceLost),
        }
    }

    fn check_frame(&mut self) -> RenderResult<()> {
        self.check_device()?;
        if !self.in_frame {
            self.diagnostics.protocol(ProtocolViolation::CallOutsideFrame);
            return Err(RenderError::FrameNotActive);
        }
        Ok(())
    }

    fn family_of(&mut self, key: RendererKey) -> RenderResult<PrimitiveFamily> {
        if let Some(family) = self.renderer_family(key) {
            return Ok(family);
        }
        self.diagnostics.protocol(ProtocolViolation::UnknownRenderer);
        Err(ProtocolViolation::UnknownRenderer.into())
    }

    fn renderer_for(&mut self, family: PrimitiveFamily) -> RendererKey {
        if let Some(key) = self.by_family.get(&family) {
            return *key;
        }
        let key = self.renderers.insert(PrimitiveRenderer::new(family));
        self.by_family.insert(family, key);
        log::debug!("Created {} renderer", family);
        key
    }

    fn close_open_group(&mut self) -> RenderResult<()> {
        let Some(key) = self.open_group.take() else {
            return Ok(());
        };
        let (mut ctx, batcher, renderers) = self.parts();
        match renderers.get_mut(key) {
            Some(renderer) => renderer.end_group(&mut ctx, batcher),
            None => Ok(()),
        }
    }

    /// Report protocol violations carried by `result` before returning it
    fn observe(&mut self, result: RenderResult<()>) -> RenderResult<()> {
        if let Err(RenderError::ProtocolViolation(violation)) = &result {
            self.diagnostics.protocol(*violation);
        }
        result
    }

    fn parts(
        &mut self,
    ) -> (
        FrameContext<'_>,
        &mut StandardRenderer,
        &mut SlotMap<RendererKey, PrimitiveRenderer>,
    ) {
        let ctx = FrameContext {
            backend: self.backend.as_mut(),
            geometry: &mut self.geometry,
            indices: &self.indices,
            shaders: &mut self.shaders,
            state: &mut self.state,
            materials: &mut self.materials,
            camera: &self.camera,
            frame: &self.frame,
            distorting: self.distorting.as_mut(),
            diagnostics: &mut self.diagnostics,
            stats: &mut self.stats,
        };
        (ctx, &mut self.batcher, &mut self.renderers)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.device == DeviceState::Active {
            self.shaders.release(self.backend.as_mut());
            self.indices.release(self.backend.as_mut());
            self.geometry.release(self.backend.as_mut());
        }
        self.materials.clear();
        log::info!("Effect renderer destroyed");
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("square_max_count", &self.square_max_count)
            .field("device", &self.device)
            .field("in_frame", &self.in_frame)
            .field("open_group", &self.open_group)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
