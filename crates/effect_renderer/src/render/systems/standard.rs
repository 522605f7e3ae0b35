//! Standard renderer: the batcher shared by sprites, ribbons, rings and tracks
//!
//! Primitives arrive one at a time as generated vertices plus the draw state
//! they need. Consecutive primitives with the same draw state accumulate in
//! one open batch; a batch is flushed as a single indexed draw when the state
//! changes, when the batch reaches the index buffer's quad limit, or when the
//! group ends. Vertices are never reordered, so draw order is call order.

use crate::foundation::math::RectF;
use crate::render::api::Diagnostic;
use crate::render::primitives::{GpuVertex, Vertex, VertexDistortion};
use crate::render::resources::{
    BufferError, PixelConstants, RenderState, ShaderKind, TextureSet, VertexConstants,
};
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::NodeMaterial;
use crate::render::{RenderError, RenderResult};

/// Everything that must match for two primitives to share a draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    /// Shader variant
    pub shader: ShaderKind,
    /// Pipeline state, textures included
    pub render: RenderState,
    /// Effective distortion strength, zero for the standard shader
    pub distortion_intensity: f32,
}

impl DrawState {
    /// Resolve the draw state of a material for this frame
    ///
    /// Fails when the material binds more textures than there are slots.
    pub fn from_material(material: &NodeMaterial, ctx: &FrameContext<'_>) -> RenderResult<Self> {
        let shader = ShaderKind::resolve(material.use_texture(), material.distortion);
        let mut textures = TextureSet::from_slice(&material.textures)?;
        if shader == ShaderKind::Distortion {
            if let Some(background) = ctx.frame.background {
                textures.push(background)?;
            }
        }

        Ok(Self {
            shader,
            render: RenderState {
                alpha_blend: material.alpha_blend,
                depth_test: material.depth_test,
                depth_write: material.depth_write,
                culling: material.culling,
                render_mode: ctx.frame.render_mode,
                texture_filter: material.texture_filter,
                texture_wrap: material.texture_wrap,
                textures,
            },
            distortion_intensity: match shader {
                ShaderKind::Distortion => material.distortion_intensity * ctx.frame.distortion_intensity,
                ShaderKind::Standard => 0.0,
            },
        })
    }
}

#[derive(Debug)]
struct OpenBatch {
    state: DrawState,
    vertices: Vec<VertexDistortion>,
}

/// Vertex batcher
#[derive(Debug)]
pub struct StandardRenderer {
    batch: Option<OpenBatch>,
    group_open: bool,
    max_batch_vertices: usize,
    spare: Vec<VertexDistortion>,
}

impl StandardRenderer {
    /// Create a batcher whose draws cover at most `square_max_count` quads
    pub fn new(square_max_count: usize) -> Self {
        Self {
            batch: None,
            group_open: false,
            max_batch_vertices: square_max_count.max(1) * 4,
            spare: Vec::new(),
        }
    }

    /// Largest number of vertices one draw can cover
    pub fn max_batch_vertices(&self) -> usize {
        self.max_batch_vertices
    }

    /// Whether a group is open
    pub fn is_group_open(&self) -> bool {
        self.group_open
    }

    /// Vertices waiting in the open batch
    pub fn pending_vertices(&self) -> usize {
        self.batch.as_ref().map_or(0, |batch| batch.vertices.len())
    }

    /// Open a group that will write up to `vertex_count` vertices
    ///
    /// When the reservation does not fit behind the buffer cursor the buffer
    /// is rewound now rather than in the middle of the group.
    pub fn begin_group(&mut self, ctx: &mut FrameContext<'_>, vertex_count: usize) -> RenderResult<()> {
        self.group_open = true;

        if vertex_count == 0 {
            return Ok(());
        }

        let stride = VertexDistortion::LAYOUT.stride;
        let reserve = vertex_count
            .saturating_mul(stride)
            .min(ctx.geometry.capacity());
        if !ctx.geometry.fits(reserve, stride) {
            ctx.diagnostics.report(Diagnostic::CapacityFlush {
                requested: reserve,
                remaining: ctx.geometry.remaining(),
            });
            ctx.geometry.wrap();
        }
        Ok(())
    }

    /// Add one primitive's vertices
    ///
    /// The vertex count must be a multiple of four; every four vertices form
    /// one quad ordered lower-left, lower-right, upper-left, upper-right.
    pub fn push(
        &mut self,
        ctx: &mut FrameContext<'_>,
        state: DrawState,
        vertices: &[VertexDistortion],
    ) -> RenderResult<()> {
        if vertices.is_empty() {
            return Ok(());
        }

        if vertices.len() > self.max_batch_vertices {
            let stride = state.shader.layout().stride;
            ctx.diagnostics.report(Diagnostic::PrimitiveTooLarge {
                requested: vertices.len() * stride,
                capacity: self.max_batch_vertices * stride,
            });
            return Err(RenderError::CapacityExceeded {
                requested: vertices.len() * stride,
                available: self.max_batch_vertices * stride,
            });
        }

        if let Some(batch) = &self.batch {
            if batch.state != state {
                self.flush(ctx)?;
            } else if batch.vertices.len() + vertices.len() > self.max_batch_vertices {
                let stride = state.shader.layout().stride;
                ctx.diagnostics.report(Diagnostic::CapacityFlush {
                    requested: vertices.len() * stride,
                    remaining: (self.max_batch_vertices - batch.vertices.len()) * stride,
                });
                self.flush(ctx)?;
            }
        }

        let spare = &mut self.spare;
        let batch = self.batch.get_or_insert_with(|| OpenBatch {
            state,
            vertices: std::mem::take(spare),
        });
        batch.vertices.extend_from_slice(vertices);
        Ok(())
    }

    /// Close the group, drawing whatever is still batched
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        self.group_open = false;
        self.flush(ctx)
    }

    /// Draw the open batch, if any
    pub fn flush(&mut self, ctx: &mut FrameContext<'_>) -> RenderResult<()> {
        let Some(mut batch) = self.batch.take() else {
            return Ok(());
        };

        let result = Self::draw(ctx, &batch);
        batch.vertices.clear();
        self.spare = batch.vertices;
        result
    }

    /// Drop the open batch without drawing it (device lost)
    pub fn abandon(&mut self) {
        if let Some(batch) = self.batch.take() {
            log::debug!("Abandoning batch of {} vertices", batch.vertices.len());
        }
        self.group_open = false;
    }

    fn draw(ctx: &mut FrameContext<'_>, batch: &OpenBatch) -> RenderResult<()> {
        let state = &batch.state;
        if state.shader == ShaderKind::Distortion {
            if !ctx.frame.distorting {
                ctx.stats.skipped_batches += 1;
                return Ok(());
            }
            if let Some(callback) = ctx.distorting.as_mut() {
                if !callback.on_distorting(&mut *ctx.backend) {
                    log::trace!("Distorting callback skipped a batch of {} vertices", batch.vertices.len());
                    ctx.stats.skipped_batches += 1;
                    return Ok(());
                }
            }
        }

        let shader = ctx
            .shaders
            .begin(state.shader, &mut *ctx.backend)
            .ok_or(RenderError::DeviceLost)?;
        ctx.state.apply(&state.render, &mut *ctx.backend);

        let view_projection = ctx.camera.camera_projection_matrix() * ctx.frame.local_to_world;
        let constants = VertexConstants::new(&view_projection, RectF::UNIT);
        ctx.backend.set_vertex_constants(shader.program, bytemuck::bytes_of(&constants));
        if state.shader == ShaderKind::Distortion {
            let constants = PixelConstants::new(state.distortion_intensity);
            ctx.backend.set_pixel_constants(shader.program, bytemuck::bytes_of(&constants));
        }

        let offset = match state.shader {
            ShaderKind::Standard => {
                let narrowed: Vec<Vertex> = batch.vertices.iter().copied().map(Vertex::from).collect();
                Self::upload(ctx, &narrowed)?
            }
            ShaderKind::Distortion => Self::upload(ctx, &batch.vertices)?,
        };

        let (Some(vertex_buffer), Some(index_buffer)) = (ctx.geometry.handle(), ctx.indices.handle()) else {
            return Err(RenderError::DeviceLost);
        };
        let stride = shader.layout.stride;
        ctx.backend.bind_geometry(vertex_buffer, stride, index_buffer);

        let sprite_count = batch.vertices.len() / 4;
        ctx.backend.draw_sprites(sprite_count, offset / stride)?;

        ctx.stats.draw_calls += 1;
        ctx.stats.vertices += batch.vertices.len() as u64;
        log::trace!(
            "Drew {} sprites with the {:?} shader at vertex {}",
            sprite_count,
            state.shader,
            offset / stride
        );
        Ok(())
    }

    /// Copy vertices into the geometry buffer, rewinding it when full
    fn upload<V: GpuVertex>(ctx: &mut FrameContext<'_>, vertices: &[V]) -> RenderResult<usize> {
        let stride = V::LAYOUT.stride;
        let size = vertices.len() * stride;

        let offset = match ctx.geometry.map(size, stride) {
            Ok(mut region) => {
                region.write(vertices)?;
                region.offset()
            }
            Err(BufferError::Overflow { requested, remaining }) => {
                ctx.diagnostics.report(Diagnostic::CapacityFlush { requested, remaining });
                ctx.geometry.wrap();
                let mut region = ctx.geometry.map(size, stride)?;
                region.write(vertices)?;
                region.offset()
            }
            Err(err) => return Err(err.into()),
        };

        ctx.geometry.unmap(&mut *ctx.backend)?;
        Ok(offset)
    }
}
