//! Model renderer: one host mesh submission per instance
//!
//! Models carry host mesh assets, so nothing is vertex-batched. Each
//! instance looks up the layer's material instance in the per-view cache,
//! writes its per-instance parameters and submits the mesh.

use crate::foundation::math::{utils, Vec3};
use crate::render::api::{MeshSubmission, ModelMaterialParameters};
use crate::render::resources::{MaterialKey, MAX_TEXTURE_SLOTS};
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::{ModelInstanceParameter, ModelNodeParameter};
use crate::render::{RenderError, RenderResult};

/// Submits model instances
#[derive(Debug, Default)]
pub struct ModelRenderer {
    submitted_in_group: usize,
}

impl ModelRenderer {
    /// Create a model renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a group; geometry buffers are not touched
    pub fn begin_group(&mut self, _node: &ModelNodeParameter<'_>, count: usize) {
        self.submitted_in_group = 0;
        log::trace!("Model group of {} instances", count);
    }

    /// Submit one instance
    pub fn render(
        &mut self,
        ctx: &mut FrameContext<'_>,
        node: &ModelNodeParameter<'_>,
        instance: &ModelInstanceParameter,
    ) -> RenderResult<()> {
        let Some(model) = node.model else {
            return Ok(());
        };

        let material = &node.material;
        if material.textures.len() > MAX_TEXTURE_SLOTS {
            return Err(RenderError::TextureSlotOverflow {
                requested: material.textures.len(),
                limit: MAX_TEXTURE_SLOTS,
            });
        }
        if material.distortion {
            let skip = !ctx.frame.distorting
                || ctx
                    .distorting
                    .as_mut()
                    .is_some_and(|callback| !callback.on_distorting(&mut *ctx.backend));
            if skip {
                log::trace!("Skipped a distortion model instance");
                ctx.stats.skipped_batches += 1;
                return Ok(());
            }
        }

        let lighting = node.lighting && ctx.frame.lighting;
        let key = MaterialKey {
            texture: material.textures.first().copied(),
            alpha_blend: material.alpha_blend,
            lighting,
            distortion: material.distortion,
        };
        let view_index = ctx.frame.view_index;
        let handle = ctx.materials.get_or_create(&key, view_index, &mut *ctx.backend)?;

        let transform = ctx.frame.local_to_world * instance.transform;
        let light = &ctx.frame.light;
        let params = ModelMaterialParameters {
            transform,
            uv: instance.uv,
            color: instance.color.to_normalized(),
            time: instance.time,
            light_direction: utils::normalize_or(light.direction, Vec3::y()),
            light_color: light.color.to_normalized(),
            light_ambient: light.ambient.to_normalized(),
            distortion_intensity: material.distortion_intensity * ctx.frame.distortion_intensity,
        };
        ctx.backend.set_material_parameters(handle, &params);

        ctx.backend.submit_mesh(&MeshSubmission {
            mesh: model.mesh(),
            material: handle,
            transform,
            face_range: model.face_range(instance.time),
            view_index,
        })?;

        self.submitted_in_group += 1;
        ctx.stats.draw_calls += 1;
        ctx.stats.mesh_submissions += 1;
        Ok(())
    }

    /// Close the group
    pub fn end_group(&mut self) {
        log::trace!("Model group closed after {} submissions", self.submitted_in_group);
        self.submitted_in_group = 0;
    }
}
