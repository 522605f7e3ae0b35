//! Frame-level scenarios driven through the renderer facade

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::assets::ModelAsset;
use crate::foundation::math::Mat4;

fn renderer_with(config: RendererConfig) -> Renderer {
    Renderer::new(Box::new(RecordingBackend::new()), config).unwrap()
}

fn renderer() -> Renderer {
    renderer_with(RendererConfig::new(100))
}

fn recorder(renderer: &Renderer) -> &RecordingBackend {
    renderer.backend().as_any().downcast_ref().unwrap()
}

fn recorder_mut(renderer: &mut Renderer) -> &mut RecordingBackend {
    renderer.backend_mut().as_any_mut().downcast_mut().unwrap()
}

fn collect_diagnostics(renderer: &mut Renderer) -> Rc<RefCell<Vec<Diagnostic>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    renderer.set_diagnostic_callback(Some(Box::new(move |d: &Diagnostic| sink.borrow_mut().push(d.clone()))));
    seen
}

fn draw_group(renderer: &mut Renderer, key: RendererKey, node: NodeParameter<'_>, instances: &[InstanceParameter<'_>]) {
    renderer.begin_group(key, &node, instances.len()).unwrap();
    for instance in instances {
        renderer.render_instance(key, &node, instance).unwrap();
    }
    renderer.end_group(key, &node).unwrap();
}

fn textured(texture: u64) -> NodeMaterial {
    NodeMaterial {
        textures: vec![TextureHandle(texture)],
        ..NodeMaterial::default()
    }
}

fn distortion() -> NodeMaterial {
    NodeMaterial {
        distortion: true,
        ..NodeMaterial::default()
    }
}

#[test]
fn test_identical_sprites_share_one_draw() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite); 3]);
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert_eq!(backend.draw_calls(), vec![(3, 0)]);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::SetBlend(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::UploadVertices { .. })), 1);
    assert_eq!(renderer.draw_call_count(), 1);
    assert_eq!(renderer.draw_vertex_count(), 12);
}

#[test]
fn test_texture_change_sets_draw_boundary() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let material = textured(9);
    let plain = SpriteInstanceParameter::default();
    let with_texture = SpriteInstanceParameter {
        material: Some(&material),
        ..SpriteInstanceParameter::default()
    };

    renderer.begin_rendering().unwrap();
    draw_group(
        &mut renderer,
        key,
        NodeParameter::Sprite(&node),
        &[
            InstanceParameter::Sprite(&plain),
            InstanceParameter::Sprite(&plain),
            InstanceParameter::Sprite(&with_texture),
            InstanceParameter::Sprite(&with_texture),
        ],
    );
    renderer.end_rendering().unwrap();

    assert_eq!(recorder(&renderer).draw_calls(), vec![(2, 0), (2, 8)]);
}

#[test]
fn test_distortion_sprite_gets_its_own_draw() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let material = distortion();
    let plain = SpriteInstanceParameter::default();
    let distorted = SpriteInstanceParameter {
        material: Some(&material),
        ..SpriteInstanceParameter::default()
    };

    renderer.begin_rendering().unwrap();
    draw_group(
        &mut renderer,
        key,
        NodeParameter::Sprite(&node),
        &[
            InstanceParameter::Sprite(&plain),
            InstanceParameter::Sprite(&plain),
            InstanceParameter::Sprite(&distorted),
        ],
    );
    renderer.end_rendering().unwrap();

    let sprites: Vec<usize> = recorder(&renderer).draw_calls().iter().map(|d| d.0).collect();
    assert_eq!(sprites, vec![2, 1]);
    let strides: Vec<usize> = recorder(&renderer)
        .commands()
        .iter()
        .filter_map(|c| match c {
            BackendCommand::BindGeometry { stride, .. } => Some(*stride),
            _ => None,
        })
        .collect();
    assert_eq!(strides, vec![24, 48]);
}

#[test]
fn test_empty_group_issues_nothing() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[]);
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert!(backend.draw_calls().is_empty());
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::UploadVertices { .. })), 0);
}

#[test]
fn test_models_reuse_cached_material() {
    let mut renderer = renderer();
    let key = renderer.create_model_renderer();
    let model = ModelAsset::new(MeshHandle(7), &[(0, 4)]);
    let node = ModelNodeParameter {
        material: textured(3),
        model: Some(&model),
        lighting: false,
    };
    let instance = ModelInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Model(&node), &[InstanceParameter::Model(&instance); 2]);
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateMaterialInstance { .. })), 1);
    assert_eq!(backend.submissions().len(), 2);
    assert!(backend.submissions().iter().all(|s| s.mesh == MeshHandle(7)));
    assert!(backend.draw_calls().is_empty());
    assert_eq!(renderer.stats().mesh_submissions, 2);
}

#[test]
fn test_model_cache_is_per_view() {
    let mut renderer = renderer();
    let key = renderer.create_model_renderer();
    let model = ModelAsset::new(MeshHandle(7), &[(0, 4)]);
    let node = ModelNodeParameter {
        material: textured(3),
        model: Some(&model),
        lighting: false,
    };
    let instance = ModelInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Model(&node), &[InstanceParameter::Model(&instance)]);
    renderer.set_view_index(1).unwrap();
    draw_group(&mut renderer, key, NodeParameter::Model(&node), &[InstanceParameter::Model(&instance)]);
    renderer.end_rendering().unwrap();

    let views: Vec<usize> = recorder(&renderer).submissions().iter().map(|s| s.view_index).collect();
    assert_eq!(views, vec![0, 1]);
    assert_eq!(renderer.material_cache().created(), 2);
}

#[test]
fn test_view_index_out_of_range() {
    let mut renderer = renderer();
    assert_eq!(renderer.set_view_index(MAX_VIEW_SLOTS), Err(RenderError::InvalidViewIndex(MAX_VIEW_SLOTS)));
    assert_eq!(renderer.view_index(), 0);
}

#[test]
fn test_lost_device_blocks_until_reset() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();
    let seen = collect_diagnostics(&mut renderer);

    renderer.on_lost_device();
    assert_eq!(renderer.device_state(), DeviceState::Lost);
    assert_eq!(renderer.begin_rendering(), Err(RenderError::DeviceLost));
    assert_eq!(renderer.begin_group(key, &NodeParameter::Sprite(&node), 1), Err(RenderError::DeviceLost));

    renderer.on_reset_device().unwrap();
    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateVertexBuffer { .. })), 2);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateShader { .. })), 4);
    assert_eq!(backend.draw_calls().len(), 1);
    assert_eq!(*seen.borrow(), vec![Diagnostic::DeviceLost, Diagnostic::DeviceReset]);
}

#[test]
fn test_lost_device_mid_frame_drops_batch() {
    let mut renderer = renderer_with(RendererConfig::new(100).with_restore_host_state(true));
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    renderer.begin_group(key, &NodeParameter::Sprite(&node), 1).unwrap();
    renderer
        .render_instance(key, &NodeParameter::Sprite(&node), &InstanceParameter::Sprite(&sprite))
        .unwrap();
    renderer.on_lost_device();

    assert_eq!(renderer.end_rendering(), Err(RenderError::DeviceLost));
    assert!(!renderer.is_frame_active());
    assert!(recorder(&renderer).draw_calls().is_empty());

    renderer.on_reset_device().unwrap();
    let backend = recorder(&renderer);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::SaveHostState)), 1);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::RestoreHostState)), 1);
}

#[test]
fn test_failed_reset_releases_partial_resources() {
    let mut renderer = renderer();
    renderer.on_lost_device();
    recorder_mut(&mut renderer).clear();
    recorder_mut(&mut renderer).set_fail_shaders(true);

    assert!(matches!(renderer.on_reset_device(), Err(RenderError::BackendError(_))));
    assert_eq!(renderer.device_state(), DeviceState::Lost);
    let backend = recorder(&renderer);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateVertexBuffer { .. })), 1);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateIndexBuffer { .. })), 1);
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::ReleaseBuffer(_))), 2);

    recorder_mut(&mut renderer).set_fail_shaders(false);
    renderer.on_reset_device().unwrap();
    assert_eq!(renderer.device_state(), DeviceState::Active);
    let backend = recorder(&renderer);
    let created = backend.count(|c| {
        matches!(c, BackendCommand::CreateVertexBuffer { .. } | BackendCommand::CreateIndexBuffer { .. })
    });
    let released = backend.count(|c| matches!(c, BackendCommand::ReleaseBuffer(_)));
    assert_eq!(created - released, 2);
}

#[test]
fn test_open_group_closed_at_end_of_frame() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();
    let seen = collect_diagnostics(&mut renderer);

    renderer.begin_rendering().unwrap();
    renderer.begin_group(key, &NodeParameter::Sprite(&node), 1).unwrap();
    renderer
        .render_instance(key, &NodeParameter::Sprite(&node), &InstanceParameter::Sprite(&sprite))
        .unwrap();
    renderer.end_rendering().unwrap();

    assert_eq!(recorder(&renderer).draw_calls(), vec![(1, 0)]);
    assert_eq!(*seen.borrow(), vec![Diagnostic::Protocol(ProtocolViolation::GroupLeftOpen)]);
}

#[test]
fn test_protocol_violations_are_recovered() {
    let mut renderer = renderer();
    let sprites = renderer.create_sprite_renderer();
    let ribbons = renderer.create_ribbon_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();
    let ribbon_node = RibbonNodeParameter::default();
    let seen = collect_diagnostics(&mut renderer);

    assert_eq!(
        renderer.begin_group(sprites, &NodeParameter::Sprite(&node), 1),
        Err(RenderError::FrameNotActive)
    );

    renderer.begin_rendering().unwrap();
    // Instance without a group opens one implicitly.
    renderer
        .render_instance(sprites, &NodeParameter::Sprite(&node), &InstanceParameter::Sprite(&sprite))
        .unwrap();
    // Opening another group closes the first.
    renderer.begin_group(ribbons, &NodeParameter::Ribbon(&ribbon_node), 0).unwrap();
    renderer.end_group(ribbons, &NodeParameter::Ribbon(&ribbon_node)).unwrap();
    renderer.end_group(ribbons, &NodeParameter::Ribbon(&ribbon_node)).unwrap();
    renderer.end_rendering().unwrap();

    assert_eq!(recorder(&renderer).draw_calls(), vec![(1, 0)]);
    assert_eq!(
        *seen.borrow(),
        vec![
            Diagnostic::Protocol(ProtocolViolation::CallOutsideFrame),
            Diagnostic::Protocol(ProtocolViolation::RenderingOutsideGroup(PrimitiveFamily::Sprite)),
            Diagnostic::Protocol(ProtocolViolation::NestedGroup(PrimitiveFamily::Ribbon)),
            Diagnostic::Protocol(ProtocolViolation::EndWithoutBegin(PrimitiveFamily::Ribbon)),
        ]
    );
}

#[test]
fn test_mismatched_parameters_rejected() {
    let mut renderer = renderer();
    let sprites = renderer.create_sprite_renderer();
    let ribbon_node = RibbonNodeParameter::default();
    let seen = collect_diagnostics(&mut renderer);

    renderer.begin_rendering().unwrap();
    let result = renderer.begin_group(sprites, &NodeParameter::Ribbon(&ribbon_node), 1);
    renderer.end_rendering().unwrap();

    let violation = ProtocolViolation::ParameterMismatch {
        expected: PrimitiveFamily::Sprite,
        received: PrimitiveFamily::Ribbon,
    };
    assert_eq!(result, Err(RenderError::ProtocolViolation(violation)));
    assert_eq!(*seen.borrow(), vec![Diagnostic::Protocol(violation)]);
}

#[test]
fn test_renderer_keys_are_one_per_family() {
    let mut renderer = renderer();
    let a = renderer.create_track_renderer();
    let b = renderer.create_track_renderer();
    let c = renderer.create_ring_renderer();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(renderer.renderer_family(c), Some(PrimitiveFamily::Ring));
}

#[test]
fn test_ribbon_track_and_ring_vertex_counts() {
    let mut renderer = renderer();
    let ribbons = renderer.create_ribbon_renderer();
    let tracks = renderer.create_track_renderer();
    let rings = renderer.create_ring_renderer();

    let ribbon_node = RibbonNodeParameter::default();
    let joints: Vec<RibbonInstanceParameter<'_>> = (0..3)
        .map(|i| RibbonInstanceParameter {
            transform: Mat4::new_translation(&crate::foundation::math::Vec3::new(0.0, i as f32, 0.0)),
            instance_index: i,
            instance_count: 3,
            ..RibbonInstanceParameter::default()
        })
        .collect();
    let track_node = TrackNodeParameter::default();
    let track_joints: Vec<TrackInstanceParameter<'_>> = (0..3)
        .map(|i| TrackInstanceParameter {
            instance_index: i,
            instance_count: 3,
            ..TrackInstanceParameter::default()
        })
        .collect();
    let ring_node = RingNodeParameter {
        division: 4,
        ..RingNodeParameter::default()
    };
    let ring = RingInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    let instances: Vec<InstanceParameter<'_>> = joints.iter().map(InstanceParameter::Ribbon).collect();
    draw_group(&mut renderer, ribbons, NodeParameter::Ribbon(&ribbon_node), &instances);
    let instances: Vec<InstanceParameter<'_>> = track_joints.iter().map(InstanceParameter::Track).collect();
    draw_group(&mut renderer, tracks, NodeParameter::Track(&track_node), &instances);
    draw_group(&mut renderer, rings, NodeParameter::Ring(&ring_node), &[InstanceParameter::Ring(&ring)]);
    renderer.end_rendering().unwrap();

    let sprites: Vec<usize> = recorder(&renderer).draw_calls().iter().map(|d| d.0).collect();
    assert_eq!(sprites, vec![2, 4, 8]);
    assert_eq!(renderer.draw_vertex_count(), 8 + 16 + 32);
}

#[test]
fn test_distorting_callback_can_skip_batch() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter {
        material: distortion(),
        ..SpriteNodeParameter::default()
    };
    let sprite = SpriteInstanceParameter::default();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    renderer.set_distorting_callback(Some(Box::new(move |_backend: &mut dyn RenderBackend| {
        *counter.borrow_mut() += 1;
        false
    })));

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.end_rendering().unwrap();

    assert_eq!(*calls.borrow(), 1);
    assert!(recorder(&renderer).draw_calls().is_empty());
    assert_eq!(renderer.stats().skipped_batches, 1);
}

#[test]
fn test_distorting_callback_can_skip_model() {
    let mut renderer = renderer();
    let key = renderer.create_model_renderer();
    let model = ModelAsset::new(MeshHandle(7), &[(0, 4)]);
    let node = ModelNodeParameter {
        material: distortion(),
        model: Some(&model),
        lighting: false,
    };
    let instance = ModelInstanceParameter::default();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    renderer.set_distorting_callback(Some(Box::new(move |_backend: &mut dyn RenderBackend| {
        *counter.borrow_mut() += 1;
        false
    })));

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Model(&node), &[InstanceParameter::Model(&instance)]);
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert_eq!(*calls.borrow(), 1);
    assert!(backend.submissions().is_empty());
    assert_eq!(backend.count(|c| matches!(c, BackendCommand::CreateMaterialInstance { .. })), 0);
    assert_eq!(renderer.stats().skipped_batches, 1);
}

#[test]
fn test_distortion_disabled_skips_without_callback() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter {
        material: distortion(),
        ..SpriteNodeParameter::default()
    };
    let sprite = SpriteInstanceParameter::default();
    renderer.set_is_distorting(false);

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.end_rendering().unwrap();

    assert!(recorder(&renderer).draw_calls().is_empty());
    assert_eq!(renderer.stats().skipped_batches, 1);
}

#[test]
fn test_host_state_saved_and_restored() {
    let mut renderer = renderer_with(RendererConfig::new(16).with_restore_host_state(true));
    renderer.begin_rendering().unwrap();
    renderer.end_rendering().unwrap();

    let backend = recorder(&renderer);
    assert_eq!(backend.count(|c| *c == BackendCommand::SaveHostState), 1);
    assert_eq!(backend.count(|c| *c == BackendCommand::RestoreHostState), 1);

    renderer.set_restoration_of_states_flag(false);
    recorder_mut(&mut renderer).clear();
    renderer.begin_rendering().unwrap();
    renderer.end_rendering().unwrap();
    assert_eq!(recorder(&renderer).count(|c| *c == BackendCommand::SaveHostState), 0);
}

#[test]
fn test_reset_render_state_reemits_everything() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.reset_render_state();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.end_rendering().unwrap();

    assert_eq!(recorder(&renderer).count(|c| matches!(c, BackendCommand::SetBlend(_))), 2);
}

#[test]
fn test_draw_counters_reset() {
    let mut renderer = renderer();
    let key = renderer.create_sprite_renderer();
    let node = SpriteNodeParameter::default();
    let sprite = SpriteInstanceParameter::default();

    renderer.begin_rendering().unwrap();
    draw_group(&mut renderer, key, NodeParameter::Sprite(&node), &[InstanceParameter::Sprite(&sprite)]);
    renderer.end_rendering().unwrap();

    renderer.reset_draw_call_count();
    renderer.reset_draw_vertex_count();
    assert_eq!(renderer.draw_call_count(), 0);
    assert_eq!(renderer.draw_vertex_count(), 0);
}
