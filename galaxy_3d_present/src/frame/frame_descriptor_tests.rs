//! Unit tests for frame/frame_descriptor.rs

use super::*;
use crate::camera::Camera;
use crate::device::{CommandBufferHandle, DescriptorSetHandle};
use crate::error::Error;

/// Scene used by the tests: each system appends its name
#[derive(Default)]
struct Scene {
    visits: Vec<String>,
}

struct NamedSystem {
    name: String,
    fail: bool,
}

impl NamedSystem {
    fn boxed(name: &str) -> Box<dyn RenderSystem<Scene>> {
        Box::new(Self { name: name.to_string(), fail: false })
    }

    fn failing(name: &str) -> Box<dyn RenderSystem<Scene>> {
        Box::new(Self { name: name.to_string(), fail: true })
    }
}

impl RenderSystem<Scene> for NamedSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn record(&mut self, frame: &mut FrameDescriptor<'_, Scene>) -> crate::error::Result<()> {
        if self.fail {
            return Err(Error::InvalidResource(format!("{} has no pipeline", self.name)));
        }
        frame.scene_objects.visits.push(format!("{}@{}", self.name, frame.frame_index));
        Ok(())
    }
}

fn descriptor<'a>(camera: &'a Camera, scene: &'a mut Scene, frame_index: usize) -> FrameDescriptor<'a, Scene> {
    FrameDescriptor {
        frame_index,
        frame_time: 1.0 / 60.0,
        command_buffer: CommandBufferHandle::from_raw(7),
        camera,
        global_descriptor_set: DescriptorSetHandle::NULL,
        scene_objects: scene,
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

#[test]
fn test_empty_list() {
    let list: RenderSystemList<Scene> = RenderSystemList::new();
    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
}

#[test]
fn test_register_counts_systems() {
    let mut list = RenderSystemList::new();
    list.register(NamedSystem::boxed("simple"));
    list.register(NamedSystem::boxed("point_light"));
    assert_eq!(list.len(), 2);
    assert!(!list.is_empty());
}

// ============================================================================
// RECORDING
// ============================================================================

#[test]
fn test_record_all_in_registration_order() {
    let mut list = RenderSystemList::new();
    list.register(NamedSystem::boxed("simple"));
    list.register(NamedSystem::boxed("point_light"));

    let camera = Camera::new();
    let mut scene = Scene::default();
    let mut frame = descriptor(&camera, &mut scene, 1);
    list.record_all(&mut frame).unwrap();

    assert_eq!(scene.visits, vec!["simple@1", "point_light@1"]);
}

#[test]
fn test_record_all_stops_at_first_error() {
    let mut list = RenderSystemList::new();
    list.register(NamedSystem::boxed("simple"));
    list.register(NamedSystem::failing("broken"));
    list.register(NamedSystem::boxed("point_light"));

    let camera = Camera::new();
    let mut scene = Scene::default();
    let mut frame = descriptor(&camera, &mut scene, 0);
    let result = list.record_all(&mut frame);

    assert_eq!(result, Err(Error::InvalidResource("broken has no pipeline".to_string())));
    assert_eq!(scene.visits, vec!["simple@0"]);
}

#[test]
fn test_descriptor_exposes_frame_data() {
    let mut camera = Camera::new();
    camera.set_perspective_projection(1.0, 2.0, 0.1, 10.0);
    let mut scene = Scene::default();
    let frame = descriptor(&camera, &mut scene, 1);

    assert_eq!(frame.command_buffer, CommandBufferHandle::from_raw(7));
    assert!(frame.global_descriptor_set.is_null());
    assert_eq!(frame.camera.projection_matrix(), camera.projection_matrix());
    assert!((frame.frame_time - 1.0 / 60.0).abs() < f32::EPSILON);
}
