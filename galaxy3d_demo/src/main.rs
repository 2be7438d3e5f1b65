//! Galaxy3D demo: opens a window and drives the frame pipeline until it closes

mod scene;
mod systems;

use std::process::ExitCode;
use std::sync::Arc;

use galaxy_3d_present::galaxy3d::device::{DescriptorSetHandle, GraphicsDevice};
use galaxy_3d_present::galaxy3d::frame::{FrameDescriptor, FrameOrchestrator, FrameTimer, RenderSystemList};
use galaxy_3d_present::galaxy3d::surface::WindowSurface;
use galaxy_3d_present::galaxy3d::{Camera, ChainConfig, Config, Result};
use galaxy_3d_present::{engine_debug, engine_error, engine_info};
use galaxy_3d_present_vulkan::galaxy3d::VulkanGraphicsDevice;
use glam::Vec3;

use scene::DemoScene;
use systems::{PointLightSystem, SimpleRenderSystem};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> ExitCode {
    let result = run();

    #[cfg(feature = "vulkan-validation")]
    galaxy_3d_present_vulkan::galaxy3d::print_validation_stats_report();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            engine_error!("galaxy3d::demo", "Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut window = WindowSurface::new("Galaxy3D Demo", WIDTH, HEIGHT)?;

    let config = Config {
        enable_validation: cfg!(feature = "vulkan-validation"),
        app_name: "Galaxy3D Demo".to_string(),
        ..Default::default()
    };
    let vulkan_device = VulkanGraphicsDevice::new(window.window().as_ref(), config)?;
    engine_info!("galaxy3d::demo", "Using GPU: {}", vulkan_device.physical_device_name());
    let device: Arc<dyn GraphicsDevice> = Arc::new(vulkan_device);

    let mut orchestrator = FrameOrchestrator::new(device.clone(), &mut window, ChainConfig::default())?;

    let mut scene = DemoScene::new();
    for object in scene.objects() {
        engine_debug!("galaxy3d::demo", "Spawned '{}' (id {}, color {:?})", object.name, object.id, object.color);
    }
    engine_info!("galaxy3d::demo", "Scene: {} object(s), {} light(s)", scene.objects().len(), scene.light_count());
    let mut systems = RenderSystemList::new();
    systems.register(Box::new(PointLightSystem::default()));
    systems.register(Box::new(SimpleRenderSystem::default()));

    let mut camera = Camera::new();
    camera.set_view_target(Vec3::new(-1.0, -2.0, -2.0), Vec3::ZERO, Vec3::NEG_Y);

    let mut timer = FrameTimer::new();

    while !window.should_close() {
        window.poll_events();
        let frame_time = timer.tick();

        camera.set_perspective_projection(50f32.to_radians(), orchestrator.aspect_ratio(), 0.1, 100.0);

        let Some(command_buffer) = orchestrator.begin_frame(&mut window)? else {
            continue;
        };

        let mut frame = FrameDescriptor {
            frame_index: orchestrator.frame_index(),
            frame_time,
            command_buffer,
            camera: &camera,
            global_descriptor_set: DescriptorSetHandle::NULL,
            scene_objects: &mut scene,
        };

        orchestrator.begin_render_pass_scope(command_buffer);
        let recorded = systems.record_all(&mut frame);
        orchestrator.end_render_pass_scope(command_buffer);
        recorded?;

        orchestrator.end_frame(&mut window)?;
    }

    engine_info!(
        "galaxy3d::demo",
        "Closing after {} frame(s) in {:.1}s ({} image chain rebuild(s))",
        timer.frame_count(),
        timer.elapsed().as_secs_f32(),
        orchestrator.recreation_count()
    );

    // Orchestrator waits for the GPU, then the device, then the window surface
    drop(orchestrator);
    drop(device);
    drop(window);
    Ok(())
}
