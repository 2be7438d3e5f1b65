//! Demo render systems
//!
//! The presentation core hands every system the open command buffer inside
//! the render pass scope. These systems update their per-frame state and
//! report what they would draw; pipelines live outside this demo.

use galaxy_3d_present::galaxy3d::Result;
use galaxy_3d_present::galaxy3d::frame::{FrameDescriptor, RenderSystem};
use galaxy_3d_present::engine_trace;
use glam::{Mat4, Quat};

use crate::scene::DemoScene;

/// Draws every non-light object with its model matrix
#[derive(Default)]
pub struct SimpleRenderSystem {
    /// Model-view-projection matrices of the last recorded frame
    pub last_draws: Vec<(u32, Mat4)>,
}

impl RenderSystem<DemoScene> for SimpleRenderSystem {
    fn name(&self) -> &str {
        "simple"
    }

    fn record(&mut self, frame: &mut FrameDescriptor<'_, DemoScene>) -> Result<()> {
        let view_projection = frame.camera.view_projection_matrix();

        self.last_draws.clear();
        for object in frame.scene_objects.objects() {
            if object.light_intensity.is_none() {
                self.last_draws.push((object.id, view_projection * object.transform.matrix()));
            }
        }

        engine_trace!("galaxy3d::demo", "Frame {}: {} mesh draw(s) into {:?}",
            frame.frame_index, self.last_draws.len(), frame.command_buffer);
        Ok(())
    }
}

/// Rotates the point lights around the vertical axis
pub struct PointLightSystem {
    /// Radians per second
    pub angular_speed: f32,
}

impl Default for PointLightSystem {
    fn default() -> Self {
        Self { angular_speed: 0.5 }
    }
}

impl RenderSystem<DemoScene> for PointLightSystem {
    fn name(&self) -> &str {
        "point_light"
    }

    fn record(&mut self, frame: &mut FrameDescriptor<'_, DemoScene>) -> Result<()> {
        let rotation = Quat::from_rotation_y(self.angular_speed * frame.frame_time);

        for object in frame.scene_objects.objects_mut() {
            if object.light_intensity.is_some() {
                object.transform.translation = rotation * object.transform.translation;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "systems_tests.rs"]
mod tests;
