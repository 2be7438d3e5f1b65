/// Camera - view and projection matrices carried in the frame descriptor
///
/// Matrices target Vulkan clip space: right-handed view space, Y down in
/// normalized device coordinates, depth in [0, 1].
/// The camera stores what the caller sets; render systems only read it.

use glam::{Mat4, Vec3};

/// Flips Y from glam's (Y up) clip space to Vulkan's (Y down)
const VULKAN_Y_FLIP: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
]);

/// Camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    view_matrix: Mat4,
    inverse_view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::IDENTITY,
            inverse_view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== PROJECTION =====

    /// Orthographic projection of the given view-space box
    pub fn set_orthographic_projection(&mut self, left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) {
        self.projection_matrix = VULKAN_Y_FLIP * Mat4::orthographic_rh(left, right, bottom, top, near, far);
    }

    /// Perspective projection
    ///
    /// # Arguments
    ///
    /// * `fovy` - Vertical field of view in radians
    /// * `aspect` - Width / height (typically `FrameOrchestrator::aspect_ratio`)
    /// * `near` - Near plane distance (maps to depth 0)
    /// * `far` - Far plane distance (maps to depth 1)
    ///
    /// # Panics
    ///
    /// If `aspect` is zero (minimized window).
    pub fn set_perspective_projection(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) {
        assert!(aspect.abs() > f32::EPSILON, "Camera aspect ratio must be non-zero");
        self.projection_matrix = VULKAN_Y_FLIP * Mat4::perspective_rh(fovy, aspect, near, far);
    }

    // ===== VIEW =====

    /// Look from `position` along `direction`
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        self.set_view(Mat4::look_to_rh(position, direction, up));
    }

    /// Look from `position` at `target`
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// View from a position and Tait-Bryan angles applied Y, X, then Z (radians)
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let world = Mat4::from_translation(position)
            * Mat4::from_rotation_y(rotation.y)
            * Mat4::from_rotation_x(rotation.x)
            * Mat4::from_rotation_z(rotation.z);
        self.view_matrix = world.inverse();
        self.inverse_view_matrix = world;
    }

    fn set_view(&mut self, view: Mat4) {
        self.view_matrix = view;
        self.inverse_view_matrix = view.inverse();
    }

    // ===== GETTERS =====

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Camera-to-world transform
    pub fn inverse_view_matrix(&self) -> &Mat4 {
        &self.inverse_view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// World-space camera position
    pub fn position(&self) -> Vec3 {
        self.inverse_view_matrix.w_axis.truncate()
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
