//! Demo scene: a few objects and point lights orbiting them

use glam::{Mat4, Quat, Vec3};

/// Position, rotation (Euler YXZ, radians) and scale
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE }
    }
}

impl Transform {
    /// Model matrix (translate * rotate Y, X, Z * scale)
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: u32,
    pub name: String,
    pub transform: Transform,
    pub color: Vec3,
    /// Some(intensity) for point lights
    pub light_intensity: Option<f32>,
}

#[derive(Debug, Default)]
pub struct DemoScene {
    objects: Vec<SceneObject>,
    next_id: u32,
}

impl DemoScene {
    /// Two meshes on a floor, surrounded by a ring of colored lights
    pub fn new() -> Self {
        let mut scene = Self::default();

        scene.spawn("flat_vase", Transform {
            translation: Vec3::new(-0.5, 0.5, 0.0),
            scale: Vec3::new(3.0, 1.5, 3.0),
            ..Default::default()
        }, Vec3::ONE, None);
        scene.spawn("smooth_vase", Transform {
            translation: Vec3::new(0.5, 0.5, 0.0),
            scale: Vec3::new(3.0, 1.5, 3.0),
            ..Default::default()
        }, Vec3::ONE, None);
        scene.spawn("floor", Transform {
            translation: Vec3::new(0.0, 0.5, 0.0),
            scale: Vec3::new(3.0, 1.0, 3.0),
            ..Default::default()
        }, Vec3::ONE, None);

        let light_colors = [
            Vec3::new(1.0, 0.1, 0.1),
            Vec3::new(0.1, 0.1, 1.0),
            Vec3::new(0.1, 1.0, 0.1),
            Vec3::new(1.0, 1.0, 0.1),
            Vec3::new(0.1, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        let step = std::f32::consts::TAU / light_colors.len() as f32;
        for (i, color) in light_colors.into_iter().enumerate() {
            let orbit = Quat::from_rotation_y(i as f32 * step);
            scene.spawn(&format!("point_light_{}", i), Transform {
                translation: orbit * Vec3::new(-1.0, -1.0, -1.0),
                scale: Vec3::splat(0.1),
                ..Default::default()
            }, color, Some(0.2));
        }

        scene
    }

    pub fn spawn(&mut self, name: &str, transform: Transform, color: Vec3, light_intensity: Option<f32>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(SceneObject { id, name: name.to_string(), transform, color, light_intensity });
        id
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    pub fn light_count(&self) -> usize {
        self.objects.iter().filter(|o| o.light_intensity.is_some()).count()
    }
}
