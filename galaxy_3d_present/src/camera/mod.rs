//! Camera module: view/projection data handed to render systems each frame.

mod camera;

pub use camera::Camera;
