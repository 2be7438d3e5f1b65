/// Image chain module - presentable images and surface negotiation

pub mod negotiation;
pub mod image_chain;

pub use negotiation::*;
pub use image_chain::*;
