pub mod analysis;
pub mod decode;
#[cfg(feature = "pose")]
pub mod movenet;
pub mod pose;
pub mod sampler;
pub mod shot;
pub mod timeline;
