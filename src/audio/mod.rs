pub mod analysis;
pub mod contact;
pub mod decode;
pub mod energy;
pub mod features;
pub mod music;
pub mod spike;
