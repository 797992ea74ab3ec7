pub mod types;
pub mod config;
pub mod data;
pub mod sampler;
pub mod processing;
pub mod temporal;
pub mod playback;
pub mod projection;
pub mod contours;
pub mod density;
pub mod declutter;
pub mod hover;
pub mod session;
