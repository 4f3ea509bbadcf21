pub mod config;
pub mod display;
pub mod pacing;
pub mod streamer;
mod visualizer;

pub use config::{VisualizerConfig, WindowGeometry};
pub use display::{DisplaySurface, NativeWindow};
pub use streamer::{MediaType, Streamer};
pub use visualizer::Visualizer;
