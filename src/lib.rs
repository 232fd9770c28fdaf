pub mod analyzer;
pub mod app;
pub mod audio;
pub mod config;
pub mod control;
pub mod logging;
pub mod params;
pub mod profile;
pub mod render;
pub mod synth;
pub mod terminal;

pub use analyzer::{Analyzer, AnalyzerConfig, Features};
pub use control::{ControlState, Selection, Snapshot};
pub use params::Parameters;
pub use render::{Frame, FrameRenderer, Output};
