//! Three-band parametric equalizer (low-cut, peak, high-cut) with a live
//! spectrum analyser, plus the file player that hosts it.

pub mod config;
pub mod engine;

pub use config::AppConfig;
pub use engine::engine::{AudioEngine, EngineOptions};
pub use engine::error::{EngineError, Result};
pub use engine::params::{ChainSettings, ParamId, ParameterStore, Slope};
