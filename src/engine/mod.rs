pub mod analysis;
pub mod buffer;
pub mod clock;
pub mod decoder;
pub mod display;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod output;
pub mod params;
