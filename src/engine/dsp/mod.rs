pub mod biquad;
pub mod chain;
pub mod coefficients;
pub mod dsp_chain;
pub mod resampler;
pub mod updater;
