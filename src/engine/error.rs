//! Error types for the equalizer engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no output device available")]
    NoOutputDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("failed to query output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to pause output stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("no audio backend available")]
    NoBackend,

    #[error("decoder error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("no supported audio tracks found")]
    NoTrack,

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("sample producer already in use")]
    ProducerInUse,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("invalid parameter assignment `{0}`, expected <name>=<value>")]
    InvalidAssignment(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
