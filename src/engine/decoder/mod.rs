pub mod symphonia_decoder;

/// Source of interleaved f32 audio for the player.
pub trait AudioDecoder: Send {
    /// Next block of interleaved samples, `None` at end of stream.
    fn decode_next(&mut self) -> Option<Vec<f32>>;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u32;

    fn seek(&mut self, time_secs: f64);

    /// Total duration in seconds, when the container reports it.
    fn duration(&self) -> Option<f64>;
}
