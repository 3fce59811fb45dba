pub mod cpal_backend;
pub mod output_manager;

use std::sync::Arc;

use cpal::FromSample;

use crate::engine::analysis::SpectrumTap;
use crate::engine::buffer::AudioBufferConsumer;
use crate::engine::dsp::dsp_chain::DspChain;
use crate::engine::error::Result;
use crate::engine::params::ParameterStore;

/// Largest number of frames rendered per internal pass. Callbacks asking for
/// more are processed in several passes over the same scratch buffer.
pub const MAX_RENDER_FRAMES: usize = 4096;

/// What the stream callback needs that outlives any single stream: the
/// decoded-sample queue, the spectrum taps and the parameters. Handed back
/// on shutdown so a reconnected stream can pick up where the old one left.
pub struct RenderContext {
    pub consumer: AudioBufferConsumer,
    pub taps: Vec<SpectrumTap>,
    pub params: Arc<ParameterStore>,
}

/// Per-stream render state, rebuilt whenever the stream (and so possibly the
/// sample rate) changes.
pub struct StreamRenderer {
    context: RenderContext,
    dsp: DspChain,
    scratch: Vec<f32>,
    channels: usize,
}

impl StreamRenderer {
    pub fn new(context: RenderContext, sample_rate: u32, channels: usize) -> Self {
        let channels = channels.max(1);
        let dsp = DspChain::new(sample_rate as f64, channels, context.params.clone());
        Self {
            context,
            dsp,
            scratch: vec![0.0; MAX_RENDER_FRAMES * channels],
            channels,
        }
    }

    pub fn into_context(self) -> RenderContext {
        self.context
    }

    /// Fills `data` from the sample queue through the equalizer, converting
    /// to the device format. Returns the number of queued samples consumed;
    /// whatever the queue could not supply is rendered as silence.
    pub fn render<T: FromSample<f32>>(&mut self, data: &mut [T]) -> usize {
        let chunk_len = self.scratch.len();
        let mut consumed = 0;
        for out in data.chunks_mut(chunk_len) {
            let scratch = &mut self.scratch[..out.len()];
            consumed += render_chunk(&mut self.context, &mut self.dsp, self.channels, scratch);
            for (dst, src) in out.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample_(*src);
            }
        }
        consumed
    }

    /// Forgets queued samples and filter state after a seek.
    pub fn discard(&mut self) {
        self.context.consumer.clear();
        self.dsp.reset();
    }
}

fn render_chunk(
    context: &mut RenderContext,
    dsp: &mut DspChain,
    channels: usize,
    out: &mut [f32],
) -> usize {
    let read = context.consumer.pop_slice(out);
    out[read..].fill(0.0);

    dsp.process(out);

    for frame in out.chunks_exact(channels) {
        for (tap, sample) in context.taps.iter_mut().zip(frame) {
            tap.push_sample(*sample);
        }
    }
    read
}

pub trait AudioOutput {
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// `false` once the stream reported an error or the default device
    /// changed.
    fn is_healthy(&self) -> bool;

    /// Tears the stream down and returns its render context.
    fn shutdown(&mut self) -> Option<RenderContext>;

    /// Periodic housekeeping from the control thread.
    fn tick(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::analysis::spectrum_fifo;
    use crate::engine::buffer::create_audio_buffer;
    use crate::engine::params::ParamId;

    #[test]
    fn render_pads_underrun_and_feeds_taps() {
        let (mut producer, consumer) = create_audio_buffer(64);
        let (tap_l, rx_l) = spectrum_fifo(4, 4);
        let (tap_r, rx_r) = spectrum_fifo(4, 4);
        let params = std::sync::Arc::new(ParameterStore::default());
        params.set(ParamId::LowCutBypassed, 1.0);
        params.set(ParamId::HighCutBypassed, 1.0);
        params.set(ParamId::PeakBypassed, 1.0);

        let context = RenderContext {
            consumer,
            taps: vec![tap_l, tap_r],
            params,
        };
        let mut renderer = StreamRenderer::new(context, 48000, 2);

        producer.push_slice(&[0.5, -0.5, 0.25, -0.25]);
        let mut out = [9.0f32; 8];
        assert_eq!(renderer.render(&mut out), 4);
        assert_eq!(out, [0.5, -0.5, 0.25, -0.25, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(rx_l.available_blocks(), 1);
        assert_eq!(rx_r.available_blocks(), 1);
    }

    #[test]
    fn render_converts_to_device_format() {
        let (mut producer, consumer) = create_audio_buffer(16);
        let params = std::sync::Arc::new(ParameterStore::default());
        params.set(ParamId::LowCutBypassed, 1.0);
        params.set(ParamId::HighCutBypassed, 1.0);
        params.set(ParamId::PeakBypassed, 1.0);
        let context = RenderContext {
            consumer,
            taps: Vec::new(),
            params,
        };
        let mut renderer = StreamRenderer::new(context, 44100, 2);

        producer.push_slice(&[1.0, -1.0]);
        let mut out = [7i16; 4];
        assert_eq!(renderer.render(&mut out), 2);
        assert_eq!(out[0], i16::MAX);
        assert_eq!(out[2], 0);
        assert_eq!(out[3], 0);

        producer.push_slice(&[0.5, 0.5]);
        renderer.discard();
        let mut out = [1.0f32; 2];
        assert_eq!(renderer.render(&mut out), 0);
        assert_eq!(out, [0.0, 0.0]);
    }
}
