use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};

use crate::engine::error::{EngineError, Result};

/// Converts interleaved decoder output to the stream's sample rate.
///
/// Input is collected until a full chunk is available; rubato works on
/// planar buffers, so each chunk is de-interleaved and the result
/// re-interleaved. Runs on the decode thread only.
pub struct Resampler {
    resampler: Fft<f32>,
    channels: usize,
    chunk_size: usize,
    pending: Vec<f32>,
    planar_in: Vec<Vec<f32>>,
    planar_out: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        let resampler = Fft::<f32>::new(
            source_sample_rate as usize,
            target_sample_rate as usize,
            chunk_size,
            2,
            channels,
            FixedSync::Input,
        )
        .map_err(|e| EngineError::Resample(e.to_string()))?;

        Ok(Self {
            resampler,
            channels,
            chunk_size,
            pending: Vec::with_capacity(chunk_size * channels * 2),
            planar_in: vec![vec![0.0; chunk_size]; channels],
            planar_out: vec![Vec::new(); channels],
        })
    }

    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let chunk_len = self.chunk_size * self.channels;
        let mut output = Vec::new();

        while self.pending.len() >= chunk_len {
            for (i, frame) in self.pending[..chunk_len].chunks_exact(self.channels).enumerate() {
                for (ch, sample) in frame.iter().enumerate() {
                    self.planar_in[ch][i] = *sample;
                }
            }
            self.pending.drain(..chunk_len);

            let out_len = self.resampler.output_frames_next();
            for channel in self.planar_out.iter_mut() {
                channel.clear();
                channel.resize(out_len, 0.0);
            }

            let input_adapter =
                SequentialSliceOfVecs::new(&self.planar_in, self.channels, self.chunk_size)
                    .map_err(|e| EngineError::Resample(e.to_string()))?;
            let mut output_adapter =
                SequentialSliceOfVecs::new_mut(&mut self.planar_out, self.channels, out_len)
                    .map_err(|e| EngineError::Resample(e.to_string()))?;

            let (_, written) = self
                .resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| EngineError::Resample(e.to_string()))?;

            output.reserve(written * self.channels);
            for i in 0..written {
                for ch in 0..self.channels {
                    output.push(self.planar_out[ch][i]);
                }
            }
        }

        Ok(output)
    }

    /// Pads the last partial chunk with silence and pushes it through.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let remaining_frames = self.pending.len() / self.channels;
        let padding = (self.chunk_size - remaining_frames) * self.channels;
        self.pending.resize(self.pending.len() + padding, 0.0);

        self.process(&[])
    }
}
