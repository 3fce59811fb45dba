use std::f32::consts::PI;
use std::sync::Arc;

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    CachingCons, CachingProd, HeapRb,
};
use rustfft::{num_complex::Complex32, Fft, FftPlanner};

use crate::engine::dsp::biquad::gain_to_decibels;

/// Blackman-Harris window scaled so its mean is 1. A full-scale sine that
/// sits on a bin centre then reads 0 dB after normalisation.
pub fn blackman_harris(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let n = (size - 1) as f32;
    let mut window: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 / n;
            0.35875 - 0.48829 * (2.0 * PI * x).cos() + 0.14128 * (4.0 * PI * x).cos()
                - 0.01168 * (6.0 * PI * x).cos()
        })
        .collect();

    let sum: f32 = window.iter().sum();
    let scale = size as f32 / sum;
    window.iter_mut().for_each(|w| *w *= scale);
    window
}

/// Turns a rolling window of samples into magnitude spectra in dB.
///
/// Results go to a bounded queue; when the queue is full the new spectrum is
/// discarded.
pub struct FftDataGenerator {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
    producer: CachingProd<Arc<HeapRb<Vec<f32>>>>,
    consumer: CachingCons<Arc<HeapRb<Vec<f32>>>>,
    dropped: u64,
}

impl FftDataGenerator {
    /// `fft_order` is the base-2 log of the transform size.
    pub fn new(fft_order: u32, queue_capacity: usize) -> Self {
        let fft_size = 1usize << fft_order;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let (producer, consumer) = HeapRb::<Vec<f32>>::new(queue_capacity.max(1)).split();

        Self {
            fft,
            fft_size,
            window: blackman_harris(fft_size),
            buffer: vec![Complex32::new(0.0, 0.0); fft_size],
            scratch,
            producer,
            consumer,
            dropped: 0,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    /// Windows the newest `fft_size` samples of `audio`, transforms them and
    /// queues `fft_size / 2` bin levels in dB, floored at `noise_floor_db`.
    pub fn produce_fft_data(&mut self, audio: &[f32], noise_floor_db: f32) {
        let start = audio.len().saturating_sub(self.fft_size);
        let source = &audio[start..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = source.get(i).copied().unwrap_or(0.0);
            *slot = Complex32::new(sample * self.window[i], 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.num_bins();
        let norm = num_bins as f32;
        let magnitudes: Vec<f32> = self.buffer[..num_bins]
            .iter()
            .map(|bin| gain_to_decibels((bin.norm() / norm) as f64, noise_floor_db as f64) as f32)
            .collect();

        if self.producer.try_push(magnitudes).is_err() {
            self.dropped += 1;
        }
    }

    pub fn num_available(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn pop(&mut self) -> Option<Vec<f32>> {
        self.consumer.try_pop()
    }

    /// Spectra discarded because the queue was full since the last call.
    pub fn take_dropped(&mut self) -> u64 {
        std::mem::take(&mut self.dropped)
    }
}
