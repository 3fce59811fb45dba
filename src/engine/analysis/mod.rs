//! Spectrum analysis: audio-thread taps feed per-channel analysers that run
//! on the display timer.

pub mod fft;
pub mod fifo;
pub mod path;

use tracing::{debug, warn};

use crate::engine::analysis::fft::FftDataGenerator;
use crate::engine::analysis::fifo::SpectrumReceiver;
use crate::engine::analysis::path::{PathProducer, Point, Rect};

pub use fifo::{spectrum_fifo, SpectrumTap};

/// Tuning for one channel's analyser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerSettings {
    /// Transform size is `2^fft_order`.
    pub fft_order: u32,
    pub noise_floor_db: f32,
    /// Fresh samples required between two transforms once the window is full.
    pub hop_size: usize,
    pub fft_queue_capacity: usize,
    pub smoothing: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            fft_order: 11,
            noise_floor_db: -48.0,
            hop_size: 512,
            fft_queue_capacity: 16,
            smoothing: 0.5,
        }
    }
}

/// Drains one channel's spectrum FIFO into a rolling window, runs the FFT
/// and keeps the latest spectrum path.
pub struct ChannelAnalyzer {
    label: &'static str,
    receiver: SpectrumReceiver,
    block: Vec<f32>,
    mono_buffer: Vec<f32>,
    generator: FftDataGenerator,
    path_producer: PathProducer,
    settings: AnalyzerSettings,
    received: usize,
    since_fft: usize,
}

impl ChannelAnalyzer {
    pub fn new(
        label: &'static str,
        receiver: SpectrumReceiver,
        settings: AnalyzerSettings,
    ) -> Self {
        let generator = FftDataGenerator::new(settings.fft_order, settings.fft_queue_capacity);
        let fft_size = generator.fft_size();
        Self {
            label,
            block: vec![0.0; receiver.block_size()],
            receiver,
            mono_buffer: vec![0.0; fft_size],
            generator,
            path_producer: PathProducer::new(settings.smoothing),
            settings,
            received: 0,
            since_fft: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn fft_size(&self) -> usize {
        self.generator.fft_size()
    }

    /// Latest spectrum path, kept until a newer spectrum is rendered.
    pub fn path(&self) -> &[Point] {
        self.path_producer.path()
    }

    /// Slides `block` into the tail of the rolling window.
    fn push_into_window(&mut self, len: usize) {
        let window = self.mono_buffer.len();
        let block = &self.block[..len];
        if len >= window {
            self.mono_buffer.copy_from_slice(&block[len - window..]);
        } else {
            self.mono_buffer.copy_within(len.., 0);
            self.mono_buffer[window - len..].copy_from_slice(block);
        }
    }

    /// Drains every queued block and renders each due spectrum into `bounds`
    /// as soon as it is computed, so the path always ends on the newest
    /// audio. Returns `true` if the path changed.
    pub fn process(&mut self, bounds: Rect, sample_rate: f64) -> bool {
        let block_len = self.receiver.block_size();
        let fft_size = self.generator.fft_size();
        let bin_width = sample_rate / fft_size as f64;
        let floor = self.settings.noise_floor_db;
        let mut updated = false;

        while self.receiver.pop_block(&mut self.block) {
            self.push_into_window(block_len);
            self.received = (self.received + block_len).min(fft_size);
            self.since_fft += block_len;

            if self.received < fft_size || self.since_fft < self.settings.hop_size {
                continue;
            }
            self.since_fft = 0;
            self.generator.produce_fft_data(&self.mono_buffer, floor);
            while let Some(magnitudes) = self.generator.pop() {
                self.path_producer
                    .generate_path(&magnitudes, bounds, fft_size, bin_width, floor);
                updated = true;
            }
        }

        let dropped = self.receiver.take_dropped();
        if dropped > 0 {
            warn!(channel = self.label, dropped, "spectrum FIFO overflow, blocks discarded");
        }
        let dropped = self.generator.take_dropped();
        if dropped > 0 {
            warn!(channel = self.label, dropped, "FFT queue overflow, spectra discarded");
        }

        if updated {
            debug!(channel = self.label, points = self.path().len(), "spectrum path updated");
        }
        updated
    }

    /// Discards queued audio and the rolling window, e.g. after a seek.
    pub fn clear(&mut self) {
        self.receiver.clear();
        self.mono_buffer.iter_mut().for_each(|s| *s = 0.0);
        self.received = 0;
        self.since_fft = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(block: usize, capacity: usize) -> (SpectrumTap, ChannelAnalyzer) {
        let (tap, rx) = spectrum_fifo(block, capacity);
        let settings = AnalyzerSettings {
            fft_order: 10,
            hop_size: block,
            smoothing: 0.0,
            ..AnalyzerSettings::default()
        };
        (tap, ChannelAnalyzer::new("left", rx, settings))
    }

    #[test]
    fn no_spectrum_before_window_fills() {
        let (mut tap, mut analyzer) = analyzer(256, 8);
        tap.push(&[0.5; 768]);
        assert!(!analyzer.process(Rect::new(0.0, 0.0, 100.0, 50.0), 48000.0));
        assert!(analyzer.path().is_empty());

        tap.push(&[0.5; 256]);
        assert!(analyzer.process(Rect::new(0.0, 0.0, 100.0, 50.0), 48000.0));
        assert_eq!(analyzer.path().len(), 100);
    }

    #[test]
    fn window_keeps_newest_samples() {
        let (mut tap, mut analyzer) = analyzer(4, 4);
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        tap.push(&samples);
        analyzer.process(Rect::new(0.0, 0.0, 10.0, 10.0), 48000.0);
        let tail = &analyzer.mono_buffer[analyzer.mono_buffer.len() - 8..];
        assert_eq!(tail, samples.as_slice());
    }

    #[test]
    fn empty_drain_is_a_no_op() {
        let (mut tap, mut analyzer) = analyzer(512, 8);
        let bounds = Rect::new(0.0, 0.0, 64.0, 32.0);
        tap.push(&vec![0.25; 1024]);
        assert!(analyzer.process(bounds, 48000.0));
        let before = analyzer.path().to_vec();

        assert!(!analyzer.process(bounds, 48000.0));
        assert_eq!(analyzer.path(), before.as_slice());
    }

    #[test]
    fn hop_larger_than_block_skips_blocks() {
        let (mut tap, rx) = spectrum_fifo(256, 16);
        let settings = AnalyzerSettings {
            fft_order: 10,
            hop_size: 512,
            smoothing: 0.0,
            ..AnalyzerSettings::default()
        };
        let mut analyzer = ChannelAnalyzer::new("left", rx, settings);
        let bounds = Rect::new(0.0, 0.0, 32.0, 16.0);

        // Window fills on the fourth block; 1024 fresh samples also cover the hop.
        tap.push(&[0.5; 1024]);
        assert!(analyzer.process(bounds, 48000.0));

        tap.push(&[0.5; 256]);
        assert!(!analyzer.process(bounds, 48000.0));
        tap.push(&[0.5; 256]);
        assert!(analyzer.process(bounds, 48000.0));
        tap.push(&[0.5; 256]);
        assert!(!analyzer.process(bounds, 48000.0));
    }

    #[test]
    fn clear_waits_for_a_full_window_again() {
        let (mut tap, mut analyzer) = analyzer(256, 16);
        let bounds = Rect::new(0.0, 0.0, 32.0, 16.0);
        tap.push(&[0.5; 1024]);
        assert!(analyzer.process(bounds, 48000.0));
        let before = analyzer.path().to_vec();

        // Queued audio from before the seek never reaches the window.
        tap.push(&[0.5; 512]);
        analyzer.clear();
        assert!(analyzer.mono_buffer.iter().all(|&s| s == 0.0));

        tap.push(&[0.5; 768]);
        assert!(!analyzer.process(bounds, 48000.0));
        assert_eq!(analyzer.path(), before.as_slice());

        tap.push(&[0.5; 256]);
        assert!(analyzer.process(bounds, 48000.0));
    }

    #[test]
    fn full_fft_queue_still_renders_newest_audio() {
        let (mut tap, rx) = spectrum_fifo(512, 30);
        let settings = AnalyzerSettings {
            fft_queue_capacity: 1,
            smoothing: 0.0,
            ..AnalyzerSettings::default()
        };
        let mut analyzer = ChannelAnalyzer::new("left", rx, settings);
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);

        // A stalled display: silence then a loud tone, all drained in one call.
        tap.push(&[0.0; 20 * 512]);
        let tone: Vec<f32> = (0..10 * 512)
            .map(|n| (std::f32::consts::TAU * 1000.0 * n as f32 / 48000.0).sin())
            .collect();
        tap.push(&tone);
        assert!(analyzer.process(bounds, 48000.0));

        let loudest = analyzer.path().iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        assert!(loudest < 10.0, "loudest point at y = {loudest}");
        assert_eq!(analyzer.generator.take_dropped(), 0);
    }
}
