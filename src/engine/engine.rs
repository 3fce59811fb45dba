use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::analysis::fifo::SpectrumReceiver;
use crate::engine::analysis::{spectrum_fifo, AnalyzerSettings, ChannelAnalyzer};
use crate::engine::buffer::{create_audio_buffer, AudioBufferProducer};
use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::decoder::{symphonia_decoder::SymphoniaDecoder, AudioDecoder};
use crate::engine::dsp::resampler::Resampler;
use crate::engine::error::{EngineError, Result};
use crate::engine::output::{output_manager::OutputManager, AudioOutput, RenderContext};
use crate::engine::params::ParameterStore;

/// Sample rate assumed until the first stream reports its own.
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const RESAMPLER_CHUNK: usize = 1024;
/// Labels of the analysed channels, in channel order.
const SPECTRUM_CHANNELS: [&str; 2] = ["left", "right"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub audio_buffer_seconds: f64,
    pub spectrum_block_size: usize,
    pub spectrum_fifo_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            audio_buffer_seconds: 1.0,
            spectrum_block_size: 512,
            spectrum_fifo_capacity: 30,
        }
    }
}

enum DecoderCommand {
    Seek(f64),
    Stop,
}

/// File player with the equalizer in its output path.
///
/// Decoding runs on its own thread and feeds the output stream through a
/// lock-free sample queue; the stream callback equalizes and taps the
/// spectrum of what it plays.
pub struct AudioEngine {
    clock: Arc<Clock>,
    output: Box<dyn AudioOutput>,
    producer: Option<AudioBufferProducer>,
    spectrum_receivers: Vec<SpectrumReceiver>,
    decode_thread: Option<JoinHandle<AudioBufferProducer>>,
    is_decoding: Arc<AtomicBool>,
    seek_requested: Arc<AtomicBool>,
    command_tx: Option<Sender<DecoderCommand>>,
    duration: Option<f64>,
}

impl AudioEngine {
    pub fn new(options: EngineOptions, params: Arc<ParameterStore>) -> Result<Self> {
        let clock = Arc::new(Clock::new(DEFAULT_SAMPLE_RATE));

        let seconds = options.audio_buffer_seconds.max(0.05);
        let capacity = (seconds * DEFAULT_SAMPLE_RATE as f64 * 2.0) as usize;
        let (producer, consumer) = create_audio_buffer(capacity);

        let (taps, spectrum_receivers): (Vec<_>, Vec<_>) = SPECTRUM_CHANNELS
            .iter()
            .map(|_| spectrum_fifo(options.spectrum_block_size, options.spectrum_fifo_capacity))
            .unzip();

        let context = RenderContext {
            consumer,
            taps,
            params,
        };
        let output = Box::new(OutputManager::new(context, clock.clone()));

        Ok(Self {
            clock,
            output,
            producer: Some(producer),
            spectrum_receivers,
            decode_thread: None,
            is_decoding: Arc::new(AtomicBool::new(false)),
            seek_requested: Arc::new(AtomicBool::new(false)),
            command_tx: None,
            duration: None,
        })
    }

    pub fn clock(&self) -> Arc<Clock> {
        self.clock.clone()
    }

    /// Builds one analyser per tapped channel. The receivers move into the
    /// analysers, so this yields them only once.
    pub fn take_analyzers(&mut self, settings: AnalyzerSettings) -> Vec<ChannelAnalyzer> {
        self.spectrum_receivers
            .drain(..)
            .zip(SPECTRUM_CHANNELS)
            .map(|(receiver, label)| ChannelAnalyzer::new(label, receiver, settings))
            .collect()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let decoder = SymphoniaDecoder::new(path)?;
        self.duration = decoder.duration();
        let producer = self.producer.take().ok_or(EngineError::ProducerInUse)?;

        let (tx, rx) = mpsc::channel();
        self.command_tx = Some(tx);

        self.is_decoding.store(true, Ordering::SeqCst);
        self.clock.set_eos(false);
        self.clock.set_sample_pos(0);
        self.clock.signal_discontinuity();

        let worker = DecodeWorker {
            decoder: Box::new(decoder),
            producer,
            clock: self.clock.clone(),
            is_decoding: self.is_decoding.clone(),
            seek_requested: self.seek_requested.clone(),
            commands: rx,
        };
        self.decode_thread = Some(thread::spawn(move || worker.run()));
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.clock.set_state(PlaybackState::Playing);
        self.output.start()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.clock.set_state(PlaybackState::Paused);
        self.output.pause()
    }

    pub fn stop(&mut self) {
        self.clock.set_state(PlaybackState::Stopped);
        if let Err(err) = self.output.stop() {
            warn!(%err, "failed to stop output");
        }

        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(DecoderCommand::Stop);
        }
        self.is_decoding.store(false, Ordering::SeqCst);
        if let Some(handle) = self.decode_thread.take() {
            match handle.join() {
                Ok(producer) => self.producer = Some(producer),
                Err(_) => error!("decode thread panicked"),
            }
        }

        self.clock.set_sample_pos(0);
        self.clock.signal_discontinuity();
    }

    pub fn seek(&mut self, time_secs: f64) {
        let time_secs = time_secs.max(0.0);
        let channels = self.clock.get_channels() as f64;
        let samples_per_sec = self.clock.get_sample_rate() as f64 * channels;
        let sample_pos = (time_secs * samples_per_sec) as u64;
        self.clock.set_sample_pos(sample_pos);
        self.clock.signal_discontinuity();

        if let Some(tx) = &self.command_tx {
            self.seek_requested.store(true, Ordering::SeqCst);
            let _ = tx.send(DecoderCommand::Seek(time_secs));
        }
    }

    pub fn get_time_secs(&self) -> f64 {
        self.clock.get_time_secs()
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.get_state()
    }

    /// `true` once the decoder is done and the queued audio has played out.
    pub fn is_finished(&self) -> bool {
        self.clock.is_eos() && self.clock.get_state() == PlaybackState::Stopped
    }

    pub fn tick(&mut self) {
        self.output.tick();
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
        self.output.shutdown();
    }
}

struct DecodeWorker {
    decoder: Box<dyn AudioDecoder>,
    producer: AudioBufferProducer,
    clock: Arc<Clock>,
    is_decoding: Arc<AtomicBool>,
    /// Set by the engine before it queues a seek, so a blocked push can
    /// give up on a block from the old position.
    seek_requested: Arc<AtomicBool>,
    commands: Receiver<DecoderCommand>,
}

impl DecodeWorker {
    /// Decodes until end of stream or a stop request, returning the queue
    /// producer so the next file can reuse it.
    fn run(mut self) -> AudioBufferProducer {
        let source_rate = self.decoder.sample_rate();
        let source_channels = self.decoder.channels().max(1) as usize;
        let mut output_rate = self.clock.get_sample_rate();
        let mut output_channels = self.clock.get_channels().max(1) as usize;
        let mut resampler = self.make_resampler(source_rate, output_rate, source_channels);

        while self.is_decoding.load(Ordering::Relaxed) {
            if !self.handle_commands(&mut resampler, source_rate, output_rate, source_channels) {
                break;
            }

            let current_rate = self.clock.get_sample_rate();
            let current_channels = self.clock.get_channels().max(1) as usize;
            if current_rate != output_rate || current_channels != output_channels {
                info!(
                    from_rate = output_rate,
                    to_rate = current_rate,
                    from_channels = output_channels,
                    to_channels = current_channels,
                    "output format changed"
                );
                output_rate = current_rate;
                output_channels = current_channels;
                resampler = self.make_resampler(source_rate, output_rate, source_channels);
                self.clock.signal_discontinuity();
            }

            if self.producer.vacant_len() < RESAMPLER_CHUNK * output_channels {
                thread::sleep(Duration::from_millis(10));
                continue;
            }

            let Some(samples) = self.decoder.decode_next() else {
                if let Some(r) = resampler.as_mut() {
                    match r.flush() {
                        Ok(tail) => {
                            let tail = remap_channels(&tail, source_channels, output_channels);
                            self.push_all(&tail);
                        }
                        Err(err) => warn!(%err, "resampler flush failed"),
                    }
                }
                debug!("end of stream");
                self.clock.set_eos(true);
                break;
            };

            let samples = match resampler.as_mut() {
                Some(r) => match r.process(&samples) {
                    Ok(resampled) => resampled,
                    Err(err) => {
                        error!(%err, "resampling failed, stopping decode");
                        self.clock.set_eos(true);
                        break;
                    }
                },
                None => samples,
            };

            let samples = remap_channels(&samples, source_channels, output_channels);
            // A false return means a seek or stop cut the block short; the
            // next iteration handles it.
            self.push_all(&samples);
        }

        self.is_decoding.store(false, Ordering::SeqCst);
        self.producer
    }

    fn make_resampler(
        &self,
        source_rate: u32,
        output_rate: u32,
        channels: usize,
    ) -> Option<Resampler> {
        if source_rate == output_rate {
            return None;
        }
        info!(source_rate, output_rate, channels, "resampling");
        match Resampler::new(source_rate, output_rate, channels, RESAMPLER_CHUNK) {
            Ok(r) => Some(r),
            Err(err) => {
                error!(%err, "failed to create resampler, playing at source rate");
                None
            }
        }
    }

    /// Applies queued commands. Returns `false` on stop.
    fn handle_commands(
        &mut self,
        resampler: &mut Option<Resampler>,
        source_rate: u32,
        output_rate: u32,
        channels: usize,
    ) -> bool {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                DecoderCommand::Seek(time) => {
                    self.seek_requested.store(false, Ordering::SeqCst);
                    self.decoder.seek(time);
                    if resampler.is_some() {
                        *resampler = self.make_resampler(source_rate, output_rate, channels);
                    }
                    self.clock.set_eos(false);
                    self.clock.signal_discontinuity();
                }
                DecoderCommand::Stop => {
                    self.is_decoding.store(false, Ordering::SeqCst);
                    return false;
                }
            }
        }
        true
    }

    /// Pushes a block, waiting for room. Returns `false` if a command
    /// arrived first (the rest of the block is dropped).
    fn push_all(&mut self, samples: &[f32]) -> bool {
        let mut pushed = 0;
        while pushed < samples.len() {
            if !self.is_decoding.load(Ordering::Relaxed)
                || self.seek_requested.load(Ordering::Relaxed)
            {
                return false;
            }
            pushed += self.producer.push_slice(&samples[pushed..]);
            if pushed < samples.len() {
                thread::sleep(Duration::from_millis(5));
            }
        }
        true
    }
}

/// Maps interleaved frames from `from` to `to` channels: mono is
/// duplicated, a downmix to mono averages, otherwise channels are taken in
/// order and missing ones are silent.
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
        }
    }
    out
}
