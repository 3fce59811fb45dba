use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl From<u8> for PlaybackState {
    fn from(value: u8) -> Self {
        match value {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

/// Shared playback state between the control, decode, audio and display
/// threads. Every field is an atomic so the stream callback can read and
/// update it without locking.
///
/// The sample rate and channel count describe the *output stream*; they are
/// written when a stream is (re)built and read by the decoder (to resample)
/// and the display (to map FFT bins).
pub struct Clock {
    /// Interleaved samples played since the last seek.
    sample_pos: AtomicU64,
    sample_rate: AtomicU32,
    channels: AtomicU8,
    state: AtomicU8,
    /// Decoder has delivered its last sample.
    end_of_stream: AtomicBool,
    /// Audio callback should discard queued samples.
    clear_buffer: AtomicBool,
    /// Display should forget its rolling spectrum window.
    reset_spectrum: AtomicBool,
}

impl Clock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_pos: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate),
            channels: AtomicU8::new(2),
            state: AtomicU8::new(PlaybackState::Stopped as u8),
            end_of_stream: AtomicBool::new(false),
            clear_buffer: AtomicBool::new(false),
            reset_spectrum: AtomicBool::new(false),
        }
    }

    pub fn get_sample_pos(&self) -> u64 {
        self.sample_pos.load(Ordering::Relaxed)
    }

    pub fn set_sample_pos(&self, pos: u64) {
        self.sample_pos.store(pos, Ordering::SeqCst);
    }

    /// Advances the position; only counts while playing.
    pub fn increment_samples(&self, amount: u64) {
        if self.get_state() == PlaybackState::Playing {
            self.sample_pos.fetch_add(amount, Ordering::Relaxed);
        }
    }

    pub fn get_time_secs(&self) -> f64 {
        let pos = self.get_sample_pos() as f64;
        let rate = self.get_sample_rate() as f64;
        let channels = self.get_channels() as f64;
        if rate > 0.0 && channels > 0.0 {
            pos / (rate * channels)
        } else {
            0.0
        }
    }

    pub fn get_state(&self) -> PlaybackState {
        PlaybackState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn set_stream_format(&self, sample_rate: u32, channels: u16) {
        self.sample_rate.store(sample_rate, Ordering::SeqCst);
        self.channels.store(channels.min(u8::MAX as u16) as u8, Ordering::SeqCst);
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn get_channels(&self) -> u32 {
        self.channels.load(Ordering::Relaxed) as u32
    }

    pub fn set_eos(&self, eos: bool) {
        self.end_of_stream.store(eos, Ordering::SeqCst);
    }

    pub fn is_eos(&self) -> bool {
        self.end_of_stream.load(Ordering::Relaxed)
    }

    /// Asks the audio callback to drop queued samples and the display to
    /// restart its spectrum window (used on seek).
    pub fn signal_discontinuity(&self) {
        self.clear_buffer.store(true, Ordering::SeqCst);
        self.reset_spectrum.store(true, Ordering::SeqCst);
    }

    /// Test-and-clear of the buffer clear request.
    pub fn take_clear_buffer(&self) -> bool {
        self.clear_buffer.swap(false, Ordering::AcqRel)
    }

    /// Test-and-clear of the spectrum reset request.
    pub fn take_spectrum_reset(&self) -> bool {
        self.reset_spectrum.swap(false, Ordering::AcqRel)
    }
}
