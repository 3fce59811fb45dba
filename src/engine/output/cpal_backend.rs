use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, error, info};

use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::error::{EngineError, Result};
use crate::engine::output::{AudioOutput, RenderContext, StreamRenderer};

type SharedRenderer = Arc<Mutex<Option<StreamRenderer>>>;

pub struct CpalBackend {
    stream: Stream,
    device_id: String,
    is_healthy: Arc<AtomicBool>,
    renderer: SharedRenderer,
}

impl CpalBackend {
    /// Opens the default output device and builds a stream that equalizes the
    /// queued samples. On failure the render context is handed back so the
    /// caller can retry later.
    pub fn new(
        context: RenderContext,
        clock: Arc<Clock>,
    ) -> std::result::Result<Self, (RenderContext, EngineError)> {
        let host = cpal::default_host();
        let Some(device) = host.default_output_device() else {
            return Err((context, EngineError::NoOutputDevice));
        };

        let device_id = device_name(&device);
        let supported = match device.default_output_config() {
            Ok(config) => config,
            Err(err) => return Err((context, err.into())),
        };

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let sample_rate: u32 = config.sample_rate;
        let channels = config.channels;

        clock.set_stream_format(sample_rate, channels);

        // Filled once the stream exists; the callback renders silence until then.
        let renderer: SharedRenderer = Arc::new(Mutex::new(None));
        let is_healthy = Arc::new(AtomicBool::new(true));

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, &renderer, &clock, &is_healthy)
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, &renderer, &clock, &is_healthy)
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, &renderer, &clock, &is_healthy)
            }
            other => {
                let err = EngineError::UnsupportedSampleFormat(other.to_string());
                return Err((context, err));
            }
        };
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => return Err((context, err.into())),
        };

        let stream_renderer = StreamRenderer::new(context, sample_rate, channels as usize);
        match renderer.lock() {
            Ok(mut slot) => *slot = Some(stream_renderer),
            Err(poisoned) => *poisoned.into_inner() = Some(stream_renderer),
        }

        info!(
            device = %device_id,
            sample_rate,
            channels,
            format = %sample_format,
            "output stream ready"
        );
        Ok(Self {
            stream,
            device_id,
            is_healthy,
            renderer,
        })
    }
}

impl AudioOutput for CpalBackend {
    fn start(&mut self) -> Result<()> {
        self.stream.play()?;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.stream.pause()?;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Err(err) = self.stream.pause() {
            debug!(%err, "pause on stop failed");
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        if !self.is_healthy.load(Ordering::SeqCst) {
            return false;
        }
        let host = cpal::default_host();
        match host.default_output_device() {
            Some(device) => device_name(&device) == self.device_id,
            None => false,
        }
    }

    fn shutdown(&mut self) -> Option<RenderContext> {
        if let Err(err) = self.stream.pause() {
            debug!(%err, "pause on shutdown failed");
        }
        reclaim(&self.renderer)
    }

    fn tick(&mut self) {}
}

#[allow(deprecated)]
fn device_name(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

fn reclaim(renderer: &SharedRenderer) -> Option<RenderContext> {
    let mut guard = match renderer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.take().map(StreamRenderer::into_context)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    renderer: &SharedRenderer,
    clock: &Arc<Clock>,
    is_healthy: &Arc<AtomicBool>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let renderer = renderer.clone();
    let clock = clock.clone();
    let is_healthy = is_healthy.clone();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Contended only while the control thread is shutting the stream down.
            match renderer.try_lock() {
                Ok(mut guard) => match guard.as_mut() {
                    Some(r) => process_audio(data, r, &clock),
                    None => silence(data),
                },
                Err(TryLockError::WouldBlock) | Err(TryLockError::Poisoned(_)) => silence(data),
            }
        },
        move |err| {
            is_healthy.store(false, Ordering::SeqCst);
            error!(%err, "output stream error");
        },
        None,
    )
}

fn process_audio<T: FromSample<f32>>(data: &mut [T], renderer: &mut StreamRenderer, clock: &Clock) {
    if clock.take_clear_buffer() {
        renderer.discard();
    }

    if clock.get_state() != PlaybackState::Playing {
        silence(data);
        return;
    }

    let read = renderer.render(data);
    clock.increment_samples(read as u64);

    if read == 0 && clock.is_eos() {
        clock.set_state(PlaybackState::Stopped);
    }
}

fn silence<T: FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample_(0.0);
    }
}
