use std::sync::Arc;

use crate::engine::dsp::chain::MonoChain;
use crate::engine::dsp::updater::update_filters;
use crate::engine::params::{ChangeListener, ParameterStore};

/// The audio thread's equalizer: one [`MonoChain`] per output channel.
///
/// Owned exclusively by the stream callback. Parameter changes reach it only
/// through its [`ChangeListener`]; when a change is pending, a fresh snapshot
/// is read and every channel is rebuilt from it before the block is filtered.
pub struct DspChain {
    chains: Vec<MonoChain>,
    channels: usize,
    sample_rate: f64,
    params: Arc<ParameterStore>,
    listener: ChangeListener,
}

impl DspChain {
    pub fn new(sample_rate: f64, channels: usize, params: Arc<ParameterStore>) -> Self {
        let channels = channels.max(1);
        let listener = params.notifier().subscribe();
        let mut chain = Self {
            chains: vec![MonoChain::new(); channels],
            channels,
            sample_rate,
            params,
            listener,
        };
        chain.refresh();
        chain
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn chain(&self, channel: usize) -> Option<&MonoChain> {
        self.chains.get(channel)
    }

    /// Rebuilds coefficients if the parameters changed since the last call.
    /// Returns whether a recompute happened.
    pub fn refresh(&mut self) -> bool {
        if !self.listener.consume() {
            return false;
        }
        let settings = self.params.snapshot();
        for chain in self.chains.iter_mut() {
            update_filters(chain, &settings, self.sample_rate);
        }
        true
    }

    /// Filters an interleaved block in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        self.refresh();

        for frame in samples.chunks_exact_mut(self.channels) {
            for (sample, chain) in frame.iter_mut().zip(self.chains.iter_mut()) {
                *sample = chain.process_sample(*sample);
            }
        }
    }

    pub fn reset(&mut self) {
        self.chains.iter_mut().for_each(MonoChain::reset);
    }
}
