//! Per-channel filter cascade: low-cut, peak, high-cut.

use crate::engine::dsp::biquad::{gain_to_decibels, BiquadCoefficients, BiquadFilter};
use crate::engine::dsp::coefficients::MAX_CUT_SECTIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

/// Four second-order sections, each with its own bypass flag.
#[derive(Debug, Clone, Copy)]
pub struct CutStage {
    filters: [BiquadFilter; MAX_CUT_SECTIONS],
    bypassed: [bool; MAX_CUT_SECTIONS],
}

impl Default for CutStage {
    fn default() -> Self {
        Self {
            filters: [BiquadFilter::default(); MAX_CUT_SECTIONS],
            bypassed: [true; MAX_CUT_SECTIONS],
        }
    }
}

impl CutStage {
    pub fn is_bypassed(&self, index: usize) -> bool {
        self.bypassed[index]
    }

    pub fn bypass_mask(&self) -> [bool; MAX_CUT_SECTIONS] {
        self.bypassed
    }

    pub fn enabled_sections(&self) -> usize {
        self.bypassed.iter().filter(|b| !**b).count()
    }

    pub fn coefficients(&self, index: usize) -> &BiquadCoefficients {
        self.filters[index].coefficients()
    }

    pub(crate) fn set_coefficients(&mut self, index: usize, coefficients: BiquadCoefficients) {
        self.filters[index].set_coefficients(coefficients);
    }

    /// Publishes a whole bypass mask in one assignment.
    pub(crate) fn set_bypass_mask(&mut self, mask: [bool; MAX_CUT_SECTIONS]) {
        self.bypassed = mask;
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for (filter, bypassed) in self.filters.iter_mut().zip(self.bypassed) {
            if !bypassed {
                filter.process_block(samples);
            }
        }
    }

    #[inline]
    pub fn process_sample(&mut self, mut x: f32) -> f32 {
        for (filter, bypassed) in self.filters.iter_mut().zip(self.bypassed) {
            if !bypassed {
                x = filter.process(x);
            }
        }
        x
    }

    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.filters
            .iter()
            .zip(self.bypassed)
            .filter(|(_, bypassed)| !bypassed)
            .map(|(f, _)| f.coefficients().magnitude_for_frequency(frequency, sample_rate))
            .product()
    }

    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(BiquadFilter::reset);
    }
}

/// One channel's equalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoChain {
    low_cut: CutStage,
    peak: BiquadFilter,
    high_cut: CutStage,
    bypassed: [bool; 3],
}

impl MonoChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(position: ChainPosition) -> usize {
        match position {
            ChainPosition::LowCut => 0,
            ChainPosition::Peak => 1,
            ChainPosition::HighCut => 2,
        }
    }

    pub fn is_bypassed(&self, position: ChainPosition) -> bool {
        self.bypassed[Self::slot(position)]
    }

    pub fn set_bypassed(&mut self, position: ChainPosition, bypassed: bool) {
        self.bypassed[Self::slot(position)] = bypassed;
    }

    pub fn low_cut(&self) -> &CutStage {
        &self.low_cut
    }

    pub fn high_cut(&self) -> &CutStage {
        &self.high_cut
    }

    pub fn peak(&self) -> &BiquadCoefficients {
        self.peak.coefficients()
    }

    pub(crate) fn cut_stage_mut(&mut self, position: ChainPosition) -> Option<&mut CutStage> {
        match position {
            ChainPosition::LowCut => Some(&mut self.low_cut),
            ChainPosition::HighCut => Some(&mut self.high_cut),
            ChainPosition::Peak => None,
        }
    }

    pub(crate) fn set_peak_coefficients(&mut self, coefficients: BiquadCoefficients) {
        self.peak.set_coefficients(coefficients);
    }

    /// Filters a planar block in place. Bounded work, no allocation.
    pub fn process(&mut self, samples: &mut [f32]) {
        if !self.is_bypassed(ChainPosition::LowCut) {
            self.low_cut.process(samples);
        }
        if !self.is_bypassed(ChainPosition::Peak) {
            self.peak.process_block(samples);
        }
        if !self.is_bypassed(ChainPosition::HighCut) {
            self.high_cut.process(samples);
        }
    }

    #[inline]
    pub fn process_sample(&mut self, mut x: f32) -> f32 {
        if !self.bypassed[0] {
            x = self.low_cut.process_sample(x);
        }
        if !self.bypassed[1] {
            x = self.peak.process(x);
        }
        if !self.bypassed[2] {
            x = self.high_cut.process_sample(x);
        }
        x
    }

    /// Linear gain of every enabled section multiplied together.
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        let mut mag = 1.0;
        if !self.is_bypassed(ChainPosition::Peak) {
            mag *= self.peak.coefficients().magnitude_for_frequency(frequency, sample_rate);
        }
        if !self.is_bypassed(ChainPosition::LowCut) {
            mag *= self.low_cut.magnitude_for_frequency(frequency, sample_rate);
        }
        if !self.is_bypassed(ChainPosition::HighCut) {
            mag *= self.high_cut.magnitude_for_frequency(frequency, sample_rate);
        }
        mag
    }

    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        gain_to_decibels(self.magnitude_for_frequency(frequency, sample_rate), -300.0)
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_chain_is_transparent() {
        let mut chain = MonoChain::new();
        let mut block = [0.1, -0.5, 0.9, 0.0];
        let original = block;
        chain.process(&mut block);
        assert_eq!(block, original);
        assert_eq!(chain.low_cut().enabled_sections(), 0);
        assert!((chain.magnitude_for_frequency(440.0, 48000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn block_and_sample_paths_agree() {
        let mut a = MonoChain::new();
        a.set_peak_coefficients(BiquadCoefficients::peak(48000.0, 1000.0, 2.0, 9.0));
        let mut b = a;

        let input: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin()).collect();
        let mut block = input.clone();
        a.process(&mut block);
        let per_sample: Vec<f32> = input.iter().map(|x| b.process_sample(*x)).collect();
        assert_eq!(block, per_sample);
    }

    #[test]
    fn bypassed_peak_contributes_unity() {
        let mut chain = MonoChain::new();
        chain.set_peak_coefficients(BiquadCoefficients::peak(48000.0, 1000.0, 1.0, 12.0));
        assert!(chain.magnitude_db(1000.0, 48000.0) > 11.0);
        chain.set_bypassed(ChainPosition::Peak, true);
        assert!(chain.magnitude_db(1000.0, 48000.0).abs() < 1e-9);
    }
}
