//! Installs freshly designed coefficients into a live [`MonoChain`].
//!
//! The chain is owned by whichever thread calls these functions, so an
//! update and a `process` call can never interleave; each section still
//! receives its coefficients and its bypass state as whole values.

use crate::engine::dsp::chain::{ChainPosition, CutStage, MonoChain};
use crate::engine::dsp::coefficients::{
    make_high_cut_filter, make_low_cut_filter, make_peak_filter, CutCoefficients, MAX_CUT_SECTIONS,
};
use crate::engine::params::{ChainSettings, Slope};

/// Enables sections `0..slope.stages()` with the given coefficients and
/// bypasses the rest. The new mask replaces the old one in one assignment.
pub fn update_cut_filter(stage: &mut CutStage, coefficients: &CutCoefficients, slope: Slope) {
    let mut mask = [true; MAX_CUT_SECTIONS];
    for (index, section) in coefficients.sections().iter().take(slope.stages()).enumerate() {
        stage.set_coefficients(index, *section);
        mask[index] = false;
    }
    stage.set_bypass_mask(mask);
}

pub fn update_peak_filter(chain: &mut MonoChain, settings: &ChainSettings, sample_rate: f64) {
    chain.set_peak_coefficients(make_peak_filter(settings, sample_rate));
    chain.set_bypassed(ChainPosition::Peak, settings.peak_bypassed);
}

/// Recomputes all three stages from one snapshot.
pub fn update_filters(chain: &mut MonoChain, settings: &ChainSettings, sample_rate: f64) {
    update_peak_filter(chain, settings, sample_rate);

    let low_cut = make_low_cut_filter(settings, sample_rate);
    let high_cut = make_high_cut_filter(settings, sample_rate);

    chain.set_bypassed(ChainPosition::LowCut, settings.low_cut_bypassed);
    if let Some(stage) = chain.cut_stage_mut(ChainPosition::LowCut) {
        update_cut_filter(stage, &low_cut, settings.low_cut_slope);
    }

    chain.set_bypassed(ChainPosition::HighCut, settings.high_cut_bypassed);
    if let Some(stage) = chain.cut_stage_mut(ChainPosition::HighCut) {
        update_cut_filter(stage, &high_cut, settings.high_cut_slope);
    }
}
