//! Coefficient factory: settings snapshot in, filter coefficients out.
//!
//! Everything here is a pure function of its arguments. Frequencies must lie
//! strictly inside `(0, sample_rate / 2)`; callers keep them there with
//! [`clamp_to_nyquist`].

use std::f64::consts::PI;

use crate::engine::dsp::biquad::BiquadCoefficients;
use crate::engine::params::{ChainSettings, Slope};

/// Sections available in each cut stage.
pub const MAX_CUT_SECTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    /// High-pass response, removes content below the cutoff.
    LowCut,
    /// Low-pass response, removes content above the cutoff.
    HighCut,
}

/// Sections of one Butterworth decomposition. Only the first `len` entries
/// are meaningful; the rest are pass-through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutCoefficients {
    sections: [BiquadCoefficients; MAX_CUT_SECTIONS],
    len: usize,
}

impl CutCoefficients {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn sections(&self) -> &[BiquadCoefficients] {
        &self.sections[..self.len]
    }

    pub fn get(&self, index: usize) -> Option<&BiquadCoefficients> {
        self.sections().get(index)
    }
}

/// Keeps a design frequency inside the open interval `(0, nyquist)`.
pub fn clamp_to_nyquist(frequency: f32, sample_rate: f64) -> f64 {
    let nyquist = sample_rate / 2.0;
    (frequency as f64).clamp(1.0e-3, nyquist * 0.999)
}

pub fn peak_coefficients(
    frequency: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
) -> BiquadCoefficients {
    debug_assert!(frequency > 0.0 && frequency < sample_rate / 2.0);
    debug_assert!(q > 0.0);
    BiquadCoefficients::peak(sample_rate, frequency, q, gain_db)
}

/// Butterworth cut of order `2 * slope.stages()`, split into second-order
/// sections. Section `i` of `k` uses `Q = 1 / (2 cos((2i + 1) pi / 4k))`.
pub fn cut_coefficients(
    kind: CutKind,
    frequency: f64,
    sample_rate: f64,
    slope: Slope,
) -> CutCoefficients {
    debug_assert!(frequency > 0.0 && frequency < sample_rate / 2.0);

    let order = slope.order() as f64;
    let len = slope.stages();
    let mut sections = [BiquadCoefficients::IDENTITY; MAX_CUT_SECTIONS];

    for (i, section) in sections.iter_mut().take(len).enumerate() {
        let q = 1.0 / (2.0 * ((2.0 * i as f64 + 1.0) * PI / (order * 2.0)).cos());
        *section = match kind {
            CutKind::LowCut => BiquadCoefficients::high_pass(sample_rate, frequency, q),
            CutKind::HighCut => BiquadCoefficients::low_pass(sample_rate, frequency, q),
        };
    }

    CutCoefficients { sections, len }
}

pub fn make_peak_filter(settings: &ChainSettings, sample_rate: f64) -> BiquadCoefficients {
    peak_coefficients(
        clamp_to_nyquist(settings.peak_freq, sample_rate),
        settings.peak_gain_db as f64,
        settings.peak_quality.max(1.0e-3) as f64,
        sample_rate,
    )
}

pub fn make_low_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    cut_coefficients(
        CutKind::LowCut,
        clamp_to_nyquist(settings.low_cut_freq, sample_rate),
        sample_rate,
        settings.low_cut_slope,
    )
}

pub fn make_high_cut_filter(settings: &ChainSettings, sample_rate: f64) -> CutCoefficients {
    cut_coefficients(
        CutKind::HighCut,
        clamp_to_nyquist(settings.high_cut_freq, sample_rate),
        sample_rate,
        settings.high_cut_slope,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dsp::biquad::gain_to_decibels;

    const SR: f64 = 48000.0;

    fn cascade_db(coeffs: &CutCoefficients, freq: f64) -> f64 {
        let mag: f64 = coeffs
            .sections()
            .iter()
            .map(|c| c.magnitude_for_frequency(freq, SR))
            .product();
        gain_to_decibels(mag, -300.0)
    }

    #[test]
    fn section_count_follows_slope() {
        for slope in Slope::CHOICES {
            let c = cut_coefficients(CutKind::LowCut, 200.0, SR, slope);
            assert_eq!(c.len(), slope.stages());
            assert!(c.get(slope.stages()).is_none());
        }
    }

    #[test]
    fn cascade_is_three_db_down_at_cutoff() {
        for slope in Slope::CHOICES {
            for kind in [CutKind::LowCut, CutKind::HighCut] {
                let c = cut_coefficients(kind, 1000.0, SR, slope);
                let db = cascade_db(&c, 1000.0);
                assert!((db + 3.01).abs() < 0.1, "{kind:?} {slope:?}: {db}");
            }
        }
    }

    #[test]
    fn steeper_slope_attenuates_more() {
        let mut previous = 0.0;
        for slope in Slope::CHOICES {
            let c = cut_coefficients(CutKind::LowCut, 1000.0, SR, slope);
            let db = cascade_db(&c, 250.0);
            assert!(db < previous, "{slope:?}: {db} !< {previous}");
            previous = db;
        }
    }

    #[test]
    fn high_cut_passes_low_frequencies() {
        let c = cut_coefficients(CutKind::HighCut, 5000.0, SR, Slope::Slope48);
        assert!(cascade_db(&c, 100.0).abs() < 0.01);
    }

    #[test]
    fn factory_is_deterministic() {
        let settings = ChainSettings {
            low_cut_freq: 123.0,
            low_cut_slope: Slope::Slope36,
            peak_gain_db: -7.5,
            ..ChainSettings::default()
        };
        assert_eq!(make_low_cut_filter(&settings, SR), make_low_cut_filter(&settings, SR));
        assert_eq!(make_peak_filter(&settings, SR), make_peak_filter(&settings, SR));
    }

    #[test]
    fn clamp_keeps_below_nyquist() {
        assert!(clamp_to_nyquist(20000.0, 32000.0) < 16000.0);
        assert!(clamp_to_nyquist(0.0, 48000.0) > 0.0);
        assert_eq!(clamp_to_nyquist(1000.0, 48000.0), 1000.0);
    }
}
