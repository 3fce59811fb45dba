use crate::engine::analysis::path::{jmap, map_to_log10, Point, Rect, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::engine::dsp::chain::MonoChain;
use crate::engine::dsp::updater::update_filters;
use crate::engine::params::ChainSettings;

/// Bottom of the response curve's gain axis.
pub const RESPONSE_MIN_DB: f64 = -24.0;
/// Top of the response curve's gain axis.
pub const RESPONSE_MAX_DB: f64 = 24.0;

/// The static frequency-response curve drawn under the spectrum.
///
/// Holds its own [`MonoChain`] value, separate from the audio thread's
/// chains, so response queries never touch live filter state.
pub struct ResponseCurve {
    chain: MonoChain,
    sample_rate: f64,
    path: Vec<Point>,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCurve {
    pub fn new() -> Self {
        Self {
            chain: MonoChain::new(),
            sample_rate: 0.0,
            path: Vec::new(),
        }
    }

    pub fn chain(&self) -> &MonoChain {
        &self.chain
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn update_chain(&mut self, settings: &ChainSettings, sample_rate: f64) {
        update_filters(&mut self.chain, settings, sample_rate);
        self.sample_rate = sample_rate;
    }

    /// Response in dB at every pixel column of `bounds`.
    pub fn magnitudes_db(&self, bounds: Rect) -> Vec<f64> {
        let columns = bounds.columns();
        (0..columns)
            .map(|i| {
                let freq = map_to_log10(i as f64 / columns as f64, MIN_FREQUENCY, MAX_FREQUENCY);
                self.chain.magnitude_db(freq, self.sample_rate)
            })
            .collect()
    }

    /// Rebuilds the curve for `bounds`, gain clamped to +-24 dB.
    pub fn rebuild_path(&mut self, bounds: Rect) {
        let mags = self.magnitudes_db(bounds);
        let bottom = bounds.bottom() as f64;
        let top = bounds.y as f64;

        self.path.clear();
        self.path.extend(mags.iter().enumerate().map(|(i, db)| {
            let db = db.clamp(RESPONSE_MIN_DB, RESPONSE_MAX_DB);
            Point {
                x: bounds.x + i as f32,
                y: jmap(db, RESPONSE_MIN_DB, RESPONSE_MAX_DB, bottom, top) as f32,
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_settings_draw_a_centred_line() {
        let settings = ChainSettings {
            low_cut_bypassed: true,
            high_cut_bypassed: true,
            ..ChainSettings::default()
        };
        let mut curve = ResponseCurve::new();
        curve.update_chain(&settings, 48000.0);
        let bounds = Rect::new(0.0, 0.0, 200.0, 100.0);
        curve.rebuild_path(bounds);

        assert_eq!(curve.path().len(), 200);
        assert!(curve.path().iter().all(|p| (p.y - 50.0).abs() < 1e-3));
    }

    #[test]
    fn deep_cut_is_clamped_to_bottom() {
        let settings = ChainSettings {
            low_cut_freq: 2000.0,
            low_cut_slope: crate::engine::params::Slope::Slope48,
            ..ChainSettings::default()
        };
        let mut curve = ResponseCurve::new();
        curve.update_chain(&settings, 48000.0);
        let bounds = Rect::new(5.0, 10.0, 100.0, 80.0);
        curve.rebuild_path(bounds);
        assert_eq!(curve.path()[0].y, 90.0);
        assert_eq!(curve.path()[0].x, 5.0);
    }
}
