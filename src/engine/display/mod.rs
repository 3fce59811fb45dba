//! What a UI would draw: the response curve, the spectrum overlay and the
//! axis grid, refreshed from a fixed-rate timer.

pub mod grid;
pub mod response;
pub mod timer;

use std::sync::Arc;

use tracing::debug;

use crate::engine::analysis::path::{Point, Rect};
use crate::engine::analysis::ChannelAnalyzer;
use crate::engine::display::grid::{frequency_gridlines, gain_gridlines, FrequencyLine, GainLine};
use crate::engine::display::response::ResponseCurve;
use crate::engine::params::{ChangeListener, ParameterStore};

pub use timer::DisplayTimer;

/// One channel's spectrum overlay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectrumPath {
    pub channel: &'static str,
    pub points: Vec<Point>,
}

/// Everything needed to redraw the analyser view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayFrame {
    pub sequence: u64,
    pub sample_rate: f64,
    pub analysis_area: Rect,
    pub response_path: Vec<Point>,
    pub spectrum_paths: Vec<SpectrumPath>,
    pub frequency_lines: Vec<FrequencyLine>,
    pub gain_lines: Vec<GainLine>,
}

/// The response/spectrum view model. Owned by the display thread.
pub struct Display {
    bounds: Rect,
    params: Arc<ParameterStore>,
    listener: ChangeListener,
    response: ResponseCurve,
    analyzers: Vec<ChannelAnalyzer>,
    show_spectrum: bool,
    sample_rate: f64,
    sequence: u64,
}

impl Display {
    pub fn new(
        bounds: Rect,
        params: Arc<ParameterStore>,
        analyzers: Vec<ChannelAnalyzer>,
        show_spectrum: bool,
    ) -> Self {
        let listener = params.notifier().subscribe();
        Self {
            bounds,
            params,
            listener,
            response: ResponseCurve::new(),
            analyzers,
            show_spectrum,
            sample_rate: 0.0,
            sequence: 0,
        }
    }

    /// Area inside the border, leaving room for axis labels.
    pub fn render_area(&self) -> Rect {
        self.bounds.inset(20.0, 12.0, 20.0, 2.0)
    }

    /// Area the curves are mapped into.
    pub fn analysis_area(&self) -> Rect {
        self.render_area().inset(0.0, 4.0, 0.0, 4.0)
    }

    pub fn response(&self) -> &ResponseCurve {
        &self.response
    }

    pub fn analyzers(&self) -> &[ChannelAnalyzer] {
        &self.analyzers
    }

    /// One timer tick: drain the analysers, then rebuild the response curve
    /// if parameters (or the stream's sample rate) changed. Returns `true`
    /// when anything visible changed.
    pub fn tick(&mut self, sample_rate: f64) -> bool {
        let area = self.analysis_area();
        let mut changed = false;

        if self.show_spectrum && sample_rate > 0.0 {
            for analyzer in self.analyzers.iter_mut() {
                changed |= analyzer.process(area, sample_rate);
            }
        }

        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.listener.mark_pending();
        }

        if self.sample_rate > 0.0 && self.listener.consume() {
            let settings = self.params.snapshot();
            self.response.update_chain(&settings, self.sample_rate);
            self.response.rebuild_path(area);
            debug!(?settings, sample_rate = self.sample_rate, "response curve rebuilt");
            changed = true;
        }

        if changed {
            self.sequence += 1;
        }
        changed
    }

    pub fn frame(&self) -> DisplayFrame {
        let area = self.analysis_area();
        DisplayFrame {
            sequence: self.sequence,
            sample_rate: self.sample_rate,
            analysis_area: area,
            response_path: self.response.path().to_vec(),
            spectrum_paths: self
                .analyzers
                .iter()
                .map(|a| SpectrumPath {
                    channel: a.label(),
                    points: a.path().to_vec(),
                })
                .collect(),
            frequency_lines: frequency_gridlines(area),
            gain_lines: gain_gridlines(area),
        }
    }

    pub fn clear_spectrum(&mut self) {
        self.analyzers.iter_mut().for_each(ChannelAnalyzer::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::analysis::{spectrum_fifo, AnalyzerSettings};
    use crate::engine::params::ParamId;

    fn display(params: Arc<ParameterStore>) -> Display {
        let (_tap, rx) = spectrum_fifo(512, 4);
        let analyzer = ChannelAnalyzer::new("left", rx, AnalyzerSettings::default());
        Display::new(Rect::new(0.0, 0.0, 440.0, 214.0), params, vec![analyzer], true)
    }

    #[test]
    fn analysis_area_insets_bounds() {
        let d = display(Arc::new(ParameterStore::default()));
        assert_eq!(d.analysis_area(), Rect::new(20.0, 16.0, 400.0, 192.0));
    }

    #[test]
    fn waits_for_a_sample_rate() {
        let mut d = display(Arc::new(ParameterStore::default()));
        assert!(!d.tick(0.0));
        assert!(d.response().path().is_empty());
        assert!(d.tick(48000.0));
        assert_eq!(d.response().path().len(), 400);
    }

    #[test]
    fn parameter_burst_rebuilds_once() {
        let params = Arc::new(ParameterStore::default());
        let mut d = display(params.clone());
        d.tick(48000.0);
        assert!(!d.tick(48000.0));

        params.set(ParamId::PeakGain, 3.0);
        params.set(ParamId::PeakGain, 9.0);
        params.set(ParamId::PeakFreq, 1000.0);
        assert!(d.tick(48000.0));
        assert!(!d.tick(48000.0));

        let db = d.response().chain().magnitude_db(1000.0, 48000.0);
        assert!((db - 9.0).abs() < 0.2, "got {db}");
    }

    #[test]
    fn sample_rate_change_forces_rebuild() {
        let mut d = display(Arc::new(ParameterStore::default()));
        d.tick(48000.0);
        assert!(d.tick(44100.0));
        assert_eq!(d.response().sample_rate(), 44100.0);
    }

    #[test]
    fn frame_carries_grid() {
        let mut d = display(Arc::new(ParameterStore::default()));
        d.tick(48000.0);
        let frame = d.frame();
        let area = d.analysis_area();
        assert_eq!(frame.frequency_lines.len(), grid::FREQUENCY_GRIDLINES.len());
        assert_eq!(frame.gain_lines.len(), grid::GAIN_GRIDLINES.len());
        assert!(frame
            .frequency_lines
            .iter()
            .all(|line| line.x >= area.x && line.x <= area.right()));
    }
}
