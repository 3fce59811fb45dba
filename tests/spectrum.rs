use std::f32::consts::TAU;
use std::sync::Arc;

use simple_eq::engine::analysis::fft::FftDataGenerator;
use simple_eq::engine::analysis::path::{Point, Rect};
use simple_eq::engine::analysis::{spectrum_fifo, AnalyzerSettings, ChannelAnalyzer};
use simple_eq::engine::display::Display;
use simple_eq::{ParamId, ParameterStore};

const SAMPLE_RATE: f64 = 48000.0;

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| (TAU * freq * n as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn loudest_column(path: &[Point]) -> usize {
    path.iter()
        .enumerate()
        .min_by(|a, b| a.1.y.total_cmp(&b.1.y))
        .map(|(i, _)| i)
        .unwrap()
}

#[test]
fn sine_peaks_in_nearest_bin() {
    let mut generator = FftDataGenerator::new(11, 4);
    generator.produce_fft_data(&sine(1000.0, 2048), -48.0);

    let magnitudes = generator.pop().unwrap();
    assert_eq!(magnitudes.len(), 1024);
    let peak = magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    // 1000 / (48000 / 2048) = 42.67
    assert_eq!(peak, 43);
    assert!(magnitudes[peak] > -3.0);
    assert!(magnitudes[500] <= -47.0);
}

#[test]
fn sine_path_peaks_at_its_log_position() {
    let (mut tap, receiver) = spectrum_fifo(512, 30);
    let settings = AnalyzerSettings {
        smoothing: 0.0,
        ..AnalyzerSettings::default()
    };
    let mut analyzer = ChannelAnalyzer::new("left", receiver, settings);
    let bounds = Rect::new(0.0, 0.0, 1000.0, 200.0);

    tap.push(&sine(1000.0, 4096));
    assert!(analyzer.process(bounds, SAMPLE_RATE));

    let path = analyzer.path();
    assert_eq!(path.len(), 1000);
    let expected = (1000f64 / 20.0).log10() / 1000f64.log10() * 1000.0;
    let column = loudest_column(path) as f64;
    assert!((column - expected).abs() <= 3.0, "peak at column {column}, expected {expected:.1}");
}

#[test]
fn empty_drain_keeps_previous_path() {
    let (mut tap, receiver) = spectrum_fifo(512, 30);
    let mut analyzer = ChannelAnalyzer::new("right", receiver, AnalyzerSettings::default());
    let bounds = Rect::new(0.0, 0.0, 400.0, 100.0);

    tap.push(&sine(440.0, 2048));
    assert!(analyzer.process(bounds, SAMPLE_RATE));
    let before = analyzer.path().to_vec();

    for _ in 0..5 {
        assert!(!analyzer.process(bounds, SAMPLE_RATE));
    }
    assert_eq!(analyzer.path(), before.as_slice());
}

#[test]
fn display_rebuilds_response_once_per_burst() {
    let params = Arc::new(ParameterStore::default());
    let (_tap, receiver) = spectrum_fifo(512, 30);
    let analyzer = ChannelAnalyzer::new("left", receiver, AnalyzerSettings::default());
    let bounds = Rect::new(0.0, 0.0, 600.0, 200.0);
    let mut display = Display::new(bounds, params.clone(), vec![analyzer], true);

    assert!(display.tick(SAMPLE_RATE));
    assert!(!display.tick(SAMPLE_RATE));
    let flat = display.frame();
    assert_eq!(flat.response_path.len(), display.analysis_area().columns());

    for gain in [3.0, 6.0, 9.0, 12.0] {
        params.set(ParamId::PeakGain, gain);
    }
    assert!(display.tick(SAMPLE_RATE));
    assert!(!display.tick(SAMPLE_RATE));

    let boosted = display.frame();
    assert_eq!(boosted.sequence, flat.sequence + 1);
    let top = boosted
        .response_path
        .iter()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min);
    let flat_top = flat.response_path.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    assert!(top < flat_top);
}

#[test]
fn sample_rate_change_rebuilds_response() {
    let params = Arc::new(ParameterStore::default());
    let mut display = Display::new(Rect::new(0.0, 0.0, 600.0, 200.0), params, Vec::new(), false);

    assert!(display.tick(44100.0));
    assert!(!display.tick(44100.0));
    assert!(display.tick(SAMPLE_RATE));
    assert_eq!(display.response().sample_rate(), SAMPLE_RATE);
}
