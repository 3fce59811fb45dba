use std::io::Write;

use simple_eq::{AppConfig, EngineError, ParamId, ParameterStore, Slope};

#[test]
fn loads_partial_config_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "refresh_hz": 30,
            "fft_order": 12,
            "show_spectrum": false,
            "parameters": {{
                "Peak Freq": 1000,
                "Peak Gain": 6,
                "HighCut Slope": 2,
                "LowCut Bypassed": 1
            }}
        }}"#
    )
    .unwrap();

    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(config.refresh_hz, 30.0);
    assert_eq!(config.analyzer_settings().fft_order, 12);
    assert!(!config.show_spectrum);
    assert_eq!(config.spectrum_block_size, 512);
    assert_eq!(config.noise_floor_db, -48.0);

    let params = ParameterStore::default();
    config.apply_parameters(&params).unwrap();
    let settings = params.snapshot();
    assert_eq!(settings.peak_freq, 1000.0);
    assert_eq!(settings.peak_gain_db, 6.0);
    assert_eq!(settings.high_cut_slope, Slope::Slope36);
    assert!(settings.low_cut_bypassed);
    assert!(!settings.high_cut_bypassed);
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eq.json");

    let mut config = AppConfig::default();
    config.hop_size = 256;
    config.parameters.insert(ParamId::PeakQuality.name().to_string(), 4.0);
    config.save(&path).unwrap();

    assert_eq!(AppConfig::load(&path).unwrap(), config);
}

#[test]
fn malformed_config_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"refresh_hz\": ").unwrap();
    assert!(matches!(AppConfig::load(file.path()), Err(EngineError::Config(_))));
}

#[test]
fn missing_config_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(matches!(AppConfig::load(missing), Err(EngineError::Io(_))));
}

#[test]
fn out_of_range_values_are_constrained() {
    let params = ParameterStore::default();
    params.apply_assignment("Peak Gain=40").unwrap();
    params.apply_assignment("lowcut slope = 7").unwrap();
    params.apply_assignment("Peak Bypassed=on").unwrap();

    assert_eq!(params.value(ParamId::PeakGain), 24.0);
    assert_eq!(params.snapshot().low_cut_slope, Slope::Slope48);
    assert!(params.is_on(ParamId::PeakBypassed));
    assert!(matches!(
        params.apply_assignment("Peak Gain"),
        Err(EngineError::InvalidAssignment(_))
    ));
}
