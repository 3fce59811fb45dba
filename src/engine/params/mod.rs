//! Equalizer parameters and the settings snapshot the filters are built from.
//!
//! The store is the stand-in for a host's parameter tree: every value lives
//! in an atomic so the audio callback can read a consistent-enough snapshot
//! without locking, and every write raises the shared [`ChangeNotifier`].

pub mod notifier;

use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::error::{EngineError, Result};
pub use notifier::{ChangeListener, ChangeNotifier};

/// Cut filter steepness. Each step enables one more second-order section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Slope {
    #[default]
    Slope12 = 0,
    Slope24 = 1,
    Slope36 = 2,
    Slope48 = 3,
}

impl From<usize> for Slope {
    fn from(value: usize) -> Self {
        match value {
            0 => Slope::Slope12,
            1 => Slope::Slope24,
            2 => Slope::Slope36,
            _ => Slope::Slope48,
        }
    }
}

impl Slope {
    pub const CHOICES: [Slope; 4] =
        [Slope::Slope12, Slope::Slope24, Slope::Slope36, Slope::Slope48];

    /// Number of enabled sections in a cut stage (1..=4).
    pub fn stages(self) -> usize {
        self as usize + 1
    }

    /// Butterworth order realized by the enabled sections.
    pub fn order(self) -> usize {
        self.stages() * 2
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.stages() as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            Slope::Slope12 => "12 dB/oct",
            Slope::Slope24 => "24 dB/oct",
            Slope::Slope36 => "36 dB/oct",
            Slope::Slope48 => "48 dB/oct",
        }
    }
}

/// Immutable read of every equalizer parameter at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_freq: 20.0,
            high_cut_freq: 20000.0,
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_quality: 1.0,
            low_cut_slope: Slope::Slope12,
            high_cut_slope: Slope::Slope12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Continuous,
    Choice,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub kind: ParamKind,
}

impl ParamRange {
    const fn continuous(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            kind: ParamKind::Continuous,
        }
    }

    /// Snaps a raw value onto the legal values of this parameter.
    pub fn constrain(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value };
        match self.kind {
            ParamKind::Continuous => value.clamp(self.min, self.max),
            ParamKind::Choice => value.round().clamp(self.min, self.max),
            ParamKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
    LowCutBypassed,
    PeakBypassed,
    HighCutBypassed,
}

pub const PARAM_COUNT: usize = 10;

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::LowCutFreq,
        ParamId::HighCutFreq,
        ParamId::PeakFreq,
        ParamId::PeakGain,
        ParamId::PeakQuality,
        ParamId::LowCutSlope,
        ParamId::HighCutSlope,
        ParamId::LowCutBypassed,
        ParamId::PeakBypassed,
        ParamId::HighCutBypassed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "LowCut Freq",
            ParamId::HighCutFreq => "HighCut Freq",
            ParamId::PeakFreq => "Peak Freq",
            ParamId::PeakGain => "Peak Gain",
            ParamId::PeakQuality => "Peak Quality",
            ParamId::LowCutSlope => "LowCut Slope",
            ParamId::HighCutSlope => "HighCut Slope",
            ParamId::LowCutBypassed => "LowCut Bypassed",
            ParamId::PeakBypassed => "Peak Bypassed",
            ParamId::HighCutBypassed => "HighCut Bypassed",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }

    pub fn range(self) -> ParamRange {
        match self {
            ParamId::LowCutFreq => ParamRange::continuous(20.0, 20000.0, 20.0),
            ParamId::HighCutFreq => ParamRange::continuous(20.0, 20000.0, 20000.0),
            ParamId::PeakFreq => ParamRange::continuous(20.0, 20000.0, 750.0),
            ParamId::PeakGain => ParamRange::continuous(-24.0, 24.0, 0.0),
            ParamId::PeakQuality => ParamRange::continuous(0.1, 10.0, 1.0),
            ParamId::LowCutSlope | ParamId::HighCutSlope => ParamRange {
                min: 0.0,
                max: (Slope::CHOICES.len() - 1) as f32,
                default: 0.0,
                kind: ParamKind::Choice,
            },
            ParamId::LowCutBypassed | ParamId::PeakBypassed | ParamId::HighCutBypassed => {
                ParamRange {
                    min: 0.0,
                    max: 1.0,
                    default: 0.0,
                    kind: ParamKind::Toggle,
                }
            }
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Lock-free parameter storage with change notification.
pub struct ParameterStore {
    values: [AtomicU32; PARAM_COUNT],
    notifier: ChangeNotifier,
}

impl ParameterStore {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self {
            values: std::array::from_fn(|i| {
                AtomicU32::new(ParamId::ALL[i].range().default.to_bits())
            }),
            notifier,
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn value(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    pub fn choice_index(&self, id: ParamId) -> usize {
        self.value(id).round().max(0.0) as usize
    }

    pub fn is_on(&self, id: ParamId) -> bool {
        self.value(id) >= 0.5
    }

    /// Stores a constrained value and signals the change. The payload is not
    /// forwarded; consumers re-read a full [`snapshot`](Self::snapshot).
    pub fn set(&self, id: ParamId, value: f32) {
        let value = id.range().constrain(value);
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
        self.notifier.notify();
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> Result<ParamId> {
        let id = ParamId::from_name(name)
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))?;
        self.set(id, value);
        Ok(id)
    }

    /// Applies a `"<name>=<value>"` assignment. Toggles also accept
    /// `on`/`off`/`true`/`false`.
    pub fn apply_assignment(&self, assignment: &str) -> Result<ParamId> {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| EngineError::InvalidAssignment(assignment.to_string()))?;
        let value = match raw.trim().to_ascii_lowercase().as_str() {
            "on" | "true" => 1.0,
            "off" | "false" => 0.0,
            other => other
                .parse::<f32>()
                .map_err(|_| EngineError::InvalidAssignment(assignment.to_string()))?,
        };
        self.set_by_name(name, value)
    }

    pub fn snapshot(&self) -> ChainSettings {
        ChainSettings {
            low_cut_freq: self.value(ParamId::LowCutFreq),
            high_cut_freq: self.value(ParamId::HighCutFreq),
            peak_freq: self.value(ParamId::PeakFreq),
            peak_gain_db: self.value(ParamId::PeakGain),
            peak_quality: self.value(ParamId::PeakQuality),
            low_cut_slope: Slope::from(self.choice_index(ParamId::LowCutSlope)),
            high_cut_slope: Slope::from(self.choice_index(ParamId::HighCutSlope)),
            low_cut_bypassed: self.is_on(ParamId::LowCutBypassed),
            peak_bypassed: self.is_on(ParamId::PeakBypassed),
            high_cut_bypassed: self.is_on(ParamId::HighCutBypassed),
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(ChangeNotifier::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_defaults() {
        let store = ParameterStore::default();
        assert_eq!(store.snapshot(), ChainSettings::default());
    }

    #[test]
    fn set_clamps_and_notifies() {
        let store = ParameterStore::default();
        let listener = store.notifier().subscribe();
        listener.consume();

        store.set(ParamId::PeakGain, 60.0);
        assert_eq!(store.value(ParamId::PeakGain), 24.0);
        assert!(listener.consume());

        store.set(ParamId::LowCutSlope, 2.6);
        assert_eq!(store.snapshot().low_cut_slope, Slope::Slope48);
    }

    #[test]
    fn assignments_parse_names_and_toggles() {
        let store = ParameterStore::default();
        assert_eq!(store.apply_assignment("peak gain = 6").unwrap(), ParamId::PeakGain);
        assert_eq!(store.value(ParamId::PeakGain), 6.0);

        store.apply_assignment("LowCut Bypassed=on").unwrap();
        assert!(store.snapshot().low_cut_bypassed);

        assert!(matches!(
            store.apply_assignment("Nope=1"),
            Err(EngineError::UnknownParameter(_))
        ));
        assert!(matches!(
            store.apply_assignment("Peak Gain"),
            Err(EngineError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn slope_stage_counts() {
        let stages: Vec<usize> = Slope::CHOICES.iter().map(|s| s.stages()).collect();
        assert_eq!(stages, vec![1, 2, 3, 4]);
        assert_eq!(Slope::Slope48.db_per_octave(), 48);
        assert_eq!(Slope::from(9), Slope::Slope48);
    }

    #[test]
    fn slope_labels_follow_the_choice() {
        let store = ParameterStore::default();
        assert_eq!(store.snapshot().low_cut_slope.label(), "12 dB/oct");
        store.apply_assignment("HighCut Slope=3").unwrap();
        assert_eq!(store.snapshot().high_cut_slope.label(), "48 dB/oct");
    }
}
