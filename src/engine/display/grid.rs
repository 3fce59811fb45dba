//! Axis gridlines and their labels.

use crate::engine::analysis::path::{jmap, map_from_log10, Rect, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::engine::display::response::{RESPONSE_MAX_DB, RESPONSE_MIN_DB};

pub const FREQUENCY_GRIDLINES: [f32; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

pub const GAIN_GRIDLINES: [f32; 5] = [-24.0, -12.0, 0.0, 12.0, 24.0];

/// Offset between the response gain scale and the spectrum scale printed on
/// the opposite edge.
pub const SPECTRUM_LABEL_OFFSET_DB: f32 = -24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyLine {
    pub frequency: f32,
    pub x: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainLine {
    pub gain_db: f32,
    pub y: f32,
    pub label: String,
    pub spectrum_label: String,
    /// The 0 dB line is drawn in its own colour.
    pub highlighted: bool,
}

/// "20Hz", "500Hz", "1kHz", "20kHz".
pub fn frequency_label(frequency: f32) -> String {
    if frequency > 999.0 {
        format!("{}kHz", frequency / 1000.0)
    } else {
        format!("{frequency}Hz")
    }
}

/// "+12", "0", "-24".
pub fn gain_label(gain_db: f32) -> String {
    if gain_db > 0.0 {
        format!("+{gain_db}")
    } else {
        format!("{gain_db}")
    }
}

fn log_position(frequency: f32) -> f32 {
    map_from_log10(frequency as f64, MIN_FREQUENCY, MAX_FREQUENCY) as f32
}

pub fn frequency_gridlines(area: Rect) -> Vec<FrequencyLine> {
    FREQUENCY_GRIDLINES
        .iter()
        .map(|&frequency| FrequencyLine {
            frequency,
            x: area.x + area.width * log_position(frequency),
            label: frequency_label(frequency),
        })
        .collect()
}

pub fn gain_gridlines(area: Rect) -> Vec<GainLine> {
    GAIN_GRIDLINES
        .iter()
        .map(|&gain_db| GainLine {
            gain_db,
            y: jmap(
                gain_db as f64,
                RESPONSE_MIN_DB,
                RESPONSE_MAX_DB,
                area.bottom() as f64,
                area.y as f64,
            ) as f32,
            label: gain_label(gain_db),
            spectrum_label: format!("{}", gain_db + SPECTRUM_LABEL_OFFSET_DB),
            highlighted: gain_db == 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(frequency_label(20.0), "20Hz");
        assert_eq!(frequency_label(1000.0), "1kHz");
        assert_eq!(frequency_label(20000.0), "20kHz");
        assert_eq!(gain_label(12.0), "+12");
        assert_eq!(gain_label(0.0), "0");
        assert_eq!(gain_label(-24.0), "-24");
    }

    #[test]
    fn frequency_lines_span_the_area() {
        let area = Rect::new(10.0, 0.0, 300.0, 100.0);
        let lines = frequency_gridlines(area);
        assert_eq!(lines.len(), 10);
        assert!((lines[0].x - 10.0).abs() < 1e-4);
        assert!((lines[9].x - 310.0).abs() < 1e-3);
        assert!(lines.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn only_zero_db_is_highlighted() {
        let area = Rect::new(0.0, 0.0, 100.0, 48.0);
        let lines = gain_gridlines(area);
        let highlighted: Vec<f32> = lines
            .iter()
            .filter(|l| l.highlighted)
            .map(|l| l.gain_db)
            .collect();
        assert_eq!(highlighted, vec![0.0]);
        assert_eq!(lines[2].y, 24.0);
        assert_eq!(lines[0].y, 48.0);
        assert_eq!(lines[4].spectrum_label, "0");
        assert_eq!(lines[0].spectrum_label, "-48");
    }
}
