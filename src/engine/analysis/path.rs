//! Log-frequency display geometry and the spectrum path producer.

/// Lowest frequency on the display's x axis.
pub const MIN_FREQUENCY: f64 = 20.0;
/// Highest frequency on the display's x axis.
pub const MAX_FREQUENCY: f64 = 20000.0;
/// Highest usable noise floor. The y axis needs a non-empty dB range below 0.
pub const MAX_NOISE_FLOOR_DB: f32 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned area in device pixels, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Number of whole pixel columns.
    pub fn columns(&self) -> usize {
        self.width.max(0.0).floor() as usize
    }

    /// Shrinks every edge by the given amounts.
    pub fn inset(&self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }
}

/// Linear remap of `value` from `[src_min, src_max]` to `[dst_min, dst_max]`.
pub fn jmap(value: f64, src_min: f64, src_max: f64, dst_min: f64, dst_max: f64) -> f64 {
    dst_min + (value - src_min) * (dst_max - dst_min) / (src_max - src_min)
}

/// Position of `value` on a log axis from `min` to `max`, in `0..=1`.
pub fn map_from_log10(value: f64, min: f64, max: f64) -> f64 {
    (value / min).log10() / (max / min).log10()
}

/// Inverse of [`map_from_log10`].
pub fn map_to_log10(proportion: f64, min: f64, max: f64) -> f64 {
    min * (max / min).powf(proportion)
}

/// Renders magnitude spectra into a per-pixel-column path.
///
/// The last path is held until a new spectrum arrives, and successive
/// spectra are blended with an exponential average so the overlay moves
/// smoothly at the display rate.
pub struct PathProducer {
    path: Vec<Point>,
    levels: Vec<f32>,
    smoothing: f32,
}

impl PathProducer {
    /// `smoothing` is the weight of the previous frame, `0.0` disables it.
    pub fn new(smoothing: f32) -> Self {
        Self {
            path: Vec::new(),
            levels: Vec::new(),
            smoothing: smoothing.clamp(0.0, 0.99),
        }
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Level in dB for one pixel column: the loudest bin whose centre lies in
    /// the column, or a linear blend of the neighbouring bins when the column
    /// is narrower than a bin.
    fn column_level(
        magnitudes: &[f32],
        bin_width: f64,
        low_hz: f64,
        high_hz: f64,
        noise_floor_db: f32,
    ) -> f32 {
        let last = magnitudes.len() - 1;
        let first_bin = (low_hz / bin_width).ceil() as usize;
        let end_bin = ((high_hz / bin_width).ceil() as usize).min(magnitudes.len());

        if first_bin < end_bin {
            return magnitudes[first_bin..end_bin]
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
        }

        let position = low_hz / bin_width;
        let k0 = position.floor() as usize;
        if k0 > last {
            return noise_floor_db;
        }
        let k1 = (k0 + 1).min(last);
        let t = (position - k0 as f64) as f32;
        magnitudes[k0] * (1.0 - t) + magnitudes[k1] * t
    }

    /// Maps `magnitudes` (dB per bin) into `bounds`: x is log frequency from
    /// 20 Hz to 20 kHz, y runs from `noise_floor_db` at the bottom edge to
    /// 0 dB at the top edge, clamped. Floors above [`MAX_NOISE_FLOOR_DB`]
    /// are lowered to it.
    pub fn generate_path(
        &mut self,
        magnitudes: &[f32],
        bounds: Rect,
        fft_size: usize,
        bin_width: f64,
        noise_floor_db: f32,
    ) {
        let columns = bounds.columns();
        let num_bins = magnitudes.len().min(fft_size / 2);
        if columns == 0 || num_bins == 0 || bin_width <= 0.0 {
            return;
        }
        let magnitudes = &magnitudes[..num_bins];
        let noise_floor_db = noise_floor_db.min(MAX_NOISE_FLOOR_DB);

        let fresh = self.levels.len() != columns;
        if fresh {
            self.levels.clear();
            self.levels.resize(columns, noise_floor_db);
        }

        self.path.clear();
        self.path.reserve(columns);

        let bottom = bounds.bottom() as f64;
        let top = bounds.y as f64;

        for (column, level) in self.levels.iter_mut().enumerate() {
            let low = column as f64 / columns as f64;
            let high = (column + 1) as f64 / columns as f64;
            let low_hz = map_to_log10(low, MIN_FREQUENCY, MAX_FREQUENCY);
            let high_hz = map_to_log10(high, MIN_FREQUENCY, MAX_FREQUENCY);
            let value = Self::column_level(magnitudes, bin_width, low_hz, high_hz, noise_floor_db);

            *level = if fresh {
                value
            } else {
                *level * self.smoothing + value * (1.0 - self.smoothing)
            };

            let db = level.clamp(noise_floor_db, 0.0) as f64;
            let y = jmap(db, noise_floor_db as f64, 0.0, bottom, top);
            self.path.push(Point {
                x: bounds.x + column as f32,
                y: y as f32,
            });
        }
    }
}
