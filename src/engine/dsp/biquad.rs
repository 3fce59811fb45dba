use std::f64::consts::PI;

/// Normalized second-order section coefficients (`a0 == 1`).
///
/// Coefficients are designed in `f64` and stored as `f32`, the precision the
/// audio path runs at. A section is always replaced as a whole value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    /// Pass-through section.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }

    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }

    /// Peaking (bell) section, `gain_db` at `frequency`.
    pub fn peak(sample_rate: f64, frequency: f64, q: f64, gain_db: f64) -> Self {
        let a = 10.0f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }

    /// Linear magnitude of the section's response at `frequency`.
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (sin1, cos1) = w.sin_cos();
        let (sin2, cos2) = (2.0 * w).sin_cos();

        let (b0, b1, b2) = (self.b0 as f64, self.b1 as f64, self.b2 as f64);
        let (a1, a2) = (self.a1 as f64, self.a2 as f64);

        let num_re = b0 + b1 * cos1 + b2 * cos2;
        let num_im = -(b1 * sin1 + b2 * sin2);
        let den_re = 1.0 + a1 * cos1 + a2 * cos2;
        let den_im = -(a1 * sin1 + a2 * sin2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// A second-order section in transposed direct form II.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadFilter {
    coefficients: BiquadCoefficients,
    z1: f32,
    z2: f32,
}

impl BiquadFilter {
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }

    /// Replaces the coefficients. Filter state is kept so a live update does
    /// not click.
    pub fn set_coefficients(&mut self, coefficients: BiquadCoefficients) {
        self.coefficients = coefficients;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let c = &self.coefficients;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Linear gain to decibels, floored at `minus_infinity_db`.
pub fn gain_to_decibels(gain: f64, minus_infinity_db: f64) -> f64 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(minus_infinity_db)
    } else {
        minus_infinity_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48000.0;

    #[test]
    fn identity_passes_through() {
        let mut filter = BiquadFilter::new(BiquadCoefficients::IDENTITY);
        assert_eq!(filter.process(0.5), 0.5);
        let magnitude = BiquadCoefficients::IDENTITY.magnitude_for_frequency(1234.0, SR);
        assert!((magnitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn high_pass_blocks_dc() {
        let mut filter = BiquadFilter::new(BiquadCoefficients::high_pass(SR, 1000.0, 0.707));
        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.process(1.0);
        }
        assert!(out.abs() < 0.01);
    }

    #[test]
    fn low_pass_passes_dc() {
        let mut filter = BiquadFilter::new(BiquadCoefficients::low_pass(SR, 1000.0, 0.707));
        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 0.01);
    }

    #[test]
    fn butterworth_section_is_minus_three_db_at_cutoff() {
        let c = BiquadCoefficients::high_pass(SR, 1000.0, std::f64::consts::FRAC_1_SQRT_2);
        let db = gain_to_decibels(c.magnitude_for_frequency(1000.0, SR), -120.0);
        assert!((db + 3.01).abs() < 0.05, "got {db}");
    }

    #[test]
    fn peak_hits_gain_at_centre() {
        let c = BiquadCoefficients::peak(SR, 1000.0, 1.0, 6.0);
        let db = gain_to_decibels(c.magnitude_for_frequency(1000.0, SR), -120.0);
        assert!((db - 6.0).abs() < 0.01, "got {db}");
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = BiquadFilter::new(BiquadCoefficients::low_pass(SR, 500.0, 0.707));
        filter.process(1.0);
        filter.reset();
        let mut fresh = BiquadFilter::new(*filter.coefficients());
        assert_eq!(filter.process(0.25), fresh.process(0.25));
    }

    #[test]
    fn decibel_floor() {
        assert_eq!(gain_to_decibels(0.0, -48.0), -48.0);
        assert_eq!(gain_to_decibels(1e-9, -48.0), -48.0);
        assert!((gain_to_decibels(1.0, -48.0)).abs() < 1e-12);
    }
}
