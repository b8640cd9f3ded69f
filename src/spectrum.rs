//! Discrete Fourier transform of flux series.
//!
//! No windowing or detrending is applied: the transform runs directly on raw
//! or gap-filled flux values, and the frequency grid follows the standard DFT
//! bin ordering (bin 0 = DC, ascending positive frequencies in the first
//! half, negative/aliased frequencies in the second half).

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Which flux sequence a spectrum was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Raw, possibly gapped samples (frequencies from the modal spacing)
    Original,
    /// Gap-filled uniform series
    GapFilled,
}

/// DFT of a flux series: parallel frequency and coefficient sequences.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub provenance: Provenance,
    frequency: Vec<f64>,
    coefficients: Vec<Complex<f64>>,
}

impl Spectrum {
    /// Assemble a spectrum from parallel frequency/coefficient sequences.
    ///
    /// The two sequences must have equal length and follow the DFT bin
    /// ordering described in the module docs.
    pub fn from_parts(
        provenance: Provenance,
        frequency: Vec<f64>,
        coefficients: Vec<Complex<f64>>,
    ) -> Self {
        debug_assert_eq!(frequency.len(), coefficients.len());
        Self {
            provenance,
            frequency,
            coefficients,
        }
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn coefficients(&self) -> &[Complex<f64>] {
        &self.coefficients
    }

    /// Power (squared magnitude) of bin `k`
    pub fn power(&self, k: usize) -> f64 {
        self.coefficients[k].norm_sqr()
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// Compute the DFT of `flux` sampled at constant spacing `dt`.
///
/// Pure function over its inputs; `dt` is the uniform grid spacing for
/// gap-filled series or the modal spacing for raw gapped input.
pub fn transform(flux: &[f64], dt: f64, provenance: Provenance) -> Spectrum {
    let n = flux.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let coefficients = transform_with(fft.as_ref(), flux);

    Spectrum {
        provenance,
        frequency: fft_frequencies(n, dt),
        coefficients,
    }
}

/// DFT with a pre-planned FFT, for callers running many same-length series.
pub fn transform_with(fft: &dyn Fft<f64>, flux: &[f64]) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> =
        flux.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);
    buffer
}

/// DFT sample frequencies for `n` samples at spacing `dt`.
///
/// Bin `k` maps to `k/(n*dt)` for `k < ceil(n/2)` and to `(k - n)/(n*dt)`
/// afterwards, the usual fftfreq convention.
pub fn fft_frequencies(n: usize, dt: f64) -> Vec<f64> {
    let step = 1.0 / (n as f64 * dt);
    (0..n)
        .map(|k| {
            if k < (n + 1) / 2 {
                k as f64 * step
            } else {
                (k as i64 - n as i64) as f64 * step
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_frequencies_even() {
        let freqs = fft_frequencies(8, 1.0);
        let expected = [0.0, 0.125, 0.25, 0.375, -0.5, -0.375, -0.25, -0.125];
        for (a, b) in freqs.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fft_frequencies_odd() {
        let freqs = fft_frequencies(5, 2.0);
        let expected = [0.0, 0.1, 0.2, -0.2, -0.1];
        for (a, b) in freqs.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_transform_dc_only() {
        let flux = vec![3.0; 16];
        let spectrum = transform(&flux, 1.0, Provenance::Original);

        assert_eq!(spectrum.len(), 16);
        assert!((spectrum.coefficients()[0].re - 48.0).abs() < 1e-9);
        for k in 1..16 {
            assert!(spectrum.power(k) < 1e-18);
        }
    }

    #[test]
    fn test_transform_sinusoid_peak_bin() {
        // A sinusoid at frequency f0 must put its dominant non-DC peak at
        // bin round(n * f0 * dt).
        let n = 128;
        let dt = 0.5;
        let f0 = 0.25;
        let flux: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * f0 * (i as f64 * dt)).sin())
            .collect();

        let spectrum = transform(&flux, dt, Provenance::GapFilled);

        let mut max_bin = 1;
        for k in 1..n / 2 {
            if spectrum.power(k) > spectrum.power(max_bin) {
                max_bin = k;
            }
        }

        let expected = (n as f64 * f0 * dt).round() as usize;
        assert_eq!(max_bin, expected);
    }

    #[test]
    fn test_transform_with_matches_transform() {
        let flux: Vec<f64> = (0..32).map(|i| (i as f64).cos()).collect();
        let spectrum = transform(&flux, 1.0, Provenance::Original);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(32);
        let direct = transform_with(fft.as_ref(), &flux);

        for (a, b) in spectrum.coefficients().iter().zip(&direct) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
