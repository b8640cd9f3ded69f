//! Peak detection in a power spectrum.
//!
//! The periodicity candidate is the highest-power bin above a cutoff
//! frequency `f_cut`. Frequencies at or below the cutoff are assumed
//! dominated by slowly varying red noise and are excluded; only the first
//! (non-aliased) half of the spectrum is scanned.

use rustfft::num_complex::Complex;
use snafu::Snafu;

use crate::spectrum::Spectrum;

#[derive(Debug, Snafu)]
pub enum PeakError {
    /// The cutoff left no bins to search
    #[snafu(display("no spectral bins above cutoff frequency {f_cut}"))]
    DegenerateSpectrum { f_cut: f64 },
}

/// The single highest-power bin above the cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRecord {
    pub frequency: f64,
    /// Squared magnitude of the spectral coefficient
    pub power: f64,
}

impl PeakRecord {
    /// Period corresponding to the peak frequency
    pub fn period(&self) -> f64 {
        1.0 / self.frequency
    }
}

/// Find the maximum-power bin with frequency strictly above `f_cut`.
///
/// Scans the first half of the spectrum in ascending-frequency order; if
/// several bins share the exact maximum, the lowest-frequency one wins.
pub fn find_peak(spectrum: &Spectrum, f_cut: f64) -> Result<PeakRecord, PeakError> {
    let half = spectrum.len() / 2;
    find_peak_in(
        &spectrum.frequency()[..half],
        &spectrum.coefficients()[..half],
        f_cut,
    )
}

/// Peak search over parallel frequency/coefficient slices.
///
/// Used directly by the surrogate pipeline, where thousands of coefficient
/// sets share one frequency grid.
pub fn find_peak_in(
    frequency: &[f64],
    coefficients: &[Complex<f64>],
    f_cut: f64,
) -> Result<PeakRecord, PeakError> {
    let mut best: Option<PeakRecord> = None;

    for (&f, c) in frequency.iter().zip(coefficients) {
        if f <= f_cut {
            continue;
        }
        let power = c.norm_sqr();
        // Strict comparison keeps the first (lowest-frequency) bin on ties.
        if best.map_or(true, |b| power > b.power) {
            best = Some(PeakRecord {
                frequency: f,
                power,
            });
        }
    }

    best.ok_or(PeakError::DegenerateSpectrum { f_cut })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{fft_frequencies, Provenance};

    fn spectrum_with_powers(powers: &[f64]) -> Spectrum {
        let n = powers.len();
        let coeffs: Vec<Complex<f64>> = powers
            .iter()
            .map(|&p| Complex::new(p.sqrt(), 0.0))
            .collect();
        Spectrum::from_parts(Provenance::GapFilled, fft_frequencies(n, 1.0), coeffs)
    }

    #[test]
    fn test_zero_cutoff_matches_global_max_excluding_dc() {
        let powers = [100.0, 3.0, 9.0, 7.0, 2.0, 1.0, 4.0, 5.0];
        let spectrum = spectrum_with_powers(&powers);

        let peak = find_peak(&spectrum, 0.0).unwrap();

        // Global max over the first half excluding bin 0 is bin 2.
        assert_eq!(peak.frequency, spectrum.frequency()[2]);
        assert!((peak.power - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_cutoff_excludes_low_frequency_bins() {
        let powers = [0.0, 50.0, 8.0, 6.0, 1.0, 1.0, 1.0, 1.0];
        let spectrum = spectrum_with_powers(&powers);

        // Bin 1 sits at f = 0.125; cut it away.
        let peak = find_peak(&spectrum, 0.125).unwrap();
        assert_eq!(peak.frequency, spectrum.frequency()[2]);
    }

    #[test]
    fn test_tie_breaks_to_lowest_frequency() {
        let powers = [0.0, 4.0, 9.0, 9.0, 1.0, 1.0, 1.0, 1.0];
        let spectrum = spectrum_with_powers(&powers);

        let peak = find_peak(&spectrum, 0.0).unwrap();
        assert_eq!(peak.frequency, spectrum.frequency()[2]);
    }

    #[test]
    fn test_degenerate_when_cutoff_above_everything() {
        let powers = [1.0; 8];
        let spectrum = spectrum_with_powers(&powers);

        assert!(matches!(
            find_peak(&spectrum, 10.0),
            Err(PeakError::DegenerateSpectrum { .. })
        ));
    }

    #[test]
    fn test_period_is_reciprocal_frequency() {
        let peak = PeakRecord {
            frequency: 0.25,
            power: 1.0,
        };
        assert_eq!(peak.period(), 4.0);
    }
}
