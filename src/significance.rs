//! Monte Carlo significance of an observed spectral peak.
//!
//! Every surrogate flux variant runs through the same transform-and-peak
//! pipeline as the observed series, yielding one peak power per surrogate.
//! The `N` surrogate peak powers form an empirical null distribution; the
//! p-value is the area of its density histogram at or beyond the observed
//! peak power.
//!
//! The surrogate pipeline is embarrassingly parallel: each variant reads
//! only the shared frequency grid and its own shuffled flux, so it runs on
//! a rayon parallel iterator with results merged by plain collection.

use rayon::prelude::*;
use rustfft::FftPlanner;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::peak::{find_peak_in, PeakRecord};
use crate::spectrum::{fft_frequencies, transform_with};
use crate::surrogate::SyntheticEnsemble;

#[derive(Debug, Snafu)]
pub enum SignificanceError {
    /// Zero surrogates: the null distribution is undefined
    #[snafu(display("surrogate ensemble is empty, null distribution undefined"))]
    EmptyNullDistribution,

    /// A surrogate spectrum left no bins above the cutoff
    #[snafu(display("surrogate peak search failed: {source}"))]
    SurrogatePeak { source: crate::peak::PeakError },
}

/// Monte Carlo p-value for an observed peak power.
#[derive(Debug, Clone)]
pub struct SignificanceResult {
    /// Estimated probability of a noise-only peak at least as large as
    /// observed, clamped into `[1/sqrt(N), 1]`
    pub p_value: f64,
    /// Resolution floor `1/sqrt(N)` of the N-draw estimate
    pub floor: f64,
    /// Surrogate peak powers (squared magnitudes), for downstream display
    pub surrogate_peaks: Vec<f64>,
}

/// Estimate the significance of `observed` against a surrogate ensemble.
///
/// For each variant: DFT, then peak search above `f_cut`. The resulting
/// peak-power distribution is binned into `n_bins` equal-width density bins
/// and the p-value is the summed density area over bins whose center is at
/// or beyond the observed power.
pub fn estimate(
    ensemble: &SyntheticEnsemble,
    observed: &PeakRecord,
    f_cut: f64,
    n_bins: usize,
) -> Result<SignificanceResult, SignificanceError> {
    if ensemble.is_empty() {
        return Err(SignificanceError::EmptyNullDistribution);
    }

    // Size the FFT and frequency grid from the flux variants, not the time
    // grid: a fractional gap ratio can leave the reconstructed flux a sample
    // short of the grid, and every variant permutes that flux.
    let n = ensemble.variants()[0].len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let frequency = fft_frequencies(n, ensemble.dt());
    let half = n / 2;

    let surrogate_peaks: Vec<f64> = ensemble
        .variants()
        .par_iter()
        .map(|flux| {
            let coefficients = transform_with(fft.as_ref(), flux);
            find_peak_in(&frequency[..half], &coefficients[..half], f_cut)
                .map(|peak| peak.power)
        })
        .collect::<Result<_, _>>()
        .context(SurrogatePeakSnafu)?;

    let floor = 1.0 / (surrogate_peaks.len() as f64).sqrt();
    let p_value = histogram_tail_area(&surrogate_peaks, observed.power, n_bins)
        .clamp(floor, 1.0);

    debug!(
        surrogates = surrogate_peaks.len(),
        observed_power = observed.power,
        p_value,
        "significance estimate"
    );

    Ok(SignificanceResult {
        p_value,
        floor,
        surrogate_peaks,
    })
}

/// Density-histogram area at or beyond `threshold`.
///
/// Bins span the sample range with equal widths; density is
/// `count / (N * width)`, so each contributing bin adds `count / N`.
fn histogram_tail_area(samples: &[f64], threshold: f64, n_bins: usize) -> f64 {
    let n_bins = n_bins.max(1);
    let n = samples.len() as f64;

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / n_bins as f64;

    if width == 0.0 {
        // All surrogate peaks identical: the whole distribution sits at one
        // point, at or beyond the threshold or entirely below it.
        return if min >= threshold { 1.0 } else { 0.0 };
    }

    let mut counts = vec![0usize; n_bins];
    for &s in samples {
        let idx = (((s - min) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    let mut area = 0.0;
    for (i, &count) in counts.iter().enumerate() {
        let center = min + (i as f64 + 0.5) * width;
        if center >= threshold {
            area += count as f64 / n;
        }
    }
    area
}
