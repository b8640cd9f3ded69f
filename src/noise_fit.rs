//! Red-noise power-law fit to a power spectral density.
//!
//! Blazar light curves are dominated by red noise: power falling off with
//! frequency as `P(f) = norm / f^beta`. The fit runs over spectrum bins
//! `[1, len/2)`, excluding DC and the aliased second half, against the
//! squared magnitudes of the coefficients, using Levenberg-Marquardt on the
//! two parameters `[norm, beta]`.
//!
//! The fit is guess-sensitive: a poor initial guess can land in a local
//! minimum or fail to converge, so the guess is a mandatory per-dataset
//! input and the iteration budget is deliberately very large.

use snafu::Snafu;
use tracing::debug;

use crate::spectrum::Spectrum;

/// Iteration budget tolerant of initial guesses far from the optimum
pub const MAX_ITERATIONS: usize = 200_000;

/// Relative reduction in the sum of squared residuals that counts as converged
const FTOL: f64 = 1e-12;

/// Step size, relative to the parameter magnitudes, that counts as converged
const XTOL: f64 = 1e-14;

#[derive(Debug, Snafu)]
pub enum FitError {
    /// Optimizer exhausted its iteration budget; last parameters attached
    #[snafu(display(
        "power-law fit did not converge within {iterations} iterations \
         (last attempt: norm={norm:.6e}, beta={beta:.4})"
    ))]
    FitDivergence {
        iterations: usize,
        norm: f64,
        beta: f64,
    },

    /// Spectrum too short to leave any bins in the fit domain
    #[snafu(display("spectrum with {len} bins leaves no usable fit domain"))]
    DomainTooSmall { len: usize },
}

/// Result of the power-law fit, immutable once produced.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Optimized `[norm, beta]`
    pub params: [f64; 2],
    /// 2x2 covariance; the diagonal holds the parameter variances
    pub covariance: [[f64; 2]; 2],
    /// Frequencies of the fit domain (bins `[1, len/2)`)
    pub frequency: Vec<f64>,
    /// Model curve evaluated on the fit domain, for direct overlay
    pub fitted: Vec<f64>,
}

/// The red-noise model `P(f) = norm / f^beta`.
pub fn power_law(f: f64, norm: f64, beta: f64) -> f64 {
    norm / f.powf(beta)
}

/// Fit the power-law model to a spectrum's PSD.
pub fn fit(spectrum: &Spectrum, guess: [f64; 2]) -> Result<FitResult, FitError> {
    fit_with_budget(spectrum, guess, MAX_ITERATIONS)
}

/// Fit with an explicit iteration budget (the default is [`MAX_ITERATIONS`]).
pub fn fit_with_budget(
    spectrum: &Spectrum,
    guess: [f64; 2],
    max_iterations: usize,
) -> Result<FitResult, FitError> {
    let half = spectrum.len() / 2;
    if half <= 1 {
        return Err(FitError::DomainTooSmall {
            len: spectrum.len(),
        });
    }

    let freq: Vec<f64> = spectrum.frequency()[1..half].to_vec();
    let psd: Vec<f64> = (1..half).map(|k| spectrum.power(k)).collect();

    let (params, iterations) =
        levenberg_marquardt(&freq, &psd, guess, max_iterations)?;

    debug!(
        norm = params[0],
        beta = params[1],
        iterations,
        bins = freq.len(),
        "power-law fit converged"
    );

    let covariance = covariance_at(&freq, &psd, params);
    let fitted = freq.iter().map(|&f| power_law(f, params[0], params[1])).collect();

    Ok(FitResult {
        params,
        covariance,
        frequency: freq,
        fitted,
    })
}

/// Levenberg-Marquardt on the two power-law parameters.
///
/// Returns the optimized parameters and the number of iterations used, or
/// [`FitError::FitDivergence`] carrying the last attempted parameters.
fn levenberg_marquardt(
    freq: &[f64],
    psd: &[f64],
    guess: [f64; 2],
    max_iterations: usize,
) -> Result<([f64; 2], usize), FitError> {
    let mut params = guess;
    let mut lambda = 1e-3;
    let mut ssr = sum_squared_residuals(freq, psd, params);

    for iteration in 0..max_iterations {
        // Normal equations from the analytic Jacobian:
        //   d/dnorm = f^-beta,  d/dbeta = -norm * ln(f) * f^-beta
        let mut jtj = [[0.0f64; 2]; 2];
        let mut jtr = [0.0f64; 2];
        for (&f, &y) in freq.iter().zip(psd) {
            let base = f.powf(-params[1]);
            let j0 = base;
            let j1 = -params[0] * f.ln() * base;
            let r = y - params[0] * base;
            jtj[0][0] += j0 * j0;
            jtj[0][1] += j0 * j1;
            jtj[1][1] += j1 * j1;
            jtr[0] += j0 * r;
            jtr[1] += j1 * r;
        }
        jtj[1][0] = jtj[0][1];

        // Marquardt damping scales the diagonal.
        let a = [
            [jtj[0][0] * (1.0 + lambda), jtj[0][1]],
            [jtj[1][0], jtj[1][1] * (1.0 + lambda)],
        ];
        let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        if det == 0.0 || !det.is_finite() {
            return Err(FitError::FitDivergence {
                iterations: iteration,
                norm: params[0],
                beta: params[1],
            });
        }
        let step = [
            (jtr[0] * a[1][1] - jtr[1] * a[0][1]) / det,
            (jtr[1] * a[0][0] - jtr[0] * a[1][0]) / det,
        ];

        // Negligible step relative to the parameter magnitudes: converged.
        let step_norm = step[0].hypot(step[1]);
        let param_norm = params[0].hypot(params[1]);
        if step_norm <= XTOL * (param_norm + XTOL) {
            return Ok((params, iteration + 1));
        }

        let trial = [params[0] + step[0], params[1] + step[1]];
        let trial_ssr = sum_squared_residuals(freq, psd, trial);

        if trial_ssr.is_finite() && trial_ssr <= ssr {
            let improvement = ssr - trial_ssr;
            params = trial;
            let converged = improvement <= FTOL * (ssr + f64::MIN_POSITIVE);
            ssr = trial_ssr;
            lambda = (lambda * 0.1).max(1e-14);
            if converged {
                return Ok((params, iteration + 1));
            }
        } else {
            lambda *= 10.0;
        }
    }

    Err(FitError::FitDivergence {
        iterations: max_iterations,
        norm: params[0],
        beta: params[1],
    })
}

fn sum_squared_residuals(freq: &[f64], psd: &[f64], params: [f64; 2]) -> f64 {
    freq.iter()
        .zip(psd)
        .map(|(&f, &y)| {
            let r = y - power_law(f, params[0], params[1]);
            r * r
        })
        .sum()
}

/// Covariance of the optimized parameters: `inv(JtJ) * ssr / (m - 2)`.
fn covariance_at(freq: &[f64], psd: &[f64], params: [f64; 2]) -> [[f64; 2]; 2] {
    let mut jtj = [[0.0f64; 2]; 2];
    for &f in freq {
        let base = f.powf(-params[1]);
        let j0 = base;
        let j1 = -params[0] * f.ln() * base;
        jtj[0][0] += j0 * j0;
        jtj[0][1] += j0 * j1;
        jtj[1][1] += j1 * j1;
    }
    jtj[1][0] = jtj[0][1];

    let det = jtj[0][0] * jtj[1][1] - jtj[0][1] * jtj[1][0];
    let m = freq.len();
    if det == 0.0 || !det.is_finite() || m <= 2 {
        return [[f64::INFINITY, f64::INFINITY], [f64::INFINITY, f64::INFINITY]];
    }

    let ssr = sum_squared_residuals(freq, psd, params);
    let scale = ssr / (m - 2) as f64;
    [
        [jtj[1][1] / det * scale, -jtj[0][1] / det * scale],
        [-jtj[1][0] / det * scale, jtj[0][0] / det * scale],
    ]
}
