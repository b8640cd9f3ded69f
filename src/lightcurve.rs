//! Light-curve data model and the ingestion boundary.
//!
//! Monitoring tables arrive with string-encoded censoring: a flux cell may
//! carry a leading `<` marking an upper limit, and an error cell a leading `-`
//! marking a censored measurement error. This module strips those markers into
//! typed values and builds the read-only [`LightCurve`] the numeric pipeline
//! operates on, with upper-limit points collected into a side-channel
//! [`CensoredPoints`] set. Marked text never reaches the spectral stages.

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Flux or error cell is not numeric once its marker is stripped
    #[snafu(display("row {row}: value {value:?} is not numeric after marker stripping"))]
    MalformedInput { row: usize, value: String },

    /// Fewer than two samples; no time differences can be computed
    #[snafu(display("light curve has {len} samples, need at least 2"))]
    InsufficientData { len: usize },

    /// Timestamps must be strictly increasing
    #[snafu(display("row {row}: time is not strictly increasing"))]
    NonMonotonicTime { row: usize },

    /// Parallel columns must have equal lengths
    #[snafu(display("column lengths differ: {time} time, {flux} flux, {flux_err} error"))]
    ColumnMismatch {
        time: usize,
        flux: usize,
        flux_err: usize,
    },
}

/// A single flux cell after marker stripping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FluxValue {
    /// Plain detection
    Measured(f64),
    /// Upper limit (the cell carried a leading `<`)
    UpperLimit(f64),
}

impl FluxValue {
    pub fn value(&self) -> f64 {
        match *self {
            FluxValue::Measured(v) | FluxValue::UpperLimit(v) => v,
        }
    }
}

/// Upper-limit points extracted at ingestion, kept out of the numeric core
#[derive(Debug, Clone, Default)]
pub struct CensoredPoints {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
}

impl CensoredPoints {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Irregularly sampled flux time series for one source.
///
/// Invariants enforced at construction: strictly increasing time, at least
/// two samples, equal-length columns. Read-only afterwards; every pipeline
/// stage consumes it by reference and produces a new record.
#[derive(Debug, Clone)]
pub struct LightCurve {
    name: String,
    time: Vec<f64>,
    flux: Vec<f64>,
    /// Per-sample flux error; `None` where the error was censored
    flux_err: Vec<Option<f64>>,
}

impl LightCurve {
    pub fn new(
        name: impl Into<String>,
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Vec<Option<f64>>,
    ) -> Result<Self, ParseError> {
        if time.len() != flux.len() || time.len() != flux_err.len() {
            return Err(ParseError::ColumnMismatch {
                time: time.len(),
                flux: flux.len(),
                flux_err: flux_err.len(),
            });
        }
        if time.len() < 2 {
            return Err(ParseError::InsufficientData { len: time.len() });
        }
        for (row, pair) in time.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ParseError::NonMonotonicTime { row: row + 1 });
            }
        }
        Ok(Self {
            name: name.into(),
            time,
            flux,
            flux_err,
        })
    }

    /// Build a light curve from raw string cells, separating upper limits.
    ///
    /// Upper-limit flux values stay in the curve (marker stripped) and are
    /// additionally recorded in the returned [`CensoredPoints`] together with
    /// their timestamps. Censored error cells become `None`.
    pub fn from_table(
        name: impl Into<String>,
        time: &[f64],
        flux: &[&str],
        flux_err: &[&str],
    ) -> Result<(Self, CensoredPoints), ParseError> {
        if time.len() != flux.len() || time.len() != flux_err.len() {
            return Err(ParseError::ColumnMismatch {
                time: time.len(),
                flux: flux.len(),
                flux_err: flux_err.len(),
            });
        }

        let mut censored = CensoredPoints::default();
        let mut flux_out = Vec::with_capacity(flux.len());
        let mut err_out = Vec::with_capacity(flux_err.len());

        for (row, (&cell, &err_cell)) in flux.iter().zip(flux_err).enumerate() {
            let parsed = parse_flux(cell).ok_or_else(|| ParseError::MalformedInput {
                row,
                value: cell.to_string(),
            })?;
            if let FluxValue::UpperLimit(v) = parsed {
                censored.time.push(time[row]);
                censored.flux.push(v);
            }
            flux_out.push(parsed.value());

            err_out.push(parse_flux_error(err_cell).ok_or_else(|| {
                ParseError::MalformedInput {
                    row,
                    value: err_cell.to_string(),
                }
            })?);
        }

        let curve = Self::new(name, time.to_vec(), flux_out, err_out)?;
        Ok((curve, censored))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_err(&self) -> &[Option<f64>] {
        &self.flux_err
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Parse one flux cell, recognizing the `<` upper-limit marker.
pub fn parse_flux(cell: &str) -> Option<FluxValue> {
    let trimmed = cell.trim();
    if let Some(rest) = trimmed.strip_prefix('<') {
        rest.trim().parse().ok().map(FluxValue::UpperLimit)
    } else {
        trimmed.parse().ok().map(FluxValue::Measured)
    }
}

/// Parse one flux-error cell; a leading `-` means the error was censored.
pub fn parse_flux_error(cell: &str) -> Option<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.starts_with('-') {
        return Some(None);
    }
    trimmed.parse().ok().map(Some)
}
