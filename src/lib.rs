
pub mod gapfill;
pub mod lightcurve;
pub mod noise_fit;
pub mod peak;
pub mod pipeline;
pub mod significance;
pub mod spectrum;
pub mod surrogate;
pub mod tracing_init;

pub use gapfill::UniformSeries;
pub use lightcurve::{CensoredPoints, LightCurve};
pub use noise_fit::FitResult;
pub use peak::PeakRecord;
pub use pipeline::{analyze, analyze_batch, AnalysisConfig, AnalysisError, SourceAnalysis};
pub use significance::SignificanceResult;
pub use spectrum::{Provenance, Spectrum};
pub use surrogate::SyntheticEnsemble;
