//! metacog-core — scoring engine for LLM metacognition.
//!
//! A response to a problem is lifted into structured signals
//! ([`extract`]), measured by weighted metrics ([`metric`]), grouped into
//! five dimensions ([`dimension`], [`evaluators`]) and combined into one
//! framework score ([`framework`]). Missing measurements are absent rather
//! than zero, and every aggregate reports how much of its weight was
//! actually measured ([`aggregate`]).

pub mod aggregate;
pub mod dimension;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod extract;
pub mod framework;
pub mod metric;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod signals;
pub mod statistics;
pub mod traits;
pub mod weights;

pub use error::{ConfigError, ProviderError};
pub use framework::Framework;
pub use model::{DimensionKind, Problem, ProblemSet, Reference};
pub use results::{DimensionResult, EvaluationResult, MetricScore};
pub use weights::WeightsSpec;
