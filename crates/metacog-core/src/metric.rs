//! The smallest scored unit: a named, weighted measurement function.

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::model::Problem;
use crate::results::MetricScore;
use crate::signals::SignalSet;

/// A measurement over extracted signals and the problem's reference data.
///
/// Returns `None` when the signals or reference data it needs are missing.
pub type Measure = Arc<dyn Fn(&Problem, &SignalSet) -> Option<f64> + Send + Sync>;

/// A weighted metric within a dimension.
///
/// Metrics hold no per-evaluation state; each call to [`Metric::score`]
/// produces a fresh [`MetricScore`].
#[derive(Clone)]
pub struct Metric {
    name: String,
    weight: f64,
    measure: Measure,
}

impl Metric {
    /// Create a metric, rejecting weights outside `[0, 1]`.
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        measure: impl Fn(&Problem, &SignalSet) -> Option<f64> + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        check_weight(&name, weight)?;
        Ok(Self {
            name,
            weight,
            measure: Arc::new(measure),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Run the measurement.
    ///
    /// A value outside `[0, 1]` (or NaN) is a defect in the measurement
    /// function; it is logged and reported as absent.
    pub fn measure(&self, problem: &Problem, signals: &SignalSet) -> Option<f64> {
        let value = (self.measure)(problem, signals)?;
        if (0.0..=1.0).contains(&value) {
            Some(value)
        } else {
            tracing::warn!(
                metric = %self.name,
                problem = %problem.id,
                value,
                "measurement outside [0, 1], treating as absent"
            );
            None
        }
    }

    /// Measure and wrap the result with this metric's name and weight.
    pub fn score(&self, problem: &Problem, signals: &SignalSet) -> MetricScore {
        let score = self.measure(problem, signals);
        tracing::debug!(metric = %self.name, problem = %problem.id, ?score, "measured");
        MetricScore {
            name: self.name.clone(),
            weight: self.weight,
            score,
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_weight(name: &str, weight: f64) -> Result<(), ConfigError> {
    if weight.is_finite() && (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(ConfigError::WeightOutOfRange {
            name: name.to_string(),
            weight,
        })
    }
}
