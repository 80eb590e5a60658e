//! Metric-schema validation.
//!
//! The gate between research output and code generation: no metric reaches
//! the coding agent without passing this check.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::types::{Metric, MetricType};

/// Prometheus metric-name rule.
static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("metric name regex"));

/// Check every metric against the schema, failing on the first offender.
///
/// Rules, in order per metric: name must match the Prometheus name pattern,
/// description must be non-blank, type must be one of the closed
/// [`MetricType`] set. No side effects; an empty slice is valid.
pub fn validate_metrics(metrics: &[Metric]) -> Result<(), ValidationError> {
    for metric in metrics {
        if !METRIC_NAME.is_match(&metric.name) {
            return Err(ValidationError::MetricName {
                name: metric.name.clone(),
            });
        }
        if metric.description.trim().is_empty() {
            return Err(ValidationError::MissingDescription {
                name: metric.name.clone(),
            });
        }
        if MetricType::parse(&metric.metric_type).is_none() {
            return Err(ValidationError::MetricType {
                name: metric.name.clone(),
                metric_type: metric.metric_type.clone(),
            });
        }
    }
    Ok(())
}
