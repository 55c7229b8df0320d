use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyConfigInvalid {
    #[error("policy value out of range: {0}")]
    OutOfRange(#[from] validator::ValidationErrors),
    #[error(
        "{scope} confidence thresholds must satisfy low < medium < high (got {low}, {medium}, {high})"
    )]
    ThresholdOrder {
        scope: String,
        low: f64,
        medium: f64,
        high: f64,
    },
}
