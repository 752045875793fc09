use super::domain::RenewalPrediction;

/// Outbound hook estimating how likely a customer is to renew, based on reseller notes.
pub trait RenewalPredictor: Send + Sync {
    fn predict(&self, notes: &str) -> Result<RenewalPrediction, PredictionError>;
}

/// Prediction failures never abort a submission; callers log and continue.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction service unavailable: {0}")]
    Unavailable(String),
    #[error("prediction likelihood {0} outside 0..=1")]
    OutOfRange(f32),
}

/// Rejects predictions whose likelihood is not a probability.
pub(crate) fn checked(prediction: RenewalPrediction) -> Result<RenewalPrediction, PredictionError> {
    if (0.0..=1.0).contains(&prediction.likelihood) {
        Ok(prediction)
    } else {
        Err(PredictionError::OutOfRange(prediction.likelihood))
    }
}
