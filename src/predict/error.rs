use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No TLE available: {0}")]
    TleUnavailable(String),
    #[error("Malformed TLE: {0}")]
    MalformedTle(String),
    #[error("Propagation error: {0}")]
    PropagationDegenerate(String),
    #[error("No pass in the next {hours} hours")]
    NoPassInHorizon { hours: i64 },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
}

impl PredictError {
    /// Outcomes a user can run into during normal operation, as opposed to faults.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            PredictError::TleUnavailable(_) | PredictError::NoPassInHorizon { .. }
        )
    }
}
