use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookingError>;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: String,
    },
    #[error("no slots available at company {0}")]
    SlotsExhausted(String),
    #[error("time slot already taken for this mentor")]
    Conflict,
    #[error("payment gateway failure: {0}")]
    Gateway(String),
    #[error("webhook signature rejected")]
    SignatureRejected,
    #[error("no booking matches payment reference {0}")]
    UnknownReference(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BookingError {
    /// Gateway failures are the only class the caller should retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}
