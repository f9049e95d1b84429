//! Error handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Input errors
    #[error("Series '{0}' contains no samples")]
    EmptySeries(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid value at row {row}: {reason}")]
    InvalidValue { row: usize, reason: String },

    #[error("CSV error at row {row}: {message}")]
    Csv { row: usize, message: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // External service errors
    #[error("Download failed: {0}")]
    Fetch(String),

    // Model errors
    #[error("Model error: {0}")]
    Model(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Model integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<candle_core::Error> for Error {
    fn from(err: candle_core::Error) -> Self {
        Error::Model(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let row = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        Error::Csv { row, message: err.to_string() }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                Error::Fetch(format!("HTTP {} from {}", code, response.get_url()))
            }
            ureq::Error::Transport(t) => Error::Fetch(t.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::EmptySeries("train".to_string());
        assert_eq!(err.to_string(), "Series 'train' contains no samples");

        let err = Error::Integrity {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(err.to_string().contains("expected aa"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
