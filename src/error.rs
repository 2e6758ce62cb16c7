// Typed errors for the agritrial library. The CLI wraps these in eyre.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A locality or crop name with no code in the reference tables.
    #[error("no code registered for {kind} \"{name}\"")]
    InvalidReference { kind: &'static str, name: String },

    #[error("no record with id {0}")]
    NotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no trials to export")]
    EmptyExport,

    /// A treatment carries at most 3 product/dose pairs and 10 measurements.
    #[error("a treatment holds at most {max} {what}")]
    LimitExceeded { what: &'static str, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::InvalidReference {
            kind: "locality",
            name: "Atlantis".to_string(),
        };
        assert_eq!(err.to_string(), "no code registered for locality \"Atlantis\"");

        let err = Error::NotFound("2024-RO-SJ-001".to_string());
        assert_eq!(err.to_string(), "no record with id 2024-RO-SJ-001");

        let err = Error::LimitExceeded {
            what: "product/dose pairs",
            max: 3,
        };
        assert_eq!(err.to_string(), "a treatment holds at most 3 product/dose pairs");
    }
}
