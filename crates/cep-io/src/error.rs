//! Error type for boundary-table imports.

use thiserror::Error;

/// Errors raised while reading scenario input tables.
#[derive(Debug, Error)]
pub enum ImportError {
    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rows parsed but the data is inconsistent
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl From<ImportError> for cep_core::CepError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Io(io) => cep_core::CepError::Io(io),
            other => cep_core::CepError::Parse(other.to_string()),
        }
    }
}

/// Result type alias for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_cep_error() {
        let err: cep_core::CepError = ImportError::Invalid("bad row".into()).into();
        assert!(err.to_string().contains("bad row"));
    }
}
