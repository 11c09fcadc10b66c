use thiserror::Error;

/// Top-level error type for the Docent system.
///
/// Subsystem crates either use these variants directly or define their own
/// error types with a `From<DocentError>` conversion so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Index build error: {0}")]
    IndexBuild(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Empty input")]
    EmptyInput,

    #[error("Document ingestion already in progress")]
    Busy,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Payload too large: {size} bytes exceeds {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for DocentError {
    fn from(err: toml::de::Error) -> Self {
        DocentError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DocentError {
    fn from(err: toml::ser::Error) -> Self {
        DocentError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DocentError {
    fn from(err: serde_json::Error) -> Self {
        DocentError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Docent operations.
pub type Result<T> = std::result::Result<T, DocentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocentError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_pipeline_variants() {
        let cases: Vec<(DocentError, &str)> = vec![
            (
                DocentError::Upload("no file".to_string()),
                "Upload error: no file",
            ),
            (
                DocentError::Extraction("scanned image".to_string()),
                "Extraction error: scanned image",
            ),
            (
                DocentError::IndexBuild("no chunks".to_string()),
                "Index build error: no chunks",
            ),
            (
                DocentError::Generation("timeout".to_string()),
                "Generation error: timeout",
            ),
            (DocentError::EmptyInput, "Empty input"),
            (DocentError::Busy, "Document ingestion already in progress"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DocentError = io_err.into();
        assert!(matches!(err, DocentError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let docent_err: DocentError = err.unwrap_err().into();
        assert!(matches!(docent_err, DocentError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let docent_err: DocentError = err.unwrap_err().into();
        assert!(matches!(docent_err, DocentError::Serialization(_)));
    }

    #[test]
    fn test_payload_too_large_display() {
        let err = DocentError::PayloadTooLarge {
            size: 200,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "Payload too large: 200 bytes exceeds 100 bytes"
        );
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
