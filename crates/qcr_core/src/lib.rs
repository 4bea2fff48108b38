pub mod config;
pub mod demo;
pub mod domain;
pub mod error;
pub mod ingest;

#[cfg(test)]
mod tests {
    use super::error::{AppError, ErrorCategory};

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("INDEX_STORE_FAILED", "write failed").with_retryable(false);
        assert_eq!(err.code, "INDEX_STORE_FAILED");
        assert_eq!(err.message, "write failed");
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "[INDEX_STORE_FAILED] write failed");
    }

    #[test]
    fn error_codes_map_to_categories() {
        let cases = [
            ("DATA_FOLDER_NOT_FOUND", ErrorCategory::MissingResource),
            ("INGEST_PARSE_FAILED", ErrorCategory::Parse),
            ("INDEX_EMPTY_INPUT", ErrorCategory::EmptyInput),
            ("LLM_FAILED", ErrorCategory::ExternalService),
            ("INDEX_NOT_READY", ErrorCategory::NotReady),
            ("CONFIG_MISSING_API_KEY", ErrorCategory::Config),
            ("INDEX_INCOMPATIBLE", ErrorCategory::Storage),
            ("QUERY_EMPTY", ErrorCategory::InvalidInput),
            ("SOMETHING_ELSE", ErrorCategory::Other),
        ];
        for (code, expected) in cases {
            assert_eq!(AppError::new(code, "x").category(), expected, "code={code}");
        }
    }

    #[test]
    fn app_error_serializes_for_json_output() {
        let err = AppError::new("EMBEDDINGS_FAILED", "API request failed")
            .with_details("status=503")
            .with_retryable(true);
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["code"], "EMBEDDINGS_FAILED");
        assert_eq!(v["retryable"], true);
        assert_eq!(serde_json::to_value(err.category()).unwrap(), "external_service");
    }
}
