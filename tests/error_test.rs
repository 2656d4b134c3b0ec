//! Tests for error types

use rayo_db::Error;

#[test]
fn test_parse_error() {
    let error = Error::Parse("unexpected token".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("SQL parse error"));
    assert!(error_str.contains("unexpected token"));
}

#[test]
fn test_signature_mismatch_error() {
    let error = Error::SignatureMismatch {
        udf: "score".to_string(),
        expected: "(Float64) -> Float64".to_string(),
        actual: "2 argument(s)".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("score"));
    assert!(error_str.contains("(Float64) -> Float64"));
    assert!(error_str.contains("2 argument(s)"));
}

#[test]
fn test_unknown_function_error() {
    let error = Error::UnknownFunction("predict".to_string());
    assert!(format!("{error}").contains("'predict' is not registered"));
}

#[test]
fn test_unknown_table_error() {
    let error = Error::UnknownTable("ratings".to_string());
    assert!(format!("{error}").contains("'ratings' is not registered"));
}

#[test]
fn test_degenerate_error_names_count() {
    let error = Error::Degenerate(2);
    let error_str = format!("{error}");
    assert!(error_str.contains("2"));
    assert!(error_str.contains("at least 3"));
}

#[test]
fn test_model_error() {
    let error = Error::Model("truncated file".to_string());
    assert!(format!("{error}").contains("Model error: truncated file"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_storage_error() {
    let error = Error::Storage("corrupt parquet".to_string());
    assert!(format!("{error}").contains("Storage error: corrupt parquet"));
}
