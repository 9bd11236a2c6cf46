//! Unit tests for error.rs
//!
//! Tests Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_cycle_error_display() {
    let err = Error::CycleError("node 'arm' is an ancestor of 'root'".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Cycle error"));
    assert!(display.contains("ancestor"));
}

#[test]
fn test_load_error_display() {
    let err = Error::LoadError("stream 'sky.png' not found".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Load error"));
    assert!(display.contains("sky.png"));
}

#[test]
fn test_conversion_error_display() {
    let err = Error::ConversionError("empty pixel buffer".to_string());
    assert_eq!(format!("{}", err), "Conversion error: empty pixel buffer");
}

#[test]
fn test_lifecycle_error_display() {
    let err = Error::LifecycleError("handle #7 enqueued twice".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Lifecycle error"));
    assert!(display.contains("#7"));
}

#[test]
fn test_invalid_argument_display() {
    let err = Error::InvalidArgument("minRange > maxRange".to_string());
    assert!(format!("{}", err).contains("Invalid argument"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::BackendError("test".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::CycleError("x".to_string()));
    assert!(debug.contains("CycleError"));

    let debug = format!("{:?}", Error::InvalidNode("x".to_string()));
    assert!(debug.contains("InvalidNode"));
}

#[test]
fn test_error_clone_keeps_message() {
    let err1 = Error::LoadError("truncated".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

#[test]
fn test_io_error_converts_to_load_error() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
    let err: Error = io.into();
    match err {
        Error::LoadError(msg) => assert!(msg.contains("missing.png")),
        other => panic!("expected LoadError, got {:?}", other),
    }
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::ConversionError("bad".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(matches!(outer(), Err(Error::ConversionError(_))));
}

#[test]
fn test_io_error_propagation_with_question_mark() {
    fn read() -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        Ok(())
    }

    assert!(matches!(read(), Err(Error::LoadError(_))));
}
