//! Unit tests for the error taxonomy

use crate::error::Error;

#[test]
fn test_surface_outdated_is_the_only_retryable_error() {
    assert!(Error::SurfaceOutdated.is_retryable());

    assert!(!Error::BackendError("x".to_string()).is_retryable());
    assert!(!Error::OutOfMemory.is_retryable());
    assert!(!Error::InvalidResource("x".to_string()).is_retryable());
    assert!(!Error::InitializationFailed("x".to_string()).is_retryable());
    assert!(!Error::BindingContract("x".to_string()).is_retryable());
}

#[test]
fn test_display_messages() {
    assert_eq!(
        Error::BackendError("boom".to_string()).to_string(),
        "Backend error: boom"
    );
    assert_eq!(Error::OutOfMemory.to_string(), "Out of GPU memory");
    assert_eq!(
        Error::BindingContract("slot 3".to_string()).to_string(),
        "Binding contract violation: slot 3"
    );
    assert_eq!(
        Error::SurfaceOutdated.to_string(),
        "Presentation surface out of date"
    );
}

#[test]
fn test_errors_compare_by_value() {
    assert_eq!(Error::SurfaceOutdated, Error::SurfaceOutdated);
    assert_ne!(
        Error::BackendError("a".to_string()),
        Error::BackendError("b".to_string())
    );
}
