//! Tests for error types

use kubesre::error::SreError;

#[test]
fn test_command_error_display() {
    let err = SreError::command(&["get", "pods", "-A"], "connection refused");
    assert_eq!(err.to_string(), "Command `get pods -A` failed: connection refused");
}

#[test]
fn test_not_found_display() {
    let err = SreError::NotFound {
        kind: "pods".to_string(),
        name: "web-1".to_string(),
    };
    assert_eq!(err.to_string(), "Resource not found: pods/web-1");
}

#[test]
fn test_collaborator_failures() {
    assert!(SreError::command(&["get"], "x").is_collaborator_failure());
    assert!(SreError::Timeout("kubectl get pods".into()).is_collaborator_failure());
    assert!(SreError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "kubectl")).is_collaborator_failure());

    assert!(!SreError::Parse("bad".into()).is_collaborator_failure());
    assert!(!SreError::InvalidArgument("empty".into()).is_collaborator_failure());
    assert!(!SreError::UnsupportedKind("foo".into()).is_collaborator_failure());
}

#[test]
fn test_from_serde_json_error_is_parse() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: SreError = json_err.into();
    assert!(matches!(err, SreError::Parse(_)));
}

#[test]
fn test_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: SreError = io_err.into();
    assert!(err.to_string().contains("denied"));
}

#[test]
fn test_context_errors_display() {
    assert_eq!(SreError::ContextNotFound("prod".into()).to_string(), "Context not found: prod");
    assert!(SreError::NoContext.to_string().contains("current context"));
}
