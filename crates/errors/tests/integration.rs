//! Integration tests for error types

#[cfg(test)]
mod tests {
    use spark_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = BuildError::Busy.into();
        assert!(matches!(err, Error::Build(BuildError::Busy)));
        assert_eq!(err.as_build(), Some(&BuildError::Busy));

        let err: Error = ProjectError::UnknownFragment { id: "intro".into() }.into();
        assert!(matches!(err, Error::Project(_)));
        assert!(err.as_build().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = BuildError::StaleUpstream {
            fragment: "intro".into(),
            transformer: "uppercase".into(),
            upstream: "trim".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("intro"));
        assert!(msg.contains("trim"));
    }

    #[test]
    fn test_user_facing_surface_delegates() {
        let err: Error = BuildError::Busy.into();
        assert_eq!(err.user_code(), Some("build.busy"));
        assert!(err.user_hint().is_some());
        assert!(err.is_retryable());

        let err: Error = ProjectError::UnknownTransformer {
            name: "compile".into(),
        }
        .into();
        assert_eq!(err.user_message(), "transformer not found: compile");
        assert_eq!(err.user_code(), Some("project.unknown_transformer"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transform_failure_is_not_retryable() {
        let err = BuildError::Transform {
            transformer: "fail".into(),
            message: "boom".into(),
        };
        assert_eq!(err.user_message(), "transformer fail failed: boom");
        assert_eq!(err.user_code(), Some("build.transform_failed"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(&io, "/tmp/spark.toml");
        match &err {
            Error::Io { kind, path, .. } => {
                assert_eq!(*kind, std::io::ErrorKind::NotFound);
                assert_eq!(path.as_deref(), Some("/tmp/spark.toml"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.user_code(), Some("error.io"));

        let bare: Error = std::io::Error::other("disk").into();
        assert_eq!(bare.user_message(), "disk");
    }

    #[test]
    fn test_json_error_becomes_internal() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(err.user_code(), Some("error.internal"));
    }
}
