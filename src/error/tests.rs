//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("invalid weight");
        assert_eq!(err.to_string(), "configuration error: invalid weight");
    }

    #[test]
    fn test_host_error_unknown_command() {
        let err = HostError::UnknownCommand("editor.fold".to_string());
        assert_eq!(err.to_string(), "unknown command 'editor.fold'");
    }

    #[test]
    fn test_host_error_read() {
        let err = HostError::read("/tmp/a.rs", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to read '/tmp/a.rs': permission denied"
        );
    }

    #[test]
    fn test_host_error_conversion() {
        let host_err = HostError::SymbolQuery("index not ready".to_string());
        let err: Error = host_err.into();
        assert!(matches!(err, Error::Host(_)));
    }

    #[test]
    fn test_provider_error_conversion() {
        let provider_err = ProviderError::Enumeration {
            provider: "symbols",
            reason: "timeout".to_string(),
        };
        assert_eq!(provider_err.to_string(), "symbols provider failed: timeout");
        let err: Error = provider_err.into();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_watcher_error_conversion() {
        let watch_err = WatcherError::WatchFailed {
            path: "/tmp/test".to_string(),
            reason: "permission denied".to_string(),
        };
        let err: Error = watch_err.into();
        assert!(matches!(err, Error::Watcher(_)));
    }

    #[test]
    fn test_invalid_pattern_display() {
        let err = WatcherError::InvalidPattern {
            pattern: "[".to_string(),
            reason: "unclosed class".to_string(),
        };
        assert!(err.to_string().contains("invalid pattern '['"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_action_error() {
        let err = Error::action("command exploded");
        assert_eq!(err.to_string(), "action failed: command exploded");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(Error::config("test error"))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::Action("something went wrong".to_string());
        let debug_str = format!("{err:?}");
        assert!(debug_str.contains("Action"));
        assert!(debug_str.contains("something went wrong"));
    }
}
