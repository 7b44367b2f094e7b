use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: u64,
        column: u64,
    },

    #[error("Remote execution failed{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    RemoteError { status: Option<u16>, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Remote,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RunnerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::IoError(_) | Self::ParseError { .. } => ErrorCategory::Input,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::RemoteError { .. } => ErrorCategory::Remote,
            Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    /// 單一語句失敗屬於可恢復錯誤，其餘皆為啟動階段的致命錯誤
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RemoteError { .. } => ErrorSeverity::Medium,
            Self::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.severity() <= ErrorSeverity::Medium
    }

    /// Process exit code for an error that ends the run.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High | ErrorSeverity::Critical => 1,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingConfigError { field } => match field.as_str() {
                "endpoint" => "Set SUPABASE_URL or pass --url".to_string(),
                "api_key" => "Set SUPABASE_SERVICE_ROLE_KEY or pass --key".to_string(),
                other => format!("Provide a value for '{}'", other),
            },
            Self::InvalidConfigValueError { field, .. } => {
                format!("Check the value of '{}' on the command line or in the config file", field)
            }
            Self::ConfigError { .. } | Self::TomlError(_) => {
                "Make sure the config file exists and is valid TOML".to_string()
            }
            Self::IoError(_) => "Check that the script path exists and is readable".to_string(),
            Self::ParseError { .. } => {
                "Look for an unterminated string, quoted identifier or dollar-quoted body".to_string()
            }
            Self::HttpError(_) => "Check network connectivity and the endpoint URL".to_string(),
            Self::RemoteError { status, .. } => match status {
                Some(401) | Some(403) => "Check that the access key has permission to call the RPC".to_string(),
                Some(404) => "Check that the exec-SQL function exists on the remote database".to_string(),
                _ => "Inspect the statement and the remote error message".to_string(),
            },
            Self::SerializationError(_) => "This is a bug, please report it".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("Required configuration '{}' is missing", field)
            }
            Self::IoError(e) => format!("Could not read input: {}", e),
            Self::ParseError { line, column, .. } => {
                format!("Could not split the script (line {}, column {})", line, column)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_exit_with_one() {
        let missing = RunnerError::MissingConfigError {
            field: "endpoint".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Configuration);
        assert_eq!(missing.exit_code(), 1);
        assert!(!missing.is_recoverable());
        assert!(missing.recovery_suggestion().contains("SUPABASE_URL"));

        let parse = RunnerError::ParseError {
            message: "Unterminated string literal".to_string(),
            line: 3,
            column: 7,
        };
        assert_eq!(parse.category(), ErrorCategory::Input);
        assert_eq!(parse.exit_code(), 1);
    }

    #[test]
    fn test_remote_error_is_recoverable() {
        let err = RunnerError::remote(Some(400), "relation \"x\" does not exist");
        assert!(err.is_recoverable());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "Remote execution failed (HTTP 400): relation \"x\" does not exist"
        );

        let transport = RunnerError::remote(None, "connection refused");
        assert_eq!(transport.to_string(), "Remote execution failed: connection refused");
    }
}
