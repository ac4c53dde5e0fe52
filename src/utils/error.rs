use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("Management API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("Task {task} did not complete within {seconds}s")]
    TaskTimeout { task: String, seconds: u64 },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("Response parsing error: {message}")]
    ParseError { message: String },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Remote,
    Input,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigrationError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::IoError(_) => ErrorCategory::Network,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::ApiError { .. }
            | Self::TaskFailed { .. }
            | Self::TaskTimeout { .. }
            | Self::NotFound { .. } => ErrorCategory::Remote,
            Self::InvalidInput { .. } => ErrorCategory::Input,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::ParseError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::InvalidInput { .. } => ErrorSeverity::Low,
            Self::HttpError(_) | Self::TaskTimeout { .. } => ErrorSeverity::Medium,
            Self::ApiError { .. }
            | Self::TaskFailed { .. }
            | Self::AuthenticationError { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::SerializationError(_) | Self::ParseError { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    /// 失敗時給操作人員的下一步建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check that the vCenter host is reachable and that the TLS trust setting matches its certificate"
            }
            ErrorCategory::Authentication => "Verify the user name and password and that the account is not locked",
            ErrorCategory::Remote => {
                "Inspect the recent tasks in vCenter; changes already applied are not rolled back automatically"
            }
            ErrorCategory::Input => "Re-run the tool and enter one of the listed values",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags and try again",
            ErrorCategory::Internal => "Re-run with --verbose and report the log output",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(e) if e.is_connect() => {
                "Could not connect to the management endpoint".to_string()
            }
            Self::HttpError(e) if e.is_timeout() => {
                "The management endpoint did not answer in time".to_string()
            }
            Self::AuthenticationError { .. } => "Login to the management endpoint failed".to_string(),
            Self::TaskFailed { message, .. } => format!("A vCenter task failed: {}", message),
            Self::TaskTimeout { seconds, .. } => {
                format!("A vCenter task was still running after {} seconds", seconds)
            }
            other => other.to_string(),
        }
    }

    /// 對應的程序退出碼，任何錯誤都不為 0
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
