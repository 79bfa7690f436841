use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Connection refused by server: {message}")]
    ConnectRefused { message: String },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::WebSocketError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Protocol,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::ApiError(_)
            | RelayError::WebSocketError(_)
            | RelayError::HttpStatusError { .. } => ErrorCategory::Network,
            RelayError::ProtocolError { .. } | RelayError::ConnectRefused { .. } => {
                ErrorCategory::Protocol
            }
            RelayError::ConfigError { .. }
            | RelayError::MissingConfigError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            RelayError::SerializationError(_) | RelayError::ValidationError { .. } => {
                ErrorCategory::Data
            }
            RelayError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Protocol | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否屬於可重試的錯誤
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::HttpStatusError { status, .. } => *status >= 500,
            _ => self.severity() == ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RelayError::ApiError(_) | RelayError::WebSocketError(_) => {
                "Check network connectivity and that the server is reachable".to_string()
            }
            RelayError::HttpStatusError { status: 401, .. }
            | RelayError::HttpStatusError { status: 403, .. } => {
                "The session token was rejected; sign in again to obtain a new one".to_string()
            }
            RelayError::HttpStatusError { .. } => {
                "The server returned an error; retry later".to_string()
            }
            RelayError::ConnectRefused { .. } => {
                "The real-time server rejected the handshake; verify the session token".to_string()
            }
            RelayError::ProtocolError { .. } => {
                "The server speaks an unexpected protocol; check server.socket_path".to_string()
            }
            RelayError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file", field)
            }
            RelayError::InvalidConfigValueError { field, .. }
            | RelayError::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}' in the configuration file", field)
            }
            RelayError::ConfigError { .. } => "Review the configuration file".to_string(),
            RelayError::ValidationError { .. } => "Correct the input and try again".to_string(),
            RelayError::SerializationError(_) => {
                "The server response could not be decoded; check server version".to_string()
            }
            RelayError::IoError(_) => "Check file permissions and disk space".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the server: {}", self),
            ErrorCategory::Protocol => format!("Real-time connection failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Invalid data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}
