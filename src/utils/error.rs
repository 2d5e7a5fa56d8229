use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unexpected payload: {message}")]
    UnexpectedPayload { message: String },

    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Settings error: {message}")]
    SettingsError { message: String },

    #[error("Unknown location: {input}")]
    UnknownLocation { input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MenuError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MenuError::ApiError(_) | MenuError::InvalidUrl { .. } => ErrorCategory::Network,
            MenuError::CsvError(_)
            | MenuError::SerializationError(_)
            | MenuError::UnexpectedPayload { .. } => ErrorCategory::Data,
            MenuError::ConfigValidationError { .. }
            | MenuError::InvalidConfigValueError { .. }
            | MenuError::UnknownLocation { .. } => ErrorCategory::Configuration,
            MenuError::IoError(_) | MenuError::SettingsError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 設定檔寫不進去時仍可顯示菜單
            MenuError::SettingsError { .. } => ErrorSeverity::Low,
            MenuError::ApiError(_) | MenuError::UnexpectedPayload { .. } => ErrorSeverity::Medium,
            MenuError::InvalidUrl { .. }
            | MenuError::ConfigValidationError { .. }
            | MenuError::InvalidConfigValueError { .. }
            | MenuError::UnknownLocation { .. }
            | MenuError::CsvError(_)
            | MenuError::SerializationError(_) => ErrorSeverity::High,
            MenuError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MenuError::ApiError(e) if e.is_timeout() => {
                "The menu server did not answer in time".to_string()
            }
            MenuError::ApiError(_) => "Could not reach the menu server".to_string(),
            MenuError::UnexpectedPayload { .. } => {
                "The menu server sent something that is not a menu".to_string()
            }
            MenuError::InvalidUrl { url, .. } => format!("The menu URL '{}' is invalid", url),
            MenuError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            MenuError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            MenuError::UnknownLocation { input } => {
                format!("'{}' is not a known cafeteria", input)
            }
            MenuError::SettingsError { .. } => {
                "Your location choice could not be remembered".to_string()
            }
            MenuError::CsvError(_) | MenuError::SerializationError(_) => {
                "The menu could not be written in the requested format".to_string()
            }
            MenuError::IoError(e) => format!("A file operation failed: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check your connection and the configured base URL",
            ErrorCategory::Data => "Try a different --format",
            ErrorCategory::Configuration => {
                "Check the command line flags and the [api]/[display] sections of the config file"
            }
            ErrorCategory::System => "Check file permissions of the settings directory",
        }
    }
}

pub type Result<T> = std::result::Result<T, MenuError>;
