//! Configuration error types
//!
//! Error codes:
//! - MARK_CONFIG_READ_FAILED
//! - MARK_CONFIG_INVALID_JSON
//! - MARK_CONFIG_INVALID_VALUE

use std::fmt;

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Config file could not be read
    ReadFailed,
    /// Config file is not valid JSON for the expected shape
    InvalidJson,
    /// A value is out of range
    InvalidValue,
}

impl ConfigErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed => "MARK_CONFIG_READ_FAILED",
            Self::InvalidJson => "MARK_CONFIG_INVALID_JSON",
            Self::InvalidValue => "MARK_CONFIG_INVALID_VALUE",
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::ReadFailed, msg)
    }

    pub fn invalid_json(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::InvalidJson, msg)
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::InvalidValue, msg)
    }

    /// Get the error code
    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid_value("page_size must be > 0");
        let display = err.to_string();
        assert!(display.contains("MARK_CONFIG_INVALID_VALUE"));
        assert!(display.contains("page_size"));
    }
}
