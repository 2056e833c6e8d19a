use std::fmt;
use thiserror::Error;

/// Workbench error codes, grouped by the stage that produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    // General errors
    NoError = 0,
    Failed = 1,
    Internal = 4,
    BadParameter = 10,
    SerializationError = 40,
    FileError = 41,

    // Connection and configuration errors
    AuthenticationFailed = 1100,
    SettingsMissing = 1101,
    SettingsInvalid = 1102,

    // Traversal errors
    QueryFailed = 1500,
    QueryConnectionClosed = 1501,
    GraphsonMalformed = 1502,

    // Compute engine errors
    TransportFailed = 2000,
    PayloadMissing = 2001,
    AlgorithmFailed = 2002,
    AlgorithmResultMalformed = 2003,
    ColumnWriteFailed = 2004,
}

impl ErrorCode {
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ErrorCode::NoError,
            1 => ErrorCode::Failed,
            4 => ErrorCode::Internal,
            10 => ErrorCode::BadParameter,
            40 => ErrorCode::SerializationError,
            41 => ErrorCode::FileError,
            1100 => ErrorCode::AuthenticationFailed,
            1101 => ErrorCode::SettingsMissing,
            1102 => ErrorCode::SettingsInvalid,
            1500 => ErrorCode::QueryFailed,
            1501 => ErrorCode::QueryConnectionClosed,
            1502 => ErrorCode::GraphsonMalformed,
            2000 => ErrorCode::TransportFailed,
            2001 => ErrorCode::PayloadMissing,
            2002 => ErrorCode::AlgorithmFailed,
            2003 => ErrorCode::AlgorithmResultMalformed,
            2004 => ErrorCode::ColumnWriteFailed,
            _ => ErrorCode::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::NoError => write!(f, "no error"),
            ErrorCode::Failed => write!(f, "failed"),
            ErrorCode::Internal => write!(f, "internal error"),
            ErrorCode::BadParameter => write!(f, "bad parameter"),
            ErrorCode::AuthenticationFailed => write!(f, "authentication failed"),
            ErrorCode::SettingsMissing => write!(f, "engine settings missing"),
            ErrorCode::QueryFailed => write!(f, "query failed"),
            ErrorCode::QueryConnectionClosed => write!(f, "connection closed"),
            ErrorCode::TransportFailed => write!(f, "transport failed"),
            ErrorCode::AlgorithmFailed => write!(f, "algorithm failed"),
            ErrorCode::ColumnWriteFailed => write!(f, "column write failed"),
            _ => write!(f, "error code {}", self.as_u32()),
        }
    }
}

/// Main workbench error type
#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error("Authenticator failed: {0}")]
    Authentication(String),

    #[error("{0}")]
    Query(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Algorithm failed: {0}")]
    EngineAlgorithm(String),

    #[error("Column write failed: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("GraphSON error: {0}")]
    Graphson(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl WorkbenchError {
    pub fn authentication(message: impl Into<String>) -> Self {
        WorkbenchError::Authentication(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        WorkbenchError::Query(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        WorkbenchError::Transport(message.into())
    }

    pub fn graphson(message: impl Into<String>) -> Self {
        WorkbenchError::Graphson(message.into())
    }

    pub fn settings_missing() -> Self {
        WorkbenchError::Config("compute engine is not connected, call connect first".to_string())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            WorkbenchError::Authentication(_) => ErrorCode::AuthenticationFailed,
            WorkbenchError::Query(_) => ErrorCode::QueryFailed,
            WorkbenchError::Transport(_) => ErrorCode::TransportFailed,
            WorkbenchError::EngineAlgorithm(_) => ErrorCode::AlgorithmFailed,
            WorkbenchError::Persistence(_) => ErrorCode::ColumnWriteFailed,
            WorkbenchError::Validation(_) => ErrorCode::BadParameter,
            WorkbenchError::Config(_) => ErrorCode::SettingsMissing,
            WorkbenchError::Graphson(_) => ErrorCode::GraphsonMalformed,
            WorkbenchError::Io(_) => ErrorCode::FileError,
            WorkbenchError::Serde(_) => ErrorCode::SerializationError,
        }
    }
}

impl From<reqwest::Error> for WorkbenchError {
    fn from(err: reqwest::Error) -> Self {
        WorkbenchError::Transport(err.to_string())
    }
}

impl From<validator::ValidationErrors> for WorkbenchError {
    fn from(err: validator::ValidationErrors) -> Self {
        WorkbenchError::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for WorkbenchError {
    fn from(err: config::ConfigError) -> Self {
        WorkbenchError::Config(err.to_string())
    }
}

/// Result type alias for workbench operations
pub type Result<T> = std::result::Result<T, WorkbenchError>;

/// Macro for early return with a query error
#[macro_export]
macro_rules! query_bail {
    ($($arg:tt)*) => {
        return Err($crate::common::error::WorkbenchError::query(format!($($arg)*)))
    };
}

/// Macro for ensuring a GraphSON shape or returning an error
#[macro_export]
macro_rules! graphson_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::common::error::WorkbenchError::graphson(format!($($arg)*)));
        }
    };
}
