use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unreachable,
    EmptyProgram,
    Malformed,
    LinkUnavailable,
    InvalidGeometry,
    Io,
}

/// Recoverable failures surfaced by the robot session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RobotError {
    #[error("target ({x:.2}, {y:.2}) is outside the arm workspace")]
    Unreachable { x: f64, y: f64 },
    #[error("program has no saved positions")]
    EmptyProgram,
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("motion link unavailable: {0}")]
    LinkUnavailable(String),
    #[error("program file error: {0}")]
    Io(String),
}

impl RobotError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RobotError::Unreachable { .. } => ErrorCode::Unreachable,
            RobotError::EmptyProgram => ErrorCode::EmptyProgram,
            RobotError::Malformed(_) => ErrorCode::Malformed,
            RobotError::LinkUnavailable(_) => ErrorCode::LinkUnavailable,
            RobotError::Io(_) => ErrorCode::Io,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("link {link} length must be a positive finite number, got {value}")]
    NonPositiveLink { link: u8, value: f64 },
    #[error("offset angle must be finite, got {0}")]
    InvalidOffset(f64),
    #[error("invalid axis range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
}

/// Serializable failure summary for the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&RobotError> for ErrorReport {
    fn from(value: &RobotError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<GeometryError> for ErrorReport {
    fn from(value: GeometryError) -> Self {
        Self::new(ErrorCode::InvalidGeometry, value.to_string())
    }
}
