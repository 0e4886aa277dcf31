//! Error type shared by the library and the `atboot` binary.
//!
//! Every failure carries the process exit code it maps to:
//!
//! - `2`: input/IO problems (missing or malformed survey files, bad arguments)
//! - `3`: insufficient data (no records for a class, empty tables)
//! - `4`: numerical failures (singular covariance, no valid fit, no haul)

pub const EXIT_INPUT: u8 = 2;
pub const EXIT_INSUFFICIENT: u8 = 3;
pub const EXIT_NUMERICAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::new(EXIT_INSUFFICIENT, message)
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERICAL, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
