use std::fmt;

use thiserror::Error;

use crate::category::Category;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Bad option: {0}")]
    BadOption(String),

    #[error("Bad value for option: {0}")]
    BadValue(String),

    #[error("Empty configuration: {0}")]
    EmptyConfig(String),

    #[error("No provider available for category '{0}'")]
    NoProvider(Category),

    #[error("Unknown getter: {0}")]
    UnknownGetter(String),

    #[error("Ignored cache")]
    IgnoredCache,

    #[error("Stopped by callback")]
    StoppedByCallback,

    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl MetadataError {
    /// Classify this error into the public error-code vocabulary.
    ///
    /// Transport and parse failures are reported as `BadValue`: when they
    /// escape at all it is because a caller-supplied URL or payload was unusable.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadOption(_) => ErrorCode::BadOption,
            Self::BadValue(_) => ErrorCode::BadValue,
            Self::EmptyConfig(_) | Self::Runtime(_) => ErrorCode::EmptyConfig,
            Self::NoProvider(_) => ErrorCode::NoProvider,
            Self::UnknownGetter(_) => ErrorCode::UnknownGetter,
            Self::IgnoredCache => ErrorCode::IgnoredCache,
            Self::StoppedByCallback => ErrorCode::StoppedByCallback,
            Self::Parse(_) | Self::Io(_) | Self::Bridge(_) => ErrorCode::BadValue,
        }
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// Flat status code paired with every public operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok,
    BadOption,
    BadValue,
    EmptyConfig,
    NoProvider,
    UnknownGetter,
    IgnoredCache,
    StoppedByCallback,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::Ok,
        ErrorCode::BadOption,
        ErrorCode::BadValue,
        ErrorCode::EmptyConfig,
        ErrorCode::NoProvider,
        ErrorCode::UnknownGetter,
        ErrorCode::IgnoredCache,
        ErrorCode::StoppedByCallback,
    ];

    /// Numeric value, stable across releases
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human readable description of the code
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "all okay",
            Self::BadOption => "bad option",
            Self::BadValue => "bad value for option",
            Self::EmptyConfig => "NULL pointer for struct",
            Self::NoProvider => "No provider specified",
            Self::UnknownGetter => "Unknown ID for getter",
            Self::IgnoredCache => "Ignored cache",
            Self::StoppedByCallback => "Stopped by callback",
        }
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Collapse an operation result into its status code
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(err) => err.code(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(ErrorCode::Ok.description(), "all okay");
        assert_eq!(ErrorCode::BadValue.description(), "bad value for option");
        assert_eq!(ErrorCode::EmptyConfig.description(), "NULL pointer for struct");
        assert_eq!(ErrorCode::StoppedByCallback.to_string(), "Stopped by callback");
    }

    #[test]
    fn test_numeric_codes_round_trip() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(8), None);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            MetadataError::NoProvider(Category::Lyric).code(),
            ErrorCode::NoProvider
        );
        assert_eq!(
            MetadataError::UnknownGetter("x".into()).code(),
            ErrorCode::UnknownGetter
        );
        assert_eq!(MetadataError::Parse("x".into()).code(), ErrorCode::BadValue);

        let ok: Result<()> = Ok(());
        assert_eq!(ErrorCode::from_result(&ok), ErrorCode::Ok);
        let err: Result<()> = Err(MetadataError::BadOption("nope".into()));
        assert_eq!(ErrorCode::from_result(&err), ErrorCode::BadOption);
    }
}
