//! Error types.
//!
//! Only startup and file I/O can fail. The steady-state pipeline (channel
//! arrival, tick, fusion) is infallible.

use thiserror::Error;

/// Invalid or unreadable configuration. Fatal to startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter {name} = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn invalid(
        name: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        ConfigError::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        }
    }
}

/// Bag file recording and playback failures.
#[derive(Debug, Error)]
pub enum BagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] postcard::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type BagResult<T> = std::result::Result<T, BagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = ConfigError::invalid("io_ratio", 0, ">= 1");
        assert_eq!(err.to_string(), "invalid parameter io_ratio = 0: expected >= 1");
    }
}
