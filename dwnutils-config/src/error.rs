use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A type alias for a `Result` that uses `ConfigError` as the error type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The main error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field that must not be empty is empty.
    #[error("Config field cannot be empty: {0}")]
    EmptyField(&'static str),

    /// A provisioned capacity of zero was given.
    #[error("Capacity must be greater than zero: {0}")]
    ZeroCapacity(&'static str),

    /// Io error.
    #[error("Io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Toml deserialization error.
    #[error("Toml deserialization error: {0}")]
    TomlError(#[from] toml::de::Error),
}
