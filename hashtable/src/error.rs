/// Errors returned by [`LightMap`](crate::LightMap) and its [`Config`](crate::Config)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key is longer than the configured key capacity
    OversizeKey { len: usize, capacity: usize },

    /// Value is longer than the configured value capacity
    OversizeValue { len: usize, capacity: usize },

    /// Zero-length keys cannot be stored, length 0 marks an empty slot
    EmptyKey,

    /// Configuration rejected by [`Config::build`](crate::Config::build)
    InvalidConfig(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OversizeKey { len, capacity } => {
                write!(f, "key of {len} bytes exceeds key capacity {capacity}")
            }
            Self::OversizeValue { len, capacity } => {
                write!(f, "value of {len} bytes exceeds value capacity {capacity}")
            }
            Self::EmptyKey => write!(f, "empty keys are not supported"),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Map result
pub type Result<T> = std::result::Result<T, Error>;
