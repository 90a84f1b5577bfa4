use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A grid coordinate outside `keys x steps`.
    IndexOutOfRange {
        key: usize,
        step: usize,
        keys: usize,
        steps: usize,
    },
    InvalidBpm(String),
    InvalidConfig(String),
    Audio(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IndexOutOfRange { key, step, keys, steps } => write!(
                f,
                "Index Error: cell ({}, {}) outside {} keys x {} steps",
                key, step, keys, steps
            ),
            Error::InvalidBpm(msg) => write!(f, "Invalid BPM: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid Config: {}", msg),
            Error::Audio(msg) => write!(f, "Audio Error: {}", msg),
        }
    }
}
