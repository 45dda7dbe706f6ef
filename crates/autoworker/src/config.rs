//! Worker configuration.

use workwire::DEFAULT_ID_LENGTH;

/// Shortest accepted correlation id. 8 letters is about 37 bits.
pub const MIN_ID_LENGTH: usize = 8;
pub const MAX_ID_LENGTH: usize = 64;

pub const DEFAULT_THREAD_NAME: &str = "autoworker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    IdLengthOutOfRange(usize),
    EmptyThreadName,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdLengthOutOfRange(len) => write!(
                f,
                "id length {} is outside {}..={}",
                len, MIN_ID_LENGTH, MAX_ID_LENGTH
            ),
            Self::EmptyThreadName => write!(f, "worker thread name must not be empty"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Letters per correlation id.
    pub id_length: usize,
    /// Name of the OS thread a `ThreadHost` spawns.
    pub thread_name: String,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_length(mut self, id_length: usize) -> Self {
        self.id_length = id_length;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.id_length) {
            return Err(Error::IdLengthOutOfRange(self.id_length));
        }
        if self.thread_name.is_empty() {
            return Err(Error::EmptyThreadName);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_length: DEFAULT_ID_LENGTH,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
