use thiserror::Error;

/// Errors raised by the interval model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("interval index {index} is out of range for {len} active interval(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Adding would exceed the configured maximum under the reject policy.
    #[error("at most {max} interval(s) can be active at once")]
    OverflowRejected { max: usize },

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid custom hours {0:?}: expected a number between 0 and 24")]
    InvalidCustomHours(String),
}
