use dosa_traits::PinId;
use thiserror::Error;

/// Why a controller could not be constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing digital I/O backend")]
    MissingIo,
    #[error("missing pin map")]
    MissingPins,
    #[error("pin {pin} assigned to both {first} and {second}")]
    DuplicatePin {
        pin: PinId,
        first: &'static str,
        second: &'static str,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// A command from the control channel that could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
    #[error("invalid payload for {topic}: {payload:?} ({expected})")]
    InvalidPayload {
        topic: &'static str,
        payload: String,
        expected: &'static str,
    },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
