use thiserror::Error;

/// Failures claiming or driving GPIO lines.

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pin {pin} unavailable: {reason}")]
    PinUnavailable { pin: u8, reason: String },
}

pub type Result<T> = std::result::Result<T, HwError>;
