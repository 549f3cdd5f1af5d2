use thiserror::Error;

/// Result type for receiver operations
pub type Result<T> = std::result::Result<T, AvrError>;

/// Errors that can occur when talking to a receiver
#[derive(Error, Debug)]
pub enum AvrError {
    /// Transport-level failure (serial port, TCP socket)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Link is not open
    #[error("Not connected")]
    NotConnected,

    /// Driver task or transport was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Nothing arrived before the read deadline
    #[error("Timeout")]
    Timeout,

    /// A command or configuration value is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation does not apply to the current receiver state
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Line pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl AvrError {
    /// Whether this error means the link should be treated as down
    pub fn is_link_down(&self) -> bool {
        matches!(
            self,
            AvrError::Transport(_) | AvrError::Io(_) | AvrError::NotConnected | AvrError::ConnectionClosed
        )
    }
}
