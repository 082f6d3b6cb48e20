use std::io::ErrorKind;

use binrpc_codec::CodecError;
use binrpc_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (endpoint parsing, connect, socket options).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Codec-level error, including I/O errors on the stream.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ClientError {
    /// Whether the error comes from a read or write timeout on the stream.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Codec(CodecError::Io(err))
            | ClientError::Transport(TransportError::Io(err)) => {
                matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
            }
            ClientError::Transport(TransportError::Connect { source, .. }) => {
                source.kind() == ErrorKind::TimedOut
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
