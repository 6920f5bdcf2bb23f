//! The unified error type for the client facade.

use classline_protocol::ProtocolError;
use classline_session::GatewayError;
use classline_transport::TransportError;

/// Everything that can go wrong at the facade surface.
///
/// Transport, protocol, and identity errors pass through transparently;
/// the remaining variants are conditions the facade itself detects.
#[derive(Debug, thiserror::Error)]
pub enum ClasslineError {
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Identity gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A send was attempted while no connection is open.
    ///
    /// Outbound messages are not queued; the caller decides whether to
    /// retry once the connection reports open again.
    #[error("not connected")]
    NotConnected,

    /// The connection manager task is gone.
    #[error("connection manager stopped")]
    ManagerStopped,
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_transport_error_converts_and_displays() {
        let source = TransportError::ConnectFailed(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        let err: ClasslineError = source.into();
        assert!(matches!(err, ClasslineError::Transport(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_gateway_error_converts() {
        let err: ClasslineError = GatewayError::Unauthorized.into();
        assert!(matches!(err, ClasslineError::Gateway(_)));
    }

    #[test]
    fn test_not_connected_display() {
        assert_eq!(ClasslineError::NotConnected.to_string(), "not connected");
    }
}
