//! Defines the reason codes of the disconnect message.

use std::fmt;

/// The reason sent along with a disconnect message.
///
/// See [RFC 4253 section 11.1](https://datatracker.ietf.org/doc/html/rfc4253#section-11.1).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DisconnectReason {
    /// `SSH_DISCONNECT_HOST_NOT_ALLOWED_TO_CONNECT`
    HostNotAllowedToConnect,
    /// `SSH_DISCONNECT_PROTOCOL_ERROR`
    ProtocolError,
    /// `SSH_DISCONNECT_KEY_EXCHANGE_FAILED`
    KeyExchangeFailed,
    /// `SSH_DISCONNECT_MAC_ERROR`
    MacError,
    /// `SSH_DISCONNECT_COMPRESSION_ERROR`
    CompressionError,
    /// `SSH_DISCONNECT_SERVICE_NOT_AVAILABLE`
    ServiceNotAvailable,
    /// `SSH_DISCONNECT_PROTOCOL_VERSION_NOT_SUPPORTED`
    ProtocolVersionNotSupported,
    /// `SSH_DISCONNECT_HOST_KEY_NOT_VERIFIABLE`
    HostKeyNotVerifiable,
    /// `SSH_DISCONNECT_CONNECTION_LOST`
    ConnectionLost,
    /// `SSH_DISCONNECT_BY_APPLICATION`
    ByApplication,
    /// `SSH_DISCONNECT_TOO_MANY_CONNECTIONS`
    TooManyConnections,
    /// `SSH_DISCONNECT_AUTH_CANCELLED_BY_USER`
    AuthCancelledByUser,
    /// `SSH_DISCONNECT_NO_MORE_AUTH_METHODS_AVAILABLE`
    NoMoreAuthMethodsAvailable,
    /// `SSH_DISCONNECT_ILLEGAL_USER_NAME`
    IllegalUserName,
    /// A reason code without a name in RFC 4253.
    Other(u32),
}

impl DisconnectReason {
    /// Returns the numeric reason code sent on the wire.
    pub fn code(self) -> u32 {
        match self {
            DisconnectReason::HostNotAllowedToConnect => 1,
            DisconnectReason::ProtocolError => 2,
            DisconnectReason::KeyExchangeFailed => 3,
            DisconnectReason::MacError => 5,
            DisconnectReason::CompressionError => 6,
            DisconnectReason::ServiceNotAvailable => 7,
            DisconnectReason::ProtocolVersionNotSupported => 8,
            DisconnectReason::HostKeyNotVerifiable => 9,
            DisconnectReason::ConnectionLost => 10,
            DisconnectReason::ByApplication => 11,
            DisconnectReason::TooManyConnections => 12,
            DisconnectReason::AuthCancelledByUser => 13,
            DisconnectReason::NoMoreAuthMethodsAvailable => 14,
            DisconnectReason::IllegalUserName => 15,
            DisconnectReason::Other(code) => code,
        }
    }
}

impl From<u32> for DisconnectReason {
    fn from(code: u32) -> DisconnectReason {
        match code {
            1 => DisconnectReason::HostNotAllowedToConnect,
            2 => DisconnectReason::ProtocolError,
            3 => DisconnectReason::KeyExchangeFailed,
            5 => DisconnectReason::MacError,
            6 => DisconnectReason::CompressionError,
            7 => DisconnectReason::ServiceNotAvailable,
            8 => DisconnectReason::ProtocolVersionNotSupported,
            9 => DisconnectReason::HostKeyNotVerifiable,
            10 => DisconnectReason::ConnectionLost,
            11 => DisconnectReason::ByApplication,
            12 => DisconnectReason::TooManyConnections,
            13 => DisconnectReason::AuthCancelledByUser,
            14 => DisconnectReason::NoMoreAuthMethodsAvailable,
            15 => DisconnectReason::IllegalUserName,
            other => DisconnectReason::Other(other),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisconnectReason::Other(code) => write!(f, "reason {}", code),
            reason => write!(f, "{:?} ({})", reason, reason.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_survive_conversion() {
        for code in 0..20 {
            assert_eq!(DisconnectReason::from(code).code(), code);
        }

        assert_eq!(DisconnectReason::from(2), DisconnectReason::ProtocolError);
        assert_eq!(DisconnectReason::from(4), DisconnectReason::Other(4));
        assert_eq!(DisconnectReason::ByApplication.code(), 11);
    }
}
