//! Defines all the errors that can occur in the transport layer.

pub use definitions::{
    algorithms::{
        AlgorithmCategory, AlgorithmRole, CipherError, CompressionError, HostKeyError,
        KeyExchangeAlgorithmError,
    },
    consts::DisconnectReason,
    ParseError,
};

use std::io;

/// There was an error while sending or receiving packets.
#[derive(Debug, thiserror::Error)]
pub enum CommunicationError {
    /// The input reached its end.
    ///
    /// No more packets will be received after this error.
    #[error("end of input reached")]
    EndOfInput,
    /// There was an IO error while sending or receiving a packet.
    #[error("an io error occured: {0}")]
    Io(#[from] io::Error),
    /// A received packet had an invalid format.
    #[error("a packet had an invalid format")]
    InvalidFormat,
    /// A received packet had an invalid padding.
    #[error("a packet had an invalid padding")]
    InvalidPadding,
    /// A received packet announced a length above the accepted maximum.
    #[error("a packet with length {0} exceeds the maximum packet size")]
    PacketTooLarge(u32),
    /// An outgoing payload of the given length does not fit into a single packet.
    #[error("a payload of {0} bytes does not fit into a packet")]
    PayloadTooLarge(usize),
    /// The MAC on a received packet was invalid.
    #[error("a received MAC was invalid")]
    InvalidMac,
    /// A received packet could not be decompressed successfully.
    #[error("decompression unsuccessful: {0}")]
    Compression(#[from] CompressionError),
    /// The cipher of the connection failed.
    #[error("the cipher failed: {0}")]
    Cipher(#[from] CipherError),
}

impl CommunicationError {
    /// Returns the disconnect reason that matches this error.
    pub fn reason(&self) -> DisconnectReason {
        match self {
            CommunicationError::EndOfInput | CommunicationError::Io(_) => {
                DisconnectReason::ConnectionLost
            }
            CommunicationError::InvalidFormat
            | CommunicationError::InvalidPadding
            | CommunicationError::PacketTooLarge(_)
            | CommunicationError::PayloadTooLarge(_) => DisconnectReason::ProtocolError,
            CommunicationError::InvalidMac => DisconnectReason::MacError,
            CommunicationError::Compression(_) => DisconnectReason::CompressionError,
            CommunicationError::Cipher(_) => DisconnectReason::KeyExchangeFailed,
        }
    }
}

/// A fatal error that ends the connection.
///
/// Every fatal condition is expressed as this error. It carries the reason and description that
/// are sent to the peer in the final disconnect message.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("{reason:?}: {description}")]
pub struct DisconnectError {
    /// The reason sent in the disconnect message.
    pub reason: DisconnectReason,
    /// The human readable description sent in the disconnect message.
    pub description: String,
}

impl DisconnectError {
    /// Creates a new disconnect error.
    pub fn new(reason: DisconnectReason, description: impl Into<String>) -> DisconnectError {
        DisconnectError {
            reason,
            description: description.into(),
        }
    }

    /// Creates a disconnect error for a violation of the protocol.
    pub fn protocol_error(description: impl Into<String>) -> DisconnectError {
        DisconnectError::new(DisconnectReason::ProtocolError, description)
    }
}

impl From<CommunicationError> for DisconnectError {
    fn from(err: CommunicationError) -> DisconnectError {
        DisconnectError::new(err.reason(), err.to_string())
    }
}

impl From<KeyExchangeAlgorithmError> for DisconnectError {
    fn from(err: KeyExchangeAlgorithmError) -> DisconnectError {
        DisconnectError::new(DisconnectReason::KeyExchangeFailed, err.to_string())
    }
}

/// Describes the errors that can occur while building a connection configuration.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum BuildError {
    /// The building failed due to an invalid algorithm.
    #[error("invalid algorithm used: {0}")]
    InvalidAlgorithm(#[from] InvalidAlgorithmError),
    /// The given algorithm category had no algorithms in it.
    #[error("{0}: no algorithm found")]
    EmptyAlgorithmRole(AlgorithmRole),
    /// The given algorithm category requires a "none" algorithm, but none was given.
    #[error("{0}: no \"none\" algorithm found")]
    RequiredNoneAlgorithmMissing(AlgorithmRole),
    /// A host key algorithm could not import its key.
    #[error("host key algorithm {algorithm} could not load its key: {error}")]
    HostKey {
        /// The name of the host key algorithm.
        algorithm: &'static str,
        /// The reason the key could not be loaded.
        error: HostKeyError,
    },
}

/// The software version was illegal according to RFC 4253.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum IllegalVersionError {
    /// The proposed version was empty.
    #[error("the version cannot be empty")]
    Empty,
    /// The proposed version contained a non-ascii character.
    #[error("the version can only contain ascii characters")]
    NonAscii(usize),
    /// The proposed version contained a whitespace character.
    #[error("the version cannot contain whitespace characters")]
    Whitespace(usize),
    /// The proposed version contained a non printable character.
    #[error("the version can only contain printable characters")]
    NonPrintable(usize),
    /// The proposed version contained the `'-'` character.
    #[error("the version cannot contain the '-' character")]
    Minus(usize),
}

/// Contains the reason why an algorithm is invalid.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum InvalidAlgorithmError {
    /// The algorithm name is invalid.
    #[error("algorithm name {algorithm_name:?} is invalid: {name_error}")]
    InvalidName {
        /// The name of the invalid algorithm.
        algorithm_name: String,
        /// The category for which the algorithm is invalid.
        algorithm_category: AlgorithmCategory,
        /// The reason the name is invalid.
        name_error: InvalidNameError,
    },
    /// An algorithm with the same name was already added.
    #[error("algorithm {0:?} was added twice")]
    Duplicate(String),
}

/// Contains the reason why an algorithm name is invalid.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum InvalidNameError {
    /// The name was empty.
    #[error("algorithm name was empty")]
    EmptyName,
    /// The name was too long.
    #[error("algorithm name was too long")]
    TooLong,
    /// The name contained more than one `'@'` character.
    #[error("algorithm name contained too many '@' symbols")]
    TooManyAtSymbols,
    /// The name contained a comma.
    #[error("algorithm name contained the ',' character")]
    CommaUsed,
    /// The name contained the given non ascii character.
    #[error("algorithm name contained a non ascii character: {0:?}")]
    NonAscii(char),
    /// The name contained the given whitespace character.
    #[error("algorithm name contained a whitespace character")]
    Whitespace(char),
    /// The name contained the given non printable character.
    #[error("algorithm name contained a non printable character")]
    NonPrintable(char),
    /// The domain in the algorithm name is not a valid domain.
    #[error("algorithm name contained an invalid domain")]
    InvalidDomain,
}
