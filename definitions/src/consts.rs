//! Contains constants defined in the SSH RFCs.

pub mod message_numbers;

mod disconnect_reason;

pub use disconnect_reason::DisconnectReason;

/// The name of the user authentication service.
pub const SERVICE_USERAUTH: &str = "ssh-userauth";

/// The name of the connection protocol service.
pub const SERVICE_CONNECTION: &str = "ssh-connection";

/// The pseudo algorithm appended to the server's kex list to signal extension negotiation.
///
/// See [RFC 8308 section 2.1](https://datatracker.ietf.org/doc/html/rfc8308#section-2.1).
pub const EXT_INFO_SERVER: &str = "ext-info-s";

/// The extension listing the signature algorithms accepted for public key authentication.
pub const EXTENSION_SERVER_SIG_ALGS: &str = "server-sig-algs";

/// The language tag used when no other language is specified.
pub const DEFAULT_LANGUAGE_TAG: &str = "en";

/// Reason code for a channel open request of an unknown type.
///
/// See [RFC 4254 section 5.1](https://datatracker.ietf.org/doc/html/rfc4254#section-5.1).
pub const SSH_OPEN_UNKNOWN_CHANNEL_TYPE: u32 = 3;

/// Reason code for a channel open request that exceeds the supported number of channels.
pub const SSH_OPEN_RESOURCE_SHORTAGE: u32 = 4;
