//! Contains constants for the message numbers used by the server.
//!
//! See [RFC 4250 section 4.1](https://datatracker.ietf.org/doc/html/rfc4250#section-4.1).

/// Terminates the connection.
pub const SSH_MSG_DISCONNECT: u8 = 1;

/// Carries data that must be ignored.
pub const SSH_MSG_IGNORE: u8 = 2;

/// Answers a message that was not understood.
pub const SSH_MSG_UNIMPLEMENTED: u8 = 3;

/// Carries debugging information that may be ignored.
pub const SSH_MSG_DEBUG: u8 = 4;

/// Requests a service after the key exchange.
pub const SSH_MSG_SERVICE_REQUEST: u8 = 5;

/// Accepts a service request.
pub const SSH_MSG_SERVICE_ACCEPT: u8 = 6;

/// Carries protocol extensions negotiated with `ext-info-s`/`ext-info-c`.
pub const SSH_MSG_EXT_INFO: u8 = 7;

/// Starts the algorithm negotiation.
pub const SSH_MSG_KEXINIT: u8 = 20;

/// Switches to the newly derived keys.
pub const SSH_MSG_NEWKEYS: u8 = 21;

/// Carries the client's Diffie-Hellman public value.
pub const SSH_MSG_KEXDH_INIT: u8 = 30;

/// Carries the server's Diffie-Hellman public value, host key and signature.
pub const SSH_MSG_KEXDH_REPLY: u8 = 31;

/// Requests user authentication.
pub const SSH_MSG_USERAUTH_REQUEST: u8 = 50;

/// Rejects an authentication request.
pub const SSH_MSG_USERAUTH_FAILURE: u8 = 51;

/// Accepts an authentication request.
pub const SSH_MSG_USERAUTH_SUCCESS: u8 = 52;

/// Acknowledges that a public key would be acceptable for authentication.
pub const SSH_MSG_USERAUTH_PK_OK: u8 = 60;

/// Carries a request that is not bound to a channel.
pub const SSH_MSG_GLOBAL_REQUEST: u8 = 80;

/// Answers a global request positively.
pub const SSH_MSG_REQUEST_SUCCESS: u8 = 81;

/// Answers a global request negatively.
pub const SSH_MSG_REQUEST_FAILURE: u8 = 82;

/// Opens a new channel.
pub const SSH_MSG_CHANNEL_OPEN: u8 = 90;

/// Confirms that a channel was opened.
pub const SSH_MSG_CHANNEL_OPEN_CONFIRMATION: u8 = 91;

/// Rejects a channel open request.
pub const SSH_MSG_CHANNEL_OPEN_FAILURE: u8 = 92;

/// Increases the window of a channel.
pub const SSH_MSG_CHANNEL_WINDOW_ADJUST: u8 = 93;

/// Carries channel data.
pub const SSH_MSG_CHANNEL_DATA: u8 = 94;

/// Signals that no more data will be sent on a channel.
pub const SSH_MSG_CHANNEL_EOF: u8 = 96;

/// Closes a channel.
pub const SSH_MSG_CHANNEL_CLOSE: u8 = 97;

/// Carries a channel specific request.
pub const SSH_MSG_CHANNEL_REQUEST: u8 = 98;

/// Answers a channel request positively.
pub const SSH_MSG_CHANNEL_SUCCESS: u8 = 99;

/// Answers a channel request negatively.
pub const SSH_MSG_CHANNEL_FAILURE: u8 = 100;
