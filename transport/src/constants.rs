//! Defines constants of the transport layer protocol.

use std::{mem::size_of, time::Duration};

/// The size, in bytes, of the packet length field of a packet.
pub(crate) const PACKET_LEN_SIZE: usize = size_of::<u32>();

/// The size, in bytes, of the padding length field of a packet.
pub(crate) const PADDING_LEN_SIZE: usize = size_of::<u8>();

/// The minimum padding size of a packet.
pub(crate) const MIN_PADDING_SIZE: usize = 4;

/// The minimum size that the packet length must be a multiple of.
pub(crate) const MIN_PACKET_LEN_ALIGN: usize = 8;

/// The maximum length of the identification line, including the final CR LF.
pub(crate) const MAX_VERSION_LINE_LEN: usize = 255;

/// The largest packet length accepted from the peer.
///
/// This is also announced as the maximum packet size of channels.
pub const MAX_PACKET_SIZE: u32 = 35000;

/// The protocol version supported by this library.
pub const PROTOCOL_VERSION: &str = "2.0";

/// The number of transferred bytes after which new keys are negotiated by default.
pub const DEFAULT_REKEY_BYTES: u64 = 1 << 30;

/// The time after which new keys are negotiated by default.
pub const DEFAULT_REKEY_INTERVAL: Duration = Duration::from_secs(60 * 60);
