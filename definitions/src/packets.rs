//! Defines the closed set of packets exchanged by the server.
//!
//! Every packet is a struct that knows its message number and implements [`Parse`] and
//! [`Compose`]. The [`Packet`] enum ties them together, and [`Packet::decode`] dispatches on the
//! leading message number through a static table.

use std::io::{self, Write};

use crate::{
    consts::message_numbers::*,
    parse::{Parse, ParseError, Reader},
    write::{self, Compose},
};

/// Maps a field kind to the Rust type it is stored as.
macro_rules! field_type {
    (byte) => { u8 };
    (boolean) => { bool };
    (uint32) => { u32 };
    (string) => { Vec<u8> };
    (utf8) => { String };
    (mpint) => { num_bigint::BigInt };
    (name_list) => { Vec<String> };
    (cookie) => { [u8; 16] };
    (rest) => { Vec<u8> };
}

/// Reads a field of the given kind from `$reader`.
macro_rules! read_field {
    ($reader:ident, string) => { $reader.string()?.to_vec() };
    ($reader:ident, utf8) => { $reader.utf8()?.to_owned() };
    ($reader:ident, cookie) => { $reader.bytes_const::<16>()? };
    ($reader:ident, rest) => { $reader.bytes($reader.remaining())?.to_vec() };
    ($reader:ident, $kind:ident) => { $reader.$kind()? };
}

/// Writes a field of the given kind to `$output`.
macro_rules! write_field {
    ($output:ident, $value:expr, byte) => { write::byte(*$value, $output) };
    ($output:ident, $value:expr, boolean) => { write::boolean(*$value, $output) };
    ($output:ident, $value:expr, uint32) => { write::uint32(*$value, $output) };
    ($output:ident, $value:expr, string) => { write::string($value, $output) };
    ($output:ident, $value:expr, utf8) => { write::string($value.as_bytes(), $output) };
    ($output:ident, $value:expr, mpint) => { write::mpint($value, $output) };
    ($output:ident, $value:expr, name_list) => { write::name_list($value, $output) };
    ($output:ident, $value:expr, cookie) => { write::bytes($value, $output) };
    ($output:ident, $value:expr, rest) => { write::bytes($value, $output) };
}

/// Declares packets whose fields follow each other without any conditional parts.
///
/// Each declaration names the struct, its message number and the fields in wire order, where
/// every field is given a kind from `field_type!`.
macro_rules! ssh_packet {
    ($(
        $(#[$meta:meta])*
        $name:ident = $number:path {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $kind:ident
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: field_type!($kind),
            )*
        }

        impl $name {
            /// The message number identifying this packet.
            pub const MESSAGE_NUMBER: u8 = $number;
        }

        impl Parse for $name {
            fn parse(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
                reader.expect_byte($number)?;

                Ok($name {
                    $($field: read_field!(reader, $kind),)*
                })
            }
        }

        impl Compose for $name {
            fn compose(&self, output: &mut impl Write) -> io::Result<()> {
                write::byte($number, output)?;
                $(write_field!(output, &self.$field, $kind)?;)*

                Ok(())
            }
        }
    )*};
}

mod connection;
mod transport;
mod userauth;

pub use connection::{
    ChannelClose, ChannelData, ChannelEof, ChannelFailure, ChannelOpen, ChannelOpenConfirmation,
    ChannelOpenFailure, ChannelRequest, ChannelRequestKind, ChannelSuccess, ChannelWindowAdjust,
    GlobalRequest, PtyRequest, RequestFailure, TerminalMode, WindowChange,
};
pub use transport::{
    DebugMessage, Disconnect, ExtInfo, Ignore, KexDhInit, KexDhReply, KexInit, NewKeys,
    ServiceAccept, ServiceRequest, Unimplemented,
};
pub use userauth::{AuthMethod, UserAuthFailure, UserAuthPkOk, UserAuthRequest, UserAuthSuccess};

/// Declares the `Packet` enum together with its conversions and dispatch.
macro_rules! packets {
    ($($variant:ident),* $(,)?) => {
        /// Any packet understood by the server.
        #[derive(Debug, PartialEq, Eq, Clone)]
        pub enum Packet {
            $(
                #[allow(missing_docs)]
                $variant($variant),
            )*
        }

        impl Packet {
            /// Returns the message number of the packet.
            pub fn message_number(&self) -> u8 {
                match self {
                    $(Packet::$variant(_) => $variant::MESSAGE_NUMBER,)*
                }
            }
        }

        impl Compose for Packet {
            fn compose(&self, output: &mut impl Write) -> io::Result<()> {
                match self {
                    $(Packet::$variant(packet) => packet.compose(output),)*
                }
            }
        }

        $(
            impl From<$variant> for Packet {
                fn from(packet: $variant) -> Packet {
                    Packet::$variant(packet)
                }
            }
        )*

        /// The decoders for all known packets, keyed by message number.
        static DECODERS: &[(u8, Decoder)] = &[
            $(($variant::MESSAGE_NUMBER, decode_as::<$variant>),)*
        ];
    };
}

packets! {
    Disconnect,
    Ignore,
    Unimplemented,
    DebugMessage,
    ServiceRequest,
    ServiceAccept,
    ExtInfo,
    KexInit,
    NewKeys,
    KexDhInit,
    KexDhReply,
    UserAuthRequest,
    UserAuthFailure,
    UserAuthSuccess,
    UserAuthPkOk,
    GlobalRequest,
    RequestFailure,
    ChannelOpen,
    ChannelOpenConfirmation,
    ChannelOpenFailure,
    ChannelWindowAdjust,
    ChannelData,
    ChannelEof,
    ChannelClose,
    ChannelRequest,
    ChannelSuccess,
    ChannelFailure,
}

/// A function decoding a whole packet payload.
type Decoder = fn(&mut Reader<'_>) -> Result<Packet, ParseError>;

/// Decodes a payload as `T`.
fn decode_as<T: Parse + Into<Packet>>(reader: &mut Reader<'_>) -> Result<Packet, ParseError> {
    T::parse(reader).map(Into::into)
}

/// Describes why a payload could not be decoded into a [`Packet`].
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum DecodeError {
    /// The payload was empty and carried no message number.
    #[error("the payload is empty")]
    Empty,
    /// No packet with this message number is known.
    #[error("message number {0} is not supported")]
    Unsupported(u8),
    /// The payload does not match the layout of its packet.
    #[error("packet with message number {number} is malformed: {error}")]
    Malformed {
        /// The message number of the payload.
        number: u8,
        /// The reason the payload could not be parsed.
        error: ParseError,
    },
}

impl Packet {
    /// Decodes a packet payload, dispatching on its message number.
    ///
    /// Unknown message numbers yield [`DecodeError::Unsupported`], which is answered with an
    /// unimplemented message rather than closing the connection.
    pub fn decode(payload: &[u8]) -> Result<Packet, DecodeError> {
        let number = *payload.first().ok_or(DecodeError::Empty)?;

        let decoder = DECODERS
            .iter()
            .find(|(candidate, _)| *candidate == number)
            .map(|(_, decoder)| decoder)
            .ok_or(DecodeError::Unsupported(number))?;

        decoder(&mut Reader::new(payload)).map_err(|error| DecodeError::Malformed { number, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DisconnectReason;

    #[test]
    fn every_decoder_is_unique() {
        for (i, (number, _)) in DECODERS.iter().enumerate() {
            assert!(
                DECODERS[i + 1..].iter().all(|(other, _)| other != number),
                "message number {} is registered twice",
                number
            );
        }
    }

    #[test]
    fn unknown_message_numbers_are_unsupported() {
        assert_eq!(Packet::decode(&[]), Err(DecodeError::Empty));
        assert_eq!(Packet::decode(&[200, 1, 2]), Err(DecodeError::Unsupported(200)));
        assert_eq!(Packet::decode(&[0]), Err(DecodeError::Unsupported(0)));
    }

    #[test]
    fn truncated_packets_are_malformed() {
        assert_eq!(
            Packet::decode(&[SSH_MSG_UNIMPLEMENTED, 0, 0]),
            Err(DecodeError::Malformed {
                number: SSH_MSG_UNIMPLEMENTED,
                error: ParseError::Incomplete,
            })
        );
    }

    #[test]
    fn decode_dispatches_on_message_number() {
        let packet = Packet::decode(b"\x05\x00\x00\x00\x0cssh-userauth").unwrap();

        assert_eq!(
            packet,
            Packet::ServiceRequest(ServiceRequest {
                service_name: "ssh-userauth".into()
            })
        );
        assert_eq!(packet.message_number(), SSH_MSG_SERVICE_REQUEST);
    }

    #[test]
    fn compose_writes_message_number_first() {
        let packet: Packet = Disconnect {
            reason: DisconnectReason::ByApplication,
            description: "bye".into(),
            language: "en".into(),
        }
        .into();

        assert_eq!(
            packet.compose_to_vec(),
            b"\x01\x00\x00\x00\x0b\x00\x00\x00\x03bye\x00\x00\x00\x02en".to_vec()
        );
    }
}
