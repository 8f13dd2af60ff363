//! Parsers for the version line and the packet header in the transport layer.
//!
//! The version exchange is described in
//! [RFC 4253 section 4.2](https://tools.ietf.org/html/rfc4253#section-4.2).

use definitions::parse::{self, ParseError, ParsedValue};

use crate::{
    constants::{MAX_VERSION_LINE_LEN, PACKET_LEN_SIZE},
    version::VersionInformation,
};

/// Parses either a `protoversion` or a `softwareversion`.
///
/// The version ends at the first character in `terminators` or at the end of the input. It must
/// not be empty and may only contain printable ASCII characters.
fn version<'input>(input: &'input [u8], terminators: &[u8]) -> parse::Result<'input, &'input str> {
    let end = input
        .iter()
        .position(|c| terminators.contains(c))
        .unwrap_or(input.len());

    let (value, rest_input) = input.split_at(end);

    if value.is_empty() || !value.iter().all(u8::is_ascii_graphic) {
        return Err(ParseError::Invalid);
    }

    Ok(ParsedValue {
        value: std::str::from_utf8(value).map_err(|_| ParseError::Invalid)?,
        rest_input,
    })
}

/// Parses the line containing the version information.
///
/// The line must be the first line of the input and end in `"\r\n"`. The identification string
/// without the line ending is returned alongside the version.
///
/// See [RFC 4253 section 4.2](https://tools.ietf.org/html/rfc4253#section-4.2).
pub(super) fn version_line(input: &[u8]) -> parse::Result<(VersionInformation, &[u8])> {
    let line_end_index = match input.windows(2).position(|window| window == b"\r\n") {
        Some(index) => index,
        None if input.len() >= MAX_VERSION_LINE_LEN => return Err(ParseError::Invalid),
        None => return Err(ParseError::Incomplete),
    };
    if line_end_index + 2 > MAX_VERSION_LINE_LEN {
        return Err(ParseError::Invalid);
    }
    let identification_string = &input[..line_end_index];

    let rest_input = match identification_string.strip_prefix(b"SSH-") {
        Some(rest_input) => rest_input,
        None => return Err(ParseError::Invalid),
    };
    let ParsedValue {
        value: protocolversion,
        rest_input,
    } = version(rest_input, b"-")?;
    let rest_input = match rest_input.strip_prefix(b"-") {
        Some(rest_input) => rest_input,
        None => return Err(ParseError::Invalid),
    };
    let ParsedValue {
        value: softwareversion,
        rest_input,
    } = version(rest_input, b" ")?;

    let comments = match rest_input {
        [] => None,
        [b' ', comments @ ..] => {
            Some(std::str::from_utf8(comments).map_err(|_| ParseError::Invalid)?)
        }
        _ => return Err(ParseError::Invalid),
    };

    Ok(ParsedValue {
        value: (
            VersionInformation::announced(protocolversion, softwareversion, comments),
            identification_string,
        ),
        rest_input: &input[line_end_index + 2..],
    })
}

/// The header of a packet of the SSH transport layer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct PacketHeader {
    /// The length of the packet, excluding the length field itself and the MAC.
    pub(crate) packet_length: u32,
    /// The length of the random padding.
    pub(crate) padding_length: u8,
}

impl PacketHeader {
    /// Returns the length of the payload.
    pub(crate) fn payload_length(&self) -> usize {
        self.packet_length as usize - self.padding_length as usize - 1
    }

    /// Returns the length of the packet including the length field, but excluding the MAC.
    pub(crate) fn total_length(&self) -> usize {
        PACKET_LEN_SIZE + self.packet_length as usize
    }
}

/// Parses the already decrypted packet header.
pub(super) fn packet_header(input: &[u8]) -> parse::Result<PacketHeader> {
    let ParsedValue {
        value: packet_length,
        rest_input,
    } = parse::uint32(input)?;
    let ParsedValue {
        value: padding_length,
        rest_input,
    } = parse::byte(rest_input)?;

    Ok(ParsedValue {
        value: PacketHeader {
            packet_length,
            padding_length,
        },
        rest_input,
    })
}
