//! Packets of the connection protocol.
//!
//! See [RFC 4254](https://datatracker.ietf.org/doc/html/rfc4254).

use std::io::{self, Write};

use crate::{
    consts::message_numbers::*,
    parse::{Parse, ParseError, Reader},
    write::{self, Compose},
};

ssh_packet! {
    /// A request that is global to the connection.
    GlobalRequest = SSH_MSG_GLOBAL_REQUEST {
        /// The name of the request.
        request_name: utf8,
        /// Whether the sender expects a reply.
        want_reply: boolean,
        /// The request specific data.
        data: rest,
    }

    /// Rejects a global request.
    RequestFailure = SSH_MSG_REQUEST_FAILURE {}

    /// Requests a new channel.
    ChannelOpen = SSH_MSG_CHANNEL_OPEN {
        /// The type of the channel, such as `session`.
        channel_type: utf8,
        /// The channel number chosen by the sender.
        sender_channel: uint32,
        /// The number of bytes the sender accepts before it sends a window adjustment.
        initial_window_size: uint32,
        /// The maximum packet size the sender accepts.
        maximum_packet_size: uint32,
        /// The channel type specific data.
        data: rest,
    }

    /// Accepts a channel open request.
    ChannelOpenConfirmation = SSH_MSG_CHANNEL_OPEN_CONFIRMATION {
        /// The channel number of the peer.
        recipient_channel: uint32,
        /// The channel number chosen by the sender.
        sender_channel: uint32,
        /// The number of bytes the sender accepts before it sends a window adjustment.
        initial_window_size: uint32,
        /// The maximum packet size the sender accepts.
        maximum_packet_size: uint32,
    }

    /// Rejects a channel open request.
    ChannelOpenFailure = SSH_MSG_CHANNEL_OPEN_FAILURE {
        /// The channel number of the peer.
        recipient_channel: uint32,
        /// The reason code for the failure.
        reason_code: uint32,
        /// A human readable description of the failure.
        description: utf8,
        /// The language tag of the description.
        language: utf8,
    }

    /// Grants the peer more window space.
    ChannelWindowAdjust = SSH_MSG_CHANNEL_WINDOW_ADJUST {
        /// The channel number of the peer.
        recipient_channel: uint32,
        /// The number of bytes added to the window.
        bytes_to_add: uint32,
    }

    /// Carries channel data.
    ChannelData = SSH_MSG_CHANNEL_DATA {
        /// The channel number of the peer.
        recipient_channel: uint32,
        /// The data.
        data: string,
    }

    /// Signals that no more data will be sent on a channel.
    ChannelEof = SSH_MSG_CHANNEL_EOF {
        /// The channel number of the peer.
        recipient_channel: uint32,
    }

    /// Closes a channel.
    ChannelClose = SSH_MSG_CHANNEL_CLOSE {
        /// The channel number of the peer.
        recipient_channel: uint32,
    }

    /// Accepts a channel request.
    ChannelSuccess = SSH_MSG_CHANNEL_SUCCESS {
        /// The channel number of the peer.
        recipient_channel: uint32,
    }

    /// Rejects a channel request.
    ChannelFailure = SSH_MSG_CHANNEL_FAILURE {
        /// The channel number of the peer.
        recipient_channel: uint32,
    }
}

/// A single encoded terminal mode.
///
/// See [RFC 4254 section 8](https://datatracker.ietf.org/doc/html/rfc4254#section-8).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TerminalMode {
    /// The opcode of the mode.
    pub opcode: u8,
    /// The argument of the mode.
    pub value: u32,
}

/// The `TTY_OP_END` opcode terminating the mode list.
const TTY_OP_END: u8 = 0;

/// The first opcode that has no defined argument layout.
const FIRST_UNDEFINED_OPCODE: u8 = 160;

/// The data of a `pty-req` channel request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PtyRequest {
    /// The value of the `TERM` environment variable.
    pub term: String,
    /// The terminal width in characters.
    pub width_chars: u32,
    /// The terminal height in rows.
    pub height_rows: u32,
    /// The terminal width in pixels.
    pub width_pixels: u32,
    /// The terminal height in pixels.
    pub height_pixels: u32,
    /// The encoded terminal modes.
    pub modes: Vec<TerminalMode>,
}

/// The data of a `window-change` channel request.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WindowChange {
    /// The terminal width in characters.
    pub width_chars: u32,
    /// The terminal height in rows.
    pub height_rows: u32,
    /// The terminal width in pixels.
    pub width_pixels: u32,
    /// The terminal height in pixels.
    pub height_pixels: u32,
}

/// The type specific part of a channel request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ChannelRequestKind {
    /// Requests a pseudo terminal.
    PtyReq(PtyRequest),
    /// Requests the user's default shell.
    Shell,
    /// Tells the server about a changed terminal size.
    WindowChange(WindowChange),
    /// Sets an environment variable.
    Env {
        /// The name of the variable.
        name: String,
        /// The value of the variable.
        value: String,
    },
    /// Any other request.
    Other {
        /// The request type.
        request_type: String,
        /// The undecoded request specific data.
        data: Vec<u8>,
    },
}

impl ChannelRequestKind {
    /// Returns the request type used on the wire.
    pub fn request_type(&self) -> &str {
        match self {
            ChannelRequestKind::PtyReq(_) => "pty-req",
            ChannelRequestKind::Shell => "shell",
            ChannelRequestKind::WindowChange(_) => "window-change",
            ChannelRequestKind::Env { .. } => "env",
            ChannelRequestKind::Other { request_type, .. } => request_type,
        }
    }

    /// Writes the type specific data.
    fn compose_data(&self, output: &mut impl Write) -> io::Result<()> {
        match self {
            ChannelRequestKind::PtyReq(pty) => {
                write::string(pty.term.as_bytes(), output)?;
                write::uint32(pty.width_chars, output)?;
                write::uint32(pty.height_rows, output)?;
                write::uint32(pty.width_pixels, output)?;
                write::uint32(pty.height_pixels, output)?;

                let mut modes = Vec::with_capacity(pty.modes.len() * 5 + 1);
                for mode in &pty.modes {
                    write::byte(mode.opcode, &mut modes)?;
                    write::uint32(mode.value, &mut modes)?;
                }
                write::byte(TTY_OP_END, &mut modes)?;

                write::string(&modes, output)
            }
            ChannelRequestKind::Shell => Ok(()),
            ChannelRequestKind::WindowChange(change) => {
                write::uint32(change.width_chars, output)?;
                write::uint32(change.height_rows, output)?;
                write::uint32(change.width_pixels, output)?;
                write::uint32(change.height_pixels, output)
            }
            ChannelRequestKind::Env { name, value } => {
                write::string(name.as_bytes(), output)?;
                write::string(value.as_bytes(), output)
            }
            ChannelRequestKind::Other { data, .. } => write::bytes(data, output),
        }
    }
}

/// A function decoding the type specific data of a channel request.
type RequestDecoder = fn(&mut Reader<'_>) -> Result<ChannelRequestKind, ParseError>;

/// The decoders for the known channel request types.
static REQUEST_DECODERS: &[(&str, RequestDecoder)] = &[
    ("pty-req", decode_pty_req),
    ("shell", decode_shell),
    ("window-change", decode_window_change),
    ("env", decode_env),
];

fn decode_pty_req(reader: &mut Reader<'_>) -> Result<ChannelRequestKind, ParseError> {
    let term = reader.utf8()?.to_owned();
    let width_chars = reader.uint32()?;
    let height_rows = reader.uint32()?;
    let width_pixels = reader.uint32()?;
    let height_pixels = reader.uint32()?;
    let modes = decode_modes(reader.string()?)?;

    Ok(ChannelRequestKind::PtyReq(PtyRequest {
        term,
        width_chars,
        height_rows,
        width_pixels,
        height_pixels,
        modes,
    }))
}

/// Decodes the opcode and argument pairs of an encoded mode list.
///
/// Decoding stops at `TTY_OP_END`, at the end of the data or at the first opcode without a
/// defined argument layout.
fn decode_modes(encoded: &[u8]) -> Result<Vec<TerminalMode>, ParseError> {
    let mut reader = Reader::new(encoded);
    let mut modes = Vec::new();

    while !reader.is_empty() {
        let opcode = reader.byte()?;
        if opcode == TTY_OP_END || opcode >= FIRST_UNDEFINED_OPCODE {
            break;
        }

        let value = reader.uint32()?;
        modes.push(TerminalMode { opcode, value });
    }

    Ok(modes)
}

fn decode_shell(_: &mut Reader<'_>) -> Result<ChannelRequestKind, ParseError> {
    Ok(ChannelRequestKind::Shell)
}

fn decode_window_change(reader: &mut Reader<'_>) -> Result<ChannelRequestKind, ParseError> {
    Ok(ChannelRequestKind::WindowChange(WindowChange {
        width_chars: reader.uint32()?,
        height_rows: reader.uint32()?,
        width_pixels: reader.uint32()?,
        height_pixels: reader.uint32()?,
    }))
}

fn decode_env(reader: &mut Reader<'_>) -> Result<ChannelRequestKind, ParseError> {
    let name = reader.utf8()?.to_owned();
    let value = reader.utf8()?.to_owned();

    Ok(ChannelRequestKind::Env { name, value })
}

/// A channel specific request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ChannelRequest {
    /// The channel number of the peer.
    pub recipient_channel: u32,
    /// Whether the sender expects a reply.
    pub want_reply: bool,
    /// The request type and its data.
    pub kind: ChannelRequestKind,
}

impl ChannelRequest {
    /// The message number identifying this packet.
    pub const MESSAGE_NUMBER: u8 = SSH_MSG_CHANNEL_REQUEST;
}

impl Parse for ChannelRequest {
    fn parse(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        reader.expect_byte(SSH_MSG_CHANNEL_REQUEST)?;

        let recipient_channel = reader.uint32()?;
        let request_type = reader.utf8()?;
        let want_reply = reader.boolean()?;

        let kind = match REQUEST_DECODERS
            .iter()
            .find(|(name, _)| *name == request_type)
        {
            Some((_, decoder)) => decoder(reader)?,
            None => ChannelRequestKind::Other {
                request_type: request_type.to_owned(),
                data: reader.bytes(reader.remaining())?.to_vec(),
            },
        };

        Ok(ChannelRequest {
            recipient_channel,
            want_reply,
            kind,
        })
    }
}

impl Compose for ChannelRequest {
    fn compose(&self, output: &mut impl Write) -> io::Result<()> {
        write::byte(SSH_MSG_CHANNEL_REQUEST, output)?;
        write::uint32(self.recipient_channel, output)?;
        write::string(self.kind.request_type().as_bytes(), output)?;
        write::boolean(self.want_reply, output)?;
        self.kind.compose_data(output)
    }
}
