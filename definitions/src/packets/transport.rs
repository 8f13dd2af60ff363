//! Packets of the transport layer protocol.
//!
//! See [RFC 4253](https://datatracker.ietf.org/doc/html/rfc4253).

use std::io::{self, Write};

use crate::{
    consts::{message_numbers::*, DisconnectReason, DEFAULT_LANGUAGE_TAG},
    parse::{Parse, ParseError, Reader},
    write::{self, Compose},
};

ssh_packet! {
    /// Carries data that must be ignored.
    Ignore = SSH_MSG_IGNORE {
        /// The arbitrary data.
        data: string,
    }

    /// Tells the peer that a packet was not understood.
    Unimplemented = SSH_MSG_UNIMPLEMENTED {
        /// The sequence number of the packet that was not understood.
        sequence_number: uint32,
    }

    /// Carries debugging information.
    DebugMessage = SSH_MSG_DEBUG {
        /// Whether the message should be shown to the user.
        always_display: boolean,
        /// The debug message.
        message: utf8,
        /// The language tag of the message.
        language: utf8,
    }

    /// Requests a service after the key exchange.
    ServiceRequest = SSH_MSG_SERVICE_REQUEST {
        /// The name of the requested service.
        service_name: utf8,
    }

    /// Accepts a service request.
    ServiceAccept = SSH_MSG_SERVICE_ACCEPT {
        /// The name of the accepted service.
        service_name: utf8,
    }

    /// Starts a key exchange by listing the supported algorithms.
    KexInit = SSH_MSG_KEXINIT {
        /// Random data to make the exchange hash unpredictable.
        cookie: cookie,
        /// The supported key exchange algorithms.
        kex_algorithms: name_list,
        /// The supported host key algorithms.
        server_host_key_algorithms: name_list,
        /// The supported encryption algorithms from client to server.
        encryption_algorithms_client_to_server: name_list,
        /// The supported encryption algorithms from server to client.
        encryption_algorithms_server_to_client: name_list,
        /// The supported MAC algorithms from client to server.
        mac_algorithms_client_to_server: name_list,
        /// The supported MAC algorithms from server to client.
        mac_algorithms_server_to_client: name_list,
        /// The supported compression algorithms from client to server.
        compression_algorithms_client_to_server: name_list,
        /// The supported compression algorithms from server to client.
        compression_algorithms_server_to_client: name_list,
        /// The supported languages from client to server.
        languages_client_to_server: name_list,
        /// The supported languages from server to client.
        languages_server_to_client: name_list,
        /// Whether a guessed key exchange packet follows.
        first_kex_packet_follows: boolean,
        /// Reserved for future extensions, always `0`.
        reserved: uint32,
    }

    /// Switches to the newly negotiated keys.
    NewKeys = SSH_MSG_NEWKEYS {}

    /// Sends the public value `e` of the client.
    KexDhInit = SSH_MSG_KEXDH_INIT {
        /// The public value of the client.
        e: mpint,
    }

    /// Answers the client with the server's public value and the signed exchange hash.
    KexDhReply = SSH_MSG_KEXDH_REPLY {
        /// The public host key blob `K_S`.
        host_key: string,
        /// The public value of the server.
        f: mpint,
        /// The signature blob over the exchange hash.
        signature: string,
    }
}

/// Terminates the connection.
///
/// The language tag is optional when parsing, since some implementations omit it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Disconnect {
    /// The reason for the disconnect.
    pub reason: DisconnectReason,
    /// A human readable description of the reason.
    pub description: String,
    /// The language tag of the description.
    pub language: String,
}

impl Disconnect {
    /// The message number identifying this packet.
    pub const MESSAGE_NUMBER: u8 = SSH_MSG_DISCONNECT;
}

impl Parse for Disconnect {
    fn parse(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        reader.expect_byte(SSH_MSG_DISCONNECT)?;

        let reason = reader.uint32()?.into();
        let description = reader.utf8()?.to_owned();
        let language = if reader.is_empty() {
            DEFAULT_LANGUAGE_TAG.to_owned()
        } else {
            reader.utf8()?.to_owned()
        };

        Ok(Disconnect {
            reason,
            description,
            language,
        })
    }
}

impl Compose for Disconnect {
    fn compose(&self, output: &mut impl Write) -> io::Result<()> {
        write::byte(SSH_MSG_DISCONNECT, output)?;
        write::uint32(self.reason.code(), output)?;
        write::string(self.description.as_bytes(), output)?;
        write::string(self.language.as_bytes(), output)
    }
}

/// Announces protocol extensions.
///
/// See [RFC 8308](https://datatracker.ietf.org/doc/html/rfc8308).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExtInfo {
    /// The extensions as pairs of name and value.
    pub extensions: Vec<(String, Vec<u8>)>,
}

impl ExtInfo {
    /// The message number identifying this packet.
    pub const MESSAGE_NUMBER: u8 = SSH_MSG_EXT_INFO;
}

impl Parse for ExtInfo {
    fn parse(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        reader.expect_byte(SSH_MSG_EXT_INFO)?;

        let count = reader.uint32()?;

        // Every extension needs at least eight bytes, which bounds the allocation.
        if count as usize > reader.remaining() / 8 {
            return Err(ParseError::Incomplete);
        }

        let mut extensions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = reader.utf8()?.to_owned();
            let value = reader.string()?.to_vec();

            extensions.push((name, value));
        }

        Ok(ExtInfo { extensions })
    }
}

impl Compose for ExtInfo {
    fn compose(&self, output: &mut impl Write) -> io::Result<()> {
        use std::convert::TryInto as _;

        let count: u32 = self
            .extensions
            .len()
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many extensions"))?;

        write::byte(SSH_MSG_EXT_INFO, output)?;
        write::uint32(count, output)?;

        for (name, value) in &self.extensions {
            write::string(name.as_bytes(), output)?;
            write::string(value, output)?;
        }

        Ok(())
    }
}
