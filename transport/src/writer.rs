//! Handles aggregating of data into packets.
//!
//! This is the counter part to the input module.

use definitions::{write, CryptoRngCore};
use std::{
    borrow::Cow,
    io::{self, Write},
};

use crate::{
    algorithms::ExchangeContext,
    constants::{MIN_PADDING_SIZE, PACKET_LEN_SIZE, PADDING_LEN_SIZE},
    errors::CommunicationError,
    version::VersionInformation,
};

/// The panic message for writes into a `Vec`.
const VEC_WRITE: &str = "writes to a `Vec` cannot fail";

/// Writes the version information to the output.
pub(crate) fn write_version_info(
    input: &VersionInformation,
    output: &mut impl Write,
) -> io::Result<()> {
    write!(output, "{}\r\n", input)
}

/// Returns the smallest valid padding length for a payload of `payload_len` bytes.
///
/// `align` must be a power of two of at least 8.
pub(crate) fn padding_length(payload_len: usize, align: usize) -> u8 {
    debug_assert!(align.is_power_of_two() && align >= MIN_PADDING_SIZE);

    let unpadded = PACKET_LEN_SIZE + PADDING_LEN_SIZE + payload_len;
    let mut padding = align - unpadded % align;

    if padding < MIN_PADDING_SIZE {
        padding += align;
    }

    // `align` is a block size, so the padding stays far below 256
    padding as u8
}

/// Returns the packet length field for a payload of `payload_len` bytes.
fn packet_length(payload_len: usize, padding_len: u8) -> Result<u32, CommunicationError> {
    PADDING_LEN_SIZE
        .checked_add(payload_len)
        .and_then(|len| len.checked_add(padding_len as usize))
        .and_then(|len| u32::try_from(len).ok())
        .ok_or(CommunicationError::PayloadTooLarge(payload_len))
}

/// Handles writing packets to a stream that is ready for the network.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct WriterOutputStream {
    /// The underlying stream where data is written to.
    data: Vec<u8>,
    /// The number of packets that were written (modulo 32 bits).
    sequence_number: u32,
}

impl WriterOutputStream {
    /// Creates a new writer output stream.
    pub(crate) fn new() -> WriterOutputStream {
        WriterOutputStream {
            data: vec![],
            sequence_number: 0,
        }
    }

    /// Writes a packet with the given payload to the output stream.
    ///
    /// Returns the number of bytes the packet takes on the wire. Nothing is written if the
    /// packet length does not fit into a `u32` or the cipher fails.
    pub(crate) fn write_packet(
        &mut self,
        payload: &[u8],
        context: &mut ExchangeContext,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<usize, CommunicationError> {
        let payload = context.compression.compress(Cow::Borrowed(payload));

        let padding_len = padding_length(payload.len(), context.block_size());
        let packet_len = packet_length(payload.len(), padding_len)?;
        let mac_len = context.mac_len();

        let packet_start = self.data.len();

        self.data
            .reserve(PACKET_LEN_SIZE + packet_len as usize + mac_len);

        // Write the header
        write::uint32(packet_len, &mut self.data).expect(VEC_WRITE);
        write::byte(padding_len, &mut self.data).expect(VEC_WRITE);

        // Write the data
        self.data.extend_from_slice(&payload);

        // Write the padding
        let padding_start = self.data.len();
        self.data.resize(padding_start + padding_len as usize, 0);
        rng.fill_bytes(&mut self.data[padding_start..]);

        // Calculate the MAC
        let mac_start = self.data.len();
        self.data.resize(mac_start + mac_len, 0);
        let (packet_data, mac_data) =
            self.data[packet_start..].split_at_mut(mac_start - packet_start);
        if let Some(mac) = &mut context.mac {
            mac.compute(packet_data, self.sequence_number, mac_data);
        }

        // Encrypt the whole packet
        if let Err(err) = context
            .encryption
            .encrypt(&mut self.data[packet_start..mac_start])
        {
            self.data.truncate(packet_start);
            return Err(err.into());
        }

        self.sequence_number = self.sequence_number.wrapping_add(1);

        Ok(self.data.len() - packet_start)
    }

    /// Writes the given version information to the output stream.
    pub(crate) fn write_version_info(&mut self, version_info: &VersionInformation) {
        write_version_info(version_info, &mut self.data).expect(VEC_WRITE);
    }

    /// Returns all the non-removed data that has been written so far.
    ///
    /// This function is meant to be used to output the data to the network.
    /// Afterward the amount of data written to the network should be removed
    /// with `remove_to`.
    pub(crate) fn written_data(&self) -> &[u8] {
        &self.data
    }

    /// Removes data up to the given index.
    pub(crate) fn remove_to(&mut self, index: usize) {
        self.data.drain(..index);
    }
}
