//! Handles the input side of the SSH connection.

use definitions::{ParseError, ParsedValue};
use std::borrow::Cow;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    algorithms::ExchangeContext,
    constants::{MAX_PACKET_SIZE, MIN_PADDING_SIZE, PACKET_LEN_SIZE, PADDING_LEN_SIZE},
    errors::CommunicationError,
    version::VersionInformation,
};

use self::parse::PacketHeader;

mod parse;

/// Make some sanity checks to verify that the internal state is valid.
macro_rules! assert_valid_state {
    ($self:ident) => {
        debug_assert!($self.parsed_until <= $self.decrypted_until);
        debug_assert!($self.decrypted_until <= $self.initialized_until);
        debug_assert!($self.initialized_until <= $self.data.len());
    };
}

/// The default size for data reads.
pub(crate) const READ_SIZE: usize = 0x1000;

/// A packet that was read from the input.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReceivedPacket {
    /// The decompressed payload of the packet.
    pub(crate) payload: Vec<u8>,
    /// The sequence number of the packet.
    pub(crate) sequence_number: u32,
    /// The number of bytes the packet took on the wire.
    pub(crate) size: usize,
}

/// Handles input tranformations and buffering.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct InputBuffer {
    /// The underlying buffer.
    data: Vec<u8>,
    /// The index of the first byte that has not yet been parsed.
    parsed_until: usize,
    /// The index of the first byte that has not yet been decrypted.
    decrypted_until: usize,
    /// The index of the first byte that has not yet been initialized.
    initialized_until: usize,
    /// The number of packets that have arrived (modulo 32 bits).
    sequence_number: u32,
}

impl InputBuffer {
    /// Creates a new empty input stream.
    pub(crate) fn new() -> InputBuffer {
        InputBuffer {
            data: Vec::new(),
            parsed_until: 0,
            decrypted_until: 0,
            initialized_until: 0,
            sequence_number: 0,
        }
    }

    /// Reserves at least `size` bytes for input and returns access to them.
    fn reserve(&mut self, size: usize) -> &mut [u8] {
        assert_valid_state!(self);

        let additional_capacity = self.data.len() - self.initialized_until;
        let space_needed = size.saturating_sub(additional_capacity);

        self.data.resize(self.data.len() + space_needed, 0);

        assert_valid_state!(self);

        &mut self.data[self.initialized_until..]
    }

    /// Reads more data from the source into the buffer.
    ///
    /// This is cancel safe: if the future is dropped before it completes, no data was read.
    pub(crate) async fn read_more_data<I: AsyncRead + Unpin>(
        &mut self,
        input: &mut I,
    ) -> Result<usize, CommunicationError> {
        assert_valid_state!(self);

        let buf = self.reserve(READ_SIZE);

        let size = input.read(buf).await.map_err(CommunicationError::Io)?;

        if size == 0 {
            return Err(CommunicationError::EndOfInput);
        }

        self.initialized_until += size;

        assert_valid_state!(self);

        Ok(size)
    }

    /// Parses the version line of the peer.
    ///
    /// Returns the version along with the identification string, which is used in the exchange
    /// hash. This should not be called again, after the first `Ok(Some(_))` was returned.
    pub(crate) fn parse_version(
        &mut self,
    ) -> Result<Option<(VersionInformation, Vec<u8>)>, ParseError> {
        assert_valid_state!(self);

        debug_assert_eq!(self.parsed_until, 0);
        debug_assert_eq!(self.decrypted_until, 0);

        let ParsedValue {
            value: (info, line),
            rest_input,
        } = match parse::version_line(&self.data[..self.initialized_until]) {
            Ok(parsed) => parsed,
            Err(ParseError::Incomplete) => return Ok(None),
            Err(err) => return Err(err),
        };

        let bytes_read = self.initialized_until - rest_input.len();
        let line = line.to_vec();

        self.parsed_until = bytes_read;
        self.decrypted_until = bytes_read;

        self.remove_old_data();

        Ok(Some((info, line)))
    }

    /// Decrypts the first block of the current packet and parses its header.
    ///
    /// The header is only decrypted once, even if the rest of the packet arrives later.
    fn decrypt_header(
        &mut self,
        context: &mut ExchangeContext,
    ) -> Result<Option<PacketHeader>, CommunicationError> {
        assert_valid_state!(self);

        let block_size = context.block_size();

        if self.decrypted_until == self.parsed_until {
            if self.initialized_until - self.parsed_until < block_size {
                return Ok(None);
            }

            context
                .encryption
                .decrypt(&mut self.data[self.parsed_until..self.parsed_until + block_size])?;
            self.decrypted_until += block_size;
        }

        let header = match parse::packet_header(&self.data[self.parsed_until..self.decrypted_until])
        {
            Ok(ParsedValue { value, .. }) => value,
            Err(_) => return Err(CommunicationError::InvalidFormat),
        };

        if header.packet_length > MAX_PACKET_SIZE {
            return Err(CommunicationError::PacketTooLarge(header.packet_length));
        }
        if header.total_length() % block_size != 0
            || (header.padding_length as usize) < MIN_PADDING_SIZE
            || (header.packet_length as usize) < header.padding_length as usize + PADDING_LEN_SIZE
        {
            return Err(CommunicationError::InvalidPadding);
        }

        assert_valid_state!(self);

        Ok(Some(header))
    }

    /// Shrinks the input to the smallest possible size.
    fn remove_old_data(&mut self) {
        assert_valid_state!(self);

        self.data.drain(..self.parsed_until);

        self.decrypted_until -= self.parsed_until;
        self.initialized_until -= self.parsed_until;
        self.parsed_until = 0;

        assert_valid_state!(self);
    }

    /// Reads the next packet from the buffer and returns it.
    ///
    /// If the buffer does not contain all of the next input packet, `Ok(None)` is returned.
    ///
    /// The steps are
    /// - decrypt the first block and check the announced lengths,
    /// - wait until the whole packet and its MAC are buffered,
    /// - decrypt the rest and verify the MAC over the sequence number and the plain packet,
    /// - decompress the payload.
    pub(crate) fn read_packet(
        &mut self,
        context: &mut ExchangeContext,
    ) -> Result<Option<ReceivedPacket>, CommunicationError> {
        self.remove_old_data();

        let header = match self.decrypt_header(context)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let packet_end = self.parsed_until + header.total_length();
        let mac_end = packet_end + context.mac_len();

        if self.initialized_until < mac_end {
            return Ok(None);
        }

        context
            .encryption
            .decrypt(&mut self.data[self.decrypted_until..packet_end])?;
        self.decrypted_until = packet_end;

        let (packet, mac) = self.data[self.parsed_until..mac_end].split_at(header.total_length());

        if let Some(mac_algorithm) = &mut context.mac {
            mac_algorithm
                .verify(packet, self.sequence_number, mac)
                .map_err(|_| CommunicationError::InvalidMac)?;
        }

        let payload_start = PACKET_LEN_SIZE + PADDING_LEN_SIZE;
        let payload = &packet[payload_start..payload_start + header.payload_length()];

        let payload = context
            .compression
            .decompress(Cow::Borrowed(payload))?
            .into_owned();

        let sequence_number = self.sequence_number;
        self.sequence_number = self.sequence_number.wrapping_add(1);

        self.decrypted_until = mac_end;
        self.parsed_until = mac_end;

        assert_valid_state!(self);

        Ok(Some(ReceivedPacket {
            payload,
            sequence_number,
            size: header.total_length() + context.mac_len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_helpers::{keyed_context, unkeyed_context, FakeNetworkInput},
        writer::WriterOutputStream,
    };
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha20Rng;

    fn written(payloads: &[&[u8]], context: &mut ExchangeContext) -> Vec<u8> {
        let mut rng = ChaCha20Rng::from_seed(Default::default());
        let mut writer = WriterOutputStream::new();

        for payload in payloads {
            writer.write_packet(payload, context, &mut rng).unwrap();
        }

        writer.written_data().to_vec()
    }

    fn read_all(
        input: &mut InputBuffer,
        data: Vec<u8>,
        chunk_size: usize,
        context: &mut ExchangeContext,
    ) -> Result<Vec<ReceivedPacket>, CommunicationError> {
        let mut network = FakeNetworkInput::new(data, chunk_size);
        let mut packets = Vec::new();

        futures::executor::block_on(async {
            loop {
                while let Some(packet) = input.read_packet(context)? {
                    packets.push(packet);
                }

                match input.read_more_data(&mut network).await {
                    Ok(_) => continue,
                    Err(CommunicationError::EndOfInput) => return Ok(packets),
                    Err(err) => return Err(err),
                }
            }
        })
    }

    #[test]
    fn reserve_grows_buffer() {
        let mut input = InputBuffer::new();

        assert_eq!(input.initialized_until, 0);
        assert_eq!(input.decrypted_until, 0);
        assert_eq!(input.parsed_until, 0);
        assert_eq!(&input.data, &[]);

        let buf = input.reserve(50);
        assert_eq!(buf.len(), 50);
        buf[..8].copy_from_slice(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);

        input.initialized_until += 8;

        assert_eq!(input.reserve(20).len(), 42);
        assert_eq!(input.reserve(60).len(), 60);
        assert_eq!(input.data.len(), 68);
    }

    #[test]
    fn read_unencrypted_packets() {
        let mut context = unkeyed_context();
        let data = written(&[b"some test data", b"a", b""], &mut context);

        for chunk_size in [1, 3, 16, 100] {
            let mut input = InputBuffer::new();
            let packets = read_all(&mut input, data.clone(), chunk_size, &mut context).unwrap();

            let payloads: Vec<_> = packets.iter().map(|p| &p.payload[..]).collect();
            assert_eq!(payloads, vec![&b"some test data"[..], b"a", b""]);

            let sequence_numbers: Vec<_> = packets.iter().map(|p| p.sequence_number).collect();
            assert_eq!(sequence_numbers, vec![0, 1, 2]);

            assert_eq!(packets.iter().map(|p| p.size).sum::<usize>(), data.len());
        }
    }

    #[test]
    fn read_encrypted_packets() {
        let data = written(
            &[b"first payload", &[0x5e; 300], b"third"],
            &mut keyed_context(),
        );

        let mut input = InputBuffer::new();
        let packets = read_all(&mut input, data.clone(), 7, &mut keyed_context()).unwrap();

        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].payload, b"first payload");
        assert_eq!(packets[1].payload, vec![0x5e; 300]);
        assert_eq!(packets[2].payload, b"third");
        assert_eq!(packets[2].sequence_number, 2);
    }

    #[test]
    fn flipped_bits_fail_the_mac() {
        let data = written(&[b"a payload spanning several blocks"], &mut keyed_context());

        // The first block holds the lengths, which fail differently when they change.
        for bit in 8 * 16..8 * data.len() {
            let mut tampered = data.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);

            let mut input = InputBuffer::new();
            assert!(
                matches!(
                    read_all(&mut input, tampered, 64, &mut keyed_context()),
                    Err(CommunicationError::InvalidMac)
                ),
                "bit {} was not detected",
                bit
            );
        }

        let mut input = InputBuffer::new();
        assert_eq!(
            read_all(&mut input, data, 64, &mut keyed_context())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn invalid_lengths() {
        let mut context = unkeyed_context();

        let mut input = InputBuffer::new();
        let too_large = b"\x00\x00\x88\xc0\x04\x00\x00\x00".to_vec();
        assert!(matches!(
            read_all(&mut input, too_large, 8, &mut context),
            Err(CommunicationError::PacketTooLarge(35008))
        ));

        let mut input = InputBuffer::new();
        let unaligned = b"\x00\x00\x00\x0d\x04\x00\x00\x00".to_vec();
        assert!(matches!(
            read_all(&mut input, unaligned, 8, &mut context),
            Err(CommunicationError::InvalidPadding)
        ));

        let mut input = InputBuffer::new();
        let short_padding = b"\x00\x00\x00\x0c\x03\x00\x00\x00".to_vec();
        assert!(matches!(
            read_all(&mut input, short_padding, 8, &mut context),
            Err(CommunicationError::InvalidPadding)
        ));

        let mut input = InputBuffer::new();
        let padding_overflow = b"\x00\x00\x00\x0c\x0c\x00\x00\x00".to_vec();
        assert!(matches!(
            read_all(&mut input, padding_overflow, 8, &mut context),
            Err(CommunicationError::InvalidPadding)
        ));
    }

    #[test]
    fn version_line_then_packets() {
        let mut context = unkeyed_context();
        let mut data = b"SSH-2.0-OpenSSH_8.9p1 Ubuntu-3\r\n".to_vec();
        data.extend(written(&[b"payload"], &mut context));

        let mut input = InputBuffer::new();
        let mut network = FakeNetworkInput::new(data, 10);

        futures::executor::block_on(async {
            let (version, line) = loop {
                if let Some(parsed) = input.parse_version().unwrap() {
                    break parsed;
                }
                input.read_more_data(&mut network).await.unwrap();
            };

            assert_eq!(version.software_version(), "OpenSSH_8.9p1");
            assert_eq!(line, b"SSH-2.0-OpenSSH_8.9p1 Ubuntu-3");

            let packet = loop {
                if let Some(packet) = input.read_packet(&mut context).unwrap() {
                    break packet;
                }
                input.read_more_data(&mut network).await.unwrap();
            };

            assert_eq!(packet.payload, b"payload");
            assert_eq!(packet.sequence_number, 0);

            assert!(matches!(
                input.read_more_data(&mut network).await,
                Err(CommunicationError::EndOfInput)
            ));
        });
    }

    #[test]
    fn invalid_version_line() {
        let mut input = InputBuffer::new();
        let mut network = FakeNetworkInput::new(b"HTTP/1.1 200 OK\r\n".to_vec(), 100);

        futures::executor::block_on(input.read_more_data(&mut network)).unwrap();

        assert_eq!(input.parse_version(), Err(ParseError::Invalid));
    }
}
