//! Provides helpers for writing tests.
//!
//! Most notable are the `FakeNetworkInput` type and contexts with fixed keys.

use definitions::algorithms::internal::{
    CompressionAlgorithmEntry, EncryptionAlgorithmEntry, MacAlgorithmEntry,
};
use sshgate_algorithms::{compression, encryption, mac};
use std::{
    cmp::min,
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, ReadBuf};

use crate::algorithms::ExchangeContext;

/// Returns a context without encryption or MAC, as used before the first key exchange.
pub(crate) fn unkeyed_context() -> ExchangeContext {
    ExchangeContext::new(
        EncryptionAlgorithmEntry::factory::<encryption::None>().create(),
        None,
        CompressionAlgorithmEntry::factory::<compression::None>().create(),
    )
}

/// Returns a context using `aes128-ctr` and `hmac-sha2-256` with fixed keys.
///
/// Every call returns a context in the same state, so one can write and another one can read.
pub(crate) fn keyed_context() -> ExchangeContext {
    let mut encryption = EncryptionAlgorithmEntry::factory::<encryption::Aes128Ctr>().create();
    encryption.load_key(&[1; 16], &[2; 16]);

    let mut mac = MacAlgorithmEntry::factory::<mac::HmacSha2256>().create();
    mac.load_key(&[3; 32]);

    ExchangeContext::new(
        encryption,
        Some(mac),
        CompressionAlgorithmEntry::factory::<compression::None>().create(),
    )
}

/// Acts as a fake network for input to the SSH transport layer.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FakeNetworkInput {
    /// The data to be sent.
    input_data: Vec<u8>,
    /// The maximum amount of data that should be sent in one "packet".
    packet_size: usize,
}

impl FakeNetworkInput {
    /// Creates a fake network input from the given input data and the packet size.
    pub(crate) fn new(input_data: Vec<u8>, packet_size: usize) -> FakeNetworkInput {
        FakeNetworkInput {
            input_data,
            packet_size,
        }
    }
}

impl AsyncRead for FakeNetworkInput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let amount_to_copy = min(
            min(self.input_data.len(), self.packet_size),
            buf.remaining(),
        );

        buf.put_slice(&self.input_data[..amount_to_copy]);

        self.input_data.drain(..amount_to_copy);

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn simple_input() {
        let data: Vec<u8> = (0..175).collect();

        let mut fake_input = FakeNetworkInput::new(data.clone(), 50);

        let mut buf = [0; 100];

        futures::executor::block_on(async {
            assert_eq!(fake_input.read(&mut buf).await.ok(), Some(50));
            assert_eq!(&data[0..50], &buf[0..50]);

            assert_eq!(fake_input.read(&mut buf).await.ok(), Some(50));
            assert_eq!(&data[50..100], &buf[0..50]);

            assert_eq!(fake_input.read(&mut buf).await.ok(), Some(50));
            assert_eq!(&data[100..150], &buf[0..50]);

            assert_eq!(fake_input.read(&mut buf).await.ok(), Some(25));
            assert_eq!(&data[150..175], &buf[0..25]);
        });
    }
}
