//! Implements the key derivation of [RFC 4253 section 7.2](https://tools.ietf.org/html/rfc4253#section-7.2).

use definitions::{algorithms::KeyExchangeHashFunction, write};
use num_bigint::BigInt;
use zeroize::Zeroizing;

/// The sizes of the six values derived after each key exchange.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct KeySizes {
    /// The size of the client to server IV.
    pub iv_client_to_server: usize,
    /// The size of the server to client IV.
    pub iv_server_to_client: usize,
    /// The size of the client to server encryption key.
    pub encryption_client_to_server: usize,
    /// The size of the server to client encryption key.
    pub encryption_server_to_client: usize,
    /// The size of the client to server MAC key.
    pub mac_client_to_server: usize,
    /// The size of the server to client MAC key.
    pub mac_server_to_client: usize,
}

/// The keys derived after a key exchange.
///
/// All keys are wiped from memory once they are dropped.
#[derive(Debug)]
pub struct SessionKeys {
    /// The client to server IV (letter `A`).
    pub iv_client_to_server: Zeroizing<Vec<u8>>,
    /// The server to client IV (letter `B`).
    pub iv_server_to_client: Zeroizing<Vec<u8>>,
    /// The client to server encryption key (letter `C`).
    pub encryption_client_to_server: Zeroizing<Vec<u8>>,
    /// The server to client encryption key (letter `D`).
    pub encryption_server_to_client: Zeroizing<Vec<u8>>,
    /// The client to server MAC key (letter `E`).
    pub mac_client_to_server: Zeroizing<Vec<u8>>,
    /// The server to client MAC key (letter `F`).
    pub mac_server_to_client: Zeroizing<Vec<u8>>,
}

impl SessionKeys {
    /// Derives all six keys from the result of a key exchange.
    pub fn derive(
        hash_fn: KeyExchangeHashFunction,
        shared_secret: &BigInt,
        exchange_hash: &[u8],
        session_id: &[u8],
        sizes: &KeySizes,
    ) -> SessionKeys {
        let derive = |letter, len| {
            derive_key(
                hash_fn,
                shared_secret,
                exchange_hash,
                letter,
                session_id,
                len,
            )
        };

        SessionKeys {
            iv_client_to_server: derive(b'A', sizes.iv_client_to_server),
            iv_server_to_client: derive(b'B', sizes.iv_server_to_client),
            encryption_client_to_server: derive(b'C', sizes.encryption_client_to_server),
            encryption_server_to_client: derive(b'D', sizes.encryption_server_to_client),
            mac_client_to_server: derive(b'E', sizes.mac_client_to_server),
            mac_server_to_client: derive(b'F', sizes.mac_server_to_client),
        }
    }
}

/// Derives a single key of `len` bytes.
///
/// The first block is `HASH(K || H || letter || session_id)`, every further block is
/// `HASH(K || H || K1 || ... || Kn)` over all blocks so far. The result is truncated to `len`.
pub fn derive_key(
    hash_fn: KeyExchangeHashFunction,
    shared_secret: &BigInt,
    exchange_hash: &[u8],
    letter: u8,
    session_id: &[u8],
    len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut prefix = Zeroizing::new(Vec::new());
    write::mpint(shared_secret, &mut *prefix).expect("writes to a `Vec` cannot fail");
    prefix.extend_from_slice(exchange_hash);

    let mut input = Zeroizing::new(prefix.to_vec());
    input.push(letter);
    input.extend_from_slice(session_id);

    let mut key = Zeroizing::new(hash_fn(&input));

    while key.len() < len {
        input.truncate(prefix.len());
        input.extend_from_slice(&key);

        let block = Zeroizing::new(hash_fn(&input));
        key.extend_from_slice(&block);
    }

    key.truncate(len);
    key
}
