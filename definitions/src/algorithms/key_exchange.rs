//! Defines the `KeyExchangeAlgorithm` trait.

use num_bigint::BigInt;

use super::{internal::HostKeyAlgorithmEntry, HostKeyError};
use crate::CryptoRngCore;

/// The data needed to compute the exchange hash.
///
/// Identification strings exclude the trailing CR LF, key exchange init messages are the raw
/// payloads as they were sent.
#[derive(Debug, Clone, Copy)]
pub struct KeyExchangeData<'data> {
    /// The identification string of the client.
    pub client_identification: &'data [u8],
    /// The identification string of the server.
    pub server_identification: &'data [u8],
    /// The `SSH_MSG_KEXINIT` payload of the client.
    pub client_kexinit: &'data [u8],
    /// The `SSH_MSG_KEXINIT` payload of the server.
    pub server_kexinit: &'data [u8],
}

/// The result of the server side of a key exchange.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeyExchangeResponse {
    /// The public value of the server.
    pub server_public: BigInt,
    /// The public key blob of the host key that signed the exchange hash.
    pub host_key: Vec<u8>,
    /// The signature blob over the exchange hash.
    pub signature: Vec<u8>,
    /// The shared secret that was generated during the key exchange.
    pub shared_secret: BigInt,
    /// The exchange hash that was generated during the key exchange.
    pub exchange_hash: Vec<u8>,
}

/// The type of a hash function used by a key exchange algorithm.
pub type KeyExchangeHashFunction = fn(&[u8]) -> Vec<u8>;

/// An error raised during a key exchange.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum KeyExchangeAlgorithmError {
    /// The public value sent by the client is outside the valid range.
    #[error("the public value of the client is out of range")]
    InvalidPublicValue,
    /// The host key could not sign the exchange hash.
    #[error("the exchange hash could not be signed")]
    HostKey(#[from] HostKeyError),
}

/// Describes the server side of a key exchange algorithm.
pub trait KeyExchangeAlgorithm {
    /// The name of the key exchange algorithm.
    const NAME: &'static str;

    /// Whether the algorithm is offered during algorithm negotiation.
    const ADVERTISED: bool = true;

    /// The hash function used for the exchange hash and the key derivation.
    const HASH_FUNCTION: KeyExchangeHashFunction;

    /// Answers the public value `client_public` of the client.
    ///
    /// This generates the server's ephemeral key, computes the shared secret and the exchange
    /// hash and signs the exchange hash with `host_key`.
    fn respond(
        &mut self,
        client_public: &BigInt,
        data: &KeyExchangeData,
        host_key: &HostKeyAlgorithmEntry,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<KeyExchangeResponse, KeyExchangeAlgorithmError>;
}

algorithm_entry! {
    /// A runtime description of a key exchange algorithm.
    pub struct KeyExchangeAlgorithmEntry: KeyExchangeAlgorithm + Send {
        /// The hash function used for the exchange hash and the key derivation.
        hash_function: KeyExchangeHashFunction = HASH_FUNCTION,
    }

    shared {}

    exclusive {
        fn respond(
            &mut self,
            client_public: &BigInt,
            data: &KeyExchangeData,
            host_key: &HostKeyAlgorithmEntry,
            rng: &mut dyn CryptoRngCore
        ) -> Result<KeyExchangeResponse, KeyExchangeAlgorithmError>;
    }
}
