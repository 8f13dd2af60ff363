//! Provides the key exchange algorithms used by the SSH transport layer.

use definitions::algorithms::internal::{AlgorithmFactory, KeyExchangeAlgorithmEntry};

#[cfg(any(
    feature = "diffie-hellman-group14-sha1",
    feature = "diffie-hellman-group14-sha256",
    feature = "diffie-hellman-group16-sha512"
))]
#[doc(hidden)]
mod diffie_hellman;
#[cfg(any(
    feature = "diffie-hellman-group14-sha1",
    feature = "diffie-hellman-group14-sha256",
    feature = "diffie-hellman-group16-sha512"
))]
#[doc(inline)]
pub use self::diffie_hellman::*;

/// Calls the `add` function with all key exchange algorithms defined and enabled in this crate.
pub fn add_algorithms<F>(mut _add: F)
where
    F: FnMut(AlgorithmFactory<KeyExchangeAlgorithmEntry>),
{
    #[cfg(feature = "diffie-hellman-group14-sha256")]
    _add(KeyExchangeAlgorithmEntry::factory::<DiffieHellmanGroup14Sha256>());
    #[cfg(feature = "diffie-hellman-group16-sha512")]
    _add(KeyExchangeAlgorithmEntry::factory::<DiffieHellmanGroup16Sha512>());
    #[cfg(feature = "diffie-hellman-group14-sha1")]
    _add(KeyExchangeAlgorithmEntry::factory::<DiffieHellmanGroup14Sha1>());
}
