//! Provides the MAC algorithms used by the SSH transport layer.
//!
//! Before the first key exchange no MAC is used at all, so there is no `none` MAC algorithm.

use definitions::algorithms::internal::{AlgorithmFactory, MacAlgorithmEntry};

#[cfg(any(
    feature = "hmac-sha1",
    feature = "hmac-sha2-256",
    feature = "hmac-sha2-512"
))]
#[doc(hidden)]
mod hmac_sha;
#[cfg(any(
    feature = "hmac-sha1",
    feature = "hmac-sha2-256",
    feature = "hmac-sha2-512"
))]
#[doc(inline)]
pub use self::hmac_sha::*;

/// Calls the `add` function with all MAC algorithms defined and enabled in this crate.
pub fn add_algorithms<F>(mut _add: F)
where
    F: FnMut(AlgorithmFactory<MacAlgorithmEntry>),
{
    #[cfg(feature = "hmac-sha2-256")]
    _add(MacAlgorithmEntry::factory::<HmacSha2256>());
    #[cfg(feature = "hmac-sha2-512")]
    _add(MacAlgorithmEntry::factory::<HmacSha2512>());
    #[cfg(feature = "hmac-sha1")]
    _add(MacAlgorithmEntry::factory::<HmacSha1>());
}
