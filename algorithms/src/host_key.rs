//! Provides the host key algorithms used by the SSH transport layer.

use definitions::algorithms::internal::{AlgorithmFactory, HostKeyAlgorithmEntry};

#[cfg(any(feature = "ssh-rsa", feature = "rsa-sha2-256", feature = "rsa-sha2-512"))]
#[doc(hidden)]
mod rsa;
#[cfg(any(feature = "ssh-rsa", feature = "rsa-sha2-256", feature = "rsa-sha2-512"))]
#[doc(inline)]
pub use self::rsa::*;

/// Calls the `add` function with all host key algorithms defined and enabled in this crate.
pub fn add_algorithms<F>(mut _add: F)
where
    F: FnMut(AlgorithmFactory<HostKeyAlgorithmEntry>),
{
    #[cfg(feature = "rsa-sha2-512")]
    _add(HostKeyAlgorithmEntry::factory::<RsaSha2512>());
    #[cfg(feature = "rsa-sha2-256")]
    _add(HostKeyAlgorithmEntry::factory::<RsaSha2256>());
    #[cfg(feature = "ssh-rsa")]
    _add(HostKeyAlgorithmEntry::factory::<SshRsa>());
}
