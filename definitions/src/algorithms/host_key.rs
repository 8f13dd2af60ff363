//! Defines the `HostKeyAlgorithm` trait.

use std::{collections::HashMap, fmt};

/// Externally supplied key material, mapping a key name to its PEM encoding.
///
/// Host key algorithms look up the entry they need by name, which allows several algorithms
/// (such as the RSA signature hash variants) to share a single key.
#[derive(Default, Clone)]
pub struct HostKeyMaterial {
    /// The PEM encoded keys by name.
    keys: HashMap<String, String>,
}

impl HostKeyMaterial {
    /// Creates empty key material.
    pub fn new() -> HostKeyMaterial {
        Default::default()
    }

    /// Adds the PEM encoded key `pem` under `name`.
    pub fn with_key(mut self, name: impl Into<String>, pem: impl Into<String>) -> Self {
        self.keys.insert(name.into(), pem.into());

        self
    }

    /// Returns the key stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }
}

impl fmt::Debug for HostKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HostKeyMaterial")
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// An error raised by a host key algorithm.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum HostKeyError {
    /// No key material with the required name was supplied.
    #[error("no key material named `{0}` was supplied")]
    MissingKey(&'static str),
    /// The key material could not be decoded.
    #[error("the key material `{0}` could not be decoded")]
    InvalidKey(&'static str),
    /// The algorithm was used before a key was imported.
    #[error("no host key was imported")]
    KeyNotLoaded,
    /// Creating the signature failed.
    #[error("the signature could not be created")]
    SigningFailed,
}

/// Describes a host key algorithm.
///
/// Host key algorithms sign the exchange hash on behalf of the server and verify the signatures
/// clients produce during public key authentication.
pub trait HostKeyAlgorithm {
    /// The name of the host key algorithm.
    const NAME: &'static str;

    /// Whether the algorithm is offered during algorithm negotiation.
    const ADVERTISED: bool = true;

    /// Imports the private key this algorithm signs with from `material`.
    fn import_key(&mut self, material: &HostKeyMaterial) -> Result<(), HostKeyError>;

    /// Returns the encoded public key blob (`K_S`) of the imported key.
    fn public_key(&self) -> Result<Vec<u8>, HostKeyError>;

    /// Signs `message` and returns the self describing signature blob.
    ///
    /// The blob starts with the algorithm name, followed by the raw signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HostKeyError>;

    /// Verifies that `signature` is a signature blob over `message` for the encoded `public_key`.
    ///
    /// This does not use the imported key.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

algorithm_entry! {
    /// A runtime description of a host key algorithm.
    ///
    /// Entries are shared between connections once their key was imported.
    pub struct HostKeyAlgorithmEntry: HostKeyAlgorithm + Send + Sync {
        /// Whether the algorithm is offered during algorithm negotiation.
        advertised: bool = ADVERTISED,
    }

    shared {
        fn public_key(&self) -> Result<Vec<u8>, HostKeyError>;
        fn sign(&self, message: &[u8]) -> Result<Vec<u8>, HostKeyError>;
        fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
    }

    exclusive {
        fn import_key(&mut self, material: &HostKeyMaterial) -> Result<(), HostKeyError>;
    }
}
