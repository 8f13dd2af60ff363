//! Defines the `EncryptionAlgorithm` trait.

use super::CipherError;

/// Describes an encryption algorithm.
pub trait EncryptionAlgorithm {
    /// The name of the encryption algorithm.
    const NAME: &'static str;

    /// Whether the algorithm is offered during algorithm negotiation.
    ///
    /// Only the `none` cipher used before the first key exchange sets this to `false`.
    const ADVERTISED: bool = true;

    /// The size of the smallest amount of data that can be encrypted.
    const CIPHER_BLOCK_SIZE: usize;

    /// The size, in bytes, of the key used by this algorithm.
    const KEY_SIZE: usize;

    /// The size, in bytes, of the iv used by this algorithm.
    const IV_SIZE: usize;

    /// Loads a new key to use for the algorithm.
    ///
    /// # Panics
    /// The function may panic if
    /// - `key.len() != Self::KEY_SIZE`
    /// - `iv.len() != Self::IV_SIZE`
    fn load_key(&mut self, iv: &[u8], key: &[u8]);

    /// Unloads the key that was previously loaded.
    ///
    /// This should overwrite the memory where the key was stored with a predictable value (such as
    /// zero) to avoid the key being readable for longer than necessary.
    fn unload_key(&mut self);

    /// Encrypts `data` in place.
    ///
    /// `data.len()` must be a multiple of `Self::CIPHER_BLOCK_SIZE`. The cipher state carries over
    /// to the next call, so a packet may be encrypted in several pieces.
    fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError>;

    /// Decrypts `data` in place.
    ///
    /// The same alignment and state rules as for [`EncryptionAlgorithm::encrypt`] apply.
    fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError>;
}

algorithm_entry! {
    /// A runtime description of an encryption algorithm.
    ///
    /// Ciphers are stateful, so every direction of a connection owns its own entry.
    pub struct EncryptionAlgorithmEntry: EncryptionAlgorithm + Send {
        /// The size of the smallest amount of data that can be encrypted.
        cipher_block_size: usize = CIPHER_BLOCK_SIZE,
        /// The size, in bytes, of the key used by this algorithm.
        key_size: usize = KEY_SIZE,
        /// The size, in bytes, of the iv used by this algorithm.
        iv_size: usize = IV_SIZE,
    }

    shared {}

    exclusive {
        fn load_key(&mut self, iv: &[u8], key: &[u8]);
        fn unload_key(&mut self);
        fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError>;
        fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError>;
    }
}
