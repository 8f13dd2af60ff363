//! Provides the encryption algorithms used by the SSH transport layer.

use definitions::algorithms::{
    internal::{AlgorithmFactory, EncryptionAlgorithmEntry},
    CipherError, EncryptionAlgorithm,
};

#[cfg(any(feature = "aes128-ctr", feature = "aes192-ctr", feature = "aes256-ctr"))]
#[doc(hidden)]
mod aes_ctr;

#[cfg(any(feature = "aes128-ctr", feature = "aes192-ctr", feature = "aes256-ctr"))]
#[doc(inline)]
pub use self::aes_ctr::*;

#[cfg(any(
    feature = "aes128-cbc",
    feature = "aes192-cbc",
    feature = "aes256-cbc",
    feature = "3des-cbc"
))]
#[doc(hidden)]
mod cbc;

#[cfg(any(
    feature = "aes128-cbc",
    feature = "aes192-cbc",
    feature = "aes256-cbc",
    feature = "3des-cbc"
))]
#[doc(inline)]
pub use self::cbc::*;

/// The encryption algorithm that does nothing to the data.
///
/// This is not a functional encryption algorithm, but is used
/// instead of an encryption algorithm before the first key exchange.
/// It is never advertised.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
// This isn't a unit struct, to allow for future expansions of this.
#[non_exhaustive]
pub struct None {}

impl None {
    /// Creates a new `none` encryption algorithm.
    pub fn new() -> None {
        None {}
    }
}

impl EncryptionAlgorithm for None {
    const NAME: &'static str = "none";
    const ADVERTISED: bool = false;
    const CIPHER_BLOCK_SIZE: usize = 8;
    const KEY_SIZE: usize = 0;
    const IV_SIZE: usize = 0;

    fn load_key(&mut self, _iv: &[u8], _key: &[u8]) {
        debug_assert_eq!(_key.len(), Self::KEY_SIZE);
        debug_assert_eq!(_iv.len(), Self::IV_SIZE);
    }

    fn unload_key(&mut self) {}

    fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
        CipherError::check_alignment(data, Self::CIPHER_BLOCK_SIZE)
    }

    fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
        CipherError::check_alignment(data, Self::CIPHER_BLOCK_SIZE)
    }
}

/// Calls the `add` function with all encryption algorithms defined and enabled in this crate.
pub fn add_algorithms<F>(mut add: F)
where
    F: FnMut(AlgorithmFactory<EncryptionAlgorithmEntry>),
{
    #[cfg(feature = "aes128-ctr")]
    add(EncryptionAlgorithmEntry::factory::<Aes128Ctr>());
    #[cfg(feature = "aes192-ctr")]
    add(EncryptionAlgorithmEntry::factory::<Aes192Ctr>());
    #[cfg(feature = "aes256-ctr")]
    add(EncryptionAlgorithmEntry::factory::<Aes256Ctr>());
    #[cfg(feature = "aes128-cbc")]
    add(EncryptionAlgorithmEntry::factory::<Aes128Cbc>());
    #[cfg(feature = "aes192-cbc")]
    add(EncryptionAlgorithmEntry::factory::<Aes192Cbc>());
    #[cfg(feature = "aes256-cbc")]
    add(EncryptionAlgorithmEntry::factory::<Aes256Cbc>());
    #[cfg(feature = "3des-cbc")]
    add(EncryptionAlgorithmEntry::factory::<TripleDesCbc>());
    add(EncryptionAlgorithmEntry::factory::<None>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_leaves_data_untouched() {
        let mut alg = None::new();
        let mut data = *b"01234567abcdefgh";

        alg.encrypt(&mut data).unwrap();
        assert_eq!(&data, b"01234567abcdefgh");

        alg.decrypt(&mut data).unwrap();
        assert_eq!(&data, b"01234567abcdefgh");
    }

    #[test]
    fn none_requires_whole_blocks() {
        let mut alg = None::new();

        assert_eq!(
            alg.encrypt(&mut [0; 5]),
            Err(CipherError::UnalignedInput {
                len: 5,
                block_size: 8
            })
        );
    }

    #[test]
    fn none_is_registered_but_not_advertised() {
        let mut factories = Vec::new();
        add_algorithms(|factory| factories.push(factory));

        let none = factories
            .iter()
            .find(|factory| factory.name == "none")
            .unwrap();
        assert!(!none.advertised);
        assert!(factories
            .iter()
            .filter(|factory| factory.name != "none")
            .all(|factory| factory.advertised));
    }
}
