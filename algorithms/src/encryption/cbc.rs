//! Provides implementations of the "XXX-cbc" encryption algorithms.

use cbc::cipher::{generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use definitions::algorithms::{CipherError, EncryptionAlgorithm};
use std::fmt;

/// The chaining state of both directions after a key was loaded.
struct Chain<C>
where
    C: cbc::cipher::BlockCipher + cbc::cipher::BlockEncryptMut + cbc::cipher::BlockDecryptMut,
{
    /// Encrypts outgoing blocks.
    encryptor: cbc::Encryptor<C>,
    /// Decrypts incoming blocks.
    decryptor: cbc::Decryptor<C>,
}

macro_rules! impl_cbc {
    ($name_str:expr, $name:ident, $alg:ty, $block_size:expr, $key_size:expr) => {
        #[doc = concat!("Implements the `", $name_str, "` encryption algorithm.")]
        #[doc = ""]
        #[doc = concat!("The existence of this struct is controlled by the `", $name_str, "` feature.")]
        #[derive(Default)]
        pub struct $name {
            /// Contains the chaining state and the keys.
            ///
            /// This will be `None` as long as the keys aren't loaded.
            chain: Option<Chain<$alg>>,
        }

        impl $name {
            #[doc = concat!("Creates a new `", $name_str, "` encryption algorithm.")]
            pub fn new() -> Self {
                $name { chain: None }
            }

            /// Returns the loaded chaining state.
            fn chain(&mut self) -> Result<&mut Chain<$alg>, CipherError> {
                self.chain.as_mut().ok_or(CipherError::KeyNotLoaded)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                // Hide implementation details and keys
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }

        impl EncryptionAlgorithm for $name {
            const NAME: &'static str = $name_str;
            const CIPHER_BLOCK_SIZE: usize = $block_size;
            const KEY_SIZE: usize = $key_size;
            const IV_SIZE: usize = $block_size;

            fn load_key(&mut self, iv: &[u8], key: &[u8]) {
                let encryptor = cbc::Encryptor::<$alg>::new_from_slices(key, iv)
                    .expect("key and iv sizes match the algorithm");
                let decryptor = cbc::Decryptor::<$alg>::new_from_slices(key, iv)
                    .expect("key and iv sizes match the algorithm");

                self.chain.replace(Chain {
                    encryptor,
                    decryptor,
                });
            }

            fn unload_key(&mut self) {
                self.chain.take();
            }

            fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
                CipherError::check_alignment(data, Self::CIPHER_BLOCK_SIZE)?;
                let chain = self.chain()?;

                for block in data.chunks_exact_mut(Self::CIPHER_BLOCK_SIZE) {
                    chain
                        .encryptor
                        .encrypt_block_mut(GenericArray::from_mut_slice(block));
                }

                Ok(())
            }

            fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
                CipherError::check_alignment(data, Self::CIPHER_BLOCK_SIZE)?;
                let chain = self.chain()?;

                for block in data.chunks_exact_mut(Self::CIPHER_BLOCK_SIZE) {
                    chain
                        .decryptor
                        .decrypt_block_mut(GenericArray::from_mut_slice(block));
                }

                Ok(())
            }
        }
    };
}

#[cfg(feature = "aes128-cbc")]
impl_cbc!("aes128-cbc", Aes128Cbc, aes::Aes128, 16, 16);

#[cfg(feature = "aes192-cbc")]
impl_cbc!("aes192-cbc", Aes192Cbc, aes::Aes192, 16, 24);

#[cfg(feature = "aes256-cbc")]
impl_cbc!("aes256-cbc", Aes256Cbc, aes::Aes256, 16, 32);

#[cfg(feature = "3des-cbc")]
impl_cbc!("3des-cbc", TripleDesCbc, des::TdesEde3, 8, 24);
