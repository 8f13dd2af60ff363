//! Provides implementations of the "aesXXX-ctr" encryption algorithms.

use definitions::algorithms::{CipherError, EncryptionAlgorithm};
use std::fmt;

macro_rules! impl_aes_ctr {
    ($name_str:expr, $name:ident, $alg:ty, $key_size:expr) => {
        #[doc = concat!("Implements the `", $name_str, "` encryption algorithm.")]
        #[doc = ""]
        #[doc = concat!("The existence of this struct is controlled by the `", $name_str, "` feature.")]
        #[derive(Default)]
        pub struct $name {
            /// Contains the keystream state.
            ///
            /// This will be `None` as long as the keys aren't loaded.
            algorithm: Option<$alg>,
        }

        impl $name {
            #[doc = concat!("Creates a new `", $name_str, "` encryption algorithm.")]
            pub fn new() -> Self {
                $name { algorithm: None }
            }

            /// Applies the keystream to `data`, continuing where the last call stopped.
            fn apply(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
                CipherError::check_alignment(data, Self::CIPHER_BLOCK_SIZE)?;

                let alg = self.algorithm.as_mut().ok_or(CipherError::KeyNotLoaded)?;

                use aes::cipher::StreamCipher as _;
                alg.apply_keystream(data);

                Ok(())
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
            const CIPHER_BLOCK_SIZE: usize = 16;
            const KEY_SIZE: usize = $key_size;
            const IV_SIZE: usize = 16;

            fn load_key(&mut self, iv: &[u8], key: &[u8]) {
                use aes::cipher::KeyIvInit as _;
                let alg = <$alg>::new_from_slices(key, iv)
                    .expect("key and iv sizes match the algorithm");

                self.algorithm.replace(alg);
            }

            fn unload_key(&mut self) {
                self.algorithm.take();
            }

            fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
                self.apply(data)
            }

            fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CipherError> {
                self.apply(data)
            }
        }
    };
}

#[cfg(feature = "aes128-ctr")]
impl_aes_ctr!("aes128-ctr", Aes128Ctr, ctr::Ctr128BE::<aes::Aes128>, 16);

#[cfg(feature = "aes192-ctr")]
impl_aes_ctr!("aes192-ctr", Aes192Ctr, ctr::Ctr128BE::<aes::Aes192>, 24);

#[cfg(feature = "aes256-ctr")]
impl_aes_ctr!("aes256-ctr", Aes256Ctr, ctr::Ctr128BE::<aes::Aes256>, 32);
