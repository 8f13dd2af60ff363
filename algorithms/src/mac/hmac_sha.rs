//! Provides implementations of the "hmac-shaX(-XXX)" MAC algorithms.

use definitions::algorithms::MacAlgorithm;
use hmac::{Hmac, Mac};
use secstr::SecStr;

macro_rules! impl_hmac_sha {
    ($name_str:expr, $name:ident, $alg:ty, $size:expr) => {
        #[doc = concat!("Implements the `", $name_str, "` MAC algorithm.")]
        #[doc = ""]
        #[doc = concat!("The existence of this struct is controlled by the `", $name_str, "` feature.")]
        #[derive(Debug, Default)]
        pub struct $name {
            /// The key to use for the MAC computations.
            key: Option<SecStr>,
        }

        impl $name {
            #[doc = concat!("Creates a new `", $name_str, "` MAC algorithm.")]
            pub fn new() -> $name {
                $name { key: None }
            }
        }

        impl MacAlgorithm for $name {
            const NAME: &'static str = $name_str;
            const MAC_SIZE: usize = $size;
            const KEY_SIZE: usize = $size;

            fn load_key(&mut self, key: &[u8]) {
                debug_assert_eq!(key.len(), Self::KEY_SIZE);

                self.key.replace(SecStr::new(key.to_vec()));
            }

            fn unload_key(&mut self) {
                self.key.take();
            }

            fn compute(&mut self, data: &[u8], sequence_number: u32, result: &mut [u8]) {
                debug_assert_eq!(result.len(), Self::MAC_SIZE);

                let key = self.key.as_ref().expect("`load_key` was called before");

                let mut alg = <Hmac<$alg> as Mac>::new_from_slice(key.unsecure())
                    .expect("HMAC can take keys of any size");

                alg.update(&sequence_number.to_be_bytes());
                alg.update(data);

                result.copy_from_slice(&alg.finalize().into_bytes());
            }
        }
    };
}

#[cfg(feature = "hmac-sha1")]
impl_hmac_sha!("hmac-sha1", HmacSha1, sha1::Sha1, 20);

#[cfg(feature = "hmac-sha2-256")]
impl_hmac_sha!("hmac-sha2-256", HmacSha2256, sha2::Sha256, 32);

#[cfg(feature = "hmac-sha2-512")]
impl_hmac_sha!("hmac-sha2-512", HmacSha2512, sha2::Sha512, 64);
