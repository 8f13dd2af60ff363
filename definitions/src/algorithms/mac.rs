//! Defines the `MacAlgorithm` trait.

use super::InvalidMacError;

/// Describes a message authentication algorithm.
pub trait MacAlgorithm {
    /// The name of the MAC algorithm.
    const NAME: &'static str;

    /// Whether the algorithm is offered during algorithm negotiation.
    const ADVERTISED: bool = true;

    /// The size, in bytes, of the MAC signature used.
    const MAC_SIZE: usize;

    /// The size, in bytes, of the key used for calculating the MAC.
    const KEY_SIZE: usize;

    /// Loads the key required for this MAC algorithm.
    ///
    /// # Panics
    /// The function may panic if `key.len() != Self::KEY_SIZE`.
    fn load_key(&mut self, key: &[u8]);

    /// Unloads the key that was previously loaded.
    fn unload_key(&mut self);

    /// Computes the MAC of `data` prefixed by the big endian `sequence_number`.
    ///
    /// The result should be written to `result`.
    ///
    /// # Panics
    /// The function may panic if `result.len() != Self::MAC_SIZE` or if no key was loaded.
    fn compute(&mut self, data: &[u8], sequence_number: u32, result: &mut [u8]);

    /// Verifies if the given MAC matches the given data.
    ///
    /// Implementations must compare in constant time, which the default implementation does.
    fn verify(
        &mut self,
        data: &[u8],
        sequence_number: u32,
        mac: &[u8],
    ) -> Result<(), InvalidMacError> {
        if mac.len() != Self::MAC_SIZE {
            return Err(InvalidMacError::MacMismatch);
        }

        let mut result = vec![0; Self::MAC_SIZE];

        self.compute(data, sequence_number, &mut result[..]);

        #[inline(never)]
        fn not_equal(a: &[u8], b: &[u8]) -> u8 {
            a.iter().zip(b).fold(0, |acc, (a, b)| acc | (a ^ b))
        }

        if not_equal(&result, mac) == 0 {
            Ok(())
        } else {
            Err(InvalidMacError::MacMismatch)
        }
    }
}

algorithm_entry! {
    /// A runtime description of a MAC algorithm.
    ///
    /// This allows representing different MAC algorithms with the same type.
    pub struct MacAlgorithmEntry: MacAlgorithm + Send {
        /// The size, in bytes, of the MAC signature used.
        mac_size: usize = MAC_SIZE,
        /// The size, in bytes, of the key used for calculating the MAC.
        key_size: usize = KEY_SIZE,
    }

    shared {}

    exclusive {
        fn load_key(&mut self, key: &[u8]);
        fn unload_key(&mut self);
        fn compute(&mut self, data: &[u8], sequence_number: u32, result: &mut [u8]);
        fn verify(&mut self, data: &[u8], sequence_number: u32, mac: &[u8])
            -> Result<(), InvalidMacError>;
    }
}
