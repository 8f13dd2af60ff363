//! Provides the compression algorithms used by the SSH transport layer.

use definitions::algorithms::{
    internal::{AlgorithmFactory, CompressionAlgorithmEntry},
    CompressionAlgorithm, CompressionError,
};
use std::borrow::Cow;

/// Leaves payloads untouched.
///
/// This is the only compression offered, so `zlib` requests from clients fail negotiation unless
/// they also list `none`.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct None {}

impl CompressionAlgorithm for None {
    const NAME: &'static str = "none";

    fn compress<'data>(&mut self, data: Cow<'data, [u8]>) -> Cow<'data, [u8]> {
        data
    }

    fn decompress<'data>(
        &mut self,
        data: Cow<'data, [u8]>,
    ) -> Result<Cow<'data, [u8]>, CompressionError> {
        Ok(data)
    }
}

/// Hands the factories of all compression algorithms to `add`.
pub fn add_algorithms<F>(mut add: F)
where
    F: FnMut(AlgorithmFactory<CompressionAlgorithmEntry>),
{
    add(CompressionAlgorithmEntry::factory::<None>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_the_identity() {
        let mut alg = None {};

        let compressed = alg.compress(Cow::Borrowed(&b"payload"[..]));
        assert!(matches!(compressed, Cow::Borrowed(_)));

        assert_eq!(&alg.decompress(compressed).unwrap()[..], b"payload");
    }
}
