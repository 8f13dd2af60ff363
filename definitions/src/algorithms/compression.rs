//! Defines the `CompressionAlgorithm` trait.

use std::borrow::Cow;

/// An error raised while decompressing a payload.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum CompressionError {
    /// The compressed data could not be decompressed.
    #[error("the compressed data is invalid")]
    InvalidData,
}

/// Describes a compression algorithm.
pub trait CompressionAlgorithm {
    /// The name of the compression algorithm.
    const NAME: &'static str;

    /// Whether the algorithm is offered during algorithm negotiation.
    const ADVERTISED: bool = true;

    /// Compresses the given data.
    ///
    /// This function receives the data in a `Cow::Borrowed` variant and may
    /// return a `Cow::Owned` variant if it changes the data.
    fn compress<'data>(&mut self, data: Cow<'data, [u8]>) -> Cow<'data, [u8]>;

    /// Decompresses the given data.
    fn decompress<'data>(
        &mut self,
        data: Cow<'data, [u8]>,
    ) -> Result<Cow<'data, [u8]>, CompressionError>;
}

algorithm_entry! {
    /// A runtime description of a compression algorithm.
    pub struct CompressionAlgorithmEntry: CompressionAlgorithm + Send {}

    shared {}

    exclusive {
        fn compress<'data>(&mut self, data: Cow<'data, [u8]>) -> Cow<'data, [u8]>;
        fn decompress<'data>(&mut self, data: Cow<'data, [u8]>)
            -> Result<Cow<'data, [u8]>, CompressionError>;
    }
}
