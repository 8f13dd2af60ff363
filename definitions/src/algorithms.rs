//! Provides traits to define algorithms used in the transport layer.

use std::fmt;

/// Declares the type erased entry of an algorithm trait.
///
/// The entry copies the listed associated constants into public fields and forwards the listed
/// methods to the boxed algorithm.
macro_rules! algorithm_entry {
    (
        $(#[$meta:meta])*
        pub struct $entry:ident: $trait:ident $(+ $bound:ident)* {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $field_ty:ty = $constant:ident,
            )*
        }

        shared {
            $(fn $shared:ident(&self $(, $shared_arg:ident: $shared_ty:ty)*) -> $shared_ret:ty;)*
        }

        exclusive {
            $(
                fn $exclusive:ident $(<$lt:lifetime>)? (&mut self $(, $exclusive_arg:ident: $exclusive_ty:ty)*)
                    $(-> $exclusive_ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        pub struct $entry {
            /// The name of the algorithm.
            pub name: &'static str,
            $(
                $(#[$field_meta])*
                pub $field: $field_ty,
            )*
            algorithm: Box<dyn Erased $(+ $bound)*>,
        }

        impl ::std::fmt::Debug for $entry {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.debug_struct(stringify!($entry))
                    .field("name", &self.name)
                    .finish_non_exhaustive()
            }
        }

        impl $entry {
            #[doc = concat!("Wraps an implementation of [`", stringify!($trait), "`].")]
            pub fn new<T>(algorithm: T) -> $entry
            where
                T: $trait $(+ $bound)* + 'static,
            {
                $entry {
                    name: <T as $trait>::NAME,
                    $($field: <T as $trait>::$constant,)*
                    algorithm: Box::new(algorithm),
                }
            }

            /// Returns a factory constructing fresh instances of `T`.
            pub fn factory<T>() -> $crate::algorithms::AlgorithmFactory<$entry>
            where
                T: $trait + Default $(+ $bound)* + 'static,
            {
                fn construct<T: $trait + Default $(+ $bound)* + 'static>() -> $entry {
                    $entry::new(T::default())
                }

                $crate::algorithms::AlgorithmFactory::new(
                    <T as $trait>::NAME,
                    <T as $trait>::ADVERTISED,
                    construct::<T>,
                )
            }

            $(
                #[doc = concat!("See [`", stringify!($trait), "::", stringify!($shared), "`].")]
                pub fn $shared(&self $(, $shared_arg: $shared_ty)*) -> $shared_ret {
                    self.algorithm.$shared($($shared_arg),*)
                }
            )*

            $(
                #[doc = concat!("See [`", stringify!($trait), "::", stringify!($exclusive), "`].")]
                pub fn $exclusive $(<$lt>)? (&mut self $(, $exclusive_arg: $exclusive_ty)*) $(-> $exclusive_ret)? {
                    self.algorithm.$exclusive($($exclusive_arg),*)
                }
            )*
        }

        impl<T> From<T> for $entry
        where
            T: $trait $(+ $bound)* + 'static,
        {
            fn from(algorithm: T) -> $entry {
                $entry::new(algorithm)
            }
        }

        /// The object safe subset of the algorithm trait.
        trait Erased {
            $(fn $shared(&self $(, $shared_arg: $shared_ty)*) -> $shared_ret;)*
            $(fn $exclusive $(<$lt>)? (&mut self $(, $exclusive_arg: $exclusive_ty)*) $(-> $exclusive_ret)?;)*
        }

        impl<T: $trait> Erased for T {
            $(
                fn $shared(&self $(, $shared_arg: $shared_ty)*) -> $shared_ret {
                    <T as $trait>::$shared(self $(, $shared_arg)*)
                }
            )*

            $(
                fn $exclusive $(<$lt>)? (&mut self $(, $exclusive_arg: $exclusive_ty)*) $(-> $exclusive_ret)? {
                    <T as $trait>::$exclusive(self $(, $exclusive_arg)*)
                }
            )*
        }
    };
}

pub use compression::{CompressionAlgorithm, CompressionError};
pub use encryption::EncryptionAlgorithm;
pub use host_key::{HostKeyAlgorithm, HostKeyError, HostKeyMaterial};
pub use key_exchange::{
    KeyExchangeAlgorithm, KeyExchangeAlgorithmError, KeyExchangeData, KeyExchangeHashFunction,
    KeyExchangeResponse,
};
pub use mac::MacAlgorithm;

mod compression;
mod encryption;
mod host_key;
mod key_exchange;
mod mac;

/// Internal implementation details that are likely of little importance to library users.
///
/// They are made only public, because they're used across crate borders.
pub mod internal {
    pub use super::{
        compression::CompressionAlgorithmEntry, encryption::EncryptionAlgorithmEntry,
        host_key::HostKeyAlgorithmEntry, key_exchange::KeyExchangeAlgorithmEntry,
        mac::MacAlgorithmEntry, AlgorithmFactory,
    };
}

/// Describes the possible categories for algorithms.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AlgorithmCategory {
    /// A key exchange algorithm.
    KeyExchange,
    /// A host key algorithm.
    HostKey,
    /// An encryption algorithm.
    Encryption,
    /// A MAC algorithm.
    Mac,
    /// A compression algorithm.
    Compression,
}

/// Describes the direction of an algorithm.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AlgorithmDirection {
    /// The algorithm is used for client to server communication.
    ClientToServer,
    /// The algorithm is used for server to client communication.
    ServerToClient,
}

/// Describes an algorithm role in a connection.
///
/// This is the combination of an algorithm category with its direction, if it has one.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AlgorithmRole(pub AlgorithmCategory, pub Option<AlgorithmDirection>);

impl fmt::Display for AlgorithmRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.1 {
            Some(direction) => write!(f, "{:?} {:?}", self.0, direction),
            None => write!(f, "{:?}", self.0),
        }
    }
}

/// An error for situations where the MAC is invalid.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidMacError {
    /// The computed MAC does not match the sent MAC.
    #[error("computed MAC does not match sent MAC")]
    MacMismatch,
}

/// An error raised by a cipher.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum CipherError {
    /// The cipher was used before a key was loaded.
    #[error("the cipher was used before a key was loaded")]
    KeyNotLoaded,
    /// The input length is not a multiple of the cipher block size.
    #[error("the input length {len} is not a multiple of the block size {block_size}")]
    UnalignedInput {
        /// The length of the input.
        len: usize,
        /// The block size of the cipher.
        block_size: usize,
    },
}

impl CipherError {
    /// Checks that `data` consists of whole cipher blocks of `block_size` bytes.
    pub fn check_alignment(data: &[u8], block_size: usize) -> Result<(), CipherError> {
        if data.len() % block_size == 0 {
            Ok(())
        } else {
            Err(CipherError::UnalignedInput {
                len: data.len(),
                block_size,
            })
        }
    }
}

/// A named, zero-argument constructor for an algorithm entry.
///
/// Every connection creates fresh algorithm instances from the process-wide factories, so no
/// keyed state is ever shared between connections.
pub struct AlgorithmFactory<T> {
    /// The name of the algorithm that this factory constructs.
    pub name: &'static str,
    /// Whether the algorithm may be offered in a key exchange init message.
    pub advertised: bool,
    /// The constructor itself.
    constructor: fn() -> T,
}

impl<T> AlgorithmFactory<T> {
    /// Creates a new factory from its parts.
    pub fn new(name: &'static str, advertised: bool, constructor: fn() -> T) -> Self {
        AlgorithmFactory {
            name,
            advertised,
            constructor,
        }
    }

    /// Constructs a new instance of the algorithm.
    pub fn create(&self) -> T {
        (self.constructor)()
    }
}

impl<T> Clone for AlgorithmFactory<T> {
    fn clone(&self) -> Self {
        AlgorithmFactory {
            name: self.name,
            advertised: self.advertised,
            constructor: self.constructor,
        }
    }
}

impl<T> fmt::Debug for AlgorithmFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AlgorithmFactory")
            .field("name", &self.name)
            .field("advertised", &self.advertised)
            .finish_non_exhaustive()
    }
}
