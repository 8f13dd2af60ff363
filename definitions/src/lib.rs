//! Maps definitions from the SSH RFCs into the Rust type system.
//!
//! This includes
//! - constants defined in the RFCs ([`consts`] module)
//! - parsers and writers for the basic data types in SSH packets ([`parse`] and [`mod@write`]
//!   modules)
//! - the closed set of packets understood by the server ([`packets`] module)
//! - the capability traits implemented by concrete algorithms ([`algorithms`] module)

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub use parse::{Parse, ParseError, ParsedValue, Reader};
pub use write::Compose;

pub mod algorithms;
pub mod consts;
pub mod message_type;
pub mod packets;
pub mod parse;
pub mod write;

/// An implementation detail to allow using trait objects that implement `RngCore` and `CryptoRng`.
pub trait CryptoRngCore: rand::RngCore + rand::CryptoRng {}

impl<T: rand::RngCore + rand::CryptoRng> CryptoRngCore for T {}
