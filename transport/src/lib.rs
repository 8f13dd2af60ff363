//! Provides the server side of the SSH transport layer.
//!
//! A [`Connection`] takes a socket, exchanges version lines, negotiates algorithms, runs
//! Diffie-Hellman key exchanges and frames packets. Packets of higher layers are handed out as
//! decoded [`Packet`](definitions::packets::Packet)s.
//!
//! The algorithms of the `sshgate-algorithms` crate are registered by default. This can be turned
//! off with the `default-algorithms` feature, in which case at least the `none` encryption and
//! compression algorithms have to be registered manually.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub use crate::{
    algorithms::{
        derive_key, negotiate, AlgorithmRegistry, Algorithms, ExchangeContext, KeySizes,
        ListPosition, Negotiated, SessionKeys,
    },
    connection::{Builder, Connection, ConnectionConfig},
    errors::{BuildError, CommunicationError, DisconnectError},
    version::VersionInformation,
};

mod algorithms;
mod connection;
mod input;
#[cfg(test)]
mod test_helpers;
mod version;
mod writer;

pub mod constants;
pub mod errors;

static_assertions::assert_cfg!(
    not(target_pointer_width = "16"),
    "16-bit platforms are not supported by sshgate."
);
