//! Provides the algorithm implementations used by the SSH transport layer.
//!
//! Every algorithm is controlled by a cargo feature of the same name. Each module offers an
//! `add_algorithms` function that hands factories for all enabled algorithms of its category to
//! a callback, in the order of the server's preference.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub mod compression;
pub mod encryption;
pub mod host_key;
pub mod key_exchange;
pub mod mac;
