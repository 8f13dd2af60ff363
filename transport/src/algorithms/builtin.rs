//! Contains the built-in algorithm implementations.

use super::AlgorithmRegistry;

// With default algorithms, simply include those

/// Fills `registry` with all algorithms of the default algorithm crate, in its preference order.
#[cfg(feature = "default-algorithms")]
pub(super) fn add_builtin_algorithms(registry: &mut AlgorithmRegistry) {
    use sshgate_algorithms::{compression, encryption, host_key, key_exchange, mac};

    key_exchange::add_algorithms(|factory| registry.key_exchange.push(factory));
    host_key::add_algorithms(|factory| registry.host_key.push(factory));
    encryption::add_algorithms(|factory| registry.encryption.push(factory));
    mac::add_algorithms(|factory| registry.mac.push(factory));
    compression::add_algorithms(|factory| registry.compression.push(factory));
}

// Without default algorithms simply add no algorithms

/// Leaves `registry` empty, since no default algorithms are available.
#[cfg(not(feature = "default-algorithms"))]
pub(super) fn add_builtin_algorithms(_registry: &mut AlgorithmRegistry) {}
