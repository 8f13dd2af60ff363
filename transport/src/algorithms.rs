//! Contains the algorithm registry, the negotiation of algorithms and the per direction exchange
//! contexts.

use definitions::{
    algorithms::{
        internal::{
            AlgorithmFactory, CompressionAlgorithmEntry, EncryptionAlgorithmEntry,
            HostKeyAlgorithmEntry, KeyExchangeAlgorithmEntry, MacAlgorithmEntry,
        },
        AlgorithmCategory, AlgorithmDirection, AlgorithmRole, CompressionAlgorithm,
        EncryptionAlgorithm, HostKeyAlgorithm, HostKeyMaterial, KeyExchangeAlgorithm,
        MacAlgorithm,
    },
    consts::{DisconnectReason, EXT_INFO_SERVER},
    packets::KexInit,
    CryptoRngCore,
};
use rand::RngCore as _;
use std::{cmp::max, sync::Arc};

use crate::{
    constants::MIN_PACKET_LEN_ALIGN,
    errors::{BuildError, DisconnectError, InvalidAlgorithmError},
};

pub use self::key_expansion::{derive_key, KeySizes, SessionKeys};

mod builtin;
mod helpers;
mod key_expansion;

/// The name of the algorithm that must exist for encryption and compression.
const NONE: &str = "none";

/// Describes where an algorithm is added to its list.
///
/// The position in the list is the server's preference, which only matters for the order in the
/// key exchange init message, since the client's preference decides the negotiation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ListPosition {
    /// The algorithm is added in front of all other algorithms.
    Front,
    /// The algorithm is added after all other algorithms.
    Back,
}

/// Adds `factory` to `list` after checking its name.
fn add_factory<T>(
    list: &mut Vec<AlgorithmFactory<T>>,
    factory: AlgorithmFactory<T>,
    category: AlgorithmCategory,
    position: ListPosition,
) -> Result<(), InvalidAlgorithmError> {
    helpers::validate_algorithm_name(factory.name, category)?;

    if list.iter().any(|existing| existing.name == factory.name) {
        return Err(InvalidAlgorithmError::Duplicate(factory.name.to_owned()));
    }

    match position {
        ListPosition::Front => list.insert(0, factory),
        ListPosition::Back => list.push(factory),
    }

    Ok(())
}

/// Returns the names of all advertised algorithms in `list`.
fn advertised<T>(list: &[AlgorithmFactory<T>]) -> Vec<&'static str> {
    list.iter()
        .filter(|factory| factory.advertised)
        .map(|factory| factory.name)
        .collect()
}

/// Creates the algorithm named `name` from `list`.
fn create<T>(list: &[AlgorithmFactory<T>], name: &str) -> Option<T> {
    list.iter()
        .find(|factory| factory.name == name)
        .map(AlgorithmFactory::create)
}

/// The process wide catalog of supported algorithms.
///
/// The registry only holds constructors. Every connection creates its own algorithm instances
/// from it, so the registry can be shared freely once it is built.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    /// The key exchange algorithms.
    key_exchange: Vec<AlgorithmFactory<KeyExchangeAlgorithmEntry>>,
    /// The host key algorithms.
    host_key: Vec<AlgorithmFactory<HostKeyAlgorithmEntry>>,
    /// The encryption algorithms, used for both directions.
    encryption: Vec<AlgorithmFactory<EncryptionAlgorithmEntry>>,
    /// The MAC algorithms, used for both directions.
    mac: Vec<AlgorithmFactory<MacAlgorithmEntry>>,
    /// The compression algorithms, used for both directions.
    compression: Vec<AlgorithmFactory<CompressionAlgorithmEntry>>,
}

impl Default for AlgorithmRegistry {
    /// Creates a registry with all algorithms of the default algorithm crate.
    ///
    /// Without the `default-algorithms` feature the registry is empty.
    fn default() -> AlgorithmRegistry {
        let mut registry = AlgorithmRegistry::new();

        builtin::add_builtin_algorithms(&mut registry);

        registry
    }
}

impl AlgorithmRegistry {
    /// Creates a registry without any algorithms.
    pub fn new() -> AlgorithmRegistry {
        AlgorithmRegistry {
            key_exchange: Vec::new(),
            host_key: Vec::new(),
            encryption: Vec::new(),
            mac: Vec::new(),
            compression: Vec::new(),
        }
    }

    /// Adds the key exchange algorithm `A`.
    pub fn add_key_exchange<A>(
        &mut self,
        position: ListPosition,
    ) -> Result<&mut Self, InvalidAlgorithmError>
    where
        A: KeyExchangeAlgorithm + Default + Send + 'static,
    {
        add_factory(
            &mut self.key_exchange,
            KeyExchangeAlgorithmEntry::factory::<A>(),
            AlgorithmCategory::KeyExchange,
            position,
        )?;

        Ok(self)
    }

    /// Adds the host key algorithm `A`.
    pub fn add_host_key<A>(
        &mut self,
        position: ListPosition,
    ) -> Result<&mut Self, InvalidAlgorithmError>
    where
        A: HostKeyAlgorithm + Default + Send + Sync + 'static,
    {
        add_factory(
            &mut self.host_key,
            HostKeyAlgorithmEntry::factory::<A>(),
            AlgorithmCategory::HostKey,
            position,
        )?;

        Ok(self)
    }

    /// Adds the encryption algorithm `A`.
    pub fn add_encryption<A>(
        &mut self,
        position: ListPosition,
    ) -> Result<&mut Self, InvalidAlgorithmError>
    where
        A: EncryptionAlgorithm + Default + Send + 'static,
    {
        add_factory(
            &mut self.encryption,
            EncryptionAlgorithmEntry::factory::<A>(),
            AlgorithmCategory::Encryption,
            position,
        )?;

        Ok(self)
    }

    /// Adds the MAC algorithm `A`.
    pub fn add_mac<A>(&mut self, position: ListPosition) -> Result<&mut Self, InvalidAlgorithmError>
    where
        A: MacAlgorithm + Default + Send + 'static,
    {
        add_factory(
            &mut self.mac,
            MacAlgorithmEntry::factory::<A>(),
            AlgorithmCategory::Mac,
            position,
        )?;

        Ok(self)
    }

    /// Adds the compression algorithm `A`.
    pub fn add_compression<A>(
        &mut self,
        position: ListPosition,
    ) -> Result<&mut Self, InvalidAlgorithmError>
    where
        A: CompressionAlgorithm + Default + Send + 'static,
    {
        add_factory(
            &mut self.compression,
            CompressionAlgorithmEntry::factory::<A>(),
            AlgorithmCategory::Compression,
            position,
        )?;

        Ok(self)
    }

    /// Removes all algorithms of `category` that are not named in `names`.
    ///
    /// This allows restricting a default registry to a few algorithms.
    pub fn retain(&mut self, category: AlgorithmCategory, names: &[&str]) -> &mut Self {
        fn retain_in<T>(list: &mut Vec<AlgorithmFactory<T>>, names: &[&str]) {
            list.retain(|factory| names.contains(&factory.name));
        }

        match category {
            AlgorithmCategory::KeyExchange => retain_in(&mut self.key_exchange, names),
            AlgorithmCategory::HostKey => retain_in(&mut self.host_key, names),
            AlgorithmCategory::Encryption => retain_in(&mut self.encryption, names),
            AlgorithmCategory::Mac => retain_in(&mut self.mac, names),
            AlgorithmCategory::Compression => retain_in(&mut self.compression, names),
        }

        self
    }

    /// Returns the names of all algorithms of `category`, including unadvertised ones.
    pub fn names(&self, category: AlgorithmCategory) -> Vec<&'static str> {
        fn names_in<T>(list: &[AlgorithmFactory<T>]) -> Vec<&'static str> {
            list.iter().map(|factory| factory.name).collect()
        }

        match category {
            AlgorithmCategory::KeyExchange => names_in(&self.key_exchange),
            AlgorithmCategory::HostKey => names_in(&self.host_key),
            AlgorithmCategory::Encryption => names_in(&self.encryption),
            AlgorithmCategory::Mac => names_in(&self.mac),
            AlgorithmCategory::Compression => names_in(&self.compression),
        }
    }

    /// Checks the registry and imports all host keys from `material`.
    ///
    /// Every category needs at least one advertised algorithm, and encryption and compression
    /// need a `none` algorithm for the time before the first key exchange.
    pub fn load(&self, material: &HostKeyMaterial) -> Result<Algorithms, BuildError> {
        fn require<T>(
            list: &[AlgorithmFactory<T>],
            category: AlgorithmCategory,
        ) -> Result<(), BuildError> {
            if list.iter().any(|factory| factory.advertised) {
                Ok(())
            } else {
                Err(BuildError::EmptyAlgorithmRole(AlgorithmRole(category, None)))
            }
        }

        fn require_none<T>(
            list: &[AlgorithmFactory<T>],
            category: AlgorithmCategory,
        ) -> Result<AlgorithmFactory<T>, BuildError> {
            list.iter()
                .find(|factory| factory.name == NONE)
                .cloned()
                .ok_or(BuildError::RequiredNoneAlgorithmMissing(AlgorithmRole(
                    category, None,
                )))
        }

        require(&self.key_exchange, AlgorithmCategory::KeyExchange)?;
        require(&self.host_key, AlgorithmCategory::HostKey)?;
        require(&self.encryption, AlgorithmCategory::Encryption)?;
        require(&self.mac, AlgorithmCategory::Mac)?;
        require(&self.compression, AlgorithmCategory::Compression)?;

        let none_encryption = require_none(&self.encryption, AlgorithmCategory::Encryption)?;
        let none_compression = require_none(&self.compression, AlgorithmCategory::Compression)?;

        let host_keys = self
            .host_key
            .iter()
            .map(|factory| {
                let mut entry = factory.create();

                entry
                    .import_key(material)
                    .map_err(|error| BuildError::HostKey {
                        algorithm: factory.name,
                        error,
                    })?;

                Ok(Arc::new(entry))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(Algorithms {
            key_exchange: self.key_exchange.clone(),
            host_keys,
            encryption: self.encryption.clone(),
            mac: self.mac.clone(),
            compression: self.compression.clone(),
            none_encryption,
            none_compression,
        })
    }
}

/// The names of the algorithms chosen during a negotiation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Negotiated {
    /// The key exchange algorithm.
    pub key_exchange: &'static str,
    /// The host key algorithm.
    pub host_key: &'static str,
    /// The encryption algorithm from client to server.
    pub encryption_client_to_server: &'static str,
    /// The encryption algorithm from server to client.
    pub encryption_server_to_client: &'static str,
    /// The MAC algorithm from client to server.
    pub mac_client_to_server: &'static str,
    /// The MAC algorithm from server to client.
    pub mac_server_to_client: &'static str,
    /// The compression algorithm from client to server.
    pub compression_client_to_server: &'static str,
    /// The compression algorithm from server to client.
    pub compression_server_to_client: &'static str,
}

/// Chooses the first algorithm in `offered` that is also `provided`.
///
/// The order of `provided` is irrelevant, the client's preference always wins.
pub fn negotiate(
    role: AlgorithmRole,
    offered: &[String],
    provided: &[&'static str],
) -> Result<&'static str, DisconnectError> {
    offered
        .iter()
        .find_map(|name| provided.iter().find(|&&own| own == name.as_str()).copied())
        .ok_or_else(|| {
            DisconnectError::new(
                DisconnectReason::KeyExchangeFailed,
                format!(
                    "Could not find a shared algorithm for {}, offered: {}, provided: {}",
                    role,
                    offered.join(","),
                    provided.join(",")
                ),
            )
        })
}

/// A checked algorithm registry with imported host keys.
///
/// This is created once by [`AlgorithmRegistry::load`] and shared by all connections.
#[derive(Debug)]
pub struct Algorithms {
    /// The key exchange algorithms.
    key_exchange: Vec<AlgorithmFactory<KeyExchangeAlgorithmEntry>>,
    /// The host key algorithms with their imported keys.
    host_keys: Vec<Arc<HostKeyAlgorithmEntry>>,
    /// The encryption algorithms.
    encryption: Vec<AlgorithmFactory<EncryptionAlgorithmEntry>>,
    /// The MAC algorithms.
    mac: Vec<AlgorithmFactory<MacAlgorithmEntry>>,
    /// The compression algorithms.
    compression: Vec<AlgorithmFactory<CompressionAlgorithmEntry>>,
    /// The encryption algorithm used before the first key exchange.
    none_encryption: AlgorithmFactory<EncryptionAlgorithmEntry>,
    /// The compression algorithm used before the first key exchange.
    none_compression: AlgorithmFactory<CompressionAlgorithmEntry>,
}

impl Algorithms {
    /// Creates the key exchange init message the server sends.
    ///
    /// The kex list ends with `ext-info-s` to announce extension negotiation.
    pub fn server_kex_init(&self, rng: &mut dyn CryptoRngCore) -> KexInit {
        fn owned(names: Vec<&'static str>) -> Vec<String> {
            names.into_iter().map(String::from).collect()
        }

        let mut cookie = [0; 16];
        rng.fill_bytes(&mut cookie);

        let mut kex_algorithms = owned(advertised(&self.key_exchange));
        kex_algorithms.push(EXT_INFO_SERVER.to_owned());

        let encryption = owned(advertised(&self.encryption));
        let mac = owned(advertised(&self.mac));
        let compression = owned(advertised(&self.compression));

        KexInit {
            cookie,
            kex_algorithms,
            server_host_key_algorithms: owned(self.host_key_names()),
            encryption_algorithms_client_to_server: encryption.clone(),
            encryption_algorithms_server_to_client: encryption,
            mac_algorithms_client_to_server: mac.clone(),
            mac_algorithms_server_to_client: mac,
            compression_algorithms_client_to_server: compression.clone(),
            compression_algorithms_server_to_client: compression,
            languages_client_to_server: Vec::new(),
            languages_server_to_client: Vec::new(),
            first_kex_packet_follows: false,
            reserved: 0,
        }
    }

    /// Negotiates all algorithms against the key exchange init message of the client.
    pub fn negotiate(&self, client: &KexInit) -> Result<Negotiated, DisconnectError> {
        use AlgorithmCategory::*;
        use AlgorithmDirection::*;

        let encryption = advertised(&self.encryption);
        let mac = advertised(&self.mac);
        let compression = advertised(&self.compression);

        Ok(Negotiated {
            key_exchange: negotiate(
                AlgorithmRole(KeyExchange, None),
                &client.kex_algorithms,
                &advertised(&self.key_exchange),
            )?,
            host_key: negotiate(
                AlgorithmRole(HostKey, None),
                &client.server_host_key_algorithms,
                &self.host_key_names(),
            )?,
            encryption_client_to_server: negotiate(
                AlgorithmRole(Encryption, Some(ClientToServer)),
                &client.encryption_algorithms_client_to_server,
                &encryption,
            )?,
            encryption_server_to_client: negotiate(
                AlgorithmRole(Encryption, Some(ServerToClient)),
                &client.encryption_algorithms_server_to_client,
                &encryption,
            )?,
            mac_client_to_server: negotiate(
                AlgorithmRole(Mac, Some(ClientToServer)),
                &client.mac_algorithms_client_to_server,
                &mac,
            )?,
            mac_server_to_client: negotiate(
                AlgorithmRole(Mac, Some(ServerToClient)),
                &client.mac_algorithms_server_to_client,
                &mac,
            )?,
            compression_client_to_server: negotiate(
                AlgorithmRole(Compression, Some(ClientToServer)),
                &client.compression_algorithms_client_to_server,
                &compression,
            )?,
            compression_server_to_client: negotiate(
                AlgorithmRole(Compression, Some(ServerToClient)),
                &client.compression_algorithms_server_to_client,
                &compression,
            )?,
        })
    }

    /// Returns the host key algorithm named `name`, whether it is advertised or not.
    pub fn host_key(&self, name: &str) -> Option<&Arc<HostKeyAlgorithmEntry>> {
        self.host_keys.iter().find(|entry| entry.name == name)
    }

    /// Returns the names of the advertised host key algorithms, in preference order.
    pub fn host_key_names(&self) -> Vec<&'static str> {
        self.host_keys
            .iter()
            .filter(|entry| entry.advertised)
            .map(|entry| entry.name)
            .collect()
    }

    /// Creates a fresh instance of the key exchange algorithm `name`.
    pub(crate) fn create_key_exchange(&self, name: &str) -> Option<KeyExchangeAlgorithmEntry> {
        create(&self.key_exchange, name)
    }

    /// Creates a fresh instance of the encryption algorithm `name`.
    pub(crate) fn create_encryption(&self, name: &str) -> Option<EncryptionAlgorithmEntry> {
        create(&self.encryption, name)
    }

    /// Creates a fresh instance of the MAC algorithm `name`.
    pub(crate) fn create_mac(&self, name: &str) -> Option<MacAlgorithmEntry> {
        create(&self.mac, name)
    }

    /// Creates a fresh instance of the compression algorithm `name`.
    pub(crate) fn create_compression(&self, name: &str) -> Option<CompressionAlgorithmEntry> {
        create(&self.compression, name)
    }

    /// Creates the context used in both directions before the first key exchange.
    pub(crate) fn initial_context(&self) -> ExchangeContext {
        ExchangeContext::new(
            self.none_encryption.create(),
            None,
            self.none_compression.create(),
        )
    }
}

/// The keyed algorithms of one direction of a connection.
///
/// A new context is prepared during each key exchange and replaces the active one when the
/// `SSH_MSG_NEWKEYS` message for its direction passes.
#[derive(Debug)]
pub struct ExchangeContext {
    /// The cipher with its key and IV loaded.
    pub(crate) encryption: EncryptionAlgorithmEntry,
    /// The MAC with its key loaded, if there is one.
    pub(crate) mac: Option<MacAlgorithmEntry>,
    /// The compression algorithm.
    pub(crate) compression: CompressionAlgorithmEntry,
}

impl ExchangeContext {
    /// Creates a new context from already keyed algorithms.
    pub fn new(
        encryption: EncryptionAlgorithmEntry,
        mac: Option<MacAlgorithmEntry>,
        compression: CompressionAlgorithmEntry,
    ) -> ExchangeContext {
        ExchangeContext {
            encryption,
            mac,
            compression,
        }
    }

    /// Returns the alignment of packets in this direction.
    pub fn block_size(&self) -> usize {
        max(self.encryption.cipher_block_size, MIN_PACKET_LEN_ALIGN)
    }

    /// Returns the number of MAC bytes trailing each packet.
    pub fn mac_len(&self) -> usize {
        self.mac.as_ref().map_or(0, |mac| mac.mac_size)
    }

    /// Returns the name of the encryption algorithm.
    pub fn encryption_name(&self) -> &'static str {
        self.encryption.name
    }

    /// Returns the name of the MAC algorithm, if there is one.
    pub fn mac_name(&self) -> Option<&'static str> {
        self.mac.as_ref().map(|mac| mac.name)
    }

    /// Returns the name of the compression algorithm.
    pub fn compression_name(&self) -> &'static str {
        self.compression.name
    }
}

impl Drop for ExchangeContext {
    fn drop(&mut self) {
        self.encryption.unload_key();

        if let Some(mac) = &mut self.mac {
            mac.unload_key();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn client_preference_wins() {
        let role = AlgorithmRole(AlgorithmCategory::Encryption, None);

        assert_eq!(
            negotiate(role, &strings(&["b", "a", "c"]), &["c", "a"]),
            Ok("a")
        );
        assert_eq!(negotiate(role, &strings(&["c"]), &["a", "c"]), Ok("c"));
    }

    #[test]
    fn negotiation_failure_names_both_sets() {
        let role = AlgorithmRole(
            AlgorithmCategory::Mac,
            Some(AlgorithmDirection::ServerToClient),
        );

        let err = negotiate(role, &strings(&["x", "y"]), &["a", "b"]).unwrap_err();

        assert_eq!(err.reason, DisconnectReason::KeyExchangeFailed);
        assert_eq!(
            err.description,
            "Could not find a shared algorithm for Mac ServerToClient, offered: x,y, provided: a,b"
        );

        assert!(negotiate(role, &[], &["a"]).is_err());
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert_eq!(
            AlgorithmRegistry::new().load(&HostKeyMaterial::new()).err(),
            Some(BuildError::EmptyAlgorithmRole(AlgorithmRole(
                AlgorithmCategory::KeyExchange,
                None
            )))
        );
    }

    #[cfg(feature = "default-algorithms")]
    mod with_default_algorithms {
        use super::*;
        use definitions::algorithms::HostKeyError;
        use rand::SeedableRng as _;
        use rand_chacha::ChaCha20Rng;
        use sshgate_algorithms::{compression, encryption, host_key, key_exchange, mac};

        const HOST_KEY: &str = include_str!("../tests/data/host_rsa.pem");

        fn material() -> HostKeyMaterial {
            HostKeyMaterial::new().with_key(host_key::RSA_KEY_NAME, HOST_KEY)
        }

        fn loaded() -> Algorithms {
            AlgorithmRegistry::default().load(&material()).unwrap()
        }

        #[test]
        fn server_kex_init_lists_advertised_algorithms() {
            let algorithms = loaded();
            let mut rng = ChaCha20Rng::from_seed(Default::default());

            let kex_init = algorithms.server_kex_init(&mut rng);

            assert_eq!(
                kex_init.kex_algorithms.last().map(String::as_str),
                Some(EXT_INFO_SERVER)
            );
            assert_eq!(
                kex_init.server_host_key_algorithms,
                strings(&["rsa-sha2-512", "rsa-sha2-256", "ssh-rsa"])
            );
            assert!(!kex_init
                .encryption_algorithms_client_to_server
                .iter()
                .any(|name| name == "none"));
            assert_eq!(
                kex_init.compression_algorithms_server_to_client,
                strings(&["none"])
            );
            assert!(!kex_init.first_kex_packet_follows);

            assert_ne!(algorithms.server_kex_init(&mut rng).cookie, kex_init.cookie);
        }

        #[test]
        fn negotiate_against_client() {
            let algorithms = loaded();
            let mut rng = ChaCha20Rng::from_seed(Default::default());

            let mut client = algorithms.server_kex_init(&mut rng);
            client.kex_algorithms = strings(&["curve25519-sha256", "diffie-hellman-group14-sha256"]);
            client.server_host_key_algorithms = strings(&["ssh-rsa"]);
            client.encryption_algorithms_client_to_server = strings(&["aes128-ctr"]);
            client.encryption_algorithms_server_to_client = strings(&["3des-cbc", "aes256-ctr"]);
            client.mac_algorithms_client_to_server = strings(&["hmac-sha2-256"]);

            let negotiated = algorithms.negotiate(&client).unwrap();

            assert_eq!(negotiated.key_exchange, "diffie-hellman-group14-sha256");
            assert_eq!(negotiated.host_key, "ssh-rsa");
            assert_eq!(negotiated.encryption_client_to_server, "aes128-ctr");
            assert_eq!(negotiated.encryption_server_to_client, "3des-cbc");
            assert_eq!(negotiated.mac_client_to_server, "hmac-sha2-256");
            assert_eq!(negotiated.compression_client_to_server, "none");

            client.encryption_algorithms_client_to_server = strings(&["none"]);
            assert_eq!(
                algorithms.negotiate(&client).unwrap_err().reason,
                DisconnectReason::KeyExchangeFailed
            );
        }

        #[test]
        fn duplicates_are_rejected() {
            let mut registry = AlgorithmRegistry::default();

            assert_eq!(
                registry.add_mac::<mac::HmacSha1>(ListPosition::Front).err(),
                Some(InvalidAlgorithmError::Duplicate("hmac-sha1".into()))
            );
        }

        #[test]
        fn list_positions() {
            let mut registry = AlgorithmRegistry::new();

            registry
                .add_encryption::<encryption::Aes128Ctr>(ListPosition::Back)
                .unwrap()
                .add_encryption::<encryption::Aes256Ctr>(ListPosition::Front)
                .unwrap()
                .add_encryption::<encryption::None>(ListPosition::Back)
                .unwrap();

            assert_eq!(
                registry.names(AlgorithmCategory::Encryption),
                vec!["aes256-ctr", "aes128-ctr", "none"]
            );
        }

        #[test]
        fn none_algorithms_are_required() {
            let mut registry = AlgorithmRegistry::new();
            registry
                .add_key_exchange::<key_exchange::DiffieHellmanGroup14Sha256>(ListPosition::Back)
                .unwrap()
                .add_host_key::<host_key::RsaSha2256>(ListPosition::Back)
                .unwrap()
                .add_encryption::<encryption::Aes128Ctr>(ListPosition::Back)
                .unwrap()
                .add_mac::<mac::HmacSha2256>(ListPosition::Back)
                .unwrap()
                .add_compression::<compression::None>(ListPosition::Back)
                .unwrap();

            assert_eq!(
                registry.load(&material()).err(),
                Some(BuildError::RequiredNoneAlgorithmMissing(AlgorithmRole(
                    AlgorithmCategory::Encryption,
                    None
                )))
            );

            registry
                .add_encryption::<encryption::None>(ListPosition::Back)
                .unwrap();
            assert!(registry.load(&material()).is_ok());
        }

        #[test]
        fn host_keys_must_load() {
            assert_eq!(
                AlgorithmRegistry::default()
                    .load(&HostKeyMaterial::new())
                    .err(),
                Some(BuildError::HostKey {
                    algorithm: "rsa-sha2-512",
                    error: HostKeyError::MissingKey("rsa"),
                })
            );
        }

        #[test]
        fn retain_restricts_the_registry() {
            let mut registry = AlgorithmRegistry::default();
            registry.retain(AlgorithmCategory::HostKey, &["rsa-sha2-256"]);

            let algorithms = registry.load(&material()).unwrap();

            assert_eq!(algorithms.host_key_names(), vec!["rsa-sha2-256"]);
            assert!(algorithms.host_key("ssh-rsa").is_none());
            assert!(algorithms.host_key("rsa-sha2-256").is_some());
        }

        #[test]
        fn initial_context_is_unkeyed() {
            let context = loaded().initial_context();

            assert_eq!(context.encryption_name(), "none");
            assert_eq!(context.mac_name(), None);
            assert_eq!(context.mac_len(), 0);
            assert_eq!(context.block_size(), 8);
        }
    }
}
