//! Drives the server side of the key exchange.
//!
//! See [RFC 4253 section 7](https://tools.ietf.org/html/rfc4253#section-7) for the message flow.

use definitions::{
    algorithms::{
        internal::{CompressionAlgorithmEntry, EncryptionAlgorithmEntry, MacAlgorithmEntry},
        KeyExchangeData,
    },
    consts::{DisconnectReason, EXTENSION_SERVER_SIG_ALGS},
    message_type::MessageType,
    packets::{ExtInfo, KexDhInit, KexDhReply, KexInit, NewKeys},
    Compose as _, Parse as _,
};
use std::{mem, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{allowed_during_kex, Connection};
use crate::{
    algorithms::{Algorithms, ExchangeContext, KeySizes, Negotiated, SessionKeys},
    errors::DisconnectError,
};

/// The progress of a key exchange.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum KexState {
    /// No key exchange is running.
    Idle,
    /// The server sent its key exchange init and waits for the one of the client.
    AwaitingClientInit,
    /// Both key exchange inits were exchanged.
    AwaitingDhInit {
        /// The algorithms that were negotiated.
        negotiated: Negotiated,
        /// The payload of the key exchange init of the client.
        client_kex_init: Vec<u8>,
        /// Whether the client guessed wrong and its next key exchange packet must be ignored.
        ignore_next_kex_packet: bool,
    },
    /// The server sent its `SSH_MSG_NEWKEYS` and waits for the one of the client.
    AwaitingNewKeys,
}

impl KexState {
    /// Returns whether a packet with the message number `number` must wait until the server's
    /// `SSH_MSG_NEWKEYS` was sent.
    pub(super) fn defers(&self, number: u8) -> bool {
        match self {
            KexState::AwaitingClientInit | KexState::AwaitingDhInit { .. } => {
                !allowed_during_kex(number)
            }
            KexState::Idle | KexState::AwaitingNewKeys => false,
        }
    }

    /// Returns whether a received packet with the message number `number` violates the key
    /// exchange the client started with its `SSH_MSG_KEXINIT`.
    ///
    /// Until the client's `SSH_MSG_NEWKEYS` only transport layer messages other than service
    /// requests may arrive.
    pub(super) fn forbids_incoming(&self, number: u8) -> bool {
        match self {
            KexState::AwaitingDhInit { .. } | KexState::AwaitingNewKeys => {
                !allowed_during_kex(number)
            }
            KexState::Idle | KexState::AwaitingClientInit => false,
        }
    }

    /// Returns whether a received packet with the message number `number` is the wrongly guessed
    /// key exchange packet of the client.
    ///
    /// Only one packet is ignored.
    pub(super) fn take_ignored(&mut self, number: u8) -> bool {
        match self {
            KexState::AwaitingDhInit {
                ignore_next_kex_packet,
                ..
            } if *ignore_next_kex_packet
                && matches!(
                    MessageType::from_number(number),
                    MessageType::KeyExchangeMethodSpecific
                ) =>
            {
                *ignore_next_kex_packet = false;

                true
            }
            _ => false,
        }
    }
}

/// The freshly created algorithms of one direction, before their keys are loaded.
struct UnkeyedContext {
    encryption: EncryptionAlgorithmEntry,
    mac: MacAlgorithmEntry,
    compression: CompressionAlgorithmEntry,
}

impl UnkeyedContext {
    /// Creates the named algorithms.
    fn create(
        algorithms: &Algorithms,
        encryption: &str,
        mac: &str,
        compression: &str,
    ) -> Result<UnkeyedContext, DisconnectError> {
        let missing = |name: &str| {
            DisconnectError::new(
                DisconnectReason::KeyExchangeFailed,
                format!("negotiated algorithm {} is not available", name),
            )
        };

        Ok(UnkeyedContext {
            encryption: algorithms
                .create_encryption(encryption)
                .ok_or_else(|| missing(encryption))?,
            mac: algorithms.create_mac(mac).ok_or_else(|| missing(mac))?,
            compression: algorithms
                .create_compression(compression)
                .ok_or_else(|| missing(compression))?,
        })
    }

    /// Loads the keys and turns this into a usable context.
    fn load(mut self, iv: &[u8], encryption_key: &[u8], mac_key: &[u8]) -> ExchangeContext {
        self.encryption.load_key(iv, encryption_key);
        self.mac.load_key(mac_key);

        ExchangeContext::new(self.encryption, Some(self.mac), self.compression)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Sends the key exchange init message of the server.
    pub(super) fn send_server_kex_init(&mut self) -> Result<(), DisconnectError> {
        let payload = self.server_kex_init.clone();

        self.send_payload(&payload)?;
        self.kex = KexState::AwaitingClientInit;

        Ok(())
    }

    /// Handles the key exchange init message of the client.
    ///
    /// If the client started the key exchange, the server answers with its own message first.
    pub(super) fn handle_kex_init(&mut self, payload: Vec<u8>) -> Result<(), DisconnectError> {
        match self.kex {
            KexState::Idle => self.send_server_kex_init()?,
            KexState::AwaitingClientInit => {}
            _ => {
                return Err(DisconnectError::protocol_error(
                    "received a key exchange init during a key exchange",
                ))
            }
        }

        let client = KexInit::parse_from(&payload)
            .map_err(|_| DisconnectError::protocol_error("malformed key exchange init"))?;

        let negotiated = self.config.algorithms().negotiate(&client)?;

        info!(
            kex = negotiated.key_exchange,
            host_key = negotiated.host_key,
            encryption_client_to_server = negotiated.encryption_client_to_server,
            encryption_server_to_client = negotiated.encryption_server_to_client,
            mac_client_to_server = negotiated.mac_client_to_server,
            mac_server_to_client = negotiated.mac_server_to_client,
            "negotiated algorithms"
        );

        let guessed_right = client.kex_algorithms.first().map(String::as_str)
            == Some(negotiated.key_exchange)
            && client.server_host_key_algorithms.first().map(String::as_str)
                == Some(negotiated.host_key);

        self.kex = KexState::AwaitingDhInit {
            negotiated,
            client_kex_init: payload,
            ignore_next_kex_packet: client.first_kex_packet_follows && !guessed_right,
        };

        Ok(())
    }

    /// Answers the Diffie-Hellman init message of the client and switches the outgoing keys.
    pub(super) fn handle_kex_dh_init(&mut self, payload: &[u8]) -> Result<(), DisconnectError> {
        let (negotiated, client_kex_init) =
            match mem::replace(&mut self.kex, KexState::AwaitingNewKeys) {
                KexState::AwaitingDhInit {
                    negotiated,
                    client_kex_init,
                    ..
                } => (negotiated, client_kex_init),
                other => {
                    self.kex = other;

                    return Err(DisconnectError::protocol_error(
                        "received an unexpected key exchange packet",
                    ));
                }
            };

        let KexDhInit { e } = KexDhInit::parse_from(payload)
            .map_err(|_| DisconnectError::protocol_error("malformed key exchange packet"))?;

        let config = Arc::clone(&self.config);
        let algorithms = config.algorithms();

        let missing = || DisconnectError::protocol_error("negotiated algorithm is not available");
        let mut kex = algorithms
            .create_key_exchange(negotiated.key_exchange)
            .ok_or_else(missing)?;
        let host_key = algorithms.host_key(negotiated.host_key).ok_or_else(missing)?;

        let client_identification = match &self.client_version {
            Some((_, identification)) => identification,
            None => {
                return Err(DisconnectError::protocol_error(
                    "key exchange before the version exchange",
                ))
            }
        };
        let data = KeyExchangeData {
            client_identification,
            server_identification: &self.server_identification,
            client_kexinit: &client_kex_init,
            server_kexinit: &self.server_kex_init,
        };

        let response = kex.respond(&e, &data, host_key, &mut *self.rng)?;

        self.send_payload(
            &KexDhReply {
                host_key: response.host_key,
                f: response.server_public,
                signature: response.signature,
            }
            .compose_to_vec(),
        )?;

        let session_id = self.session_id.set(&response.exchange_hash).to_vec();

        let incoming = UnkeyedContext::create(
            algorithms,
            negotiated.encryption_client_to_server,
            negotiated.mac_client_to_server,
            negotiated.compression_client_to_server,
        )?;
        let outgoing = UnkeyedContext::create(
            algorithms,
            negotiated.encryption_server_to_client,
            negotiated.mac_server_to_client,
            negotiated.compression_server_to_client,
        )?;

        let keys = SessionKeys::derive(
            kex.hash_function,
            &response.shared_secret,
            &response.exchange_hash,
            &session_id,
            &KeySizes {
                iv_client_to_server: incoming.encryption.iv_size,
                iv_server_to_client: outgoing.encryption.iv_size,
                encryption_client_to_server: incoming.encryption.key_size,
                encryption_server_to_client: outgoing.encryption.key_size,
                mac_client_to_server: incoming.mac.key_size,
                mac_server_to_client: outgoing.mac.key_size,
            },
        );

        let incoming = incoming.load(
            &keys.iv_client_to_server,
            &keys.encryption_client_to_server,
            &keys.mac_client_to_server,
        );
        let outgoing = outgoing.load(
            &keys.iv_server_to_client,
            &keys.encryption_server_to_client,
            &keys.mac_server_to_client,
        );

        self.send_payload(&NewKeys {}.compose_to_vec())?;
        self.outgoing = outgoing;

        debug!("sent new keys");

        if !self.ext_info_sent {
            let host_key_names = algorithms.host_key_names().join(",");

            self.send_payload(
                &ExtInfo {
                    extensions: vec![(
                        EXTENSION_SERVER_SIG_ALGS.to_owned(),
                        host_key_names.into_bytes(),
                    )],
                }
                .compose_to_vec(),
            )?;
            self.ext_info_sent = true;
        }

        self.pending_incoming = Some(incoming);
        self.send_deferred()
    }

    /// Activates the new keys for received packets.
    pub(super) fn handle_new_keys(&mut self) -> Result<(), DisconnectError> {
        match (&self.kex, self.pending_incoming.take()) {
            (KexState::AwaitingNewKeys, Some(incoming)) => {
                self.incoming = incoming;
                self.kex = KexState::Idle;
                self.reset_rekey_limits();

                info!(
                    encryption = self.incoming.encryption_name(),
                    "key exchange completed"
                );

                Ok(())
            }
            _ => Err(DisconnectError::protocol_error(
                "received an unexpected new keys message",
            )),
        }
    }
}
