//! The server side of a transport layer connection.
//!
//! A [`Connection`] owns the socket and both exchange contexts. It performs the version exchange,
//! frames packets, answers key exchanges and renegotiates keys once the configured thresholds are
//! reached. Everything that is not part of the transport layer is handed to the caller as a
//! decoded [`Packet`].

use definitions::{
    algorithms::HostKeyMaterial,
    consts::{DisconnectReason, DEFAULT_LANGUAGE_TAG},
    message_type::MessageType,
    packets::{DecodeError, Disconnect, KexInit, KexDhInit, NewKeys, Packet, Unimplemented},
    Compose as _, CryptoRngCore,
};
use rand::{rngs::StdRng, SeedableRng as _};
use std::{
    collections::VecDeque,
    fmt,
    io::{self, ErrorKind},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt as _},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    algorithms::{AlgorithmRegistry, Algorithms, ExchangeContext},
    constants::{DEFAULT_REKEY_BYTES, DEFAULT_REKEY_INTERVAL},
    errors::{BuildError, CommunicationError, DisconnectError},
    input::InputBuffer,
    version::VersionInformation,
    writer::{write_version_info, WriterOutputStream},
};

use self::kex::KexState;

mod kex;

/// The validated configuration shared by all connections of a server.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// The version information sent to the client.
    version: VersionInformation,
    /// The algorithms available for negotiation.
    algorithms: Arc<Algorithms>,
    /// The number of transferred bytes after which keys are renegotiated.
    rekey_bytes: u64,
    /// The time after which keys are renegotiated.
    rekey_interval: Duration,
}

impl ConnectionConfig {
    /// Returns a builder for a connection configuration.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Returns the version information sent to the client.
    pub fn version(&self) -> &VersionInformation {
        &self.version
    }

    /// Returns the algorithms available for negotiation.
    pub fn algorithms(&self) -> &Arc<Algorithms> {
        &self.algorithms
    }

    /// Returns the number of transferred bytes after which keys are renegotiated.
    ///
    /// Sent and received bytes count towards the same limit.
    pub fn rekey_bytes(&self) -> u64 {
        self.rekey_bytes
    }

    /// Returns the time after which keys are renegotiated.
    pub fn rekey_interval(&self) -> Duration {
        self.rekey_interval
    }
}

/// A builder for a [`ConnectionConfig`].
#[derive(Debug)]
pub struct Builder {
    /// The version information for the SSH transport handler.
    version: Option<VersionInformation>,
    /// The algorithms that will be loaded.
    algorithms: AlgorithmRegistry,
    /// The key material the host key algorithms import.
    host_key_material: HostKeyMaterial,
    /// The number of transferred bytes after which keys are renegotiated.
    rekey_bytes: u64,
    /// The time after which keys are renegotiated.
    rekey_interval: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            version: None,
            algorithms: AlgorithmRegistry::default(),
            host_key_material: HostKeyMaterial::new(),
            rekey_bytes: DEFAULT_REKEY_BYTES,
            rekey_interval: DEFAULT_REKEY_INTERVAL,
        }
    }
}

impl Builder {
    /// Creates a new builder with sensible default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the version information sent to the client.
    pub fn version(self, version: VersionInformation) -> Self {
        Builder {
            version: Some(version),
            ..self
        }
    }

    /// Replaces the algorithms available for negotiation.
    pub fn algorithms(self, algorithms: AlgorithmRegistry) -> Self {
        Builder { algorithms, ..self }
    }

    /// Sets the key material the host key algorithms import.
    pub fn host_key_material(self, host_key_material: HostKeyMaterial) -> Self {
        Builder {
            host_key_material,
            ..self
        }
    }

    /// Sets the number of transferred bytes after which keys are renegotiated.
    ///
    /// The bytes of both directions are added up, so the keys of each direction protect at most
    /// this many bytes.
    pub fn rekey_bytes(self, rekey_bytes: u64) -> Self {
        Builder {
            rekey_bytes,
            ..self
        }
    }

    /// Sets the time after which keys are renegotiated.
    pub fn rekey_interval(self, rekey_interval: Duration) -> Self {
        Builder {
            rekey_interval,
            ..self
        }
    }

    /// Loads the algorithms and creates the configuration.
    pub fn build(self) -> Result<ConnectionConfig, BuildError> {
        let algorithms = self.algorithms.load(&self.host_key_material)?;

        Ok(ConnectionConfig {
            version: self.version.unwrap_or_default(),
            algorithms: Arc::new(algorithms),
            rekey_bytes: self.rekey_bytes,
            rekey_interval: self.rekey_interval,
        })
    }
}

/// The exchange hash of the first key exchange of a connection.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub(crate) struct SessionId(Option<Vec<u8>>);

impl SessionId {
    /// Stores `id`, unless an id was already stored, and returns the stored id.
    ///
    /// Later calls leave the first id untouched.
    pub(crate) fn set(&mut self, id: &[u8]) -> &[u8] {
        self.0.get_or_insert_with(|| id.to_vec())
    }

    /// Returns the stored id.
    pub(crate) fn get(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

/// A server side connection on the transport layer.
pub struct Connection<S> {
    /// The socket of the connection.
    stream: S,
    /// The configuration shared with other connections.
    config: Arc<ConnectionConfig>,
    /// The buffered input that was not yet processed.
    input: InputBuffer,
    /// The output that was not yet written to the socket.
    output: WriterOutputStream,
    /// The random number generator used for padding, cookies and key exchanges.
    rng: Box<dyn CryptoRngCore + Send>,
    /// The version information and identification string of the client.
    client_version: Option<(VersionInformation, Vec<u8>)>,
    /// The identification string of the server.
    server_identification: Vec<u8>,
    /// The payload of the key exchange init message of the server.
    server_kex_init: Vec<u8>,
    /// The active context for received packets.
    incoming: ExchangeContext,
    /// The active context for sent packets.
    outgoing: ExchangeContext,
    /// The context for received packets that becomes active with the client's `SSH_MSG_NEWKEYS`.
    pending_incoming: Option<ExchangeContext>,
    /// The progress of the current key exchange.
    kex: KexState,
    /// The session identifier of the connection.
    session_id: SessionId,
    /// Payloads that may only be sent once the running key exchange finished.
    deferred: VecDeque<Vec<u8>>,
    /// The bytes sent and received since the last key exchange.
    bytes_transferred: u64,
    /// The time at which keys are renegotiated.
    rekey_deadline: Instant,
    /// Whether the extension info was already sent.
    ext_info_sent: bool,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("client_version", &self.client_version.as_ref().map(|(v, _)| v))
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .field("kex", &self.kex)
            .field("bytes_transferred", &self.bytes_transferred)
            .finish_non_exhaustive()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Creates a new connection on `stream`, seeding a random number generator from the system.
    pub fn new(stream: S, config: Arc<ConnectionConfig>) -> Connection<S> {
        Connection::with_rng(stream, config, StdRng::from_entropy())
    }

    /// Creates a new connection on `stream` that uses `rng` for all randomness.
    ///
    /// The version line of the server is queued right away.
    pub fn with_rng<R: CryptoRngCore + Send + 'static>(
        stream: S,
        config: Arc<ConnectionConfig>,
        mut rng: R,
    ) -> Connection<S> {
        let mut output = WriterOutputStream::new();
        output.write_version_info(config.version());

        let mut server_identification = Vec::new();
        write_version_info(config.version(), &mut server_identification)
            .expect("writes to a `Vec` cannot fail");
        server_identification.truncate(server_identification.len() - 2);

        let algorithms = config.algorithms();
        let server_kex_init = algorithms.server_kex_init(&mut rng).compose_to_vec();
        let incoming = algorithms.initial_context();
        let outgoing = algorithms.initial_context();
        let rekey_deadline = Instant::now() + config.rekey_interval();

        Connection {
            stream,
            config,
            input: InputBuffer::new(),
            output,
            rng: Box::new(rng),
            client_version: None,
            server_identification,
            server_kex_init,
            incoming,
            outgoing,
            pending_incoming: None,
            kex: KexState::Idle,
            session_id: SessionId::default(),
            deferred: VecDeque::new(),
            bytes_transferred: 0,
            rekey_deadline,
            ext_info_sent: false,
        }
    }

    /// Returns the configuration of the connection.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the algorithms available for this connection.
    pub fn algorithms(&self) -> &Algorithms {
        self.config.algorithms()
    }

    /// Returns the session identifier, once the first key exchange completed.
    pub fn session_id(&self) -> Option<&[u8]> {
        self.session_id.get()
    }

    /// Returns the version information of the client, once it was received.
    pub fn client_version(&self) -> Option<&VersionInformation> {
        self.client_version.as_ref().map(|(version, _)| version)
    }

    /// Exchanges version lines with the client and starts the first key exchange.
    ///
    /// Returns the version information of the client. Calling this again after it succeeded
    /// returns the same information without touching the socket.
    pub async fn exchange_versions(&mut self) -> Result<VersionInformation, DisconnectError> {
        if let Some((version, _)) = &self.client_version {
            return Ok(version.clone());
        }

        if self.kex == KexState::Idle {
            self.send_server_kex_init()?;
        }

        loop {
            match self.input.parse_version() {
                Ok(Some((version, identification))) => {
                    if !version.is_supported() {
                        return Err(DisconnectError::new(
                            DisconnectReason::ProtocolVersionNotSupported,
                            format!(
                                "protocol version {} is not supported",
                                version.protocol_version()
                            ),
                        ));
                    }

                    info!(
                        client = %String::from_utf8_lossy(&identification),
                        "received client version"
                    );

                    self.client_version = Some((version.clone(), identification));

                    return Ok(version);
                }
                Ok(None) => {}
                Err(_) => {
                    return Err(DisconnectError::new(
                        DisconnectReason::ProtocolVersionNotSupported,
                        "invalid version line",
                    ))
                }
            }

            self.write_pending().await?;
            self.input.read_more_data(&mut self.stream).await?;
        }
    }

    /// Receives the next packet that is not part of the transport layer protocol.
    ///
    /// Returns the packet along with its sequence number. Key exchanges are performed while
    /// waiting. This is cancel safe: no packet is lost if the future is dropped.
    pub async fn next_packet(&mut self) -> Result<(Packet, u32), DisconnectError> {
        if self.client_version.is_none() {
            self.exchange_versions().await?;
        }

        loop {
            if let Some(packet) = self.process_buffered()? {
                return Ok(packet);
            }

            self.write_pending().await?;
            self.input.read_more_data(&mut self.stream).await?;
        }
    }

    /// Queues `packet` for sending.
    ///
    /// Packets of higher layers are held back while a key exchange is running.
    pub fn send(&mut self, packet: &Packet) -> Result<(), DisconnectError> {
        let payload = packet.compose_to_vec();

        if self.kex.defers(packet.message_number()) {
            self.deferred.push_back(payload);

            return Ok(());
        }

        self.send_payload(&payload)
    }

    /// Writes all queued data to the socket.
    pub async fn flush(&mut self) -> Result<(), DisconnectError> {
        Ok(self.write_pending().await?)
    }

    /// Sends a disconnect message and shuts the socket down.
    ///
    /// Failures are ignored, since the connection ends either way.
    pub async fn disconnect(&mut self, reason: DisconnectReason, description: &str) {
        info!(?reason, description, "disconnecting");

        let disconnect = Packet::from(Disconnect {
            reason,
            description: description.to_owned(),
            language: DEFAULT_LANGUAGE_TAG.to_owned(),
        });

        if self.send(&disconnect).is_ok() {
            let _ = self.write_pending().await;
        }

        let _ = self.stream.shutdown().await;
    }

    /// Processes the buffered input until a packet for the caller is found.
    fn process_buffered(&mut self) -> Result<Option<(Packet, u32)>, DisconnectError> {
        loop {
            let received = match self.input.read_packet(&mut self.incoming) {
                Ok(Some(received)) => received,
                Ok(None) => return Ok(None),
                Err(err) => {
                    if let CommunicationError::InvalidMac = err {
                        warn!("received a packet with an invalid MAC");
                    }

                    return Err(err.into());
                }
            };

            self.bytes_transferred += received.size as u64;

            let packet = self.handle_payload(received.payload, received.sequence_number)?;

            self.check_rekey()?;

            if let Some(packet) = packet {
                return Ok(Some((packet, received.sequence_number)));
            }
        }
    }

    /// Handles a single received payload.
    ///
    /// Returns the packet if it is meant for the caller.
    fn handle_payload(
        &mut self,
        payload: Vec<u8>,
        sequence_number: u32,
    ) -> Result<Option<Packet>, DisconnectError> {
        let number = match payload.first() {
            Some(&number) => number,
            None => return Err(DisconnectError::protocol_error("received an empty packet")),
        };

        if self.kex.take_ignored(number) {
            debug!(number, "ignoring packet after a wrong key exchange guess");

            return Ok(None);
        }

        match number {
            KexInit::MESSAGE_NUMBER => return self.handle_kex_init(payload).map(|_| None),
            KexDhInit::MESSAGE_NUMBER => return self.handle_kex_dh_init(&payload).map(|_| None),
            NewKeys::MESSAGE_NUMBER => return self.handle_new_keys().map(|_| None),
            _ => {}
        }

        if self.session_id.get().is_none() && !allowed_during_kex(number) {
            return Err(DisconnectError::protocol_error(format!(
                "received message {} before the first key exchange",
                number
            )));
        }

        if self.kex.forbids_incoming(number) {
            return Err(DisconnectError::protocol_error(format!(
                "received message {} during a key exchange",
                number
            )));
        }

        match Packet::decode(&payload) {
            Ok(packet) => {
                debug!(number, sequence_number, "received packet");

                Ok(Some(packet))
            }
            Err(DecodeError::Unsupported(number)) => {
                warn!(number, sequence_number, "received unsupported packet");

                self.send(&Packet::from(Unimplemented { sequence_number }))?;

                Ok(None)
            }
            Err(err) => Err(DisconnectError::protocol_error(err.to_string())),
        }
    }

    /// Starts a new key exchange if one of the thresholds is reached.
    fn check_rekey(&mut self) -> Result<(), DisconnectError> {
        if self.kex != KexState::Idle || self.session_id.get().is_none() {
            return Ok(());
        }

        if self.bytes_transferred > self.config.rekey_bytes()
            || Instant::now() >= self.rekey_deadline
        {
            debug!(
                bytes_transferred = self.bytes_transferred,
                "starting key renegotiation"
            );

            self.send_server_kex_init()?;
            self.reset_rekey_limits();
        }

        Ok(())
    }

    /// Resets the counters that trigger a key renegotiation.
    fn reset_rekey_limits(&mut self) {
        self.bytes_transferred = 0;
        self.rekey_deadline = Instant::now() + self.config.rekey_interval();
    }

    /// Frames `payload` with the active outgoing context.
    fn send_payload(&mut self, payload: &[u8]) -> Result<(), DisconnectError> {
        let size = self
            .output
            .write_packet(payload, &mut self.outgoing, &mut *self.rng)?;

        self.bytes_transferred += size as u64;

        Ok(())
    }

    /// Sends the payloads that were held back during a key exchange.
    fn send_deferred(&mut self) -> Result<(), DisconnectError> {
        while let Some(payload) = self.deferred.pop_front() {
            self.send_payload(&payload)?;
        }

        Ok(())
    }

    /// Writes all queued output to the socket.
    async fn write_pending(&mut self) -> Result<(), CommunicationError> {
        while !self.output.written_data().is_empty() {
            let written = self.stream.write(self.output.written_data()).await?;

            if written == 0 {
                return Err(io::Error::from(ErrorKind::WriteZero).into());
            }

            self.output.remove_to(written);
        }

        self.stream.flush().await?;

        Ok(())
    }
}

/// Returns whether `number` may be sent while a key exchange is running.
fn allowed_during_kex(number: u8) -> bool {
    use definitions::consts::message_numbers::{SSH_MSG_SERVICE_ACCEPT, SSH_MSG_SERVICE_REQUEST};

    MessageType::from_number(number).is_transport_layer()
        && number != SSH_MSG_SERVICE_REQUEST
        && number != SSH_MSG_SERVICE_ACCEPT
}
