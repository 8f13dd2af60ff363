//! Configures a server.

use definitions::{algorithms::HostKeyMaterial, consts::SERVICE_USERAUTH};
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};
use transport::{AlgorithmRegistry, Algorithms, ConnectionConfig, VersionInformation};

use crate::{
    channel::{ChannelHandler, ChannelHandlerFactory, ChannelSession},
    errors::ConfigError,
    service::{userauth::UserAuth, Service, ServiceFactory},
};

/// The number of failed authentication attempts after which a connection is closed.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 6;

/// Decides whether a user may log in with a public key whose signature was verified.
///
/// It is called with the user name and the public key blob.
pub type AuthorizePublicKey = Arc<dyn Fn(&str, &[u8]) -> bool + Send + Sync>;

/// The configuration shared by all connections of a server.
pub struct ServerConfig {
    connection: Arc<ConnectionConfig>,
    channel_handler: ChannelHandlerFactory,
    authorize_public_key: AuthorizePublicKey,
    max_auth_attempts: u32,
    services: HashMap<String, ServiceFactory>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut services = self.services.keys().collect::<Vec<_>>();
        services.sort();

        f.debug_struct("ServerConfig")
            .field("connection", &self.connection)
            .field("max_auth_attempts", &self.max_auth_attempts)
            .field("services", &services)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Returns a builder for a server configuration.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the configuration of the transport layer.
    pub fn connection(&self) -> &Arc<ConnectionConfig> {
        &self.connection
    }

    /// Returns the loaded algorithms.
    pub fn algorithms(&self) -> &Algorithms {
        self.connection.algorithms()
    }

    /// Returns the number of failed authentication attempts after which a connection is closed.
    pub fn max_auth_attempts(&self) -> u32 {
        self.max_auth_attempts
    }

    /// Returns the factory of the service registered as `name`.
    pub fn service(&self, name: &str) -> Option<ServiceFactory> {
        self.services.get(name).copied()
    }

    /// Returns whether `user_name` may log in with `public_key`.
    pub fn is_authorized(&self, user_name: &str, public_key: &[u8]) -> bool {
        (self.authorize_public_key)(user_name, public_key)
    }

    /// Creates the application side of a new session channel.
    pub(crate) fn create_channel_handler(&self, session: ChannelSession) -> Box<dyn ChannelHandler> {
        (self.channel_handler)(session)
    }
}

/// A builder for a [`ServerConfig`].
pub struct ServerConfigBuilder {
    /// The builder of the transport configuration.
    transport: transport::Builder,
    /// Creates the application side of session channels.
    channel_handler: Option<ChannelHandlerFactory>,
    /// The acceptance policy for verified public keys.
    authorize_public_key: Option<AuthorizePublicKey>,
    /// The number of failed authentication attempts after which a connection is closed.
    max_auth_attempts: u32,
    /// Services beside the built-in ones.
    services: Vec<(String, ServiceFactory)>,
}

impl fmt::Debug for ServerConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ServerConfigBuilder")
            .field("transport", &self.transport)
            .field("channel_handler", &self.channel_handler.is_some())
            .field("max_auth_attempts", &self.max_auth_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        ServerConfigBuilder {
            transport: transport::Builder::new(),
            channel_handler: None,
            authorize_public_key: None,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            services: Vec::new(),
        }
    }
}

impl ServerConfigBuilder {
    /// Creates a new builder with sensible default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the version information sent to the client.
    pub fn version(self, version: VersionInformation) -> Self {
        ServerConfigBuilder {
            transport: self.transport.version(version),
            ..self
        }
    }

    /// Sets the key material the host key algorithms import.
    ///
    /// The RSA host key algorithms use the key named `"rsa"`.
    pub fn host_key_material(self, material: HostKeyMaterial) -> Self {
        ServerConfigBuilder {
            transport: self.transport.host_key_material(material),
            ..self
        }
    }

    /// Replaces the algorithms available for negotiation.
    pub fn algorithms(self, algorithms: AlgorithmRegistry) -> Self {
        ServerConfigBuilder {
            transport: self.transport.algorithms(algorithms),
            ..self
        }
    }

    /// Sets the number of transferred bytes after which keys are renegotiated.
    pub fn rekey_bytes(self, rekey_bytes: u64) -> Self {
        ServerConfigBuilder {
            transport: self.transport.rekey_bytes(rekey_bytes),
            ..self
        }
    }

    /// Sets the time after which keys are renegotiated.
    pub fn rekey_interval(self, rekey_interval: Duration) -> Self {
        ServerConfigBuilder {
            transport: self.transport.rekey_interval(rekey_interval),
            ..self
        }
    }

    /// Sets the factory creating the application side of each session channel.
    pub fn channel_handler<F>(self, factory: F) -> Self
    where
        F: Fn(ChannelSession) -> Box<dyn ChannelHandler> + Send + Sync + 'static,
    {
        ServerConfigBuilder {
            channel_handler: Some(Arc::new(factory)),
            ..self
        }
    }

    /// Sets the policy deciding which verified public keys may log in.
    ///
    /// By default every key is accepted.
    pub fn authorize_public_key<F>(self, authorize: F) -> Self
    where
        F: Fn(&str, &[u8]) -> bool + Send + Sync + 'static,
    {
        ServerConfigBuilder {
            authorize_public_key: Some(Arc::new(authorize)),
            ..self
        }
    }

    /// Sets the number of failed authentication attempts after which a connection is closed.
    pub fn max_auth_attempts(self, max_auth_attempts: u32) -> Self {
        ServerConfigBuilder {
            max_auth_attempts,
            ..self
        }
    }

    /// Registers a service that clients can request by `name`.
    pub fn register_service(mut self, name: impl Into<String>, factory: ServiceFactory) -> Self {
        self.services.push((name.into(), factory));

        self
    }

    /// Loads the algorithms and creates the configuration.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let channel_handler = self
            .channel_handler
            .ok_or(ConfigError::MissingChannelHandler)?;

        let mut services = HashMap::new();
        services.insert(SERVICE_USERAUTH.to_owned(), user_auth as ServiceFactory);

        for (name, factory) in self.services {
            if services.insert(name.clone(), factory).is_some() {
                return Err(ConfigError::DuplicateService(name));
            }
        }

        Ok(ServerConfig {
            connection: Arc::new(self.transport.build()?),
            channel_handler,
            authorize_public_key: self
                .authorize_public_key
                .unwrap_or_else(|| Arc::new(|_, _| true)),
            max_auth_attempts: self.max_auth_attempts,
            services,
        })
    }
}

/// Creates the built-in user authentication service.
fn user_auth() -> Box<dyn Service> {
    Box::new(UserAuth::new())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{errors::BuildError, service::initial::Initial};

    pub(crate) const HOST_KEY: &str = include_str!("../tests/data/host_rsa.pem");

    /// A channel handler that drops everything.
    struct Discard;

    impl ChannelHandler for Discard {
        fn data(&mut self, _data: &[u8]) {}
    }

    pub(crate) fn builder() -> ServerConfigBuilder {
        ServerConfig::builder()
            .host_key_material(HostKeyMaterial::new().with_key("rsa", HOST_KEY))
            .channel_handler(|_| Box::new(Discard))
    }

    fn initial() -> Box<dyn Service> {
        Box::new(Initial)
    }

    #[test]
    fn channel_handler_is_required() {
        assert_eq!(
            ServerConfig::builder()
                .host_key_material(HostKeyMaterial::new().with_key("rsa", HOST_KEY))
                .build()
                .unwrap_err(),
            ConfigError::MissingChannelHandler
        );
    }

    #[test]
    fn transport_errors_are_passed_on() {
        assert!(matches!(
            ServerConfig::builder()
                .channel_handler(|_| Box::new(Discard))
                .build(),
            Err(ConfigError::Transport(BuildError::HostKey { .. }))
        ));
    }

    #[test]
    fn defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.max_auth_attempts(), DEFAULT_MAX_AUTH_ATTEMPTS);
        assert!(config.service("ssh-userauth").is_some());
        assert!(config.service("ssh-connection").is_none());
        assert!(config.is_authorized("anyone", b"any key"));
        assert_eq!(
            config.connection().rekey_bytes(),
            transport::constants::DEFAULT_REKEY_BYTES
        );
    }

    #[test]
    fn custom_settings() {
        let config = builder()
            .max_auth_attempts(2)
            .rekey_bytes(4096)
            .rekey_interval(Duration::from_secs(10))
            .authorize_public_key(|user, _| user == "admin")
            .register_service("custom-service", initial)
            .build()
            .unwrap();

        assert_eq!(config.max_auth_attempts(), 2);
        assert_eq!(config.connection().rekey_bytes(), 4096);
        assert_eq!(
            config.connection().rekey_interval(),
            Duration::from_secs(10)
        );
        assert!(config.is_authorized("admin", b""));
        assert!(!config.is_authorized("guest", b""));
        assert!(config.service("custom-service").is_some());
    }

    #[test]
    fn services_are_unique() {
        assert_eq!(
            builder()
                .register_service("ssh-userauth", initial)
                .build()
                .unwrap_err(),
            ConfigError::DuplicateService("ssh-userauth".to_string())
        );
    }
}
