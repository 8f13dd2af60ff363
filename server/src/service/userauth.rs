//! The user authentication service.
//!
//! See [RFC 4252](https://tools.ietf.org/html/rfc4252). Only the `publickey` method can succeed.

use definitions::{
    consts::{message_numbers::SSH_MSG_USERAUTH_REQUEST, DisconnectReason, SERVICE_CONNECTION},
    packets::{
        AuthMethod, Packet, UserAuthFailure, UserAuthPkOk, UserAuthRequest, UserAuthSuccess,
    },
    write, Reader,
};
use tracing::{debug, info, warn};

use super::{channel::SessionChannel, Dispatch, Service, ServiceContext};
use crate::{channel::UserIdentity, errors::DisconnectError};

/// The panic message for writes into a `Vec`.
const VEC_WRITE: &str = "writes to a `Vec` cannot fail";

/// The name of the public key method.
const PUBLICKEY: &str = "publickey";

/// Authenticates the user and waits for a session channel to be opened.
#[derive(Debug, Default)]
pub(crate) struct UserAuth {
    /// The number of failed authentication attempts.
    failed_attempts: u32,
    /// The user, once authenticated.
    identity: Option<UserIdentity>,
}

impl UserAuth {
    pub(crate) fn new() -> UserAuth {
        Default::default()
    }

    fn authenticate(
        &mut self,
        request: UserAuthRequest,
        context: &mut ServiceContext,
    ) -> Result<(), DisconnectError> {
        if self.identity.is_some() {
            debug!("ignored authentication request after success");
            return Ok(());
        }

        if request.service_name != SERVICE_CONNECTION {
            return Err(DisconnectError::new(
                DisconnectReason::ServiceNotAvailable,
                format!("service {:?} is not available", request.service_name),
            ));
        }

        match request.method {
            AuthMethod::None => {
                reject(context);
                Ok(())
            }
            AuthMethod::PublicKey {
                algorithm,
                public_key,
                signature: None,
            } => {
                if context.algorithms().host_key(&algorithm).is_some() {
                    context.send(UserAuthPkOk {
                        algorithm,
                        public_key,
                    });
                    Ok(())
                } else {
                    debug!(%algorithm, "unsupported public key algorithm");
                    self.fail(context)
                }
            }
            AuthMethod::PublicKey {
                algorithm,
                public_key,
                signature: Some(signature),
            } => {
                let verified = verify_signature(
                    context,
                    &request.user_name,
                    &request.service_name,
                    &algorithm,
                    &public_key,
                    &signature,
                );

                if !verified {
                    warn!(user = %request.user_name, %algorithm, "signature verification failed");
                    return self.fail(context);
                }

                if !context
                    .config()
                    .is_authorized(&request.user_name, &public_key)
                {
                    info!(user = %request.user_name, "public key not authorized");
                    return self.fail(context);
                }

                info!(user = %request.user_name, %algorithm, "user authenticated");

                context.send(UserAuthSuccess {});
                self.identity = Some(UserIdentity {
                    user_name: request.user_name,
                    algorithm,
                    public_key,
                });

                Ok(())
            }
            other => {
                debug!(method = other.name(), "unsupported authentication method");
                self.fail(context)
            }
        }
    }

    /// Rejects an attempt and closes the connection once too many attempts failed.
    fn fail(&mut self, context: &mut ServiceContext) -> Result<(), DisconnectError> {
        self.failed_attempts += 1;

        if self.failed_attempts >= context.config().max_auth_attempts() {
            return Err(DisconnectError::new(
                DisconnectReason::NoMoreAuthMethodsAvailable,
                "too many authentication failures",
            ));
        }

        reject(context);

        Ok(())
    }
}

impl Service for UserAuth {
    fn name(&self) -> &'static str {
        "ssh-userauth"
    }

    fn handle_packet(
        &mut self,
        packet: Packet,
        context: &mut ServiceContext,
    ) -> Result<Dispatch, DisconnectError> {
        match packet {
            Packet::UserAuthRequest(request) => {
                self.authenticate(request, context)?;
                Ok(Dispatch::Handled)
            }
            Packet::ChannelOpen(open) => match &self.identity {
                Some(identity) => Ok(
                    match SessionChannel::open(open, identity.clone(), context) {
                        Some(channel) => Dispatch::SwitchTo(Box::new(channel)),
                        None => Dispatch::Handled,
                    },
                ),
                None => Ok(Dispatch::Unhandled(Packet::ChannelOpen(open))),
            },
            other => Ok(Dispatch::Unhandled(other)),
        }
    }
}

/// Tells the client which methods may continue.
fn reject(context: &mut ServiceContext) {
    context.send(UserAuthFailure {
        methods: vec![PUBLICKEY.to_owned()],
        partial_success: false,
    });
}

/// Checks the signature of a `publickey` request.
///
/// The signature is verified with the algorithm named in the signature blob, which may differ
/// from the algorithm named in the request (`rsa-sha2-256` signatures for `ssh-rsa` keys).
fn verify_signature(
    context: &ServiceContext,
    user_name: &str,
    service_name: &str,
    algorithm: &str,
    public_key: &[u8],
    signature: &[u8],
) -> bool {
    let algorithms = context.algorithms();

    if algorithms.host_key(algorithm).is_none() {
        debug!(%algorithm, "unsupported public key algorithm");
        return false;
    }

    let verifier = match Reader::new(signature)
        .utf8()
        .ok()
        .and_then(|name| algorithms.host_key(name))
    {
        Some(verifier) => verifier,
        None => return false,
    };

    let message = signed_data(
        context.session_id(),
        user_name,
        service_name,
        algorithm,
        public_key,
    );

    verifier.verify(&message, signature, public_key)
}

/// Returns the data a client signs to authenticate with a public key.
///
/// See [RFC 4252 section 7](https://tools.ietf.org/html/rfc4252#section-7).
pub(crate) fn signed_data(
    session_id: &[u8],
    user_name: &str,
    service_name: &str,
    algorithm: &str,
    public_key: &[u8],
) -> Vec<u8> {
    let mut data = Vec::new();

    write::string(session_id, &mut data).expect(VEC_WRITE);
    write::byte(SSH_MSG_USERAUTH_REQUEST, &mut data).expect(VEC_WRITE);
    write::string(user_name.as_bytes(), &mut data).expect(VEC_WRITE);
    write::string(service_name.as_bytes(), &mut data).expect(VEC_WRITE);
    write::string(PUBLICKEY.as_bytes(), &mut data).expect(VEC_WRITE);
    write::boolean(true, &mut data).expect(VEC_WRITE);
    write::string(algorithm.as_bytes(), &mut data).expect(VEC_WRITE);
    write::string(public_key, &mut data).expect(VEC_WRITE);

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::tests::builder,
        service::test_helpers::{context, context_with},
    };
    use definitions::{
        algorithms::{HostKeyAlgorithm, HostKeyMaterial},
        consts::SSH_OPEN_UNKNOWN_CHANNEL_TYPE,
        packets::{ChannelOpen, ChannelOpenConfirmation, ChannelOpenFailure},
    };
    use sshgate_algorithms::host_key::{RsaSha2256, SshRsa};

    const USER_KEY: &str = include_str!("../../tests/data/user_rsa.pem");

    fn user_key<T: HostKeyAlgorithm + Default>() -> T {
        let mut key = T::default();
        key.import_key(&HostKeyMaterial::new().with_key("rsa", USER_KEY))
            .unwrap();
        key
    }

    fn request(user_name: &str, method: AuthMethod) -> Packet {
        Packet::UserAuthRequest(UserAuthRequest {
            user_name: user_name.to_string(),
            service_name: SERVICE_CONNECTION.to_string(),
            method,
        })
    }

    /// Creates a signed `publickey` request for `algorithm`, signing with `key`.
    fn signed_request<T: HostKeyAlgorithm>(
        context: &ServiceContext,
        user_name: &str,
        algorithm: &str,
        key: &T,
    ) -> Packet {
        let public_key = key.public_key().unwrap();
        let data = signed_data(
            context.session_id(),
            user_name,
            SERVICE_CONNECTION,
            algorithm,
            &public_key,
        );

        request(
            user_name,
            AuthMethod::PublicKey {
                algorithm: algorithm.to_string(),
                public_key,
                signature: Some(key.sign(&data).unwrap()),
            },
        )
    }

    fn failure() -> Packet {
        Packet::UserAuthFailure(UserAuthFailure {
            methods: vec!["publickey".to_string()],
            partial_success: false,
        })
    }

    fn session_open(sender_channel: u32) -> Packet {
        Packet::ChannelOpen(ChannelOpen {
            channel_type: "session".to_string(),
            sender_channel,
            initial_window_size: 1 << 20,
            maximum_packet_size: 32768,
            data: vec![],
        })
    }

    #[test]
    fn none_lists_the_methods() {
        let (mut context, _output) = context();
        let mut service = UserAuth::new();

        for _ in 0..10 {
            service
                .handle_packet(request("user", AuthMethod::None), &mut context)
                .unwrap();
            assert_eq!(context.take_outgoing(), vec![failure()]);
        }
    }

    #[test]
    fn probes_are_acknowledged() {
        let (mut context, _output) = context();
        let mut service = UserAuth::new();
        let public_key = user_key::<RsaSha2256>().public_key().unwrap();

        service
            .handle_packet(
                request(
                    "user",
                    AuthMethod::PublicKey {
                        algorithm: "rsa-sha2-256".to_string(),
                        public_key: public_key.clone(),
                        signature: None,
                    },
                ),
                &mut context,
            )
            .unwrap();

        assert_eq!(
            context.take_outgoing(),
            vec![Packet::UserAuthPkOk(UserAuthPkOk {
                algorithm: "rsa-sha2-256".to_string(),
                public_key: public_key.clone(),
            })]
        );

        service
            .handle_packet(
                request(
                    "user",
                    AuthMethod::PublicKey {
                        algorithm: "ssh-ed25519".to_string(),
                        public_key,
                        signature: None,
                    },
                ),
                &mut context,
            )
            .unwrap();

        assert_eq!(context.take_outgoing(), vec![failure()]);
    }

    #[test]
    fn valid_signatures_authenticate() {
        let (mut context, _output) = context();
        let mut service = UserAuth::new();
        let key = user_key::<RsaSha2256>();

        let packet = signed_request(&context, "user", "rsa-sha2-256", &key);
        service.handle_packet(packet, &mut context).unwrap();

        assert_eq!(
            context.take_outgoing(),
            vec![Packet::UserAuthSuccess(UserAuthSuccess {})]
        );
        assert_eq!(
            service.identity,
            Some(UserIdentity {
                user_name: "user".to_string(),
                algorithm: "rsa-sha2-256".to_string(),
                public_key: key.public_key().unwrap(),
            })
        );

        // Further requests are ignored
        service
            .handle_packet(request("user", AuthMethod::None), &mut context)
            .unwrap();
        assert!(context.take_outgoing().is_empty());
    }

    #[test]
    fn signatures_are_checked_with_their_own_algorithm() {
        let (mut context, _output) = context();
        let mut service = UserAuth::new();

        // An `ssh-rsa` key signing with SHA-256
        let packet = signed_request(&context, "user", "ssh-rsa", &user_key::<RsaSha2256>());
        service.handle_packet(packet, &mut context).unwrap();

        assert_eq!(
            context.take_outgoing(),
            vec![Packet::UserAuthSuccess(UserAuthSuccess {})]
        );
    }

    #[test]
    fn invalid_signatures_fail() {
        let (mut context, _output) = context_with(builder().max_auth_attempts(3));
        let mut service = UserAuth::new();
        let key = user_key::<SshRsa>();

        // Signed for a different user name
        let mut packet = signed_request(&context, "someone else", "ssh-rsa", &key);
        if let Packet::UserAuthRequest(request) = &mut packet {
            request.user_name = "user".to_string();
        }

        service.handle_packet(packet.clone(), &mut context).unwrap();
        assert_eq!(context.take_outgoing(), vec![failure()]);

        let password = request(
            "user",
            AuthMethod::Password {
                password: "hunter2".to_string(),
                new_password: None,
            },
        );
        service.handle_packet(password, &mut context).unwrap();
        assert_eq!(context.take_outgoing(), vec![failure()]);

        let err = service.handle_packet(packet, &mut context).unwrap_err();
        assert_eq!(err.reason, DisconnectReason::NoMoreAuthMethodsAvailable);
        assert!(service.identity.is_none());
    }

    #[test]
    fn unauthorized_keys_fail() {
        let (mut context, _output) =
            context_with(builder().authorize_public_key(|user, _| user == "admin"));
        let mut service = UserAuth::new();
        let key = user_key::<RsaSha2256>();

        let packet = signed_request(&context, "user", "rsa-sha2-256", &key);
        service.handle_packet(packet, &mut context).unwrap();
        assert_eq!(context.take_outgoing(), vec![failure()]);

        let packet = signed_request(&context, "admin", "rsa-sha2-256", &key);
        service.handle_packet(packet, &mut context).unwrap();
        assert_eq!(
            context.take_outgoing(),
            vec![Packet::UserAuthSuccess(UserAuthSuccess {})]
        );
    }

    #[test]
    fn other_services_are_not_available() {
        let (mut context, _output) = context();

        let err = UserAuth::new()
            .handle_packet(
                Packet::UserAuthRequest(UserAuthRequest {
                    user_name: "user".to_string(),
                    service_name: "custom-service".to_string(),
                    method: AuthMethod::None,
                }),
                &mut context,
            )
            .unwrap_err();

        assert_eq!(err.reason, DisconnectReason::ServiceNotAvailable);
    }

    #[test]
    fn channels_require_authentication() {
        let (mut context, _output) = context();
        let mut service = UserAuth::new();

        assert!(matches!(
            service.handle_packet(session_open(0), &mut context),
            Ok(Dispatch::Unhandled(Packet::ChannelOpen(_)))
        ));

        let packet = signed_request(&context, "user", "rsa-sha2-256", &user_key::<RsaSha2256>());
        service.handle_packet(packet, &mut context).unwrap();
        context.take_outgoing();

        let unknown = Packet::ChannelOpen(ChannelOpen {
            channel_type: "x11".to_string(),
            sender_channel: 4,
            initial_window_size: 1 << 20,
            maximum_packet_size: 32768,
            data: vec![],
        });
        assert!(matches!(
            service.handle_packet(unknown, &mut context),
            Ok(Dispatch::Handled)
        ));
        assert!(matches!(
            context.take_outgoing().as_slice(),
            [Packet::ChannelOpenFailure(ChannelOpenFailure {
                recipient_channel: 4,
                reason_code: SSH_OPEN_UNKNOWN_CHANNEL_TYPE,
                ..
            })]
        ));

        match service.handle_packet(session_open(7), &mut context) {
            Ok(Dispatch::SwitchTo(service)) => assert_eq!(service.name(), "ssh-connection"),
            other => panic!("unexpected dispatch {:?}", other),
        }
        assert!(matches!(
            context.take_outgoing().as_slice(),
            [Packet::ChannelOpenConfirmation(ChannelOpenConfirmation {
                recipient_channel: 7,
                ..
            })]
        ));
    }
}
