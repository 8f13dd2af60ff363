//! Packets of the user authentication protocol.
//!
//! See [RFC 4252](https://datatracker.ietf.org/doc/html/rfc4252).

use std::io::{self, Write};

use crate::{
    consts::message_numbers::*,
    parse::{Parse, ParseError, Reader},
    write::{self, Compose},
};

ssh_packet! {
    /// Rejects an authentication request and lists the methods that may continue.
    UserAuthFailure = SSH_MSG_USERAUTH_FAILURE {
        /// The authentication methods that can continue.
        methods: name_list,
        /// Whether the request was successful, but more authentication is required.
        partial_success: boolean,
    }

    /// Accepts an authentication request.
    UserAuthSuccess = SSH_MSG_USERAUTH_SUCCESS {}

    /// Tells the client that a public key is acceptable, so it may go on to sign with it.
    UserAuthPkOk = SSH_MSG_USERAUTH_PK_OK {
        /// The public key algorithm name from the request.
        algorithm: utf8,
        /// The public key blob from the request.
        public_key: string,
    }
}

/// The method specific part of an authentication request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AuthMethod {
    /// The `none` method, used to query the available methods.
    None,
    /// The `publickey` method.
    PublicKey {
        /// The name of the public key algorithm.
        algorithm: String,
        /// The public key blob.
        public_key: Vec<u8>,
        /// The signature blob, absent when the client only queries the key.
        signature: Option<Vec<u8>>,
    },
    /// The `password` method.
    Password {
        /// The password.
        password: String,
        /// The new password, if the client requests a password change.
        new_password: Option<String>,
    },
    /// Any other method.
    Other {
        /// The name of the method.
        name: String,
        /// The undecoded method specific data.
        data: Vec<u8>,
    },
}

impl AuthMethod {
    /// Returns the method name used on the wire.
    pub fn name(&self) -> &str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::PublicKey { .. } => "publickey",
            AuthMethod::Password { .. } => "password",
            AuthMethod::Other { name, .. } => name,
        }
    }
}

/// Requests authentication of a user.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserAuthRequest {
    /// The name of the user.
    pub user_name: String,
    /// The service to start after authentication.
    pub service_name: String,
    /// The authentication method and its data.
    pub method: AuthMethod,
}

impl UserAuthRequest {
    /// The message number identifying this packet.
    pub const MESSAGE_NUMBER: u8 = SSH_MSG_USERAUTH_REQUEST;
}

impl Parse for UserAuthRequest {
    fn parse(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        reader.expect_byte(SSH_MSG_USERAUTH_REQUEST)?;

        let user_name = reader.utf8()?.to_owned();
        let service_name = reader.utf8()?.to_owned();

        let method = match reader.utf8()? {
            "none" => AuthMethod::None,
            "publickey" => {
                let has_signature = reader.boolean()?;
                let algorithm = reader.utf8()?.to_owned();
                let public_key = reader.string()?.to_vec();
                let signature = if has_signature {
                    Some(reader.string()?.to_vec())
                } else {
                    None
                };

                AuthMethod::PublicKey {
                    algorithm,
                    public_key,
                    signature,
                }
            }
            "password" => {
                let changes_password = reader.boolean()?;
                let password = reader.utf8()?.to_owned();
                let new_password = if changes_password {
                    Some(reader.utf8()?.to_owned())
                } else {
                    None
                };

                AuthMethod::Password {
                    password,
                    new_password,
                }
            }
            name => AuthMethod::Other {
                name: name.to_owned(),
                data: reader.bytes(reader.remaining())?.to_vec(),
            },
        };

        Ok(UserAuthRequest {
            user_name,
            service_name,
            method,
        })
    }
}

impl Compose for UserAuthRequest {
    fn compose(&self, output: &mut impl Write) -> io::Result<()> {
        write::byte(SSH_MSG_USERAUTH_REQUEST, output)?;
        write::string(self.user_name.as_bytes(), output)?;
        write::string(self.service_name.as_bytes(), output)?;
        write::string(self.method.name().as_bytes(), output)?;

        match &self.method {
            AuthMethod::None => Ok(()),
            AuthMethod::PublicKey {
                algorithm,
                public_key,
                signature,
            } => {
                write::boolean(signature.is_some(), output)?;
                write::string(algorithm.as_bytes(), output)?;
                write::string(public_key, output)?;
                match signature {
                    Some(signature) => write::string(signature, output),
                    None => Ok(()),
                }
            }
            AuthMethod::Password {
                password,
                new_password,
            } => {
                write::boolean(new_password.is_some(), output)?;
                write::string(password.as_bytes(), output)?;
                match new_password {
                    Some(new_password) => write::string(new_password.as_bytes(), output),
                    None => Ok(()),
                }
            }
            AuthMethod::Other { data, .. } => write::bytes(data, output),
        }
    }
}
