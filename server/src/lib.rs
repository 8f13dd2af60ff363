//! Runs SSH servers that give authenticated users a terminal session.
//!
//! A [`Server`] accepts TCP connections and runs each of them in its own task. Connections go
//! through the transport layer of `sshgate-transport`, public key user authentication and finally
//! the connection protocol with a single session channel. Once the client requested a terminal,
//! the application takes over through a [`ChannelHandler`].
//!
//! ```no_run
//! use sshgate_server::{ChannelHandler, ChannelSession, HostKeyMaterial, Server, ServerConfig};
//!
//! struct Echo(ChannelSession);
//!
//! impl ChannelHandler for Echo {
//!     fn data(&mut self, data: &[u8]) {
//!         let _ = self.0.sender.send(data);
//!     }
//! }
//!
//! # async fn run(host_key_pem: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::builder()
//!     .host_key_material(HostKeyMaterial::new().with_key("rsa", host_key_pem))
//!     .channel_handler(|session| Box::new(Echo(session)))
//!     .build()?;
//!
//! Server::bind("127.0.0.1:2222", config).await?.run().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub use crate::{
    channel::{
        ChannelHandler, ChannelHandlerFactory, ChannelOutput, ChannelSender, ChannelSession,
        TerminalSize, UserIdentity,
    },
    config::{ServerConfig, ServerConfigBuilder},
    server::{Server, ShutdownHandle},
};
pub use definitions::algorithms::HostKeyMaterial;
pub use transport::{AlgorithmRegistry, VersionInformation};

mod server;
mod session;

pub mod channel;
pub mod config;
pub mod errors;
pub mod service;
