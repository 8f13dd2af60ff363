//! The services running on top of the transport layer.
//!
//! Exactly one service is active per connection. A connection starts in the [`Initial`] service,
//! which switches to a registered service on a service request. The built-in services go on from
//! user authentication to the connection protocol once a session channel is opened.
//!
//! Services do not write to the connection themselves. They queue packets in their
//! [`ServiceContext`], which the session sends after every dispatched packet.
//!
//! [`Initial`]: initial::Initial

use definitions::packets::Packet;
use std::{fmt, sync::Arc};
use tokio::sync::mpsc;
use tracing::debug;
use transport::Algorithms;

use crate::{
    channel::{ChannelOutput, ChannelSender},
    config::ServerConfig,
    errors::DisconnectError,
};

pub(crate) mod channel;
pub(crate) mod initial;
pub(crate) mod userauth;

/// Creates a fresh instance of a registered service.
pub type ServiceFactory = fn() -> Box<dyn Service>;

/// The outcome of handing a packet to a service.
#[derive(Debug)]
pub enum Dispatch {
    /// The service consumed the packet.
    Handled,
    /// The service does not handle this packet.
    ///
    /// The session falls back to the handling shared by all services.
    Unhandled(Packet),
    /// The packet was consumed and the given service replaces the active one.
    SwitchTo(Box<dyn Service>),
}

/// A service of the SSH protocol.
pub trait Service: Send + fmt::Debug {
    /// Returns the name of the service for logging.
    fn name(&self) -> &'static str;

    /// Handles a packet received from the client.
    fn handle_packet(
        &mut self,
        packet: Packet,
        context: &mut ServiceContext,
    ) -> Result<Dispatch, DisconnectError>;

    /// Handles output the application produced for the client.
    fn handle_output(
        &mut self,
        output: ChannelOutput,
        context: &mut ServiceContext,
    ) -> Result<(), DisconnectError> {
        let _ = context;
        debug!(service = self.name(), ?output, "dropped output without a channel");

        Ok(())
    }
}

/// The state of a connection that services may access.
#[derive(Debug)]
pub struct ServiceContext {
    config: Arc<ServerConfig>,
    session_id: Vec<u8>,
    outgoing: Vec<Packet>,
    channel_output: mpsc::UnboundedSender<ChannelOutput>,
}

impl ServiceContext {
    pub(crate) fn new(
        config: Arc<ServerConfig>,
        channel_output: mpsc::UnboundedSender<ChannelOutput>,
    ) -> ServiceContext {
        ServiceContext {
            config,
            session_id: Vec::new(),
            outgoing: Vec::new(),
            channel_output,
        }
    }

    /// Queues `packet` to be sent to the client.
    pub fn send(&mut self, packet: impl Into<Packet>) {
        self.outgoing.push(packet.into());
    }

    /// Returns the session identifier of the connection.
    ///
    /// It is empty before the first key exchange completed.
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// Returns the configuration of the server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the algorithms of the connection.
    pub fn algorithms(&self) -> &Algorithms {
        self.config.algorithms()
    }

    /// Returns a sender the application can use to write to the session channel.
    pub(crate) fn channel_sender(&self) -> ChannelSender {
        ChannelSender::new(self.channel_output.clone())
    }

    pub(crate) fn set_session_id(&mut self, session_id: &[u8]) {
        if self.session_id != session_id {
            self.session_id = session_id.to_vec();
        }
    }

    /// Removes and returns all queued packets.
    pub(crate) fn take_outgoing(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outgoing)
    }
}


#[cfg(test)]
mod tests {
    use super::{test_helpers::context, *};
    use definitions::packets::Ignore;

    #[test]
    fn queued_packets_are_taken_in_order() {
        let (mut context, _output) = context();

        context.send(Ignore { data: vec![1] });
        context.send(Ignore { data: vec![2] });

        assert_eq!(
            context.take_outgoing(),
            vec![
                Packet::Ignore(Ignore { data: vec![1] }),
                Packet::Ignore(Ignore { data: vec![2] }),
            ]
        );
        assert!(context.take_outgoing().is_empty());
    }

    #[test]
    fn channel_senders_feed_the_session() {
        let (context, mut output) = context();

        context.channel_sender().send("out").unwrap();

        assert_eq!(output.try_recv(), Ok(ChannelOutput::Data(b"out".to_vec())));
        assert_eq!(context.session_id(), b"test session id");
    }
}
