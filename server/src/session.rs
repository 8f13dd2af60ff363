//! Drives a single connection from the version exchange to the disconnect.

use definitions::{
    consts::DisconnectReason,
    packets::{Disconnect, GlobalRequest, Packet, RequestFailure, Unimplemented},
};
use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, watch},
};
use tracing::{debug, info, warn};
use transport::Connection;

use crate::{
    channel::ChannelOutput,
    config::ServerConfig,
    errors::DisconnectError,
    service::{initial::Initial, Dispatch, Service, ServiceContext},
};

/// The description sent to clients when the server shuts down.
pub(crate) const SHUTDOWN_MESSAGE: &str = "The server is shutting down.";

/// Runs a connection until it ends.
///
/// Fatal errors are reported to the client with a disconnect message.
pub(crate) async fn run<S>(stream: S, config: Arc<ServerConfig>, shutdown: watch::Receiver<bool>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = Connection::new(stream, Arc::clone(config.connection()));
    let mut session = Session::new(config);

    match session.drive(&mut connection, shutdown).await {
        Ok(()) => info!("connection closed"),
        Err(err) if err.reason == DisconnectReason::ConnectionLost => {
            info!(description = %err.description, "connection lost");
        }
        Err(err) => connection.disconnect(err.reason, &err.description).await,
    }
}

/// The service layer state of a connection.
#[derive(Debug)]
pub(crate) struct Session {
    /// The active service.
    service: Box<dyn Service>,
    /// The state shared with the services.
    context: ServiceContext,
    /// Output of the application for the session channel.
    output: mpsc::UnboundedReceiver<ChannelOutput>,
}

impl Session {
    pub(crate) fn new(config: Arc<ServerConfig>) -> Session {
        let (sender, output) = mpsc::unbounded_channel();

        Session {
            service: Box::new(Initial),
            context: ServiceContext::new(config, sender),
            output,
        }
    }

    /// Processes packets and application output until the connection ends.
    ///
    /// Returns `Ok` if the client disconnected.
    async fn drive<S>(
        &mut self,
        connection: &mut Connection<S>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), DisconnectError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if *shutdown.borrow() {
            return Err(shutting_down());
        }

        let version = connection.exchange_versions().await?;
        info!(client = version.software_version(), "exchanged versions");

        loop {
            tokio::select! {
                received = connection.next_packet() => {
                    let (packet, sequence_number) = received?;

                    if let Some(session_id) = connection.session_id() {
                        self.context.set_session_id(session_id);
                    }

                    if !self.dispatch(packet, sequence_number)? {
                        return Ok(());
                    }
                }
                Some(output) = self.output.recv() => {
                    self.service.handle_output(output, &mut self.context)?;
                }
                _ = shutdown.changed() => return Err(shutting_down()),
            }

            for packet in self.context.take_outgoing() {
                connection.send(&packet)?;
            }
            connection.flush().await?;
        }
    }

    /// Hands a packet to the active service and handles what it leaves over.
    ///
    /// Returns `false` if the client disconnected.
    fn dispatch(&mut self, packet: Packet, sequence_number: u32) -> Result<bool, DisconnectError> {
        debug!(
            service = self.service.name(),
            message_number = packet.message_number(),
            sequence_number,
            "received packet"
        );

        let packet = match self.service.handle_packet(packet, &mut self.context)? {
            Dispatch::Handled => return Ok(true),
            Dispatch::SwitchTo(service) => {
                info!(
                    from = self.service.name(),
                    to = service.name(),
                    "switched service"
                );
                self.service = service;

                return Ok(true);
            }
            Dispatch::Unhandled(packet) => packet,
        };

        match packet {
            Packet::Disconnect(Disconnect {
                reason,
                description,
                ..
            }) => {
                info!(?reason, %description, "client disconnected");
                return Ok(false);
            }
            Packet::Ignore(_) | Packet::Unimplemented(_) | Packet::ExtInfo(_) => {
                debug!("ignored packet");
            }
            Packet::DebugMessage(message) => {
                debug!(message = %message.message, "client debug message");
            }
            Packet::GlobalRequest(GlobalRequest {
                request_name,
                want_reply,
                ..
            }) => {
                debug!(%request_name, "rejected global request");

                if want_reply {
                    self.context.send(RequestFailure {});
                }
            }
            other => {
                warn!(
                    service = self.service.name(),
                    message_number = other.message_number(),
                    "unexpected packet"
                );
                self.context.send(Unimplemented { sequence_number });
            }
        }

        Ok(true)
    }
}

fn shutting_down() -> DisconnectError {
    DisconnectError::new(DisconnectReason::ByApplication, SHUTDOWN_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::builder;
    use definitions::packets::{ChannelOpen, DebugMessage, Ignore, ServiceAccept, ServiceRequest};

    fn session() -> Session {
        Session::new(Arc::new(builder().build().unwrap()))
    }

    #[test]
    fn unexpected_packets_are_unimplemented() {
        let mut session = session();

        let open = ChannelOpen {
            channel_type: "session".to_string(),
            sender_channel: 0,
            initial_window_size: 100,
            maximum_packet_size: 100,
            data: vec![],
        };

        assert_eq!(session.dispatch(open.into(), 17), Ok(true));
        assert_eq!(
            session.context.take_outgoing(),
            vec![Packet::Unimplemented(Unimplemented {
                sequence_number: 17
            })]
        );
    }

    #[test]
    fn informational_packets_are_ignored() {
        let mut session = session();

        let packets: [Packet; 3] = [
            Ignore { data: vec![1] }.into(),
            DebugMessage {
                always_display: true,
                message: "hello".to_string(),
                language: "en".to_string(),
            }
            .into(),
            Unimplemented { sequence_number: 3 }.into(),
        ];

        for packet in packets {
            assert_eq!(session.dispatch(packet, 5), Ok(true));
        }
        assert!(session.context.take_outgoing().is_empty());
    }

    #[test]
    fn global_requests_are_rejected() {
        let mut session = session();

        for want_reply in [false, true] {
            let request = GlobalRequest {
                request_name: "tcpip-forward".to_string(),
                want_reply,
                data: vec![],
            };
            assert_eq!(session.dispatch(request.into(), 5), Ok(true));
        }

        assert_eq!(
            session.context.take_outgoing(),
            vec![Packet::RequestFailure(RequestFailure {})]
        );
    }

    #[test]
    fn disconnect_ends_the_session() {
        let mut session = session();

        let disconnect = Disconnect {
            reason: DisconnectReason::ByApplication,
            description: "bye".to_string(),
            language: "en".to_string(),
        };

        assert_eq!(session.dispatch(disconnect.into(), 5), Ok(false));
    }

    #[test]
    fn services_are_switched() {
        let mut session = session();

        let request = ServiceRequest {
            service_name: "ssh-userauth".to_string(),
        };

        assert_eq!(session.dispatch(request.into(), 3), Ok(true));
        assert_eq!(session.service.name(), "ssh-userauth");
        assert_eq!(
            session.context.take_outgoing(),
            vec![Packet::ServiceAccept(ServiceAccept {
                service_name: "ssh-userauth".to_string()
            })]
        );

        // A second request is not understood by the authentication service
        let request = ServiceRequest {
            service_name: "ssh-userauth".to_string(),
        };
        assert_eq!(session.dispatch(request.into(), 4), Ok(true));
        assert_eq!(
            session.context.take_outgoing(),
            vec![Packet::Unimplemented(Unimplemented { sequence_number: 4 })]
        );
    }
}
