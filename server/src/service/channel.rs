//! The connection protocol for a single session channel.
//!
//! See [RFC 4254](https://tools.ietf.org/html/rfc4254). Only one channel of type `session` is
//! supported per connection.

use definitions::{
    consts::{DEFAULT_LANGUAGE_TAG, SSH_OPEN_RESOURCE_SHORTAGE, SSH_OPEN_UNKNOWN_CHANNEL_TYPE},
    packets::{
        ChannelClose, ChannelData, ChannelEof, ChannelFailure, ChannelOpen,
        ChannelOpenConfirmation, ChannelOpenFailure, ChannelRequest, ChannelRequestKind,
        ChannelSuccess, ChannelWindowAdjust, Packet, PtyRequest,
    },
};
use std::fmt;
use tracing::{debug, info};

use super::{Dispatch, Service, ServiceContext};
use crate::{
    channel::{ChannelHandler, ChannelOutput, ChannelSession, UserIdentity},
    errors::DisconnectError,
};

/// The identifier of the server's side of the session channel.
pub(crate) const LOCAL_CHANNEL: u32 = 1;

/// The number of bytes the client may send before it has to wait for a window adjustment.
pub(crate) const WINDOW_SIZE: u32 = 2 * 1024 * 1024;

/// The largest amount of data the client may send in a single packet.
///
/// This leaves room for the channel data header within the maximum packet size.
pub(crate) const MAX_DATA_SIZE: u32 = 32 * 1024;

/// The value of `LANG` announced to the client once it requested a terminal.
const UTF8_LANG: &str = "C.UTF-8";

/// An open session channel.
pub(crate) struct SessionChannel {
    /// The user the channel belongs to.
    identity: UserIdentity,
    /// The client's identifier of the channel.
    peer_channel: u32,
    /// The number of bytes the client is still willing to receive.
    peer_window: u32,
    /// The largest amount of data the client accepts in a single packet.
    peer_max_packet: u32,
    /// The number of bytes the client may still send.
    local_window: u32,
    /// The application side, once a terminal was requested.
    handler: Option<Box<dyn ChannelHandler>>,
    /// Output of the application that does not fit into the client's window yet.
    pending: Vec<u8>,
    /// Whether the client is assumed to handle UTF-8.
    utf8: bool,
    /// Whether the application asked to close the channel.
    close_requested: bool,
    /// Whether the server sent its `SSH_MSG_CHANNEL_CLOSE`.
    close_sent: bool,
    /// Whether the client sent its `SSH_MSG_CHANNEL_CLOSE`.
    peer_closed: bool,
}

impl fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SessionChannel")
            .field("user_name", &self.identity.user_name)
            .field("peer_channel", &self.peer_channel)
            .field("peer_window", &self.peer_window)
            .field("local_window", &self.local_window)
            .field("pending", &self.pending.len())
            .field("utf8", &self.utf8)
            .field("close_sent", &self.close_sent)
            .field("peer_closed", &self.peer_closed)
            .finish_non_exhaustive()
    }
}

impl SessionChannel {
    /// Answers a channel open request.
    ///
    /// Returns the channel if the request was confirmed.
    pub(crate) fn open(
        open: ChannelOpen,
        identity: UserIdentity,
        context: &mut ServiceContext,
    ) -> Option<SessionChannel> {
        if open.channel_type != "session" {
            debug!(channel_type = %open.channel_type, "rejected channel type");

            context.send(ChannelOpenFailure {
                recipient_channel: open.sender_channel,
                reason_code: SSH_OPEN_UNKNOWN_CHANNEL_TYPE,
                description: format!("unsupported channel type {:?}", open.channel_type),
                language: DEFAULT_LANGUAGE_TAG.to_owned(),
            });

            return None;
        }

        info!(peer_channel = open.sender_channel, "session channel opened");

        context.send(ChannelOpenConfirmation {
            recipient_channel: open.sender_channel,
            sender_channel: LOCAL_CHANNEL,
            initial_window_size: WINDOW_SIZE,
            maximum_packet_size: MAX_DATA_SIZE,
        });

        Some(SessionChannel {
            identity,
            peer_channel: open.sender_channel,
            peer_window: open.initial_window_size,
            peer_max_packet: open.maximum_packet_size.max(1),
            local_window: WINDOW_SIZE,
            handler: None,
            pending: Vec::new(),
            utf8: false,
            close_requested: false,
            close_sent: false,
            peer_closed: false,
        })
    }

    /// Makes sure a packet refers to this channel.
    fn check_recipient(&self, recipient_channel: u32) -> Result<(), DisconnectError> {
        if recipient_channel != LOCAL_CHANNEL || self.peer_closed {
            return Err(DisconnectError::protocol_error(format!(
                "packet for unknown channel {}",
                recipient_channel
            )));
        }

        Ok(())
    }

    fn handle_request(&mut self, request: ChannelRequest, context: &mut ServiceContext) {
        let want_reply = request.want_reply;

        match request.kind {
            ChannelRequestKind::PtyReq(pty) if self.handler.is_none() => {
                self.reply(want_reply, true, context);
                self.start_terminal(pty, context);
            }
            ChannelRequestKind::PtyReq(_) => {
                debug!("rejected second terminal request");
                self.reply(want_reply, false, context);
            }
            ChannelRequestKind::Shell => self.reply(want_reply, true, context),
            ChannelRequestKind::WindowChange(change) => {
                if let Some(handler) = &mut self.handler {
                    handler.window_changed((&change).into());
                }
                self.reply(want_reply, true, context);
            }
            ChannelRequestKind::Env { name, value } if name == "LANG" => {
                self.set_utf8(value.contains("UTF-8"));
                self.reply(want_reply, true, context);
            }
            ChannelRequestKind::Env { name, .. } => {
                debug!(%name, "rejected environment variable");
                self.reply(want_reply, false, context);
            }
            ChannelRequestKind::Other { request_type, .. } => {
                debug!(%request_type, "rejected channel request");
                self.reply(want_reply, false, context);
            }
        }
    }

    /// Answers a channel request if the client wants a reply.
    fn reply(&self, want_reply: bool, success: bool, context: &mut ServiceContext) {
        if !want_reply {
            return;
        }

        let recipient_channel = self.peer_channel;

        if success {
            context.send(ChannelSuccess { recipient_channel });
        } else {
            context.send(ChannelFailure { recipient_channel });
        }
    }

    /// Hands the channel to the application and announces UTF-8 to the client.
    fn start_terminal(&mut self, pty: PtyRequest, context: &mut ServiceContext) {
        info!(
            term = %pty.term,
            width = pty.width_chars,
            height = pty.height_rows,
            "terminal requested"
        );

        self.utf8 = true;

        let session = ChannelSession {
            identity: self.identity.clone(),
            size: (&pty).into(),
            term: pty.term,
            utf8: self.utf8,
            sender: context.channel_sender(),
        };
        self.handler = Some(context.config().create_channel_handler(session));

        context.send(ChannelRequest {
            recipient_channel: self.peer_channel,
            want_reply: true,
            kind: ChannelRequestKind::Env {
                name: "LANG".to_owned(),
                value: UTF8_LANG.to_owned(),
            },
        });
    }

    fn set_utf8(&mut self, utf8: bool) {
        if self.utf8 == utf8 {
            return;
        }

        self.utf8 = utf8;

        if let Some(handler) = &mut self.handler {
            handler.utf8_changed(utf8);
        }
    }

    fn receive_data(
        &mut self,
        data: Vec<u8>,
        context: &mut ServiceContext,
    ) -> Result<(), DisconnectError> {
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);

        if len > self.local_window {
            return Err(DisconnectError::protocol_error(
                "channel data exceeds the window",
            ));
        }

        self.local_window -= len;

        match &mut self.handler {
            Some(handler) => handler.data(&data),
            None => debug!(len, "dropped data before a terminal was requested"),
        }

        if self.local_window < WINDOW_SIZE / 2 {
            context.send(ChannelWindowAdjust {
                recipient_channel: self.peer_channel,
                bytes_to_add: WINDOW_SIZE - self.local_window,
            });
            self.local_window = WINDOW_SIZE;
        }

        Ok(())
    }

    /// Sends as much pending output as the client's window allows.
    fn flush(&mut self, context: &mut ServiceContext) {
        if self.close_sent {
            return;
        }

        while !self.pending.is_empty() && self.peer_window > 0 {
            let len = self
                .pending
                .len()
                .min(self.peer_window as usize)
                .min(self.peer_max_packet as usize);

            context.send(ChannelData {
                recipient_channel: self.peer_channel,
                data: self.pending.drain(..len).collect(),
            });

            // `len` is bounded by the window
            self.peer_window -= len as u32;
        }

        if self.close_requested && self.pending.is_empty() {
            context.send(ChannelEof {
                recipient_channel: self.peer_channel,
            });
            context.send(ChannelClose {
                recipient_channel: self.peer_channel,
            });
            self.close_sent = true;
        }
    }

    fn handle_peer_close(&mut self, context: &mut ServiceContext) {
        self.peer_closed = true;
        self.pending.clear();

        if !self.close_sent {
            context.send(ChannelClose {
                recipient_channel: self.peer_channel,
            });
            self.close_sent = true;
        }

        if let Some(mut handler) = self.handler.take() {
            handler.closed();
        }

        info!("session channel closed");
    }
}

impl Service for SessionChannel {
    fn name(&self) -> &'static str {
        "ssh-connection"
    }

    fn handle_packet(
        &mut self,
        packet: Packet,
        context: &mut ServiceContext,
    ) -> Result<Dispatch, DisconnectError> {
        match packet {
            Packet::ChannelOpen(open) => {
                debug!(channel_type = %open.channel_type, "rejected additional channel");

                context.send(ChannelOpenFailure {
                    recipient_channel: open.sender_channel,
                    reason_code: SSH_OPEN_RESOURCE_SHORTAGE,
                    description: "only one channel is supported".to_owned(),
                    language: DEFAULT_LANGUAGE_TAG.to_owned(),
                });
            }
            Packet::ChannelRequest(request) => {
                self.check_recipient(request.recipient_channel)?;
                self.handle_request(request, context);
            }
            Packet::ChannelData(ChannelData {
                recipient_channel,
                data,
            }) => {
                self.check_recipient(recipient_channel)?;
                self.receive_data(data, context)?;
            }
            Packet::ChannelWindowAdjust(ChannelWindowAdjust {
                recipient_channel,
                bytes_to_add,
            }) => {
                self.check_recipient(recipient_channel)?;
                self.peer_window = self.peer_window.saturating_add(bytes_to_add);
                self.flush(context);
            }
            Packet::ChannelSuccess(ChannelSuccess { recipient_channel }) => {
                self.check_recipient(recipient_channel)?;
                debug!("client accepted the channel request");
            }
            Packet::ChannelFailure(ChannelFailure { recipient_channel }) => {
                self.check_recipient(recipient_channel)?;
                debug!("client rejected the channel request");
                // The only request sent is the `LANG` announcement
                self.set_utf8(false);
            }
            Packet::ChannelEof(ChannelEof { recipient_channel }) => {
                self.check_recipient(recipient_channel)?;
                debug!("client sent end of file");
            }
            Packet::ChannelClose(ChannelClose { recipient_channel }) => {
                self.check_recipient(recipient_channel)?;
                self.handle_peer_close(context);
            }
            Packet::UserAuthRequest(_) => debug!("ignored authentication request after success"),
            other => return Ok(Dispatch::Unhandled(other)),
        }

        Ok(Dispatch::Handled)
    }

    fn handle_output(
        &mut self,
        output: ChannelOutput,
        context: &mut ServiceContext,
    ) -> Result<(), DisconnectError> {
        if self.close_requested || self.close_sent {
            debug!("dropped output after close");
            return Ok(());
        }

        match output {
            ChannelOutput::Data(data) => self.pending.extend_from_slice(&data),
            ChannelOutput::Close => self.close_requested = true,
        }

        self.flush(context);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{ChannelSender, TerminalSize},
        config::tests::builder,
        service::test_helpers::context_with,
    };
    use definitions::packets::WindowChange;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// What the test application observed.
    #[derive(Debug, PartialEq, Eq, Clone)]
    enum Event {
        Started { term: String, size: TerminalSize },
        Data(Vec<u8>),
        WindowChanged(TerminalSize),
        Utf8(bool),
        Closed,
    }

    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl ChannelHandler for Recorder {
        fn data(&mut self, data: &[u8]) {
            self.events.lock().unwrap().push(Event::Data(data.to_vec()));
        }

        fn window_changed(&mut self, size: TerminalSize) {
            self.events.lock().unwrap().push(Event::WindowChanged(size));
        }

        fn utf8_changed(&mut self, utf8: bool) {
            self.events.lock().unwrap().push(Event::Utf8(utf8));
        }

        fn closed(&mut self) {
            self.events.lock().unwrap().push(Event::Closed);
        }
    }

    struct Setup {
        channel: SessionChannel,
        context: ServiceContext,
        output: mpsc::UnboundedReceiver<ChannelOutput>,
        events: Arc<Mutex<Vec<Event>>>,
        senders: Arc<Mutex<Vec<ChannelSender>>>,
    }

    impl Setup {
        fn new(peer_window: u32, peer_max_packet: u32) -> Setup {
            let events = Arc::new(Mutex::new(Vec::new()));
            let senders = Arc::new(Mutex::new(Vec::new()));

            let (recorded, stored) = (Arc::clone(&events), Arc::clone(&senders));
            let (mut context, output) = context_with(builder().channel_handler(move |session| {
                recorded.lock().unwrap().push(Event::Started {
                    term: session.term,
                    size: session.size,
                });
                stored.lock().unwrap().push(session.sender);

                Box::new(Recorder {
                    events: Arc::clone(&recorded),
                })
            }));

            let channel = SessionChannel::open(
                ChannelOpen {
                    channel_type: "session".to_string(),
                    sender_channel: 9,
                    initial_window_size: peer_window,
                    maximum_packet_size: peer_max_packet,
                    data: vec![],
                },
                UserIdentity {
                    user_name: "user".to_string(),
                    algorithm: "rsa-sha2-256".to_string(),
                    public_key: vec![],
                },
                &mut context,
            )
            .unwrap();

            assert_eq!(
                context.take_outgoing(),
                vec![Packet::ChannelOpenConfirmation(ChannelOpenConfirmation {
                    recipient_channel: 9,
                    sender_channel: LOCAL_CHANNEL,
                    initial_window_size: WINDOW_SIZE,
                    maximum_packet_size: MAX_DATA_SIZE,
                })]
            );

            Setup {
                channel,
                context,
                output,
                events,
                senders,
            }
        }

        fn handle(&mut self, packet: impl Into<Packet>) -> Vec<Packet> {
            match self.channel.handle_packet(packet.into(), &mut self.context) {
                Ok(Dispatch::Handled) => {}
                other => panic!("unexpected dispatch {:?}", other),
            }

            self.context.take_outgoing()
        }

        /// Forwards everything the application sent through its sender.
        fn forward_output(&mut self) -> Vec<Packet> {
            while let Ok(output) = self.output.try_recv() {
                self.channel
                    .handle_output(output, &mut self.context)
                    .unwrap();
            }

            self.context.take_outgoing()
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn sender(&self) -> ChannelSender {
            self.senders.lock().unwrap()[0].clone()
        }

        fn start_terminal(&mut self) {
            self.handle(request(true, ChannelRequestKind::PtyReq(pty())));
        }
    }

    fn request(want_reply: bool, kind: ChannelRequestKind) -> ChannelRequest {
        ChannelRequest {
            recipient_channel: LOCAL_CHANNEL,
            want_reply,
            kind,
        }
    }

    fn pty() -> PtyRequest {
        PtyRequest {
            term: "xterm-256color".to_string(),
            width_chars: 80,
            height_rows: 24,
            width_pixels: 0,
            height_pixels: 0,
            modes: vec![],
        }
    }

    fn data(data: &[u8]) -> Packet {
        Packet::ChannelData(ChannelData {
            recipient_channel: LOCAL_CHANNEL,
            data: data.to_vec(),
        })
    }

    #[test]
    fn other_channel_types_are_rejected() {
        let (mut context, _output) = context_with(builder());

        let channel = SessionChannel::open(
            ChannelOpen {
                channel_type: "direct-tcpip".to_string(),
                sender_channel: 3,
                initial_window_size: 100,
                maximum_packet_size: 100,
                data: vec![],
            },
            UserIdentity {
                user_name: "user".to_string(),
                algorithm: "ssh-rsa".to_string(),
                public_key: vec![],
            },
            &mut context,
        );

        assert!(channel.is_none());
        assert!(matches!(
            context.take_outgoing().as_slice(),
            [Packet::ChannelOpenFailure(ChannelOpenFailure {
                recipient_channel: 3,
                reason_code: SSH_OPEN_UNKNOWN_CHANNEL_TYPE,
                ..
            })]
        ));
    }

    #[test]
    fn terminal_request_starts_the_application() {
        let mut setup = Setup::new(1 << 20, 1 << 15);

        let sent = setup.handle(request(true, ChannelRequestKind::PtyReq(pty())));

        assert_eq!(
            sent,
            vec![
                Packet::ChannelSuccess(ChannelSuccess {
                    recipient_channel: 9
                }),
                Packet::ChannelRequest(ChannelRequest {
                    recipient_channel: 9,
                    want_reply: true,
                    kind: ChannelRequestKind::Env {
                        name: "LANG".to_string(),
                        value: "C.UTF-8".to_string(),
                    },
                }),
            ]
        );
        assert_eq!(
            setup.events(),
            vec![Event::Started {
                term: "xterm-256color".to_string(),
                size: TerminalSize {
                    width_chars: 80,
                    height_rows: 24,
                    width_pixels: 0,
                    height_pixels: 0,
                },
            }]
        );
        assert!(setup.channel.utf8);

        // Only one terminal per channel
        assert_eq!(
            setup.handle(request(true, ChannelRequestKind::PtyReq(pty()))),
            vec![Packet::ChannelFailure(ChannelFailure {
                recipient_channel: 9
            })]
        );
    }

    #[test]
    fn replies_honor_want_reply() {
        let mut setup = Setup::new(1 << 20, 1 << 15);

        assert!(setup
            .handle(request(false, ChannelRequestKind::Shell))
            .is_empty());
        assert_eq!(
            setup.handle(request(true, ChannelRequestKind::Shell)),
            vec![Packet::ChannelSuccess(ChannelSuccess {
                recipient_channel: 9
            })]
        );

        let env = |want_reply| {
            request(
                want_reply,
                ChannelRequestKind::Env {
                    name: "PATH".to_string(),
                    value: "/bin".to_string(),
                },
            )
        };
        assert!(setup.handle(env(false)).is_empty());
        assert_eq!(
            setup.handle(env(true)),
            vec![Packet::ChannelFailure(ChannelFailure {
                recipient_channel: 9
            })]
        );

        let other = ChannelRequestKind::Other {
            request_type: "x11-req".to_string(),
            data: vec![],
        };
        assert_eq!(
            setup.handle(request(true, other)),
            vec![Packet::ChannelFailure(ChannelFailure {
                recipient_channel: 9
            })]
        );
    }

    #[test]
    fn data_and_resizes_reach_the_application() {
        let mut setup = Setup::new(1 << 20, 1 << 15);

        assert!(setup.handle(data(b"before")).is_empty());

        setup.start_terminal();
        setup.handle(data(b"ls -l\r"));
        setup.handle(data(&[0x1b, b'[', b'A', 0xff]));

        let change = WindowChange {
            width_chars: 120,
            height_rows: 40,
            width_pixels: 0,
            height_pixels: 0,
        };
        assert!(setup
            .handle(request(false, ChannelRequestKind::WindowChange(change)))
            .is_empty());

        assert_eq!(
            setup.events()[1..],
            [
                Event::Data(b"ls -l\r".to_vec()),
                Event::Data(vec![0x1b, b'[', b'A', 0xff]),
                Event::WindowChanged(TerminalSize {
                    width_chars: 120,
                    height_rows: 40,
                    width_pixels: 0,
                    height_pixels: 0,
                }),
            ]
        );
    }

    #[test]
    fn utf8_follows_the_client() {
        let mut setup = Setup::new(1 << 20, 1 << 15);
        setup.start_terminal();

        assert!(setup
            .handle(ChannelFailure {
                recipient_channel: LOCAL_CHANNEL
            })
            .is_empty());
        assert!(!setup.channel.utf8);

        let lang = |value: &str| {
            request(
                false,
                ChannelRequestKind::Env {
                    name: "LANG".to_string(),
                    value: value.to_string(),
                },
            )
        };
        setup.handle(lang("en_US.UTF-8"));
        setup.handle(lang("en_US.UTF-8"));
        setup.handle(lang("C"));

        assert_eq!(
            setup.events()[1..],
            [Event::Utf8(false), Event::Utf8(true), Event::Utf8(false)]
        );
    }

    #[test]
    fn receive_window_is_replenished() {
        let mut setup = Setup::new(1 << 20, 1 << 15);
        let chunk = vec![0; MAX_DATA_SIZE as usize];
        let mut adjusted = 0;

        for _ in 0..(WINDOW_SIZE / MAX_DATA_SIZE) * 2 {
            for packet in setup.handle(data(&chunk)) {
                match packet {
                    Packet::ChannelWindowAdjust(ChannelWindowAdjust {
                        recipient_channel: 9,
                        bytes_to_add,
                    }) => adjusted += bytes_to_add,
                    other => panic!("unexpected packet {:?}", other),
                }
            }
        }

        assert!(adjusted >= WINDOW_SIZE);
        assert_eq!(
            setup.channel.local_window,
            WINDOW_SIZE + adjusted - 2 * WINDOW_SIZE
        );
    }

    #[test]
    fn exceeding_the_window_is_fatal() {
        let mut setup = Setup::new(1 << 20, 1 << 15);
        setup.channel.local_window = 3;

        let err = setup
            .channel
            .handle_packet(data(b"four"), &mut setup.context)
            .unwrap_err();

        assert_eq!(
            err,
            DisconnectError::protocol_error("channel data exceeds the window")
        );
    }

    #[test]
    fn output_respects_the_peer_window() {
        let mut setup = Setup::new(10, 4);
        setup.start_terminal();

        setup.sender().send("hello world!").unwrap();

        let chunks = |packets: Vec<Packet>| {
            packets
                .into_iter()
                .map(|packet| match packet {
                    Packet::ChannelData(ChannelData {
                        recipient_channel: 9,
                        data,
                    }) => data,
                    other => panic!("unexpected packet {:?}", other),
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(
            chunks(setup.forward_output()),
            vec![b"hell".to_vec(), b"o wo".to_vec(), b"rl".to_vec()]
        );

        assert_eq!(
            chunks(setup.handle(ChannelWindowAdjust {
                recipient_channel: LOCAL_CHANNEL,
                bytes_to_add: 100,
            })),
            vec![b"d!".to_vec()]
        );
    }

    #[test]
    fn application_close_waits_for_pending_output() {
        let mut setup = Setup::new(2, 100);
        setup.start_terminal();

        let sender = setup.sender();
        sender.send("abcd").unwrap();
        sender.close().unwrap();
        sender.send("dropped").unwrap();

        assert_eq!(
            setup.forward_output(),
            vec![Packet::ChannelData(ChannelData {
                recipient_channel: 9,
                data: b"ab".to_vec(),
            })]
        );

        assert_eq!(
            setup.handle(ChannelWindowAdjust {
                recipient_channel: LOCAL_CHANNEL,
                bytes_to_add: 100,
            }),
            vec![
                Packet::ChannelData(ChannelData {
                    recipient_channel: 9,
                    data: b"cd".to_vec(),
                }),
                Packet::ChannelEof(ChannelEof {
                    recipient_channel: 9
                }),
                Packet::ChannelClose(ChannelClose {
                    recipient_channel: 9
                }),
            ]
        );

        // The client's close completes the shutdown without another close
        assert!(setup
            .handle(ChannelClose {
                recipient_channel: LOCAL_CHANNEL
            })
            .is_empty());
        assert_eq!(setup.events().last(), Some(&Event::Closed));
    }

    #[test]
    fn client_close_is_echoed() {
        let mut setup = Setup::new(1 << 20, 1 << 15);
        setup.start_terminal();

        assert!(setup
            .handle(ChannelEof {
                recipient_channel: LOCAL_CHANNEL
            })
            .is_empty());
        assert_eq!(
            setup.handle(ChannelClose {
                recipient_channel: LOCAL_CHANNEL
            }),
            vec![Packet::ChannelClose(ChannelClose {
                recipient_channel: 9
            })]
        );
        assert_eq!(setup.events().last(), Some(&Event::Closed));

        assert_eq!(
            setup
                .channel
                .handle_packet(data(b"late"), &mut setup.context)
                .unwrap_err()
                .reason,
            definitions::consts::DisconnectReason::ProtocolError
        );
    }

    #[test]
    fn unknown_channels_are_fatal() {
        let mut setup = Setup::new(1 << 20, 1 << 15);

        let packet = ChannelData {
            recipient_channel: 5,
            data: vec![],
        };

        assert!(setup
            .channel
            .handle_packet(packet.into(), &mut setup.context)
            .is_err());
    }

    #[test]
    fn additional_channels_are_rejected() {
        let mut setup = Setup::new(1 << 20, 1 << 15);

        let sent = setup.handle(ChannelOpen {
            channel_type: "session".to_string(),
            sender_channel: 10,
            initial_window_size: 100,
            maximum_packet_size: 100,
            data: vec![],
        });

        assert!(matches!(
            sent.as_slice(),
            [Packet::ChannelOpenFailure(ChannelOpenFailure {
                recipient_channel: 10,
                reason_code: SSH_OPEN_RESOURCE_SHORTAGE,
                ..
            })]
        ));
    }
}
