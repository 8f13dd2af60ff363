//! The boundary between a session channel and the application serving it.
//!
//! The application is handed a [`ChannelSession`] once the client requests a pseudo terminal. It
//! receives the client's input through its [`ChannelHandler`] and answers through the
//! [`ChannelSender`], which may be moved to other tasks.

use definitions::packets::{PtyRequest, WindowChange};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::ChannelClosed;

/// The user a connection was authenticated as.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserIdentity {
    /// The name the user authenticated with.
    pub user_name: String,
    /// The name of the public key algorithm used for the authentication.
    pub algorithm: String,
    /// The public key blob the user proved possession of.
    pub public_key: Vec<u8>,
}

/// The dimensions of a terminal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct TerminalSize {
    /// The width in characters.
    pub width_chars: u32,
    /// The height in rows.
    pub height_rows: u32,
    /// The width in pixels.
    pub width_pixels: u32,
    /// The height in pixels.
    pub height_pixels: u32,
}

impl From<&PtyRequest> for TerminalSize {
    fn from(request: &PtyRequest) -> TerminalSize {
        TerminalSize {
            width_chars: request.width_chars,
            height_rows: request.height_rows,
            width_pixels: request.width_pixels,
            height_pixels: request.height_pixels,
        }
    }
}

impl From<&WindowChange> for TerminalSize {
    fn from(change: &WindowChange) -> TerminalSize {
        TerminalSize {
            width_chars: change.width_chars,
            height_rows: change.height_rows,
            width_pixels: change.width_pixels,
            height_pixels: change.height_pixels,
        }
    }
}

/// Output of the application for the client.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ChannelOutput {
    /// Bytes to send to the client.
    Data(Vec<u8>),
    /// The application is done and the channel should be closed.
    Close,
}

/// Sends output of the application to the client.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    sender: mpsc::UnboundedSender<ChannelOutput>,
}

impl ChannelSender {
    pub(crate) fn new(sender: mpsc::UnboundedSender<ChannelOutput>) -> ChannelSender {
        ChannelSender { sender }
    }

    /// Queues `data` for the client.
    ///
    /// The data is sent as soon as the client's window allows it, in the order it was queued.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> Result<(), ChannelClosed> {
        self.sender
            .send(ChannelOutput::Data(data.into()))
            .map_err(|_| ChannelClosed)
    }

    /// Closes the channel after all queued data was sent.
    pub fn close(&self) -> Result<(), ChannelClosed> {
        self.sender
            .send(ChannelOutput::Close)
            .map_err(|_| ChannelClosed)
    }

    /// Returns whether the connection the channel belongs to is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Everything the application learns when a session channel gets a terminal.
#[derive(Debug, Clone)]
pub struct ChannelSession {
    /// The authenticated user.
    pub identity: UserIdentity,
    /// The value of the `TERM` environment variable requested by the client.
    pub term: String,
    /// The initial size of the terminal.
    pub size: TerminalSize,
    /// Whether the client is assumed to handle UTF-8.
    pub utf8: bool,
    /// Sends output to the client.
    pub sender: ChannelSender,
}

/// The application side of a session channel.
///
/// All methods are called from the task driving the connection, so they should not block.
pub trait ChannelHandler: Send {
    /// Called with bytes the client sent.
    fn data(&mut self, data: &[u8]);

    /// Called when the client's terminal was resized.
    fn window_changed(&mut self, size: TerminalSize) {
        let _ = size;
    }

    /// Called when it becomes known whether the client handles UTF-8.
    fn utf8_changed(&mut self, utf8: bool) {
        let _ = utf8;
    }

    /// Called once the channel is closed.
    fn closed(&mut self) {}
}

/// Creates the application side of a new session channel.
pub type ChannelHandlerFactory = Arc<dyn Fn(ChannelSession) -> Box<dyn ChannelHandler> + Send + Sync>;
