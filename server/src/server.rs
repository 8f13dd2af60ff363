//! Accepts connections and runs them until the server shuts down.

use std::{io, net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    sync::watch,
    task::JoinSet,
};
use tracing::{debug, info, info_span, warn, Instrument as _};

use crate::{config::ServerConfig, session};

/// An SSH server listening on a TCP socket.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    shutdown: Arc<watch::Sender<bool>>,
}

/// Stops a running [`Server`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stops accepting connections and disconnects every live connection.
    ///
    /// Clients receive a disconnect message with the reason `SSH_DISCONNECT_BY_APPLICATION`.
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }
}

impl Server {
    /// Creates a server listening on `addr`.
    pub async fn bind(addr: impl ToSocketAddrs, config: ServerConfig) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let (shutdown, _) = watch::channel(false);

        Ok(Server {
            listener,
            config: Arc::new(config),
            shutdown: Arc::new(shutdown),
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a handle to stop the server.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: Arc::clone(&self.shutdown),
        }
    }

    /// Accepts connections until the server is shut down.
    ///
    /// Every connection runs in its own task. After the shutdown this waits for all connections
    /// to say goodbye to their clients.
    pub async fn run(self) -> io::Result<()> {
        let mut connections = JoinSet::new();
        let mut shutdown = self.shutdown.subscribe();

        info!(addr = %self.local_addr()?, "listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!(%err, "failed to accept a connection");
                            continue;
                        }
                    };

                    if let Err(err) = stream.set_nodelay(true) {
                        debug!(%err, "failed to disable Nagle's algorithm");
                    }

                    let span = info_span!("connection", %peer);
                    span.in_scope(|| info!("connection accepted"));

                    connections.spawn(
                        session::run(stream, Arc::clone(&self.config), self.shutdown.subscribe())
                            .instrument(span),
                    );
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_finished(finished);
                }
                _ = shutdown.changed() => break,
            }
        }

        info!(connections = connections.len(), "shutting down");

        while let Some(finished) = connections.join_next().await {
            log_finished(finished);
        }

        Ok(())
    }
}

fn log_finished(finished: Result<(), tokio::task::JoinError>) {
    if let Err(err) = finished {
        warn!(%err, "connection task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::builder;
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::TcpStream,
    };

    async fn start() -> (SocketAddr, ShutdownHandle, tokio::task::JoinHandle<io::Result<()>>) {
        let server = Server::bind("127.0.0.1:0", builder().build().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.shutdown_handle();

        (addr, handle, tokio::spawn(server.run()))
    }

    #[tokio::test]
    async fn greets_clients() {
        let (addr, handle, server) = start().await;

        let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
        let mut line = String::new();
        client.read_line(&mut line).await.unwrap();

        assert!(line.starts_with("SSH-2.0-sshgate_transport_"));
        assert!(line.ends_with("\r\n"));

        handle.shutdown();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_disconnects_clients() {
        let (addr, handle, server) = start().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"SSH-2.0-test_client\r\n").await.unwrap();

        // Wait until the server sent its version and key exchange init
        let mut received = vec![0; 16];
        client.read_exact(&mut received).await.unwrap();

        handle.shutdown();
        server.await.unwrap().unwrap();

        client.read_to_end(&mut received).await.unwrap();

        let message = b"The server is shutting down.";
        assert!(received
            .windows(message.len())
            .any(|window| window == message));
    }
}
