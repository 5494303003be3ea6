//! IRC connection task and send handle.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::bridge::capabilities::IrcSender;
use crate::bridge::membership::RosterSource;
use crate::common::error::{ConnectionError, ProtocolError, SendError, SendResult};
use crate::common::messages::IrcEvent;
use crate::common::types::{IrcChannel, NickSet};
use crate::config::types::IrcConfig;

use super::codec::{new_irc_connection, IrcConnection};
use super::message::IrcMessage;
use super::roster::{Roster, SharedRoster};
use super::session::IrcSession;

/// Reason sent with QUIT on shutdown.
const QUIT_MESSAGE: &str = "Bye!";

/// IRC lines are capped at 512 bytes including CRLF.
const MAX_LINE_BYTES: usize = 510;

/// Room left for the `:nick!user@host ` prefix the server adds when it
/// relays our messages to other clients.
const PREFIX_ALLOWANCE: usize = 100;

/// `\x01ACTION ` plus the closing `\x01`.
const ACTION_OVERHEAD: usize = 9;

/// Byte stream an IRC connection can run over (plain TCP or TLS).
pub trait IrcTransport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcTransport for T {}

/// Create the connection task and its send handle.
pub fn new_irc_client(
    config: IrcConfig,
    events_tx: mpsc::UnboundedSender<IrcEvent>,
    shutdown_rx: watch::Receiver<bool>,
) -> (IrcClient, IrcHandle) {
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let roster = Roster::shared();

    let client = IrcClient {
        session: IrcSession::new(config.nickname.clone(), roster.clone()),
        config,
        events_tx,
        outgoing_rx,
        shutdown_rx,
        roster: roster.clone(),
    };
    let handle = IrcHandle {
        outgoing_tx,
        roster,
    };

    (client, handle)
}

/// Owns the IRC connection: reads lines, answers the protocol, emits
/// relay events and writes queued outbound messages.
pub struct IrcClient {
    config: IrcConfig,
    session: IrcSession,
    events_tx: mpsc::UnboundedSender<IrcEvent>,
    outgoing_rx: mpsc::UnboundedReceiver<IrcMessage>,
    shutdown_rx: watch::Receiver<bool>,
    roster: SharedRoster,
}

impl IrcClient {
    /// Open the TCP connection, wrapped in TLS when configured.
    pub async fn connect(&self) -> Result<Box<dyn IrcTransport>, ConnectionError> {
        let host = self.config.server.as_str();
        let port = self.config.port();
        info!("Connecting to IRC server at {}:{}", host, port);

        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::ConnectFailed {
                host: host.to_string(),
                port,
                source,
            })?;

        if !self.config.use_tls {
            return Ok(Box::new(tcp));
        }

        if !self.config.verify_tls() {
            warn!("TLS certificate verification is disabled for {}", host);
        }
        let tls_error = |source: native_tls::Error| ConnectionError::Tls {
            host: host.to_string(),
            source,
        };
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(!self.config.verify_tls())
            .danger_accept_invalid_hostnames(!self.config.verify_tls())
            .build()
            .map_err(tls_error)?;
        let stream = tokio_native_tls::TlsConnector::from(connector)
            .connect(host, tcp)
            .await
            .map_err(tls_error)?;

        Ok(Box::new(stream))
    }

    /// Run the connection until the server closes it, an I/O error occurs,
    /// or shutdown is signalled. Always ends with a `Disconnected` event.
    pub async fn run<S>(mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.handle_connection(stream).await {
            Ok(()) => info!("IRC connection closed"),
            Err(e) => error!("IRC connection error: {}", e),
        }

        self.roster.write().clear();
        self.emit(IrcEvent::Disconnected);
    }

    async fn handle_connection<S>(&mut self, stream: S) -> Result<(), ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut connection = new_irc_connection(stream);

        for msg in self.session.registration(&self.config) {
            connection.send(msg).await?;
        }
        debug!("IRC registration sent as {}", self.session.nickname());

        loop {
            tokio::select! {
                line = connection.next() => {
                    match line {
                        Some(Ok(line)) => self.handle_line(&mut connection, &line).await?,
                        Some(Err(e)) => return Err(e),
                        None => return Ok(()),
                    }
                }

                // Outbound messages from the Slack relay loop
                Some(outgoing) = self.outgoing_rx.recv() => {
                    trace!(">> {}", outgoing.to_wire());
                    connection.send(outgoing).await?;
                }

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Leaving IRC");
                        connection.send(IrcMessage::quit(QUIT_MESSAGE)).await?;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_line<S>(
        &mut self,
        connection: &mut IrcConnection<S>,
        line: &str,
    ) -> Result<(), ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        trace!("<< {}", line);

        let msg = match IrcMessage::parse(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Skipping malformed IRC line: {}", e);
                return Ok(());
            }
        };

        let output = self.session.handle(&msg);
        for reply in output.replies {
            connection.send(reply).await?;
        }
        if let Some(event) = output.event {
            self.emit(event);
        }

        Ok(())
    }

    fn emit(&self, event: IrcEvent) {
        if let Err(e) = self.events_tx.send(event) {
            debug!("IRC event receiver closed: {}", e);
        }
    }
}

/// Cloneable handle for sending to IRC and reading rosters.
#[derive(Debug, Clone)]
pub struct IrcHandle {
    outgoing_tx: mpsc::UnboundedSender<IrcMessage>,
    roster: SharedRoster,
}

impl IrcHandle {
    fn enqueue(&self, msg: IrcMessage) -> SendResult<()> {
        self.outgoing_tx
            .send(msg)
            .map_err(|_| SendError::QueueClosed { network: "IRC" })
    }
}

impl IrcSender for IrcHandle {
    fn send_message(&self, channel: &IrcChannel, text: &str) -> SendResult<()> {
        for chunk in split_message(text, text_budget(channel.as_str(), 0)) {
            self.enqueue(IrcMessage::privmsg(channel.as_str(), &chunk))?;
        }
        Ok(())
    }

    fn send_action(&self, channel: &IrcChannel, text: &str) -> SendResult<()> {
        for chunk in split_message(text, text_budget(channel.as_str(), ACTION_OVERHEAD)) {
            self.enqueue(IrcMessage::action(channel.as_str(), &chunk))?;
        }
        Ok(())
    }

    fn join(&self, channel: &IrcChannel, key: Option<&str>) -> SendResult<()> {
        self.enqueue(IrcMessage::join(channel.as_str(), key))
    }
}

impl RosterSource for IrcHandle {
    fn current_roster(&self, channel: &IrcChannel) -> Option<NickSet> {
        self.roster.read().members(channel.as_str()).cloned()
    }
}

/// Bytes of message text that fit in one PRIVMSG to `target`.
fn text_budget(target: &str, overhead: usize) -> usize {
    // "PRIVMSG " + target + " :"
    let command = 8 + target.len() + 2;
    MAX_LINE_BYTES.saturating_sub(PREFIX_ALLOWANCE + command + overhead).max(1)
}

/// Largest char boundary in `s` that is not past `max`.
fn boundary_before(s: &str, max: usize) -> usize {
    (0..=max.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}

/// Break one line of text into pieces of at most `budget` bytes.
///
/// Breaks at the last space that fits, otherwise at a char boundary.
/// Leading indentation stays on the first piece so pasted code keeps
/// its shape.
pub fn split_message(text: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    let mut indent = text.len() - text.trim_start_matches(' ').len();

    while rest.len() > budget {
        let fit = boundary_before(rest, budget);
        let cut = match rest[..fit].rfind(' ') {
            Some(space) if space > indent => space,
            _ if fit > 0 => fit,
            // Budget narrower than one character
            _ => rest.chars().next().map_or(rest.len(), char::len_utf8),
        };
        pieces.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches(' ');
        indent = 0;
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest.to_string());
    }

    pieces
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    fn test_config() -> IrcConfig {
        IrcConfig {
            nickname: "relay".to_string(),
            name: None,
            server: "irc.example.net".to_string(),
            port: None,
            password: None,
            use_tls: false,
            verify_tls: None,
            channels: Vec::new(),
            highlight_rules: None,
        }
    }

    #[test]
    fn test_split_message_short() {
        assert_eq!(split_message("Hello world", 50), vec!["Hello world"]);
    }

    #[test]
    fn test_split_message_on_space() {
        assert_eq!(
            split_message("Hello beautiful world", 15),
            vec!["Hello", "beautiful world"]
        );
    }

    #[test]
    fn test_split_message_no_space() {
        assert_eq!(
            split_message("HelloBeautifulWorld", 10),
            vec!["HelloBeaut", "ifulWorld"]
        );
    }

    #[test]
    fn test_split_message_multibyte_utf8() {
        // "é" is 2 bytes; a budget of 4 lands inside it
        assert_eq!(split_message("café rest", 4), vec!["caf", "é", "rest"]);
    }

    #[test]
    fn test_split_message_keeps_indentation() {
        assert_eq!(
            split_message("    let total = a + b;", 16),
            vec!["    let total =", "a + b;"]
        );
        assert_eq!(split_message("  short", 16), vec!["  short"]);
    }

    #[test]
    fn test_text_budget() {
        assert_eq!(text_budget("#caa", 0), 510 - 100 - 14);
        assert_eq!(text_budget("#caa", ACTION_OVERHEAD), 510 - 100 - 14 - 9);
    }

    #[test]
    fn test_handle_splits_long_messages() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (mut client, handle) = new_irc_client(test_config(), events_tx, shutdown_rx);

        let long = "word ".repeat(200);
        handle.send_message(&IrcChannel::new("#caa"), &long).unwrap();

        let mut sent = Vec::new();
        while let Ok(msg) = client.outgoing_rx.try_recv() {
            sent.push(msg);
        }
        assert!(sent.len() > 1);
        assert!(sent.iter().all(|m| m.to_wire().len() <= MAX_LINE_BYTES - PREFIX_ALLOWANCE));
    }

    #[test]
    fn test_handle_fails_when_client_gone() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (client, handle) = new_irc_client(test_config(), events_tx, shutdown_rx);
        drop(client);

        let result = handle.join(&IrcChannel::new("#caa"), None);
        assert!(matches!(result, Err(SendError::QueueClosed { .. })));
    }

    #[tokio::test]
    async fn test_connection_flow() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (client, handle) = new_irc_client(test_config(), events_tx, shutdown_rx);

        let (client_stream, server_stream) = tokio::io::duplex(4096);
        let task = tokio::spawn(client.run(client_stream));

        let (server_read, mut server_write) = tokio::io::split(server_stream);
        let mut lines = BufReader::new(server_read).lines();

        // 1. Registration
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK relay");
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "USER backchannel 0 * Backchannel"
        );

        // 2. Welcome
        server_write
            .write_all(b":srv 001 relay :Welcome\r\n")
            .await
            .unwrap();
        assert_eq!(events_rx.recv().await, Some(IrcEvent::Connected));

        // 3. Keepalive
        server_write.write_all(b"PING :srv\r\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "PONG srv");

        // 4. Roster visible through the handle
        server_write
            .write_all(b":srv 353 relay = #caa :relay alice\r\n:srv 366 relay #caa :End\r\n")
            .await
            .unwrap();
        server_write
            .write_all(b":alice!a@h PRIVMSG #caa :hi\r\n")
            .await
            .unwrap();
        assert_eq!(
            events_rx.recv().await,
            Some(IrcEvent::Message {
                nick: "alice".to_string(),
                target: "#caa".to_string(),
                text: "hi".to_string(),
            })
        );
        let roster = handle.current_roster(&IrcChannel::new("#caa")).unwrap();
        assert!(roster.contains("alice"));

        // 5. Outbound message
        handle
            .send_message(&IrcChannel::new("#caa"), "hello world")
            .unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "PRIVMSG #caa :hello world"
        );

        // 6. Shutdown sends QUIT and reports the disconnect
        shutdown_tx.send(true).unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "QUIT Bye!");
        task.await.unwrap();

        let mut last = None;
        while let Some(event) = events_rx.recv().await {
            last = Some(event);
        }
        assert_eq!(last, Some(IrcEvent::Disconnected));
        assert!(handle.current_roster(&IrcChannel::new("#caa")).is_none());
    }
}
