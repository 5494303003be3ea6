//! Line codec for the IRC connection.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::warn;

use crate::common::error::ProtocolError;

use super::message::IrcMessage;

/// Longest accepted inbound line: 512 bytes of message plus 8191 bytes
/// of IRCv3 tags.
pub const MAX_LINE_LENGTH: usize = 512 + 8191;

/// A framed IRC connection.
pub type IrcConnection<S> = Framed<S, IrcCodec>;

/// Create a framed IRC connection over any byte stream.
pub fn new_irc_connection<S>(stream: S) -> IrcConnection<S>
where
    S: AsyncRead + AsyncWrite,
{
    Framed::new(stream, IrcCodec::new())
}

/// Decodes CRLF (or bare LF) terminated lines and encodes [`IrcMessage`]s.
///
/// Invalid UTF-8 is replaced rather than rejected, and overlong lines are
/// dropped, because a decode error would end the stream.
#[derive(Debug, Default)]
pub struct IrcCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Skipping the remainder of an overlong line
    discarding: bool,
}

impl IrcCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for IrcCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            match newline {
                Some(offset) if self.discarding => {
                    src.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                Some(offset) => {
                    let end = self.next_index + offset;
                    let line = src.split_to(end + 1);
                    self.next_index = 0;

                    let text = String::from_utf8_lossy(&line[..end]);
                    let text = text.trim_end_matches('\r');
                    if !text.is_empty() {
                        return Ok(Some(text.to_string()));
                    }
                }
                None if self.discarding => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                None if src.len() > MAX_LINE_LENGTH => {
                    warn!("Dropping IRC line longer than {} bytes", MAX_LINE_LENGTH);
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(None);
                }
                None => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<IrcMessage> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: IrcMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = msg.to_wire();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PING :a\r\nPING :b\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :b".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PING :");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"later\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :later".to_string()));
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("\r\n\r\nPING :x\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :x".to_string()));
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #c :caf\u{fffd}".to_string())
        );
    }

    #[test]
    fn test_overlong_line_is_dropped() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(vec![b'x'; MAX_LINE_LENGTH + 1].as_slice());

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        // Rest of the overlong line, then a normal one
        buf.extend_from_slice(b"xxxx\r\nPING :ok\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :ok".to_string()));
    }

    #[test]
    fn test_encode() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(IrcMessage::pong("srv"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG srv\r\n");
    }
}
