//! WebSocket tunnel stream adapter.
//!
//! This module provides `TunnelIo`, an adapter that wraps a message-framed
//! WebSocket channel and exposes it as `AsyncRead + AsyncWrite`. Relay
//! tunnels carry application bytes as base64 text frames, so:
//! - every write is sent as exactly one text frame holding the base64 of the chunk
//! - every received frame is base64-decoded and served in order, keeping the
//!   unconsumed tail buffered for the next read
//! - ping/pong frames are skipped, close frames are EOF
//!
//! Read and write deadlines are independent and per stream. Once a deadline
//! fires or the channel fails, the stream is unusable and must be dropped.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures_util::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep, sleep_until};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Encode a chunk of application bytes as a single tunnel frame.
pub fn encode_frame(data: &[u8]) -> Message {
    Message::text(STANDARD.encode(data))
}

/// Decode the payload of a tunnel frame back into application bytes.
pub fn decode_frame(payload: &[u8]) -> io::Result<Bytes> {
    STANDARD.decode(payload).map(Bytes::from).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid tunnel frame: {e}"),
        )
    })
}

/// A deadline with both the target instant and a registered timer, so an
/// already-past deadline fails immediately and a future one wakes the task.
struct Deadline {
    at: Instant,
    timer: Pin<Box<Sleep>>,
}

impl Deadline {
    fn new(at: Instant) -> Self {
        Self {
            at,
            timer: Box::pin(sleep_until(at)),
        }
    }

    fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> bool {
        Instant::now() >= self.at || self.timer.as_mut().poll(cx).is_ready()
    }
}

/// Byte-stream view of a relay tunnel channel.
///
/// `C` is any message-framed duplex channel; in production it is a
/// `WebSocketStream`, in tests an in-memory one.
///
/// One logical reader and one logical writer per stream: the read buffer is
/// only touched by `poll_read`.
pub struct TunnelIo<C> {
    channel: C,
    read_buf: Bytes,
    read_deadline: Option<Deadline>,
    write_deadline: Option<Deadline>,
    failed: bool,
}

impl<C> fmt::Debug for TunnelIo<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelIo")
            .field("buffered", &self.read_buf.len())
            .field("read_deadline", &self.read_deadline.as_ref().map(|d| d.at))
            .field("write_deadline", &self.write_deadline.as_ref().map(|d| d.at))
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<C> TunnelIo<C> {
    /// Wrap an established tunnel channel.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            read_buf: Bytes::new(),
            read_deadline: None,
            write_deadline: None,
            failed: false,
        }
    }

    /// Apply the same deadline to both directions.
    ///
    /// The read deadline is set first; if that fails the write deadline is
    /// left untouched and the error is returned.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// Set (or clear with `None`) the deadline for pending and future reads.
    pub fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.ensure_usable()?;
        self.read_deadline = deadline.map(Deadline::new);
        Ok(())
    }

    /// Set (or clear with `None`) the deadline for pending and future writes.
    pub fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.ensure_usable()?;
        self.write_deadline = deadline.map(Deadline::new);
        Ok(())
    }

    /// Number of decoded bytes received but not yet read.
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Returns true once a fatal error or deadline made the stream unusable.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Consumes the adapter and returns the underlying channel.
    pub fn into_inner(self) -> C {
        self.channel
    }

    fn ensure_usable(&self) -> io::Result<()> {
        if self.failed {
            Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "tunnel stream is no longer usable",
            ))
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, err: io::Error) -> Poll<io::Result<()>> {
        self.failed = true;
        Poll::Ready(Err(err))
    }

    fn drain_into(&mut self, buf: &mut ReadBuf<'_>) {
        let to_copy = self.read_buf.len().min(buf.remaining());
        buf.put_slice(&self.read_buf[..to_copy]);
        self.read_buf = self.read_buf.slice(to_copy..);
    }
}

impl<C> AsyncRead for TunnelIo<C>
where
    C: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.ensure_usable()?;
        if let Some(deadline) = this.read_deadline.as_mut()
            && deadline.poll_elapsed(cx)
        {
            return this.fail(timed_out("read"));
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        // Serve the tail of the previous frame before asking for a new one
        if !this.read_buf.is_empty() {
            this.drain_into(buf);
            return Poll::Ready(Ok(()));
        }

        loop {
            let decoded = match Pin::new(&mut this.channel).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => match msg {
                    Message::Text(text) => decode_frame(text.as_bytes()),
                    Message::Binary(data) => decode_frame(&data),
                    // tungstenite queues the pong reply itself
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    Message::Close(_) => return Poll::Ready(Ok(())),
                },
                Poll::Ready(Some(Err(err))) => return this.fail(ws_err(err)),
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            };
            match decoded {
                // An empty chunk would look like EOF to the caller
                Ok(data) if data.is_empty() => continue,
                Ok(data) => {
                    this.read_buf = data;
                    this.drain_into(buf);
                    return Poll::Ready(Ok(()));
                }
                Err(err) => return this.fail(err),
            }
        }
    }
}

impl<C> AsyncWrite for TunnelIo<C>
where
    C: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.ensure_usable()?;
        if let Some(deadline) = this.write_deadline.as_mut()
            && deadline.poll_elapsed(cx)
        {
            this.failed = true;
            return Poll::Ready(Err(timed_out("write")));
        }
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }
        let mut channel = Pin::new(&mut this.channel);
        match channel.as_mut().poll_ready(cx) {
            Poll::Ready(Ok(())) => {
                if let Err(err) = channel.as_mut().start_send(encode_frame(data)) {
                    this.failed = true;
                    return Poll::Ready(Err(ws_err(err)));
                }
                // The frame is accepted; push it out now so a write without a
                // flush still reaches the peer. A pending flush resumes on the
                // next write or flush.
                if let Poll::Ready(Err(err)) = channel.poll_flush(cx) {
                    this.failed = true;
                    return Poll::Ready(Err(ws_err(err)));
                }
                Poll::Ready(Ok(data.len()))
            }
            Poll::Ready(Err(err)) => {
                this.failed = true;
                Poll::Ready(Err(ws_err(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.ensure_usable()?;
        if let Some(deadline) = this.write_deadline.as_mut()
            && deadline.poll_elapsed(cx)
        {
            return this.fail(timed_out("write"));
        }
        match Pin::new(&mut this.channel).poll_flush(cx) {
            Poll::Ready(Err(err)) => this.fail(ws_err(err)),
            other => other.map(|_| Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        Pin::new(&mut this.channel).poll_close(cx).map_err(ws_err)
    }
}

fn timed_out(direction: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("tunnel {direction} deadline exceeded"),
    )
}

fn ws_err(err: WsError) -> io::Error {
    match err {
        WsError::Io(err) => err,
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            io::Error::new(io::ErrorKind::NotConnected, err)
        }
        other => io::Error::other(other),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    type Peer = WebSocketStream<DuplexStream>;

    async fn tunnel_pair() -> (TunnelIo<Peer>, Peer) {
        let (local, remote) = duplex(64 * 1024);
        let local = WebSocketStream::from_raw_socket(local, Role::Client, None).await;
        let remote = WebSocketStream::from_raw_socket(remote, Role::Server, None).await;
        (TunnelIo::new(local), remote)
    }

    fn frame_bytes(msg: Message) -> Bytes {
        match msg {
            Message::Text(text) => decode_frame(text.as_bytes()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn codec_round_trips_arbitrary_bytes() {
        let all: Vec<u8> = (0..=255u8).collect();
        let samples: [&[u8]; 4] = [b"", b"\x00", &[0xff, 0xfe, 0x00, 0x80], &all];
        for sample in samples {
            assert_eq!(&frame_bytes(encode_frame(sample))[..], sample);
        }
    }

    #[test]
    fn frames_are_base64_text() {
        match encode_frame(b"hello") {
            Message::Text(text) => assert_eq!(text.as_str(), "aGVsbG8="),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_invalid_payload() {
        let err = decode_frame(b"not base64!").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn reads_are_bounded_by_caller_buffer() {
        let (mut io, mut peer) = tunnel_pair().await;
        let chunk: Vec<u8> = vec![0x00, 0xff, 0x10, 0x80, 0x7f, 0x01, 0xfe, 0x02, 0x03, 0x9c];
        peer.send(encode_frame(&chunk)).await.unwrap();

        let mut buf = [0u8; 4];
        let mut got = Vec::new();
        let mut sizes = Vec::new();
        for _ in 0..3 {
            let n = io.read(&mut buf).await.unwrap();
            sizes.push(n);
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(got, chunk);
        assert_eq!(io.buffered(), 0);
    }

    #[tokio::test]
    async fn buffered_tail_is_served_before_next_frame() {
        let (mut io, mut peer) = tunnel_pair().await;
        peer.send(encode_frame(b"abcdef")).await.unwrap();
        peer.send(encode_frame(b"XYZ")).await.unwrap();

        let mut buf = [0u8; 4];
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"XYZ");
    }

    #[tokio::test]
    async fn empty_frames_are_skipped() {
        let (mut io, mut peer) = tunnel_pair().await;
        peer.send(encode_frame(b"")).await.unwrap();
        peer.send(encode_frame(b"data")).await.unwrap();

        let mut buf = [0u8; 16];
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"data");
    }

    #[tokio::test]
    async fn each_write_is_one_frame() {
        let (mut io, mut peer) = tunnel_pair().await;
        io.write_all(b"first").await.unwrap();
        io.write_all(&[0u8, 159, 146, 150]).await.unwrap();
        io.flush().await.unwrap();

        let first = peer.next().await.unwrap().unwrap();
        assert_eq!(&frame_bytes(first)[..], b"first");
        let second = peer.next().await.unwrap().unwrap();
        assert_eq!(&frame_bytes(second)[..], &[0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn write_reaches_peer_without_flush() {
        let (mut io, mut peer) = tunnel_pair().await;
        io.write_all(b"unflushed").await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(1), peer.next())
            .await
            .expect("frame should be sent without an explicit flush")
            .unwrap()
            .unwrap();
        assert_eq!(&frame_bytes(frame)[..], b"unflushed");
    }

    #[tokio::test]
    async fn debug_reports_buffer_and_state() {
        let (mut io, mut peer) = tunnel_pair().await;
        peer.send(encode_frame(b"abcdef")).await.unwrap();
        let mut buf = [0u8; 2];
        io.read_exact(&mut buf).await.unwrap();

        let rendered = format!("{io:?}");
        assert!(rendered.starts_with("TunnelIo"));
        assert!(rendered.contains("buffered: 4"));
        assert!(rendered.contains("failed: false"));
    }

    #[tokio::test]
    async fn close_frame_is_eof() {
        let (mut io, mut peer) = tunnel_pair().await;
        peer.close(None).await.unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(io.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_frame_fails_stream() {
        let (mut io, mut peer) = tunnel_pair().await;
        peer.send(Message::text("%%%")).await.unwrap();

        let mut buf = [0u8; 8];
        let err = io.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(io.is_failed());

        let err = io.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn past_read_deadline_times_out() {
        let (mut io, _peer) = tunnel_pair().await;
        io.set_read_deadline(Some(Instant::now())).unwrap();

        let mut buf = [0u8; 8];
        let result = tokio::time::timeout(Duration::from_secs(1), io.read(&mut buf))
            .await
            .expect("read should fail promptly");
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn past_write_deadline_times_out() {
        let (mut io, _peer) = tunnel_pair().await;
        io.set_write_deadline(Some(Instant::now())).unwrap();

        let err = io.write(b"late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn pending_read_wakes_on_deadline() {
        let (mut io, _peer) = tunnel_pair().await;
        io.set_read_deadline(Some(Instant::now() + Duration::from_millis(50)))
            .unwrap();

        let mut buf = [0u8; 8];
        let result = tokio::time::timeout(Duration::from_secs(2), io.read(&mut buf))
            .await
            .expect("deadline should wake the reader");
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn cleared_deadline_allows_io() {
        let (mut io, mut peer) = tunnel_pair().await;
        io.set_deadline(Some(Instant::now() + Duration::from_secs(60)))
            .unwrap();
        io.set_deadline(None).unwrap();
        peer.send(encode_frame(b"ok")).await.unwrap();

        let mut buf = [0u8; 8];
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ok");
    }

    #[tokio::test]
    async fn set_deadline_fails_on_failed_stream() {
        let (mut io, _peer) = tunnel_pair().await;
        io.set_read_deadline(Some(Instant::now())).unwrap();
        let mut buf = [0u8; 8];
        let _ = io.read(&mut buf).await.unwrap_err();

        let err = io
            .set_deadline(Some(Instant::now() + Duration::from_secs(5)))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
