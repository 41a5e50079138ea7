//! WebSocket frame streamer.
//!
//! Owns the client socket, the send gate, and the connection state. The
//! socket is switched to non-blocking after the handshake so that polling for
//! acknowledgments and pushing frames interleave on one thread; there is no
//! reconnect, retry, or timeout logic anywhere — once the connection closes
//! the streamer stays closed, and if the peer never acknowledges, no further
//! frames are sent.

use std::net::TcpStream;

use anyhow::{Context, Result, anyhow};
use tungstenite::{Error as WsError, Message, WebSocket, client::client};

use crate::frame::FrameBuffer;
use crate::gate::SendGate;
use crate::protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What a tick's send attempt did. Send failures are deliberately not
/// surfaced as errors: the policy is log, drop the frame, carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Header and frame(s) went out; the gate is now closed until the next
    /// acknowledgment.
    Sent,
    /// Gate was closed: previous frame still unacknowledged. Frame dropped.
    GateClosed,
    /// Not connected (or already closed). Frame dropped.
    NotConnected,
    /// A send call failed mid-cycle. The gate grant was handed back so a
    /// later tick can retry once the socket recovers.
    SendFailed,
}

pub struct FrameStreamer {
    ws: Option<WebSocket<TcpStream>>,
    state: ConnectionState,
    gate: SendGate,
    sent_cycles: u64,
}

impl FrameStreamer {
    pub fn new() -> Self {
        Self {
            ws: None,
            state: ConnectionState::Connecting,
            gate: SendGate::new(),
            sent_cycles: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the gate currently permits a send.
    pub fn ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Send cycles completed since connecting.
    pub fn sent_cycles(&self) -> u64 {
        self.sent_cycles
    }

    /// Dial `ws://{host}:{port}{path}` and perform the websocket handshake.
    /// On success the socket goes non-blocking and the gate opens (the
    /// socket-open event grants the first send).
    pub fn connect(&mut self, host: &str, port: u16, path: &str) -> Result<()> {
        if self.state == ConnectionState::Open {
            return Ok(());
        }

        let url = format!("ws://{host}:{port}{path}");
        let stream = TcpStream::connect((host, port))
            .with_context(|| format!("failed to reach {host}:{port}"))?;
        // Handshake is easier with a blocking socket, switch to non-blocking afterwards.
        let (mut ws, _response) = client(url.as_str(), stream)
            .map_err(|e| anyhow!("websocket handshake with {url} failed: {e}"))?;
        ws.get_mut()
            .set_nonblocking(true)
            .context("failed to set tcp non-blocking")?;

        self.ws = Some(ws);
        self.state = ConnectionState::Open;
        self.gate.mark_ready();
        Ok(())
    }

    /// Drain inbound messages without blocking. Any text or binary message
    /// from the peer counts as an acknowledgment and opens the gate; its
    /// content is never interpreted.
    pub fn poll(&mut self) {
        let Some(ws) = self.ws.as_mut() else {
            return;
        };

        // Finish any partially written frame before reading.
        let mut closed = match ws.flush() {
            Ok(()) => false,
            Err(ref e) if would_block(e) => false,
            Err(WsError::AlreadyClosed | WsError::ConnectionClosed) => true,
            Err(e) => {
                eprintln!("[stream] socket flush failed: {e}");
                true
            }
        };

        while !closed {
            match ws.read() {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    self.gate.mark_ready();
                }
                Ok(Message::Ping(payload)) => {
                    let _ = ws.send(Message::Pong(payload));
                }
                Ok(Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(_)) => closed = true,
                Err(ref e) if would_block(e) => break,
                Err(WsError::AlreadyClosed | WsError::ConnectionClosed) => closed = true,
                Err(e) => {
                    eprintln!("[stream] socket read failed: {e}");
                    closed = true;
                }
            }
        }

        if closed {
            self.state = ConnectionState::Closed;
            self.ws = None;
        }
    }

    /// Attempt one send cycle: header, then each frame as its own binary
    /// message. Skips (dropping the frames, never queuing) when disconnected
    /// or when the previous cycle is still unacknowledged. The gate is only
    /// spent by a fully successful cycle.
    pub fn try_send_frames(&mut self, frames: &[FrameBuffer]) -> SendOutcome {
        if self.state != ConnectionState::Open {
            return SendOutcome::NotConnected;
        }
        let Some(first) = frames.first() else {
            // Nothing rendered this tick; keep the grant.
            return SendOutcome::GateClosed;
        };
        if !self.gate.try_consume_ready() {
            return SendOutcome::GateClosed;
        }

        let header = protocol::dimensions_header(first.width, first.height);
        let Some(ws) = self.ws.as_mut() else {
            self.gate.mark_ready();
            return SendOutcome::NotConnected;
        };
        match send_cycle(ws, &header, frames) {
            Ok(()) => {
                self.sent_cycles += 1;
                SendOutcome::Sent
            }
            Err(e) => {
                // Hand the grant back so a later tick can retry.
                self.gate.mark_ready();
                if matches!(e, WsError::AlreadyClosed | WsError::ConnectionClosed) {
                    self.state = ConnectionState::Closed;
                    self.ws = None;
                }
                eprintln!("[stream] frame send failed: {e}");
                SendOutcome::SendFailed
            }
        }
    }
}

impl Default for FrameStreamer {
    fn default() -> Self {
        Self::new()
    }
}

fn send_cycle(
    ws: &mut WebSocket<TcpStream>,
    header: &str,
    frames: &[FrameBuffer],
) -> Result<(), WsError> {
    ws.write(Message::Text(header.to_string()))?;
    for frame in frames {
        ws.write(Message::Binary(frame.bytes.clone()))?;
    }
    // On a non-blocking socket the flush may not finish here; the remainder
    // is queued inside tungstenite and pushed out by the next poll.
    match ws.flush() {
        Ok(()) => Ok(()),
        Err(ref e) if would_block(e) => Ok(()),
        Err(e) => Err(e),
    }
}

fn would_block(e: &WsError) -> bool {
    matches!(e, WsError::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameBuffer {
        FrameBuffer {
            width: 2,
            height: 2,
            bytes: vec![0u8; 16],
        }
    }

    #[test]
    fn unconnected_streamer_skips_sends() {
        let mut streamer = FrameStreamer::new();
        assert_eq!(streamer.state(), ConnectionState::Connecting);
        assert!(!streamer.ready());
        assert_eq!(streamer.try_send_frames(&[frame()]), SendOutcome::NotConnected);
        assert_eq!(streamer.sent_cycles(), 0);
    }

    #[test]
    fn poll_without_socket_is_a_no_op() {
        let mut streamer = FrameStreamer::new();
        streamer.poll();
        assert_eq!(streamer.state(), ConnectionState::Connecting);
    }
}
