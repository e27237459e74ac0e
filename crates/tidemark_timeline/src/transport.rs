//! # Transport Seam
//!
//! The controller talks to the network through [`Transport`]. It never
//! blocks: `try_recv` returns what has already arrived.
//!
//! [`ChannelTransport`] moves encoded frames over crossbeam channels, so the
//! I/O side may live on another thread:
//!
//! ```text
//!   I/O thread                          update thread
//!  ┌────────────┐   Vec<u8> frames    ┌──────────────────┐
//!  │ ChannelPeer│ ──────────────────► │ ChannelTransport │ ─► controller
//!  │            │ ◄────────────────── │                  │
//!  └────────────┘                     └──────────────────┘
//! ```
//!
//! Undecodable frames are logged and dropped. Dropping the peer is a
//! connection loss.

use std::marker::PhantomData;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tidemark_io::DecodeResult;

use crate::messages::{ClientMessage, DecodeLimits, ServerMessage, WireAction};

/// Message-level connection to the server.
pub trait Transport<A> {
    /// Sends a message. Fire and forget.
    fn send(&mut self, message: ClientMessage<A>);

    /// Next received message, if any.
    fn try_recv(&mut self) -> Option<ServerMessage<A>>;

    /// Returns false once the connection is irrecoverably lost.
    fn is_connected(&self) -> bool;
}

/// Frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received and decoded.
    pub frames_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Frames dropped because they failed to decode.
    pub decode_errors: u64,
}

/// [`Transport`] over a pair of crossbeam channels carrying encoded frames.
pub struct ChannelTransport<A> {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    limits: DecodeLimits,
    connected: bool,
    stats: TransportStats,
    _action: PhantomData<fn() -> A>,
}

/// The far end of a [`ChannelTransport`], standing in for the server.
pub struct ChannelPeer<A> {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    limits: DecodeLimits,
    _action: PhantomData<fn() -> A>,
}

impl<A: WireAction> ChannelTransport<A> {
    /// Creates a connected transport and its peer.
    #[must_use]
    pub fn pair(limits: DecodeLimits) -> (Self, ChannelPeer<A>) {
        let (to_peer, from_client) = unbounded();
        let (to_client, from_peer) = unbounded();
        let transport = Self {
            outgoing: to_peer,
            incoming: from_peer,
            limits,
            connected: true,
            stats: TransportStats::default(),
            _action: PhantomData,
        };
        let peer = ChannelPeer {
            outgoing: to_client,
            incoming: from_client,
            limits,
            _action: PhantomData,
        };
        (transport, peer)
    }

    /// Frame counters.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl<A: WireAction> Transport<A> for ChannelTransport<A> {
    fn send(&mut self, message: ClientMessage<A>) {
        if !self.connected {
            return;
        }
        let frame = message.to_frame();
        let len = frame.len() as u64;
        if self.outgoing.send(frame).is_err() {
            self.connected = false;
            return;
        }
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += len;
    }

    fn try_recv(&mut self) -> Option<ServerMessage<A>> {
        loop {
            match self.incoming.try_recv() {
                Ok(frame) => {
                    self.stats.bytes_received += frame.len() as u64;
                    match ServerMessage::from_frame(&frame, &self.limits) {
                        Ok(message) => {
                            self.stats.frames_received += 1;
                            return Some(message);
                        }
                        Err(error) => {
                            self.stats.decode_errors += 1;
                            tracing::warn!(%error, len = frame.len(), "dropping undecodable frame");
                        }
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl<A: WireAction> ChannelPeer<A> {
    /// Sends a message to the client. Returns false if the client is gone.
    pub fn send(&self, message: &ServerMessage<A>) -> bool {
        self.send_raw(message.to_frame())
    }

    /// Sends an arbitrary frame.
    pub fn send_raw(&self, frame: Vec<u8>) -> bool {
        self.outgoing.send(frame).is_ok()
    }

    /// Next frame from the client, decoded.
    pub fn try_recv(&self) -> Option<DecodeResult<ClientMessage<A>>> {
        self.incoming
            .try_recv()
            .ok()
            .map(|frame| ClientMessage::from_frame(&frame, &self.limits))
    }

    /// Every decodable message received so far.
    pub fn drain(&self) -> Vec<ClientMessage<A>> {
        std::iter::from_fn(|| self.try_recv())
            .filter_map(Result::ok)
            .collect()
    }
}
