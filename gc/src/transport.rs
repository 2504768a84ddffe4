//! Request/reply message transport between the Garbler and the Evaluator.
//!
//! The protocol is strictly lockstep (spec §5): every send is matched by a
//! receive on the peer, so a small `send`/`receive`/`send_wait` surface is
//! all either party needs. Two implementations are provided: [`TcpTransport`]
//! for real sessions, and [`LocalTransport`] for tests and the `local`
//! CLI debug mode that wants to exercise framing without a socket.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{Receiver, Sender, channel};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{GcError, Result};

/// The default TCP port the Evaluator listens on (spec §6).
pub const DEFAULT_PORT: u16 = 4080;

/// A reliable, in-order, message-oriented channel between the two parties.
///
/// Implementations need only support one message in flight at a time: the
/// protocol never pipelines (spec §5).
pub trait Transport {
    /// Sends one serialized message.
    fn send<T: Serialize>(&mut self, msg: &T) -> Result<()>;

    /// Blocks until one serialized message arrives and deserializes it.
    fn receive<T: DeserializeOwned>(&mut self) -> Result<T>;

    /// Sends `msg` and blocks for the peer's reply, the pattern used for
    /// every handshake step in the protocol driver.
    fn send_wait<T: Serialize, U: DeserializeOwned>(&mut self, msg: &T) -> Result<U> {
        self.send(msg)?;
        self.receive()
    }
}

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(msg, bincode::config::standard())
        .map_err(|e| GcError::TransportError(format!("encoding failed: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| GcError::TransportError(format!("decoding failed: {e}")))
}

/// A length-prefixed `bincode` framing over a TCP connection: a big-endian
/// `u32` byte length followed by exactly that many payload bytes.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connects to the Evaluator at `addr` (the Garbler's side of the
    /// handshake).
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| GcError::TransportError(format!("connect failed: {e}")))?;
        Ok(TcpTransport { stream })
    }

    fn from_stream(stream: TcpStream) -> Self {
        TcpTransport { stream }
    }
}

impl Transport for TcpTransport {
    fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let bytes = encode(msg)?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| GcError::TransportError("message too large to frame".to_string()))?;
        self.stream
            .write_all(&len.to_be_bytes())
            .and_then(|()| self.stream.write_all(&bytes))
            .map_err(|e| GcError::TransportError(format!("send failed: {e}")))
    }

    fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut len_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut len_bytes)
            .map_err(|e| GcError::TransportError(format!("receive failed: {e}")))?;
        let len = u32::from_be_bytes(len_bytes) as usize;
        let mut buf = vec![0u8; len];
        self.stream
            .read_exact(&mut buf)
            .map_err(|e| GcError::TransportError(format!("receive failed: {e}")))?;
        decode(&buf)
    }
}

/// Accepts incoming Garbler connections on the Evaluator's listening port,
/// yielding one [`TcpTransport`] per session.
#[derive(Debug)]
pub struct EvaluatorListener {
    listener: TcpListener,
}

impl EvaluatorListener {
    /// Binds the listener to `addr`, typically `0.0.0.0:4080`.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| GcError::TransportError(format!("bind failed: {e}")))?;
        Ok(EvaluatorListener { listener })
    }

    /// Blocks for the next incoming session.
    pub fn accept(&self) -> Result<TcpTransport> {
        let (stream, _) = self
            .listener
            .accept()
            .map_err(|e| GcError::TransportError(format!("accept failed: {e}")))?;
        Ok(TcpTransport::from_stream(stream))
    }

    /// Puts the underlying socket in non-blocking mode, so [`Self::try_accept`]
    /// can be polled instead of blocking forever — how the `bob` CLI loop
    /// checks for a Ctrl-C request between sessions.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(|e| GcError::TransportError(format!("set_nonblocking failed: {e}")))
    }

    /// Non-blocking accept: `Ok(None)` means no connection is waiting yet.
    /// Requires [`Self::set_nonblocking`]`(true)` to have been called first.
    pub fn try_accept(&self) -> Result<Option<TcpTransport>> {
        match self.listener.accept() {
            Ok((stream, _)) => Ok(Some(TcpTransport::from_stream(stream))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(GcError::TransportError(format!("accept failed: {e}"))),
        }
    }
}

/// An in-process duplex pair, for tests and transport-exercising debug
/// modes that should not open a real socket.
#[derive(Debug)]
pub struct LocalTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl LocalTransport {
    /// Builds a connected pair: whatever one side sends, the other
    /// receives, and vice versa.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = channel();
        let (tx_b, rx_a) = channel();
        (
            LocalTransport { tx: tx_a, rx: rx_a },
            LocalTransport { tx: tx_b, rx: rx_b },
        )
    }
}

impl Transport for LocalTransport {
    fn send<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let bytes = encode(msg)?;
        self.tx
            .send(bytes)
            .map_err(|_| GcError::TransportError("peer disconnected".to_string()))
    }

    fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self
            .rx
            .recv()
            .map_err(|_| GcError::TransportError("peer disconnected".to_string()))?;
        decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_transport_round_trips_messages() {
        let (mut a, mut b) = LocalTransport::pair();
        a.send(&42u32).unwrap();
        let received: u32 = b.receive().unwrap();
        assert_eq!(received, 42);
    }

    #[test]
    fn send_wait_returns_peers_reply() {
        let (mut a, mut b) = LocalTransport::pair();
        std::thread::scope(|s| {
            s.spawn(move || {
                let request: String = b.receive().unwrap();
                b.send(&(request.len() as u32)).unwrap();
            });
            let reply: u32 = a.send_wait(&"hello".to_string()).unwrap();
            assert_eq!(reply, 5);
        });
    }

    #[test]
    fn tcp_transport_round_trips_over_loopback() {
        let listener = EvaluatorListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.listener.local_addr().unwrap();
        std::thread::scope(|s| {
            s.spawn(move || {
                let mut server = listener.accept().unwrap();
                let msg: String = server.receive().unwrap();
                server.send(&msg).unwrap();
            });
            let mut client = TcpTransport::connect(addr).unwrap();
            let reply: String = client.send_wait(&"ping".to_string()).unwrap();
            assert_eq!(reply, "ping");
        });
    }
}
