use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use tracing::{debug, trace};

use super::header::{RequestResponseHeader, HEADER_SIZE};
use super::packet::Packet;
use crate::common::config::Context;
use crate::common::error::{Error, Result};

/*
    Requests are strictly half-duplex: send one request, read its
    response to the end, then send the next. Nothing is pipelined and
    nothing is retried here; a failed read surfaces to the caller.
*/

pub trait Transport {
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Next packet from the peer, or `None` once it has gone quiet.
    fn receive(&mut self) -> Result<Option<Packet>>;
}

pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    pub fn connect(ctx: &Context) -> Result<Self> {
        let address = ctx.node_address();
        let stream = TcpStream::connect(&address).map_err(Error::Connectivity)?;
        stream
            .set_read_timeout(Some(ctx.receive_timeout))
            .map_err(Error::Connectivity)?;
        debug!(%address, "connected");
        Ok(TcpConnection { stream })
    }
}

impl Transport for TcpConnection {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.stream.write_all(message).map_err(Error::Connectivity)?;
        self.stream.flush().map_err(Error::Connectivity)
    }

    fn receive(&mut self) -> Result<Option<Packet>> {
        let mut raw = [0u8; HEADER_SIZE];
        let first = match self.stream.read(&mut raw) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None)
            }
            Err(e) => return Err(Error::Connectivity(e)),
        };
        self.stream
            .read_exact(&mut raw[first..])
            .map_err(Error::Connectivity)?;

        let header = RequestResponseHeader::from_bytes(&raw);
        if header.is_corrupted() {
            return Err(Error::ProtocolViolation(format!(
                "corrupted header {raw:02x?}"
            )));
        }
        let mut payload = vec![0u8; header.payload_size()];
        self.stream
            .read_exact(&mut payload)
            .map_err(Error::Connectivity)?;
        Ok(Some(Packet { header, payload }))
    }
}

/// Sends a request with a fresh dejavu and returns that dejavu.
pub fn send_request<T: Transport + ?Sized>(
    transport: &mut T,
    msg_type: u8,
    payload: &[u8],
) -> Result<u32> {
    let dejavu = RequestResponseHeader::random_dejavu();
    let message = Packet::new(msg_type, dejavu, payload.to_vec())?.encode();
    debug!(msg_type, dejavu, size = message.len(), "sending request");
    transport.send(&message)?;
    Ok(dejavu)
}

/// Next packet answering `dejavu`. Packets for other exchanges (peer
/// gossip, broadcasts) are skipped.
pub fn next_response<T: Transport + ?Sized>(
    transport: &mut T,
    dejavu: u32,
) -> Result<Option<Packet>> {
    while let Some(packet) = transport.receive()? {
        if packet.dejavu() == dejavu {
            return Ok(Some(packet));
        }
        trace!(
            msg_type = packet.msg_type(),
            dejavu = packet.dejavu(),
            "skipping unrelated packet"
        );
    }
    Ok(None)
}

/// Reads the rest of a response so the connection is clean for the next
/// request.
pub fn drain_response<T: Transport + ?Sized>(transport: &mut T, dejavu: u32) -> Result<()> {
    while let Some(packet) = next_response(transport, dejavu)? {
        if packet.is_end_of_response() {
            break;
        }
        trace!(msg_type = packet.msg_type(), "discarding surplus packet");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::ScriptedPeer;
    use crate::network::packet::{END_RESPONSE, REQUEST_TICK_DATA};

    #[test]
    fn test_request_is_framed_with_header() {
        let mut peer = ScriptedPeer::new(|_| Vec::new());
        let dejavu = send_request(&mut peer, REQUEST_TICK_DATA, &7u32.to_le_bytes()).unwrap();

        let sent = &peer.requests[0];
        assert_eq!(sent.msg_type(), REQUEST_TICK_DATA);
        assert_eq!(sent.dejavu(), dejavu);
        assert_eq!(sent.payload, 7u32.to_le_bytes());
    }

    #[test]
    fn test_unrelated_packets_are_skipped() {
        let mut peer = ScriptedPeer::new(|_| vec![(END_RESPONSE, Vec::new())]);
        peer.inject(Packet::new(99, 0, vec![1, 2, 3]).unwrap());
        let dejavu = send_request(&mut peer, REQUEST_TICK_DATA, &[0; 4]).unwrap();

        let packet = next_response(&mut peer, dejavu).unwrap().unwrap();
        assert!(packet.is_end_of_response());
        assert!(next_response(&mut peer, dejavu).unwrap().is_none());
    }
}
