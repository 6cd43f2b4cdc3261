use std::collections::VecDeque;

use super::connection::Transport;
use super::header::{RequestResponseHeader, HEADER_SIZE};
use super::packet::Packet;
use crate::common::error::Result;

type Handler = Box<dyn FnMut(&Packet) -> Vec<(u8, Vec<u8>)>>;

/// In-memory node for tests. Each request is handed to `handler`, whose
/// answers are queued stamped with the request's dejavu.
pub struct ScriptedPeer {
    handler: Handler,
    queue: VecDeque<Packet>,
    pub requests: Vec<Packet>,
}

impl ScriptedPeer {
    pub fn new(handler: impl FnMut(&Packet) -> Vec<(u8, Vec<u8>)> + 'static) -> Self {
        ScriptedPeer {
            handler: Box::new(handler),
            queue: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    pub fn inject(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }

    pub fn requests_of_type(&self, msg_type: u8) -> usize {
        self.requests
            .iter()
            .filter(|p| p.msg_type() == msg_type)
            .count()
    }
}

impl Transport for ScriptedPeer {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&message[..HEADER_SIZE]);
        let request = Packet {
            header: RequestResponseHeader::from_bytes(&raw),
            payload: message[HEADER_SIZE..].to_vec(),
        };
        for (msg_type, payload) in (self.handler)(&request) {
            self.queue
                .push_back(Packet::new(msg_type, request.dejavu(), payload)?);
        }
        self.requests.push(request);
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Packet>> {
        Ok(self.queue.pop_front())
    }
}
