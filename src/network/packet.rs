use super::header::{RequestResponseHeader, HEADER_SIZE};
use crate::common::error::Result;

pub const BROADCAST_COMPUTORS: u8 = 2;
pub const BROADCAST_TICK: u8 = 3;
pub const BROADCAST_FUTURE_TICK_DATA: u8 = 8;
pub const REQUEST_COMPUTOR_LIST: u8 = 11;
pub const REQUEST_QUORUM_TICK: u8 = 14;
pub const REQUEST_TICK_DATA: u8 = 16;
pub const BROADCAST_TRANSACTION: u8 = 24;
pub const REQUEST_CURRENT_TICK_INFO: u8 = 27;
pub const RESPOND_CURRENT_TICK_INFO: u8 = 28;
pub const REQUEST_TICK_TRANSACTIONS: u8 = 29;
pub const END_RESPONSE: u8 = 35;
pub const REQUEST_TX_STATUS: u8 = 201;
pub const RESPOND_TX_STATUS: u8 = 202;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub header: RequestResponseHeader,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(msg_type: u8, dejavu: u32, payload: Vec<u8>) -> Result<Self> {
        let header = RequestResponseHeader::new(msg_type, payload.len(), dejavu)?;
        Ok(Packet { header, payload })
    }

    pub fn msg_type(&self) -> u8 {
        self.header.msg_type
    }

    pub fn dejavu(&self) -> u32 {
        self.header.dejavu
    }

    pub fn is_end_of_response(&self) -> bool {
        self.header.msg_type == END_RESPONSE
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Request payload carrying a tick number followed by a bitmap of entries
/// the client already holds. An all-zero bitmap asks for everything.
pub fn tick_request_with_flags(tick: u32, flag_bytes: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + flag_bytes);
    payload.extend_from_slice(&tick.to_le_bytes());
    payload.resize(4 + flag_bytes, 0);
    payload
}
