pub mod connection;
pub mod header;
#[cfg(test)]
pub mod mock;
pub mod packet;
pub mod wait;

pub use connection::{drain_response, next_response, send_request, TcpConnection, Transport};
pub use header::RequestResponseHeader;
pub use packet::Packet;
pub use wait::{FixedInterval, NoWait, WaitStrategy};

/*
    Nodes speak a request/response protocol over plain TCP. Every message
    starts with an 8-byte header; requests carry a random non-zero dejavu
    which the node echoes on every packet of its answer, and an
    END_RESPONSE packet closes answers that span several packets.
    Broadcasts use a zero dejavu and are ignored by this client.
*/
