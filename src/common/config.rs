use std::time::Duration;

use super::crypto::Pubkey;

pub const DEFAULT_NODE_PORT: u16 = 21841;
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Per-run settings, built once and passed to every operation that needs
/// them. Nothing in the crate reads configuration from anywhere else.
#[derive(Clone, Debug)]
pub struct Context {
    pub node_ip: String,
    pub node_port: u16,
    pub receive_timeout: Duration,
    /// Key that signs each epoch's computor list.
    pub trust_anchor: Option<Pubkey>,
}

impl Context {
    pub fn new(node_ip: impl Into<String>) -> Self {
        Context {
            node_ip: node_ip.into(),
            node_port: DEFAULT_NODE_PORT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            trust_anchor: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.node_port = port;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_trust_anchor(mut self, anchor: Pubkey) -> Self {
        self.trust_anchor = Some(anchor);
        self
    }

    pub fn node_address(&self) -> String {
        format!("{}:{}", self.node_ip, self.node_port)
    }
}
