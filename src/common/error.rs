//! Error taxonomy for the verification client.
//!
//! Emptiness ("tick not produced yet") and not-yet-finalized lookups are not
//! errors; they are variants of the results that produce them. Failed
//! signature checks are normally carried as an `Integrity` tag on the value
//! (see `common::checked`) and only become `Error::Integrity` where the
//! operation cannot continue without a verified input.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure while talking to a node. Never retried internally.
    #[error("connectivity failure: {0}")]
    Connectivity(#[source] std::io::Error),

    /// Local file access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A signature did not verify where a verified input is mandatory.
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// The peer broke the wire protocol. The connection must be dropped.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A record or file had the wrong length.
    #[error("malformed {what}: needed {expected} bytes, got {actual}")]
    Malformed {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// A tick archive lacks the record for one of the header's digests.
    #[error("incomplete tick archive: no transaction for digest {0}")]
    IncompleteArchive(String),
}

pub type Result<T> = std::result::Result<T, Error>;
