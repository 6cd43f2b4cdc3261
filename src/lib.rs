/*
    A light client for a tick-based network run by 676 computors. Every
    tick each computor signs a vote describing the state it reached; a
    tick's outcome is whatever at least 451 of them agree on. This crate
    fetches votes, tick headers and transactions from a single node and
    checks them itself instead of trusting that node: signatures against
    the epoch's computor list, the quorum threshold, and the salted
    digests that tie each vote to the real outcome revealed one tick
    later.
*/

pub mod commands;
pub mod common;
pub mod consensus;
pub mod network;
pub mod tick;
