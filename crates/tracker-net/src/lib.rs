//! # tracker-net
//!
//! why: carry the replication protocol over real sockets between one host and its clients
//! relations: drives tracker-core's Replica from a single event loop; consumed by console
//! what: length-prefixed JSON framing, rendezvous handshake, host/client endpoints, SessionHandle
//!
//! One task owns the [`Replica`](tracker_core::Replica) per session.
//! Peer readers, writers and the intent API talk to it over channels
//! only, so every mutation of the log store is serialized through a
//! single queue and broadcasts are strictly ordered.

mod client;
mod codec;
mod error;
mod handle;
mod host;

pub use error::NetError;
pub use handle::{SessionEvent, SessionHandle};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// First port of the range rendezvous identifiers map into.
const PORT_BASE: u16 = 47000;
/// Size of the rendezvous port range.
const PORT_SPAN: u16 = 4096;

/// Derive the host's listening port from a rendezvous identifier.
///
/// Deterministic FNV-1a fold into a fixed range, so a host and a
/// client holding the same session code compute the same port without
/// any signaling service.
pub fn rendezvous_port(rendezvous: &str) -> u16 {
    PORT_BASE + (fnv1a(rendezvous.as_bytes()) % PORT_SPAN as u64) as u16
}

/// Default socket address for a rendezvous identifier (loopback).
///
/// LAN sessions pass an explicit address instead.
pub fn rendezvous_addr(rendezvous: &str) -> SocketAddr {
    SocketAddr::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        rendezvous_port(rendezvous),
    )
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_deterministic_and_in_range() {
        let a = rendezvous_port("scp-tracker-K7MX2Q");
        let b = rendezvous_port("scp-tracker-K7MX2Q");
        assert_eq!(a, b);
        assert!(a >= PORT_BASE);
        assert!(a < PORT_BASE + PORT_SPAN);
    }

    #[test]
    fn different_codes_usually_get_different_ports() {
        let a = rendezvous_port("scp-tracker-AAAAAA");
        let b = rendezvous_port("scp-tracker-ZZZZZZ");
        assert_ne!(a, b);
    }
}
