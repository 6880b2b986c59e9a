//! # session
//!
//! why: pair a role with the shareable code that rendezvouses a client with its host
//! relations: consumed by tracker-net to key the host endpoint, by console for mode selection
//! what: code generation/validation, rendezvous identifier derivation, Session

use rand::Rng;

use crate::replica::Role;

/// Length of a session code.
pub const CODE_LEN: usize = 6;

/// Code alphabet: uppercase letters minus the ambiguous I and O, and
/// digits 2-9 (0 and 1 read like O and I).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Fixed prefix of every rendezvous identifier.
const RENDEZVOUS_PREFIX: &str = "scp-tracker-";

/// Generate a fresh 6-character session code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Whether a user-supplied code has the expected shape.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Derive the rendezvous identifier the transport uses to locate the
/// host, e.g. `scp-tracker-K7MX2Q`. Deterministic: both ends compute
/// it independently from the shared code.
pub fn rendezvous_id(code: &str) -> String {
    format!("{RENDEZVOUS_PREFIX}{code}")
}

/// A role plus the shared code (present for host/client only).
/// Created when the user selects a mode; fixed afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    pub code: Option<String>,
}

impl Session {
    pub fn offline() -> Self {
        Self {
            role: Role::Offline,
            code: None,
        }
    }

    pub fn host(code: impl Into<String>) -> Self {
        Self {
            role: Role::Host,
            code: Some(code.into()),
        }
    }

    pub fn client(code: impl Into<String>) -> Self {
        Self {
            role: Role::Client,
            code: Some(code.into()),
        }
    }

    /// The rendezvous identifier, when the session is networked.
    pub fn rendezvous(&self) -> Option<String> {
        self.code.as_deref().map(rendezvous_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..100 {
            let code = generate_code();
            assert!(is_valid_code(&code), "bad code: {code}");
        }
    }

    #[test]
    fn ambiguous_characters_are_rejected() {
        assert!(!is_valid_code("ABCDI2")); // I
        assert!(!is_valid_code("ABCDO2")); // O
        assert!(!is_valid_code("ABCD12")); // 1
        assert!(!is_valid_code("ABCD02")); // 0
        assert!(!is_valid_code("ABC2")); // too short
        assert!(is_valid_code("K7MX2Q"));
    }

    #[test]
    fn rendezvous_has_fixed_prefix() {
        assert_eq!(rendezvous_id("K7MX2Q"), "scp-tracker-K7MX2Q");
        assert_eq!(Session::host("K7MX2Q").rendezvous().unwrap(), "scp-tracker-K7MX2Q");
        assert_eq!(Session::offline().rendezvous(), None);
    }
}
