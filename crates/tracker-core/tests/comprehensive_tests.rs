//! # comprehensive replication tests
//!
//! why: verify the host-authoritative replication protocol end to end, without a transport
//! relations: tests tracker-core's replica, message, log, session and keypad modules
//! what: offline ordering, host convergence, bootstrap, idempotence, round-trip, wire validation

use tracker_core::{
    BreachKeypad, EventKind, Intent, LogEntry, LogStore, Message, QuickAction, Replica, Role,
};

fn entry(content: &str) -> LogEntry {
    LogEntry::new(EventKind::Event, content)
}

/// Deliver a host broadcast to a set of client replicas.
fn deliver(broadcast: &Option<Message>, clients: &mut [&mut Replica]) {
    let msg = broadcast.as_ref().expect("host should broadcast");
    for client in clients {
        client.handle_from_host(msg.clone());
    }
}

// =============================================================================
// SECTION 1: OFFLINE STORE SEMANTICS
// =============================================================================

mod offline {
    use super::*;

    #[test]
    fn order_is_reverse_chronological_insertion() {
        let mut replica = Replica::new(Role::Offline);
        for content in ["one", "two", "three"] {
            assert!(replica.handle_intent(Intent::Add(entry(content))).is_none());
        }

        let contents: Vec<_> = replica.logs().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "two", "one"]);
    }

    #[test]
    fn remove_nonexistent_id_is_noop() {
        let mut replica = Replica::new(Role::Offline);
        replica.handle_intent(Intent::Add(entry("keep")));

        replica.handle_intent(Intent::Remove("ghost-id".into()));

        assert_eq!(replica.logs().len(), 1);
        assert_eq!(replica.logs()[0].content, "keep");
    }

    #[test]
    fn interleaved_adds_and_removes_preserve_order() {
        let mut replica = Replica::new(Role::Offline);
        replica.handle_intent(Intent::Add(entry("a")));
        replica.handle_intent(Intent::Add(entry("b")));
        let b_id = replica.logs()[0].id.clone();
        replica.handle_intent(Intent::Add(entry("c")));

        replica.handle_intent(Intent::Remove(b_id));

        let contents: Vec<_> = replica.logs().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["c", "a"]);
    }

    #[test]
    fn store_replace_all_is_wholesale() {
        let mut store = LogStore::new();
        store.add(entry("old"));

        store.replace_all(vec![entry("new1"), entry("new2")]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].content, "new1");
    }
}

// =============================================================================
// SECTION 2: HOST AUTHORITY AND BROADCAST
// =============================================================================

mod host_authority {
    use super::*;

    #[test]
    fn host_intent_mutates_then_broadcasts_snapshot() {
        let mut host = Replica::new(Role::Host);

        let broadcast = host.handle_intent(Intent::Add(entry("alert")));

        assert_eq!(host.logs().len(), 1);
        match broadcast {
            Some(Message::SyncLogs { logs }) => {
                assert_eq!(logs.len(), 1);
                assert_eq!(logs[0].content, "alert");
            }
            other => panic!("expected SyncLogs broadcast, got {other:?}"),
        }
    }

    #[test]
    fn host_applies_client_add_and_rebroadcasts() {
        let mut host = Replica::new(Role::Host);
        let new = entry("from client");

        let broadcast = host.handle_from_client(Message::AddLog { log: new.clone() });

        assert_eq!(host.logs(), [new].as_slice());
        assert!(matches!(broadcast, Some(Message::SyncLogs { .. })));
    }

    #[test]
    fn host_applies_client_remove_and_rebroadcasts() {
        let mut host = Replica::new(Role::Host);
        host.handle_intent(Intent::Add(entry("doomed")));
        let id = host.logs()[0].id.clone();

        let broadcast = host.handle_from_client(Message::RemoveLog { id });

        assert!(host.logs().is_empty());
        match broadcast {
            Some(Message::SyncLogs { logs }) => assert!(logs.is_empty()),
            other => panic!("expected empty SyncLogs, got {other:?}"),
        }
    }

    #[test]
    fn host_ignores_sync_logs_from_client() {
        let mut host = Replica::new(Role::Host);
        host.handle_intent(Intent::Add(entry("authoritative")));

        let broadcast = host.handle_from_client(Message::SyncLogs { logs: vec![] });

        assert!(broadcast.is_none());
        assert_eq!(host.logs().len(), 1, "clients are not authoritative");
    }
}

// =============================================================================
// SECTION 3: CLIENT MIRROR SEMANTICS
// =============================================================================

mod client_mirror {
    use super::*;

    #[test]
    fn client_intent_forwards_without_local_mutation() {
        let mut client = Replica::new(Role::Client);
        let new = entry("pending");

        let outbound = client.handle_intent(Intent::Add(new.clone()));

        assert!(client.logs().is_empty(), "client must wait for the snapshot");
        assert_eq!(outbound, Some(Message::AddLog { log: new }));
    }

    #[test]
    fn client_remove_intent_forwards_id() {
        let mut client = Replica::new(Role::Client);

        let outbound = client.handle_intent(Intent::Remove("abc123".into()));

        assert_eq!(outbound, Some(Message::RemoveLog { id: "abc123".into() }));
    }

    #[test]
    fn sync_replaces_client_state_wholesale() {
        let mut client = Replica::new(Role::Client);
        client.handle_from_host(Message::SyncLogs {
            logs: vec![entry("stale")],
        });

        let fresh = vec![entry("a"), entry("b")];
        let applied = client.handle_from_host(Message::SyncLogs { logs: fresh.clone() });

        assert!(applied);
        assert_eq!(client.logs(), fresh.as_slice());
    }

    #[test]
    fn sync_is_idempotent() {
        let mut client = Replica::new(Role::Client);
        let snapshot = Message::SyncLogs {
            logs: vec![entry("a"), entry("b")],
        };

        client.handle_from_host(snapshot.clone());
        let before = client.logs().to_vec();
        client.handle_from_host(snapshot);

        assert_eq!(client.logs(), before.as_slice());
    }

    #[test]
    fn client_ignores_add_and_remove_from_host() {
        let mut client = Replica::new(Role::Client);

        assert!(!client.handle_from_host(Message::AddLog { log: entry("x") }));
        assert!(!client.handle_from_host(Message::RemoveLog { id: "x".into() }));
        assert!(client.logs().is_empty());
    }
}

// =============================================================================
// SECTION 4: CONVERGENCE AND BOOTSTRAP
// =============================================================================

mod convergence {
    use super::*;

    #[test]
    fn clients_converge_on_interleaved_intents() {
        let mut host = Replica::new(Role::Host);
        let mut client_a = Replica::new(Role::Client);
        let mut client_b = Replica::new(Role::Client);

        // Host adds locally.
        let broadcast = host.handle_intent(Intent::Add(entry("host event")));
        deliver(&broadcast, &mut [&mut client_a, &mut client_b]);

        // Client A originates an add: forwarded to host, applied there,
        // rebroadcast to everyone including A.
        let forwarded = client_a
            .handle_intent(Intent::Add(entry("from a")))
            .expect("client forwards");
        let broadcast = host.handle_from_client(forwarded);
        deliver(&broadcast, &mut [&mut client_a, &mut client_b]);

        // Client B removes the host's entry.
        let host_entry_id = client_b.logs().last().unwrap().id.clone();
        let forwarded = client_b
            .handle_intent(Intent::Remove(host_entry_id))
            .expect("client forwards");
        let broadcast = host.handle_from_client(forwarded);
        deliver(&broadcast, &mut [&mut client_a, &mut client_b]);

        assert_eq!(client_a.logs(), host.logs());
        assert_eq!(client_b.logs(), host.logs());
        assert_eq!(host.logs().len(), 1);
        assert_eq!(host.logs()[0].content, "from a");
    }

    #[test]
    fn late_joiner_bootstraps_from_snapshot() {
        let mut host = Replica::new(Role::Host);
        host.handle_intent(Intent::Add(entry("before join 1")));
        host.handle_intent(Intent::Add(entry("before join 2")));

        // A new peer connection opens: the host sends its snapshot to
        // that connection alone.
        let mut late = Replica::new(Role::Client);
        late.handle_from_host(host.snapshot());

        assert_eq!(late.logs(), host.logs());
        assert_eq!(late.logs().len(), 2);
    }

    #[test]
    fn skipped_intermediate_snapshots_still_converge() {
        let mut host = Replica::new(Role::Host);
        let mut client = Replica::new(Role::Client);

        // Three mutations, but the client only observes the final
        // snapshot. Each snapshot is complete, not a delta.
        host.handle_intent(Intent::Add(entry("one")));
        host.handle_intent(Intent::Add(entry("two")));
        let last = host.handle_intent(Intent::Add(entry("three")));

        deliver(&last, &mut [&mut client]);

        assert_eq!(client.logs(), host.logs());
        assert_eq!(client.logs().len(), 3);
    }

    #[test]
    fn breach_then_remote_remove_scenario() {
        // The scenario from the protocol description: host logs a
        // breach, client mirrors it, client dismisses it remotely.
        let mut host = Replica::new(Role::Host);
        let mut client = Replica::new(Role::Client);

        let broadcast = host.handle_intent(Intent::Add(LogEntry::new(
            EventKind::Breach,
            "SCP-049 BREACH",
        )));
        deliver(&broadcast, &mut [&mut client]);

        assert_eq!(client.logs().len(), 1);
        assert_eq!(client.logs()[0].content, "SCP-049 BREACH");
        assert_eq!(client.logs()[0].kind, EventKind::Breach);

        let id = client.logs()[0].id.clone();
        let forwarded = client.handle_intent(Intent::Remove(id)).unwrap();
        let broadcast = host.handle_from_client(forwarded);
        deliver(&broadcast, &mut [&mut client]);

        assert!(host.logs().is_empty());
        assert!(client.logs().is_empty());
    }
}

// =============================================================================
// SECTION 5: WIRE FORMAT
// =============================================================================

mod wire_format {
    use super::*;

    #[test]
    fn log_entry_round_trip_preserves_all_fields() {
        let original = LogEntry::new(EventKind::Breach, "SCP-173 BREACH");
        let msg = Message::AddLog {
            log: original.clone(),
        };

        let decoded = Message::decode(&msg.encode().unwrap()).unwrap();

        match decoded {
            Message::AddLog { log } => {
                assert_eq!(log.id, original.id);
                assert_eq!(log.kind, original.kind);
                assert_eq!(log.content, original.content);
                assert_eq!(log.timestamp, original.timestamp);
            }
            other => panic!("expected AddLog, got {other:?}"),
        }
    }

    #[test]
    fn timestamp_serializes_as_iso8601_string() {
        let msg = Message::AddLog {
            log: LogEntry::new(EventKind::Event, "x"),
        };
        let value: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();

        let ts = value["log"]["timestamp"]
            .as_str()
            .expect("timestamp must be a string");
        assert!(ts.contains('T'), "not ISO-8601: {ts}");
    }

    #[test]
    fn kind_serializes_lowercase() {
        let msg = Message::SyncLogs {
            logs: vec![LogEntry::new(EventKind::Breach, "x")],
        };
        let json = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert!(json.contains(r#""kind":"breach""#));
    }

    #[test]
    fn sync_logs_round_trip() {
        let msg = Message::SyncLogs {
            logs: vec![entry("a"), entry("b")],
        };
        let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for bad in [
            &b"not json at all"[..],
            br#"{"type":"SYNC_LOGS"}"#,                    // missing logs
            br#"{"type":"ADD_LOG","log":{"id":"x"}}"#,     // incomplete entry
            br#"{"type":"UNKNOWN","data":1}"#,             // unknown tag
            br#"{"logs":[]}"#,                             // missing tag
        ] {
            assert!(
                Message::decode(bad).is_err(),
                "should reject {:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }
}

// =============================================================================
// SECTION 6: BREACH KEYPAD AND QUICK ACTIONS
// =============================================================================

mod breach_console {
    use super::*;

    #[test]
    fn keypad_emits_one_intent_per_three_digits() {
        let mut keypad = BreachKeypad::new();
        let mut replica = Replica::new(Role::Offline);

        for digit in [6u8, 8, 2, 0, 4, 9] {
            if let Some(breach) = keypad.press(digit) {
                replica.handle_intent(Intent::Add(breach));
            }
        }

        let contents: Vec<_> = replica.logs().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["SCP-049 BREACH", "SCP-682 BREACH"]);
    }

    #[test]
    fn keypad_buffer_survives_partial_entry() {
        let mut keypad = BreachKeypad::new();
        keypad.press(1);
        keypad.press(7);
        assert_eq!(keypad.display(), "17_");

        keypad.clear();
        assert_eq!(keypad.display(), "___");
    }

    #[test]
    fn quick_action_contents_are_canned() {
        assert_eq!(QuickAction::ClassDRiot.content(), "CLASS D RIOT IN PROGRESS");
        assert_eq!(QuickAction::ClassDEscape.content(), "CLASS D ESCAPE ATTEMPT");
        assert_eq!(
            QuickAction::ChaosInsurgency.content(),
            "CHAOS INSURGENCY DETECTED"
        );
    }
}

// =============================================================================
// SECTION 7: SESSION CODES
// =============================================================================

mod session_codes {
    use tracker_core::session::{generate_code, is_valid_code, rendezvous_id, CODE_LEN};
    use tracker_core::{Role, Session};

    #[test]
    fn codes_have_fixed_length_and_alphabet() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(is_valid_code(&code));
            assert!(!code.contains(['I', 'O', '0', '1']));
        }
    }

    #[test]
    fn rendezvous_is_deterministic() {
        assert_eq!(rendezvous_id("AAAAAA"), rendezvous_id("AAAAAA"));
        assert_ne!(rendezvous_id("AAAAAA"), rendezvous_id("BBBBBB"));
    }

    #[test]
    fn session_constructors_fix_role_and_code() {
        assert_eq!(Session::offline().role, Role::Offline);
        let host = Session::host("K7MX2Q");
        assert_eq!(host.role, Role::Host);
        assert_eq!(host.code.as_deref(), Some("K7MX2Q"));
        assert_eq!(Session::client("K7MX2Q").role, Role::Client);
    }
}
