//! End-to-end merge scenarios on a single replica.

mod common;

use common::{write, Harness};
use strand_core::{BusEvent, GetQuery, Graph, Message, MessageId, Node, Soul, SyncError, Value};
use strand_sync::{DispatchOutcome, PutOptions};
use strand_testkit::fixtures::{graph_of, node_without_states};
use strand_testkit::LoopbackStore;

#[test]
fn test_first_write_creates_node_and_settles() {
    let mut h = Harness::new();
    let batch = h.engine.put(write("A", "name", "Alice", 10.0));

    assert_eq!(h.value("A", "name"), Some(Value::from("Alice")));
    assert_eq!(h.state("A", "name"), 10.0);
    // Storage has not confirmed the field yet.
    assert!(h.acks_for(&batch).is_empty());
    assert!(h
        .outbound()
        .iter()
        .any(|msg| msg.id.as_ref() == Some(&batch) && msg.put.is_some()));

    h.settle();
    let acks = h.acks_for(&batch);
    assert_eq!(acks.len(), 1);
    assert!(acks[0].err.is_none());
    assert_eq!(acks[0].ok, Some(1));
    assert_eq!(h.engine.context_count(), 0);
}

#[test]
fn test_older_write_is_discarded() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "Alice", 10.0));
    h.settle();

    let stale = h.engine.put(write("A", "name", "Alicia", 5.0));
    assert_eq!(h.value("A", "name"), Some(Value::from("Alice")));
    assert_eq!(h.state("A", "name"), 10.0);
    assert_eq!(h.effects.bus.count(BusEvent::Put), 0);
    // Nothing was accepted, so the batch settles without storage.
    let acks = h.acks_for(&stale);
    assert_eq!(acks.len(), 1);
    assert!(acks[0].err.is_none());
}

#[test]
fn test_redelivered_message_is_dropped() {
    let mut h = Harness::new();
    let msg = Message::put(write("A", "name", "Alice", 10.0)).with_id("peer-1");
    assert_eq!(h.engine.ingest(msg.clone()), DispatchOutcome::Write);
    assert_eq!(h.engine.ingest(msg), DispatchOutcome::Duplicate);
    assert_eq!(h.effects.bus.count(BusEvent::Put), 1);
}

#[test]
fn test_equal_state_tie_goes_to_greater_serialization() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "Alice", 10.0));
    h.engine.put(write("A", "name", "Alicia", 10.0));
    assert_eq!(h.value("A", "name"), Some(Value::from("Alicia")));

    // The loser of the tie-break never overwrites the winner.
    h.engine.put(write("A", "name", "Alice", 10.0));
    assert_eq!(h.value("A", "name"), Some(Value::from("Alicia")));
    assert_eq!(h.state("A", "name"), 10.0);
}

#[test]
fn test_field_read_answers_locally_and_forwards() {
    let mut h = Harness::new();
    h.engine.put(graph_of([Node::new("A")
        .with("name", "Alicia", 10.0)
        .with("age", 30.0, 11.0)]));
    h.settle();

    h.effects.pending.await_reply("q1");
    let query = Message::get(GetQuery::field("A", "name")).with_id("q1");
    assert_eq!(h.engine.ingest(query), DispatchOutcome::Read);

    let replies = h.effects.pending.replies(&MessageId::new("q1"));
    assert_eq!(replies.len(), 1);
    let reply = replies[0].put.as_ref().unwrap();
    let node = reply.get(&Soul::new("A")).unwrap();
    assert_eq!(node.len(), 1);
    assert_eq!(node.get("name"), Some(&Value::from("Alicia")));
    assert_eq!(node.state_of("name").as_f64(), 10.0);

    let forwarded = h.effects.bus.of(BusEvent::Get);
    assert!(forwarded
        .iter()
        .any(|msg| msg.id == Some(MessageId::new("q1"))));
}

#[test]
fn test_read_of_unknown_soul_only_forwards() {
    let mut h = Harness::new();
    h.effects.pending.await_reply("q1");
    h.engine
        .ingest(Message::get(GetQuery::node("nobody")).with_id("q1"));
    assert!(h.effects.pending.replies(&MessageId::new("q1")).is_empty());
    assert_eq!(h.effects.bus.count(BusEvent::Get), 1);
}

#[test]
fn test_read_missed_locally_is_answered_by_storage() {
    let mut h = Harness::new();
    h.store = LoopbackStore::with_graph(write("B", "name", "Bea", 3.0));
    h.effects.pending.await_reply("q1");
    h.engine
        .ingest(Message::get(GetQuery::field("B", "name")).with_id("q1"));
    assert!(h.effects.pending.replies(&MessageId::new("q1")).is_empty());

    h.pump();
    let replies = h.effects.pending.replies(&MessageId::new("q1"));
    assert_eq!(replies.len(), 1);
    let node = replies[0]
        .put
        .as_ref()
        .and_then(|graph| graph.get(&Soul::new("B")))
        .unwrap();
    assert_eq!(node.get("name"), Some(&Value::from("Bea")));
    // Delivered to the requester, not merged.
    assert!(h.value("B", "name").is_none());
}

#[test]
fn test_read_of_absent_field_only_forwards() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "Alice", 10.0));
    h.effects.pending.await_reply("q1");
    h.engine
        .ingest(Message::get(GetQuery::field("A", "email")).with_id("q1"));
    assert!(h.effects.pending.replies(&MessageId::new("q1")).is_empty());
    assert_eq!(h.effects.bus.count(BusEvent::Get), 1);
}

#[test]
fn test_arrival_order_does_not_matter() {
    let name = write("A", "name", "Alice", 10.0);
    let age = write("A", "age", 30.0, 20.0);

    let mut forward = Harness::new();
    forward.engine.put(name.clone());
    forward.engine.put(age.clone());

    let mut reverse = Harness::new();
    reverse.engine.put(age);
    reverse.engine.put(name);

    assert_eq!(forward.engine.graph(), reverse.engine.graph());
    assert_eq!(forward.value("A", "age"), Some(Value::from(30.0)));
    assert_eq!(forward.state("A", "name"), 10.0);
}

#[test]
fn test_malformed_soul_keeps_earlier_commits_and_fails_batch() {
    let mut h = Harness::new();
    let batch: Graph = [
        (Soul::new("A"), Node::new("A").with("name", "Alice", 10.0)),
        (Soul::new("B"), node_without_states("B", "name", "Bob")),
    ]
    .into_iter()
    .collect();
    let id = h.engine.put(batch);

    assert_eq!(h.value("A", "name"), Some(Value::from("Alice")));
    assert!(h.value("B", "name").is_none());

    let acks = h.acks_for(&id);
    assert_eq!(acks.len(), 1);
    assert!(matches!(acks[0].err, Some(SyncError::Validation { .. })));
    assert!(acks[0].ok.is_none());
    // A failed batch is never rebroadcast.
    assert!(!h
        .outbound()
        .iter()
        .any(|msg| msg.id.as_ref() == Some(&id) && msg.put.is_some()));

    // Storage still confirms the committed field; that does not settle again.
    h.settle();
    assert!(h.acks_for(&id).iter().all(|ack| ack.err.is_some() || ack.ok.is_some()));
    assert_eq!(
        h.acks_for(&id).iter().filter(|ack| ack.err.is_some()).count(),
        1
    );
}

#[test]
fn test_invalid_value_fails_batch() {
    let mut h = Harness::new();
    let id = h.engine.put(write("A", "score", f64::NAN, 10.0));
    assert!(h.value("A", "score").is_none());
    let acks = h.acks_for(&id);
    assert_eq!(acks.len(), 1);
    assert!(matches!(acks[0].err, Some(SyncError::Validation { .. })));
}

#[test]
fn test_relations_are_stored() {
    let mut h = Harness::new();
    h.engine
        .put(write("users/alice", "friend", Value::relation("users/bob"), 10.0));
    let stored = h.value("users/alice", "friend").unwrap();
    assert_eq!(stored.as_relation(), Some(&Soul::new("users/bob")));
}

#[test]
fn test_peer_batch_is_rebroadcast_with_its_id() {
    let mut h = Harness::new();
    let msg = Message::put(write("A", "name", "Alice", 10.0)).with_id("peer-7");
    h.engine.ingest(msg);
    let out: Vec<_> = h
        .outbound()
        .into_iter()
        .filter(|msg| msg.id == Some(MessageId::new("peer-7")))
        .collect();
    assert_eq!(out.len(), 1);
    assert!(out[0].local.outward);
}

#[test]
fn test_no_spread_messages_are_not_relayed() {
    let mut h = Harness::new();
    let mut msg = Message::put(write("A", "name", "Alice", 10.0)).with_id("quiet");
    msg.nts = true;
    h.engine.ingest(msg);
    assert_eq!(h.value("A", "name"), Some(Value::from("Alice")));
    assert!(!h
        .outbound()
        .iter()
        .any(|msg| msg.id == Some(MessageId::new("quiet"))));
}

#[test]
fn test_echo_of_own_broadcast_is_not_reprocessed() {
    let mut h = Harness::new();
    let mut msg = Message::put(write("A", "name", "Alice", 10.0)).with_id("echo");
    msg.local.outward = true;
    assert_eq!(h.engine.ingest(msg), DispatchOutcome::Echo);
    assert!(h.value("A", "name").is_none());
    assert_eq!(h.effects.bus.count(BusEvent::In), 1);
}

fn forced() -> PutOptions {
    PutOptions {
        miss: true,
        ..PutOptions::default()
    }
}

#[test]
fn test_forced_older_write_is_announced_but_not_merged() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "Bob", 10.0));
    h.settle();
    let mut feed = h.engine.subscribe("A".into());
    h.effects.bus.clear();

    let batch = h
        .engine
        .put_with(write("A", "name", "Alice", 5.0), forced());

    let announced = h.effects.bus.of(BusEvent::Put);
    assert_eq!(announced.len(), 1);
    let field = announced[0]
        .put
        .as_ref()
        .and_then(|graph| graph.get(&Soul::new("A")))
        .and_then(|node| node.get("name"))
        .cloned();
    assert_eq!(field, Some(Value::from("Alice")));
    assert!(feed.try_recv().is_ok());

    assert_eq!(h.value("A", "name"), Some(Value::from("Bob")));
    assert_eq!(h.state("A", "name"), 10.0);

    h.settle();
    let acks = h.acks_for(&batch);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].ok, Some(1));
}

#[test]
fn test_forced_write_at_equal_state_replaces_the_tie_winner() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "b", 10.0));
    h.settle();
    h.effects.bus.clear();

    // Without the flag the lexically smaller value loses the tie.
    h.engine.put(write("A", "name", "a", 10.0));
    assert_eq!(h.effects.bus.count(BusEvent::Put), 0);

    let batch = h.engine.put_with(write("A", "name", "a", 10.0), forced());
    assert_eq!(h.effects.bus.count(BusEvent::Put), 1);
    assert_eq!(h.value("A", "name"), Some(Value::from("a")));

    h.settle();
    assert_eq!(h.acks_for(&batch).len(), 1);
}

#[test]
fn test_forced_reply_is_committed_instead_of_relayed() {
    let mut h = Harness::new();
    h.engine.put(write("A", "name", "Bob", 10.0));
    h.settle();
    h.effects.bus.clear();

    let reply = |id: &str, miss: bool| {
        let mut msg = Message::put(write("A", "name", "Alice", 5.0))
            .with_id(id)
            .in_reply_to(MessageId::new("q9"));
        msg.local.faith = true;
        msg.local.miss = miss;
        msg
    };

    assert_eq!(h.engine.ingest(reply("r0", false)), DispatchOutcome::Write);
    assert_eq!(h.effects.bus.count(BusEvent::Put), 0);
    assert!(h
        .outbound()
        .iter()
        .any(|msg| msg.id == Some(MessageId::new("r0"))));
    assert_eq!(h.engine.context_count(), 0);

    assert_eq!(h.engine.ingest(reply("r1", true)), DispatchOutcome::Write);
    assert_eq!(h.effects.bus.count(BusEvent::Put), 1);
    assert_eq!(h.value("A", "name"), Some(Value::from("Bob")));

    h.settle();
    assert_eq!(h.acks_for(&MessageId::new("r1")).len(), 1);
}
