//! Settlement of write batches from storage acknowledgments.

mod common;

use assert_matches::assert_matches;
use common::{write, Harness};
use std::sync::{Arc, Mutex};
use strand_core::{BusEvent, Message, MessageId, Node, SyncError};
use strand_sync::{DispatchOutcome, PutOptions, TurnReport};
use strand_testkit::fixtures::graph_of;

fn three_fields() -> strand_core::Graph {
    graph_of([Node::new("A")
        .with("x", 1.0, 10.0)
        .with("y", 2.0, 10.0)
        .with("z", 3.0, 10.0)])
}

fn field_ids(h: &Harness) -> Vec<MessageId> {
    h.effects
        .bus
        .of(BusEvent::Put)
        .into_iter()
        .filter_map(|msg| msg.id)
        .collect()
}

#[test]
fn test_settles_once_after_every_field_is_acked() {
    let mut h = Harness::new();
    let batch = h.engine.put(three_fields());
    let fields = field_ids(&h);
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], batch.child(0));

    for field in &fields[..2] {
        let outcome = h.engine.ingest(Message::ack(field.clone(), None, Some(1)));
        assert_eq!(outcome, DispatchOutcome::Acknowledged);
        assert!(h.acks_for(&batch).is_empty());
    }

    h.engine.ingest(Message::ack(fields[2].clone(), None, Some(1)));
    assert_eq!(h.acks_for(&batch).len(), 1);

    // A repeated confirmation under a new id does not settle again.
    h.engine.ingest(Message::ack(fields[2].clone(), None, Some(1)));
    h.engine.run_until_idle();
    assert_eq!(
        h.acks_for(&batch).iter().filter(|ack| ack.ok.is_some()).count(),
        2,
        "one settlement plus the late confirmation traced back to its batch"
    );
    assert_eq!(h.engine.context_count(), 0);
}

#[test]
fn test_success_marker_is_carried_to_settlement() {
    let mut h = Harness::new();
    let batch = h.engine.put(write("A", "x", 1.0, 10.0));
    let fields = field_ids(&h);
    h.engine.ingest(Message::ack(fields[0].clone(), None, Some(3)));
    let acks = h.acks_for(&batch);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].ok, Some(3));
}

#[test]
fn test_first_storage_error_fails_fast() {
    let mut h = Harness::new();
    let batch = h.engine.put(three_fields());
    let fields = field_ids(&h);

    h.engine.ingest(Message::ack(
        fields[1].clone(),
        Some(SyncError::remote_ack("disk full")),
        None,
    ));
    let acks = h.acks_for(&batch);
    // The failing sub-ack is re-addressed to the batch, then the batch settles.
    assert_eq!(acks.len(), 2);
    for ack in &acks {
        assert_matches!(ack.err, Some(SyncError::RemoteAck { .. }));
        assert!(ack.ok.is_none());
    }
    assert_eq!(h.engine.context_count(), 0);

    // Later errors and confirmations never produce a second settlement.
    h.engine.ingest(Message::ack(
        fields[0].clone(),
        Some(SyncError::remote_ack("second")),
        None,
    ));
    h.engine.ingest(Message::ack(fields[2].clone(), None, Some(1)));
    let errors: Vec<_> = h
        .acks_for(&batch)
        .into_iter()
        .filter_map(|ack| ack.err)
        .collect();
    assert_eq!(errors[0], SyncError::remote_ack("disk full"));
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_storage_failure_through_adapter() {
    let mut h = Harness::new();
    h.store.fail_writes("read-only");
    let batch = h.engine.put(write("A", "x", 1.0, 10.0));
    h.settle();
    let acks = h.acks_for(&batch);
    assert!(!acks.is_empty());
    assert!(acks.iter().all(|ack| ack.err.is_some()));
    // Nothing is rolled back.
    assert!(h.value("A", "x").is_some());
}

#[test]
fn test_requester_receives_settlement() {
    let mut h = Harness::new();
    h.effects.pending.await_reply("local-1");
    let msg = Message::put(write("A", "x", 1.0, 10.0)).with_id("local-1");
    h.engine.ingest(msg);
    h.settle();

    let replies = h.effects.pending.replies(&MessageId::new("local-1"));
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].ok, Some(1));
    // Delivery does not stop the settlement reaching chain consumers.
    assert_eq!(h.acks_for(&MessageId::new("local-1")).len(), 1);

    // Once released, later acks for the request are no longer delivered.
    h.effects.pending.release(&MessageId::new("local-1"));
    let late = Message::ack(MessageId::new("local-1"), None, Some(1));
    assert_eq!(h.engine.ingest(late), DispatchOutcome::Acknowledged);
    assert_eq!(h.effects.pending.replies(&MessageId::new("local-1")).len(), 1);
}

#[test]
fn test_turn_hook_runs_once() {
    let mut h = Harness::new();
    let reports: Arc<Mutex<Vec<TurnReport>>> = Arc::default();
    let sink = reports.clone();
    let batch = h.engine.put_with(
        three_fields(),
        PutOptions {
            hook: Some(Box::new(move |report| sink.lock().unwrap().push(report))),
            ..PutOptions::default()
        },
    );
    h.settle();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].batch, batch);
    assert_eq!(reports[0].accepted, 3);
    assert!(reports[0].err.is_none());
}

#[test]
fn test_unknown_ack_is_relayed() {
    let mut h = Harness::new();
    let ack = Message::ack(MessageId::new("elsewhere"), None, Some(1)).with_id("a1");
    assert_eq!(h.engine.ingest(ack), DispatchOutcome::Acknowledged);
    let out = h.outbound();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ack_of, Some(MessageId::new("elsewhere")));
}
