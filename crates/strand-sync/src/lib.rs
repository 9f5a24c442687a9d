//! # Strand Sync - merge, acknowledge, rebroadcast
//!
//! The synchronization core of a peer-replicated graph store. Messages enter
//! through [`Engine::ingest`], are de-duplicated, and routed:
//!
//! - **Writes** go to the batch committer, which checks every soul entry and
//!   runs each field through the [`ham`] rule before committing it to the
//!   local [`Graph`](strand_core::Graph)
//! - **Reads** go to the query responder, which answers from the local graph
//!   in slices and always forwards the query to storage adapters
//! - **Acknowledgments** go to the ack aggregator, which settles each write
//!   batch exactly once with success or its first error
//!
//! ## Design Principles
//!
//! - **Single owner**: the [`Engine`] owns the graph and every merge context;
//!   [`SyncRuntime`] wraps it in one tokio task and serializes access over a
//!   channel
//! - **Cooperative slicing**: wide writes and reads are processed a bounded
//!   number of fields per [`Engine::tick`]
//! - **Errors as data**: failures are recorded on the batch and surface only in
//!   its terminal acknowledgment; committed fields are never rolled back

#![forbid(unsafe_code)]

mod ack;
mod context;
mod engine;
mod fire;
mod get;
pub mod ham;
mod put;
pub mod runtime;
mod scheduler;
mod universe;
pub mod wire;

pub use context::{SettleCallback, TurnHook, TurnReport};
pub use engine::{Engine, PutOptions};
pub use ham::HamDecision;
pub use runtime::{PendingReply, RuntimeHandle, SyncRuntime};
pub use universe::DispatchOutcome;
