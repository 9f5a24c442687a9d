//! # Strand Core
//!
//! Foundation types for the strand graph synchronization engine:
//!
//! - **Data model**: [`Soul`], [`State`], [`Value`], [`Node`], [`Graph`]
//! - **Messages**: [`Message`] and its short-key wire layout
//! - **Errors**: [`SyncError`], serializable so it can ride inside acks
//! - **Effects**: traits for every collaborator the engine consumes
//! - **Configuration**: [`SyncConfig`]
//!
//! This crate holds no protocol logic; see `strand-sync` for the engine and
//! `strand-effects` for production handlers.

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod graph;
pub mod messages;
pub mod types;

pub use config::SyncConfig;
pub use effects::{
    BusEvent, DedupTracker, EffectSet, EventBus, PendingRegistry, StateEffects, ValueValidator,
};
pub use errors::{Result, SyncError};
pub use graph::Graph;
pub use messages::{ContextId, GetQuery, Message, MessageId, MessageLocal};
pub use types::{Node, NodeMeta, Relation, Soul, State, Value};
