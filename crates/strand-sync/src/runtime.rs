//! Tokio actor owning an [`Engine`].
//!
//! The engine is single-owner by construction; the runtime keeps it that way
//! across threads by living in one task and taking commands over a bounded
//! channel. Between ticks it yields so one wide batch cannot starve the other
//! tasks on the executor, and when idle it sleeps until the next timer.

use crate::engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use strand_core::{GetQuery, Graph, Message, MessageId, Result, Soul, SyncConfig, SyncError};
use strand_effects::{BusDelivery, PendingRequests, ProductionEffects};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedReceiver};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Commands accepted by the runtime loop
#[derive(Debug)]
enum Command {
    Ingest(Message),
    Snapshot(oneshot::Sender<Graph>),
    Subscribe {
        soul: Soul,
        reply: oneshot::Sender<UnboundedReceiver<Message>>,
    },
    Shutdown,
}

/// Replies to one local request
#[derive(Debug)]
pub struct PendingReply {
    /// Id of the request; every reply acknowledges it
    pub id: MessageId,
    replies: UnboundedReceiver<Message>,
    pending: Arc<PendingRequests>,
}

impl PendingReply {
    /// Next reply of any kind
    pub async fn next(&mut self) -> Option<Message> {
        self.replies.recv().await
    }

    /// Next pure acknowledgment, which for a write is its settlement
    pub async fn settled(&mut self) -> Option<Message> {
        while let Some(msg) = self.replies.recv().await {
            if msg.is_ack() {
                return Some(msg);
            }
        }
        None
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.pending.cancel(&self.id);
    }
}

/// Cloneable handle to a running [`SyncRuntime`]
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: Sender<Command>,
    pending: Arc<PendingRequests>,
    id_length: usize,
}

impl RuntimeHandle {
    /// Feed a message from a transport or storage adapter
    pub async fn ingest(&self, msg: Message) -> Result<()> {
        self.send(Command::Ingest(msg)).await
    }

    /// Write a partial graph and await its settlement through the reply
    pub async fn put(&self, graph: Graph) -> Result<PendingReply> {
        let id = self.fresh_id();
        let reply = self.register(id.clone());
        self.send(Command::Ingest(Message::put(graph).with_id(id))).await?;
        Ok(reply)
    }

    /// Read a node or field; replies arrive on the returned handle
    pub async fn get(&self, query: GetQuery) -> Result<PendingReply> {
        let id = self.fresh_id();
        let reply = self.register(id.clone());
        self.send(Command::Ingest(Message::get(query).with_id(id))).await?;
        Ok(reply)
    }

    /// Copy of the local replica
    pub async fn snapshot(&self) -> Result<Graph> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Receive every field committed to `soul`
    pub async fn subscribe(&self, soul: Soul) -> Result<UnboundedReceiver<Message>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Subscribe { soul, reply: tx }).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Stop the runtime loop
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| stopped())
    }

    fn register(&self, id: MessageId) -> PendingReply {
        PendingReply {
            replies: self.pending.register(id.clone()),
            id,
            pending: self.pending.clone(),
        }
    }

    fn fresh_id(&self) -> MessageId {
        MessageId::random(&mut rand::thread_rng(), self.id_length)
    }
}

fn stopped() -> SyncError {
    SyncError::internal("sync runtime stopped")
}

/// Task owning the engine
#[derive(Debug)]
pub struct SyncRuntime {
    engine: Engine,
    commands: Receiver<Command>,
}

impl SyncRuntime {
    /// Runtime over production handlers.
    ///
    /// Returns the runtime, its handle, and a receiver of every bus event for
    /// transport and storage adapters.
    pub fn new(config: SyncConfig) -> Result<(Self, RuntimeHandle, UnboundedReceiver<BusDelivery>)> {
        config.validate()?;
        let (effects, events) = ProductionEffects::new(&config);
        let (runtime, handle) = Self::with_effects(config, &effects);
        Ok((runtime, handle, events))
    }

    /// Runtime over already-built production handlers
    pub fn with_effects(config: SyncConfig, effects: &ProductionEffects) -> (Self, RuntimeHandle) {
        let (tx, rx) = mpsc::channel(config.inbox_capacity);
        let handle = RuntimeHandle {
            commands: tx,
            pending: effects.pending.clone(),
            id_length: config.id_length,
        };
        let engine = Engine::new(config, effects.effect_set());
        (
            Self {
                engine,
                commands: rx,
            },
            handle,
        )
    }

    /// Spawn the loop on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands and scheduled work until shut down or every handle
    /// is dropped
    pub async fn run(mut self) {
        tracing::info!("sync runtime started");
        loop {
            loop {
                match self.commands.try_recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return self.stop();
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return self.stop(),
                }
            }

            if self.engine.tick() > 0 {
                tokio::task::yield_now().await;
                continue;
            }

            match self.engine.idle_for() {
                Some(wait) => {
                    tokio::select! {
                        command = self.commands.recv() => match command {
                            Some(command) => {
                                if !self.handle(command) {
                                    return self.stop();
                                }
                            }
                            None => return self.stop(),
                        },
                        _ = tokio::time::sleep(wait.max(Duration::from_millis(1))) => {}
                    }
                }
                None => match self.commands.recv().await {
                    Some(command) => {
                        if !self.handle(command) {
                            return self.stop();
                        }
                    }
                    None => return self.stop(),
                },
            }
        }
    }

    /// Apply one command; false means stop
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Ingest(msg) => {
                self.engine.ingest(msg);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.engine.graph().clone());
            }
            Command::Subscribe { soul, reply } => {
                let _ = reply.send(self.engine.subscribe(soul));
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn stop(&self) {
        tracing::info!(
            souls = self.engine.graph().len(),
            contexts = self.engine.context_count(),
            "sync runtime stopped"
        );
    }
}
