//! The engine: single owner of the local graph and every merge context.

use crate::context::{MergeContext, SettleCallback, TurnHook};
use crate::fire::{Barrier, Waiter};
use crate::scheduler::{Scheduler, Task};
use crate::universe::DispatchOutcome;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use strand_core::{
    BusEvent, ContextId, EffectSet, GetQuery, Graph, Message, MessageId, Soul, State, SyncConfig,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Merge contexts kept alive while they wait for acknowledgments
pub(crate) const CONTEXT_CAPACITY: usize = 4_096;

/// Options for a locally initiated write
#[derive(Default)]
pub struct PutOptions {
    /// Trusted replay: skip the equal-state tie-break
    pub faith: bool,
    /// Forced re-apply for cache-miss resync
    pub miss: bool,
    /// Invoked once when the turn fires
    pub hook: Option<TurnHook>,
}

impl std::fmt::Debug for PutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutOptions")
            .field("faith", &self.faith)
            .field("miss", &self.miss)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Synchronous, deterministic sync engine.
///
/// Nothing here blocks or spawns: storage and network are reached through the
/// [`EventBus`](strand_core::EventBus), and their answers come back as new
/// messages passed to [`Engine::ingest`]. Suspended work is driven by
/// [`Engine::tick`]; [`crate::SyncRuntime`] does that from a tokio task.
pub struct Engine {
    pub(crate) config: SyncConfig,
    pub(crate) effects: EffectSet,
    pub(crate) graph: Graph,
    pub(crate) contexts: IndexMap<ContextId, MergeContext>,
    pub(crate) next_context: u64,
    /// Live field id -> owning context
    pub(crate) field_routes: HashMap<MessageId, ContextId>,
    /// Field id -> batch id, kept after the context retires so late acks
    /// can still be traced back to their batch
    pub(crate) field_origins: IndexMap<MessageId, MessageId>,
    pub(crate) barrier: Barrier,
    pub(crate) scheduler: Scheduler,
    /// Messages the engine sends itself, drained before `ingest` returns
    pub(crate) inbox: VecDeque<Message>,
    pub(crate) hooks: HashMap<MessageId, TurnHook>,
    pub(crate) subscribers: HashMap<Soul, Vec<UnboundedSender<Message>>>,
    pub(crate) rng: StdRng,
}

impl Engine {
    /// Engine with an empty graph
    pub fn new(config: SyncConfig, effects: EffectSet) -> Self {
        Self::with_graph(config, effects, Graph::new())
    }

    /// Engine seeded with an existing replica
    pub fn with_graph(config: SyncConfig, effects: EffectSet, graph: Graph) -> Self {
        effects.bus.emit(BusEvent::Create, Message::default());
        Self {
            config,
            effects,
            graph,
            contexts: IndexMap::new(),
            next_context: 0,
            field_routes: HashMap::new(),
            field_origins: IndexMap::new(),
            barrier: Barrier::default(),
            scheduler: Scheduler::new(),
            inbox: VecDeque::new(),
            hooks: HashMap::new(),
            subscribers: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a seeded id generator, for reproducible tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Local replica
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Configuration in effect
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Merge contexts still alive
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Scheduled tasks, ready or timed
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Dispatch one message from any source, then everything it caused the
    /// engine to send itself (settlement acks, read replies).
    ///
    /// Sliced and deferred work is left for [`Engine::tick`].
    pub fn ingest(&mut self, msg: Message) -> DispatchOutcome {
        let outcome = self.universe(msg);
        self.drain_inbox();
        outcome
    }

    /// Write a partial graph; returns the batch id its settlement acks
    pub fn put(&mut self, graph: Graph) -> MessageId {
        self.put_with(graph, PutOptions::default())
    }

    /// Write a partial graph with explicit turn options
    pub fn put_with(&mut self, graph: Graph, options: PutOptions) -> MessageId {
        let id = self.fresh_id();
        let mut msg = Message::put(graph).with_id(id.clone());
        msg.local.faith = options.faith;
        msg.local.miss = options.miss;
        if let Some(hook) = options.hook {
            self.hooks.insert(id.clone(), hook);
        }
        self.ingest(msg);
        id
    }

    /// Read a node or field; returns the query id replies acknowledge
    pub fn get(&mut self, query: GetQuery) -> MessageId {
        let id = self.fresh_id();
        self.ingest(Message::get(query).with_id(id.clone()));
        id
    }

    /// Run `callback` once the active completion barrier fires, or on the
    /// next tick when no turn is in flight
    pub fn on_settled(&mut self, callback: SettleCallback) {
        let waiter = Waiter::Callback(callback);
        let waiter = match self.barrier.active() {
            Some(hatch) => match self.barrier.push(hatch, waiter) {
                Ok(()) => return,
                Err(waiter) => waiter,
            },
            None => waiter,
        };
        self.scheduler.schedule(Task::Waiters(vec![waiter]));
    }

    /// Receive every field committed to `soul`
    pub fn subscribe(&mut self, soul: Soul) -> UnboundedReceiver<Message> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.entry(soul).or_default().push(sender);
        receiver
    }

    /// Run one scheduler tick: promote due timers, then run every task that
    /// was ready when the tick started. Returns the number of tasks run.
    pub fn tick(&mut self) -> usize {
        let now = self.effects.state.now();
        self.scheduler.promote(now);
        let ready = self.scheduler.take_ready();
        let count = ready.len();
        for task in ready {
            self.run_task(task);
            self.drain_inbox();
        }
        count
    }

    /// Tick until no task is ready; timers not yet due stay scheduled
    pub fn run_until_idle(&mut self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.tick();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Earliest timer deadline, if any timer is scheduled
    pub fn next_deadline(&self) -> Option<State> {
        self.scheduler.next_deadline()
    }

    /// How long the runtime may sleep: zero when work is ready, `None` when
    /// there is nothing scheduled at all
    pub fn idle_for(&self) -> Option<Duration> {
        if self.scheduler.has_ready() {
            return Some(Duration::ZERO);
        }
        let deadline = self.next_deadline()?;
        let wait = self.effects.state.now().millis_until(deadline);
        Some(Duration::from_millis(wait.ceil() as u64))
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::ResumePut { ctx, cursor } => self.continue_put(ctx, cursor),
            Task::Ham { ctx, write } => self.retry_ham(ctx, write),
            Task::Waiters(waiters) => self.run_waiters(waiters),
            Task::ResumeReply(cursor) => self.continue_reply(cursor),
        }
    }

    pub(crate) fn drain_inbox(&mut self) {
        while let Some(msg) = self.inbox.pop_front() {
            self.universe(msg);
        }
    }

    pub(crate) fn fresh_id(&mut self) -> MessageId {
        MessageId::random(&mut self.rng, self.config.id_length)
    }

    /// Register a new merge context for `trigger`, evicting the oldest
    /// contexts that only wait for acknowledgments when over capacity
    pub(crate) fn open_context(&mut self, trigger: Message, batch: MessageId) -> ContextId {
        let id = ContextId(self.next_context);
        self.next_context += 1;
        let (matched, latch) = self.barrier.open();
        let mut ctx = MergeContext::new(trigger, batch.clone(), matched, latch);
        ctx.hook = self.hooks.remove(&batch);
        self.contexts.insert(id, ctx);
        self.evict_contexts();
        id
    }

    fn evict_contexts(&mut self) {
        while self.contexts.len() > CONTEXT_CAPACITY {
            let victim = self
                .contexts
                .iter()
                .find(|(_, ctx)| ctx.evictable())
                .map(|(id, _)| *id);
            let Some(victim) = victim else {
                return;
            };
            if let Some(ctx) = self.contexts.get(&victim) {
                tracing::warn!(
                    context = %victim,
                    batch = %ctx.batch,
                    acks = ctx.acks,
                    all = ctx.all,
                    "evicting unsettled context"
                );
            }
            self.retire(victim);
        }
    }

    /// Forget a context and its live field routes
    pub(crate) fn retire(&mut self, id: ContextId) {
        if let Some(ctx) = self.contexts.shift_remove(&id) {
            for field in &ctx.fields {
                self.field_routes.remove(field);
            }
            tracing::trace!(context = %id, batch = %ctx.batch, "context retired");
        }
    }

    /// Remember which batch a field id belongs to, bounded like the dedup window
    pub(crate) fn remember_origin(&mut self, field: MessageId, batch: MessageId) {
        self.field_origins.insert(field, batch);
        while self.field_origins.len() > self.config.dedup_max_entries {
            self.field_origins.shift_remove_index(0);
        }
    }

    /// Deliver a committed field to subscribers of its soul
    pub(crate) fn notify(&mut self, soul: &Soul, msg: &Message) {
        if let Some(senders) = self.subscribers.get_mut(soul) {
            senders.retain(|sender| sender.send(msg.clone()).is_ok());
            if senders.is_empty() {
                self.subscribers.remove(soul);
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("souls", &self.graph.len())
            .field("contexts", &self.contexts.len())
            .field("tasks", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}
