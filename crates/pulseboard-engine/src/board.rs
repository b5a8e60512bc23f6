//! The relay board: connection graph, arena rebuilds and polling.

use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use pulseboard_arena::{ArenaBuilder, ArenaGeneration, ArenaLayout, ArenaSlot, Probe, PulseSource};
use pulseboard_core::Timestamp;

use crate::config::BoardConfig;
use crate::connection::{Connection, ConnectorState, SubscriptionId};
use crate::dispatch::DispatchQueue;
use crate::error::BoardError;
use crate::lazy::{BatchScope, LazyRebuild};
use crate::metrics::BoardMetrics;
use crate::registry::{InputRegistry, OutputRegistry};
use crate::report::ArenaReport;
use crate::runtime::RuntimeBinding;
use crate::traits::{Callback, InputRef, OutputRef};

// ── Links ──────────────────────────────────────────────────────────

/// An input and the outputs it was wired to at the last rebuild.
#[derive(Clone)]
pub struct InputLinks {
    /// Whether the input is bound to the live arena.
    pub is_initialized: bool,
    /// The registered producer.
    pub input: InputRef,
    /// Linked outputs, frozen at the last rebuild.
    pub outputs: Rc<[OutputRef]>,
}

/// An output and the inputs it was wired to at the last rebuild.
#[derive(Clone)]
pub struct OutputLinks {
    /// Whether the output holds a probe into the live arena.
    pub is_initialized: bool,
    /// The registered subscriber.
    pub output: OutputRef,
    /// Linked inputs, frozen at the last rebuild.
    pub inputs: Rc<[InputRef]>,
}

impl fmt::Debug for InputLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputLinks")
            .field("is_initialized", &self.is_initialized)
            .field("input", &self.input.name())
            .field(
                "outputs",
                &self.outputs.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Debug for OutputLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputLinks")
            .field("is_initialized", &self.is_initialized)
            .field("output", &self.output.name())
            .field(
                "inputs",
                &self.inputs.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ── RelayBoard ─────────────────────────────────────────────────────

/// Connects named inputs to named outputs through a shared flag arena.
///
/// The board is lazy until the first [`initialize`](Self::initialize):
/// edits only update the graph. Once initialized, every edit rebuilds the
/// arena when its scope closes (see [`batch`](Self::batch)), re-injecting a
/// fresh probe into every output and re-subscribing every input. Flags
/// start cleared after each rebuild.
pub struct RelayBoard {
    config: BoardConfig,
    inputs: InputRegistry,
    outputs: OutputRegistry,
    connectors: IndexMap<Connection, ConnectorState>,
    subscriptions: IndexMap<SubscriptionId, Connection>,
    next_subscription: u64,
    lazy: LazyRebuild,
    slot: ArenaSlot,
    generation: Option<ArenaGeneration>,
    queue: DispatchQueue,
    metrics: BoardMetrics,
    initialized: bool,
}

impl RelayBoard {
    /// Empty board with the default configuration.
    pub fn new() -> Self {
        Self::build(BoardConfig::default())
    }

    /// Empty board with a validated configuration.
    pub fn with_config(config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BoardConfig) -> Self {
        let queue = DispatchQueue::with_capacity(config.initial_queue_capacity);
        Self {
            config,
            inputs: InputRegistry::default(),
            outputs: OutputRegistry::default(),
            connectors: IndexMap::new(),
            subscriptions: IndexMap::new(),
            next_subscription: 0,
            lazy: LazyRebuild::default(),
            slot: ArenaSlot::new(),
            generation: None,
            queue,
            metrics: BoardMetrics::default(),
            initialized: false,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Rebuild and dispatch counters.
    pub fn metrics(&self) -> &BoardMetrics {
        &self.metrics
    }

    // ── Scopes ─────────────────────────────────────────────────────

    /// Open a scope that defers rebuilds until it is finished or dropped.
    pub fn batch(&mut self) -> BatchScope<'_> {
        BatchScope::open(self)
    }

    pub(crate) fn lazy_mut(&mut self) -> &mut LazyRebuild {
        &mut self.lazy
    }

    pub(crate) fn close_scope(&mut self) -> Result<(), BoardError> {
        if self.lazy.exit() && self.initialized && self.lazy.is_dirty() {
            return self.initialize();
        }
        Ok(())
    }

    fn scoped<R>(&mut self, edit: impl FnOnce(&mut Self) -> R) -> Result<R, BoardError> {
        let mut scope = self.batch();
        let out = edit(&mut *scope);
        scope.finish()?;
        Ok(out)
    }

    // ── Topology ───────────────────────────────────────────────────

    /// Connect `input` to `output`, registering either endpoint on first use.
    ///
    /// Returns `Ok(None)` when either side is absent. Connecting an existing
    /// pair returns its key without changes. On an initialized board the
    /// arena is rebuilt when the enclosing scope closes; a rebuild failure
    /// is returned but the edge stays registered.
    pub fn connect<'a>(
        &mut self,
        input: impl Into<Option<&'a InputRef>>,
        output: impl Into<Option<&'a OutputRef>>,
    ) -> Result<Option<Connection>, BoardError> {
        let (Some(input), Some(output)) = (input.into(), output.into()) else {
            return Ok(None);
        };
        let key = Connection::new(input.name(), output.name());
        if self.connectors.contains_key(&key) {
            return Ok(Some(key));
        }
        self.scoped(|board| {
            board.inputs.get_or_create(input);
            board.outputs.get_or_create(output);
            board.inputs.add_edge(key.input(), key.output());
            board.outputs.add_edge(key.output(), key.input());
            board.connectors.insert(key.clone(), ConnectorState::default());
            board.lazy.mark_dirty();
        })?;
        Ok(Some(key))
    }

    /// Register `callback` on the connection's input.
    ///
    /// Returns `Ok(None)` when the connection is not live.
    pub fn subscribe(
        &mut self,
        connection: &Connection,
        callback: impl Fn(Timestamp) + 'static,
    ) -> Result<Option<SubscriptionId>, BoardError> {
        self.subscribe_shared(connection, Rc::new(callback))
    }

    /// Register an already shared callback.
    ///
    /// The same `Rc` registered on several connections of one input runs
    /// once per batch.
    pub fn subscribe_shared(
        &mut self,
        connection: &Connection,
        callback: Callback,
    ) -> Result<Option<SubscriptionId>, BoardError> {
        if !self.connectors.contains_key(connection) {
            return Ok(None);
        }
        self.scoped(|board| {
            let id = SubscriptionId(board.next_subscription);
            board.next_subscription += 1;
            if let Some(entry) = board.inputs.get_mut(connection.input()) {
                entry.callbacks.insert(id, callback);
            }
            if let Some(state) = board.connectors.get_mut(connection) {
                state.subscriptions.push(id);
            }
            board.subscriptions.insert(id, connection.clone());
            board.lazy.mark_dirty();
            Some(id)
        })
    }

    /// Remove one callback. Returns `Ok(false)` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<bool, BoardError> {
        let Some(connection) = self.subscriptions.get(&id).cloned() else {
            return Ok(false);
        };
        self.scoped(|board| {
            board.drop_subscription(&connection, id);
            board.lazy.mark_dirty();
            true
        })
    }

    /// Remove the edge and every callback registered through it.
    ///
    /// Endpoints left without edges are dropped. A live input stops
    /// reaching the output immediately, before the rebuild. Returns
    /// `Ok(false)` if the connection was already gone.
    pub fn disconnect(&mut self, connection: &Connection) -> Result<bool, BoardError> {
        if !self.connectors.contains_key(connection) {
            return Ok(false);
        }
        self.scoped(|board| board.remove_connection(connection))??;
        Ok(true)
    }

    fn drop_subscription(&mut self, connection: &Connection, id: SubscriptionId) {
        self.subscriptions.shift_remove(&id);
        if let Some(entry) = self.inputs.get_mut(connection.input()) {
            entry.callbacks.shift_remove(&id);
        }
        if let Some(state) = self.connectors.get_mut(connection) {
            state.subscriptions.retain(|s| *s != id);
        }
    }

    fn remove_connection(&mut self, connection: &Connection) -> Result<(), BoardError> {
        let Some(state) = self.connectors.shift_remove(connection) else {
            return Ok(());
        };
        self.lazy.mark_dirty();
        for id in state.subscriptions {
            self.subscriptions.shift_remove(&id);
            if let Some(entry) = self.inputs.get_mut(connection.input()) {
                entry.callbacks.shift_remove(&id);
            }
        }
        let live_bit = self
            .outputs
            .get(connection.output())
            .and_then(|o| o.live_bit);
        self.outputs
            .remove_edge(connection.output(), connection.input());
        self.inputs
            .remove_edge(connection.input(), connection.output(), live_bit)?;
        Ok(())
    }

    // ── Rebuild ────────────────────────────────────────────────────

    /// Lay out, allocate and wire a fresh arena for the current graph.
    ///
    /// Detaches every producer and releases the previous arena first. On
    /// [`BoardError::CapacityOverflow`] nothing is allocated and the board
    /// stays uninitialized; call `initialize` again after removing outputs.
    pub fn initialize(&mut self) -> Result<(), BoardError> {
        let started = Instant::now();
        self.teardown_runtime()?;

        let output_count = self.outputs.len();
        if output_count > self.config.max_outputs {
            return Err(BoardError::CapacityOverflow {
                outputs: output_count,
                max: self.config.max_outputs,
            });
        }

        self.inputs.prepare_indices(&self.outputs);
        let layout = ArenaLayout::plan(output_count, &self.inputs.spans())?;
        let mut builder = ArenaBuilder::new(layout);
        for (input, (_, entry)) in self.inputs.iter().enumerate() {
            builder.install_source(input, entry.span, &entry.mask)?;
            for name in &entry.outputs {
                if let Some(output) = self.outputs.index_of(name) {
                    builder.link_fan_in(input, output)?;
                }
            }
        }
        for output in 0..output_count {
            builder.install_probe(output)?;
        }
        let generation = self.slot.install(builder)?;
        self.generation = Some(generation);

        let outputs = &self.outputs;
        for (index, entry) in self.inputs.values_mut().enumerate() {
            entry.source = Some(self.slot.source(generation, index)?);
            entry.linked = entry
                .outputs
                .iter()
                .filter_map(|name| outputs.get(name))
                .map(|o| Rc::clone(&o.endpoint))
                .collect();
        }

        let inputs = &self.inputs;
        for (index, entry) in self.outputs.values_mut().enumerate() {
            let probe = self.slot.probe(generation, index)?;
            entry.live_bit = Some(index);
            entry.linked = entry
                .inputs
                .iter()
                .filter_map(|name| inputs.get(name))
                .map(|i| Rc::clone(&i.endpoint))
                .collect();
            entry.probe = Some(probe.clone());
            entry.endpoint.inject(probe);
        }

        let capacity = self.inputs.len().max(self.config.initial_queue_capacity);
        let dropped = self.queue.reset(capacity);

        let queue = &self.queue;
        for entry in self.inputs.values_mut() {
            if let Some(source) = entry.source.clone() {
                let batch = entry.compile_batch();
                entry.binding = Some(RuntimeBinding::attach(&entry.endpoint, source, batch, queue));
            }
        }

        self.initialized = true;
        self.lazy.clear();

        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.metrics.rebuilds += 1;
        self.metrics.last_rebuild_us = elapsed_us;
        self.metrics.arena_bytes = self.slot.memory_bytes();
        self.metrics.dropped_batches += dropped as u64;

        tracing::debug!(
            %generation,
            inputs = self.inputs.len(),
            outputs = output_count,
            bytes = self.metrics.arena_bytes,
            elapsed_us,
            dropped,
            "relay board initialized"
        );
        Ok(())
    }

    fn teardown_runtime(&mut self) -> Result<(), BoardError> {
        self.initialized = false;
        for entry in self.inputs.values_mut() {
            entry.detach();
        }
        for entry in self.outputs.values_mut() {
            entry.detach();
        }
        self.slot.release()?;
        self.generation = None;
        self.metrics.arena_bytes = 0;
        Ok(())
    }

    /// Run every queued callback batch with `now`, in enqueue order.
    ///
    /// Returns the number of batches run. Flags are left alone; outputs
    /// clear their own.
    pub fn poll(&mut self, now: Timestamp) -> usize {
        self.metrics.polls += 1;
        let ran = self.queue.poll(now);
        if ran > 0 {
            self.metrics.dispatched_batches += ran as u64;
            tracing::trace!(batches = ran, %now, "poll dispatched");
        }
        ran
    }

    /// Drop every connection, endpoint and callback, then free the arena.
    ///
    /// The board is empty and lazy afterwards. Disposing twice is a no-op.
    pub fn dispose(&mut self) -> Result<(), BoardError> {
        self.connectors.clear();
        self.subscriptions.clear();
        self.inputs.clear();
        self.outputs.clear();
        self.queue.reset(self.config.initial_queue_capacity);
        self.lazy.clear();
        self.teardown_runtime()
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Whether a live arena is installed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Generation of the live arena.
    pub fn generation(&self) -> Option<ArenaGeneration> {
        self.generation
    }

    /// Registered inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Registered outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Live connections.
    pub fn connection_count(&self) -> usize {
        self.connectors.len()
    }

    /// Whether `connection` is live.
    pub fn contains(&self, connection: &Connection) -> bool {
        self.connectors.contains_key(connection)
    }

    /// Live connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connectors.keys()
    }

    /// Callback batches waiting for the next poll.
    pub fn pending_batches(&self) -> usize {
        self.queue.len()
    }

    /// The input registered as `input` and its outputs at the last rebuild.
    pub fn input_links(&self, input: &str) -> Option<InputLinks> {
        self.inputs.get(input).map(|entry| InputLinks {
            is_initialized: entry.is_initialized(),
            input: Rc::clone(&entry.endpoint),
            outputs: Rc::clone(&entry.linked),
        })
    }

    /// The output registered as `output` and its inputs at the last rebuild.
    pub fn output_links(&self, output: &str) -> Option<OutputLinks> {
        self.outputs.get(output).map(|entry| OutputLinks {
            is_initialized: entry.is_initialized(),
            output: Rc::clone(&entry.endpoint),
            inputs: Rc::clone(&entry.linked),
        })
    }

    /// Whether any callback is registered on `input`.
    pub fn has_callback(&self, input: &str) -> bool {
        self.inputs
            .get(input)
            .is_some_and(|entry| !entry.callbacks.is_empty())
    }

    /// Live pulse source of `input`.
    pub fn source(&self, input: &str) -> Option<PulseSource> {
        self.inputs.get(input).and_then(|e| e.source.clone())
    }

    /// Probe last injected into `output`.
    pub fn probe(&self, output: &str) -> Option<Probe> {
        self.outputs.get(output).and_then(|e| e.probe.clone())
    }

    /// Size breakdown of the live arena.
    pub fn report(&self) -> ArenaReport {
        self.generation
            .and_then(|g| self.slot.with_arena(g, ArenaReport::of).ok())
            .unwrap_or_default()
    }
}

impl Default for RelayBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RelayBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayBoard")
            .field("initialized", &self.initialized)
            .field("generation", &self.generation)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("connections", &self.connectors.len())
            .field("lazy", &self.lazy)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pulseboard_core::Subscription;

    use crate::traits::{PulseFn, RelayInput, RelayOutput};

    #[derive(Default)]
    struct Feed {
        name: String,
        listeners: Rc<RefCell<Vec<Option<PulseFn>>>>,
    }

    impl Feed {
        fn named(name: &str) -> Rc<Self> {
            Rc::new(Self {
                name: name.to_owned(),
                ..Self::default()
            })
        }

        fn fire(&self, at: u64) {
            for f in self.listeners.borrow_mut().iter_mut().flatten() {
                f(Timestamp(at));
            }
        }
    }

    impl RelayInput for Feed {
        fn name(&self) -> &str {
            &self.name
        }

        fn subscribe(&self, on_pulse: PulseFn) -> Subscription {
            let mut listeners = self.listeners.borrow_mut();
            let slot = listeners.len();
            listeners.push(Some(on_pulse));
            let listeners = Rc::clone(&self.listeners);
            Subscription::new(move || {
                listeners.borrow_mut()[slot] = None;
            })
        }
    }

    #[derive(Default)]
    struct Sink {
        name: String,
        probe: RefCell<Option<Probe>>,
    }

    impl Sink {
        fn named(name: &str) -> Rc<Self> {
            Rc::new(Self {
                name: name.to_owned(),
                ..Self::default()
            })
        }

        fn flagged(&self) -> bool {
            self.probe
                .borrow()
                .as_ref()
                .is_some_and(|p| p.is_set().unwrap_or(false))
        }
    }

    impl RelayOutput for Sink {
        fn name(&self) -> &str {
            &self.name
        }

        fn inject(&self, probe: Probe) {
            *self.probe.borrow_mut() = Some(probe);
        }
    }

    fn wire(board: &mut RelayBoard, feed: &Rc<Feed>, sink: &Rc<Sink>) -> Connection {
        let input: InputRef = feed.clone();
        let output: OutputRef = sink.clone();
        board.connect(&input, &output).unwrap().unwrap()
    }

    #[test]
    fn absent_endpoint_yields_none() {
        let mut board = RelayBoard::new();
        let output: OutputRef = Sink::named("O");
        assert_eq!(board.connect(None, &output).unwrap(), None);
        assert_eq!(board.connection_count(), 0);
    }

    #[test]
    fn lazy_until_first_initialize() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        wire(&mut board, &feed, &sink);
        assert!(!board.is_initialized());
        assert!(sink.probe.borrow().is_none());
        assert_eq!(board.metrics().rebuilds, 0);

        board.initialize().unwrap();
        feed.fire(1);
        assert!(sink.flagged());
    }

    #[test]
    fn connect_twice_returns_same_key() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        board.initialize().unwrap();
        let a = wire(&mut board, &feed, &sink);
        let b = wire(&mut board, &feed, &sink);
        assert_eq!(a, b);
        assert_eq!(board.connection_count(), 1);
        assert_eq!(board.metrics().rebuilds, 2);
    }

    #[test]
    fn batch_coalesces_rebuilds() {
        let mut board = RelayBoard::new();
        board.initialize().unwrap();
        let feed = Feed::named("I");
        let sinks: Vec<_> = (0..4).map(|i| Sink::named(&format!("O{i}"))).collect();

        let mut scope = board.batch();
        for sink in &sinks {
            wire(&mut scope, &feed, sink);
        }
        scope.finish().unwrap();

        assert_eq!(board.metrics().rebuilds, 2);
        feed.fire(3);
        assert!(sinks.iter().all(|s| s.flagged()));
    }

    #[test]
    fn empty_batch_does_not_rebuild() {
        let mut board = RelayBoard::new();
        board.initialize().unwrap();
        board.batch().finish().unwrap();
        drop(board.batch());
        assert_eq!(board.metrics().rebuilds, 1);
    }

    #[test]
    fn callbacks_run_on_poll_once_per_cycle() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        let conn = wire(&mut board, &feed, &sink);
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = Rc::clone(&seen);
            board
                .subscribe(&conn, move |now| seen.borrow_mut().push(now))
                .unwrap()
                .unwrap();
        }
        board.initialize().unwrap();
        assert!(board.has_callback("I"));

        feed.fire(1);
        feed.fire(2);
        assert!(seen.borrow().is_empty());
        assert_eq!(board.poll(Timestamp(10)), 1);
        assert_eq!(board.poll(Timestamp(11)), 0);
        assert_eq!(*seen.borrow(), vec![Timestamp(10)]);
        assert_eq!(board.metrics().dispatched_batches, 1);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let mut board = RelayBoard::new();
        assert!(!board.unsubscribe(SubscriptionId(99)).unwrap());
    }

    #[test]
    fn subscribe_on_disconnected_returns_none() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        let conn = wire(&mut board, &feed, &sink);
        assert!(board.disconnect(&conn).unwrap());
        assert!(!board.disconnect(&conn).unwrap());
        assert_eq!(board.subscribe(&conn, |_| {}).unwrap(), None);
        assert_eq!(board.input_count(), 0);
        assert_eq!(board.output_count(), 0);
    }

    #[test]
    fn rebuild_detaches_old_producer_subscriptions() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        wire(&mut board, &feed, &sink);
        board.initialize().unwrap();
        board.initialize().unwrap();
        let live = feed.listeners.borrow().iter().filter(|l| l.is_some()).count();
        assert_eq!(live, 1);
    }

    #[test]
    fn report_tracks_live_arena() {
        let mut board = RelayBoard::new();
        assert_eq!(board.report(), ArenaReport::default());
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        wire(&mut board, &feed, &sink);
        board.initialize().unwrap();
        let report = board.report();
        assert_eq!(report.inputs, 1);
        assert_eq!(report.outputs, 1);
        assert_eq!(report.edges, 1);
        assert_eq!(report.flag_bytes, 4);
        assert_eq!(report.mask_bytes, 1);
    }

    #[test]
    fn dispose_twice_is_noop() {
        let mut board = RelayBoard::new();
        let (feed, sink) = (Feed::named("I"), Sink::named("O"));
        wire(&mut board, &feed, &sink);
        board.initialize().unwrap();
        board.dispose().unwrap();
        board.dispose().unwrap();
        assert!(!board.is_initialized());
        assert_eq!(board.connection_count(), 0);
        assert!(feed.listeners.borrow().iter().all(Option::is_none));
    }
}
