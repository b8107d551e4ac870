//! # Searchbox Runtime
//!
//! The Store that owns a reducer's state and executes the effects it returns.
//!
//! ## Core Components
//!
//! - **Store**: state cell behind a `RwLock`, serialising every dispatch
//! - **Effect execution**: spawned tokio tasks whose actions feed back into the store
//! - **Observation**: action broadcast and a state version `watch` channel
//!
//! ## Example
//!
//! ```ignore
//! use searchbox_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! let mut handle = store.send(Action::DoSomething).await?;
//! handle.wait().await;
//!
//! let value = store.state(|s| s.some_field.clone()).await;
//! ```

use searchbox_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Prometheus exporter and metric descriptions
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown started.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Effects were still running when [`settle`](crate::Store::settle)
        /// gave up
        #[error("Store did not settle, {0} effects still running")]
        SettleTimeout(usize),
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Waiting on it resolves once every effect
/// spawned by that action has finished, including the dispatch of any action
/// those effects fed back into the store.
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle together with the tracking context effects report to
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that is already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running for this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: decrements the effect counter on drop, even if the effect panics
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: decrements the store-wide pending counter on drop
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreError, watch,
    };
    use tokio::sync::broadcast;

    /// Default capacity of the action broadcast channel
    const BROADCAST_CAPACITY: usize = 16;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; every reduce holds the write lock, so
    ///    dispatches apply one at a time in arrival order)
    /// 2. Reducer and Environment (shared, never mutated)
    /// 3. Effect execution with action feedback
    ///
    /// Cloning a Store is cheap and yields a handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, for observers
        action_broadcast: broadcast::Sender<A>,
        /// Incremented after every reduce
        state_version: Arc<watch::Sender<u64>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, BROADCAST_CAPACITY)
        }

        /// Create a new store with a custom action broadcast capacity
        ///
        /// Increase the capacity when observers are slow and frequently lag.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);
            let (state_version, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                state_version: Arc::new(state_version),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Bumps the state version
        /// 4. Starts the returned effects; their actions are sent back here
        ///
        /// `send()` returns once effects are started, not finished. Use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejecting action, store is shutting down");
                metrics::counter!("store.actions.rejected").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.sent").increment(1);
            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                self.state_version.send_modify(|version| *version += 1);
                effects
            };

            tracing::trace!(effect_count = effects.len(), "Reducer returned effects");
            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Read a projection of the current state
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Subscribe to actions produced by effects
        ///
        /// Only feedback actions are broadcast, not the actions passed to
        /// [`Store::send`] by callers.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The receiver carries a version number incremented after every
        /// reduce. Read the state itself with [`Store::state`].
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<u64> {
            self.state_version.subscribe()
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for pending effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the timeout expires.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            match self.drain(timeout).await {
                Ok(()) => {
                    tracing::info!("All effects completed, shutdown successful");
                    Ok(())
                },
                Err(pending) => {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    Err(StoreError::ShutdownTimeout(pending))
                },
            }
        }

        /// Wait until no effect is running, while still accepting actions
        ///
        /// Unlike an [`EffectHandle`], this also covers effects started by
        /// feedback actions and by earlier sends. Actions fed back while
        /// settling are applied.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::SettleTimeout`] if effects are still running
        /// when the timeout expires.
        pub async fn settle(&self, timeout: Duration) -> Result<(), StoreError> {
            self.drain(timeout).await.map_err(|pending| {
                tracing::warn!(pending_effects = pending, "Store did not settle in time");
                StoreError::SettleTimeout(pending)
            })
        }

        /// Poll until the store-wide effect counter hits zero
        ///
        /// Returns the number still running on timeout.
        async fn drain(&self, timeout: Duration) -> Result<(), usize> {
            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    return Err(pending);
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Feed an action produced by an effect back into the store
        async fn feed_back(&self, action: A) {
            let _ = self.action_broadcast.send(action.clone());
            if let Err(error) = self.send(action).await {
                tracing::warn!(%error, "Dropping feedback action");
            }
        }

        /// Register a spawned effect with both the per-action and store-wide counters
        fn track(&self, tracking: &EffectTracking) -> (DecrementGuard, AtomicCounterGuard) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            (
                DecrementGuard(tracking.clone()),
                AtomicCounterGuard(Arc::clone(&self.pending_effects)),
            )
        }

        /// Execute an effect with tracking
        ///
        /// - `None`: no-op
        /// - `Future`: spawned; a `Some(action)` result is sent back to the store
        /// - `Delay`: spawned; sleeps, then sends the action
        /// - `Parallel`: every member started at once under the same tracking
        /// - `Sequential`: members run one after another in a spawned task
        ///
        /// Reducer panics propagate. Effect panics are contained in their task
        /// and the guards still release the counters.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into tasks
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let guards = self.track(&tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guards = guards;
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let guards = self.track(&tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guards = guards;
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let guards = self.track(&tracking);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guards = guards;
                        for effect in effects {
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect(effect, step_tracking);
                            step.wait().await;
                        }
                        tracing::trace!("Effect::Sequential completed");
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                state_version: Arc::clone(&self.state_version),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use searchbox_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Add(i64),
        AddLater(i64),
        AddTwiceInOrder(i64, i64),
    }

    #[derive(Debug, Clone, Default)]
    struct TestState {
        total: i64,
        applied: Vec<i64>,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            _env: &(),
        ) -> SmallVec<[Effect<TestAction>; 4]> {
            match action {
                TestAction::Add(n) => {
                    state.total += n;
                    state.applied.push(n);
                    smallvec![Effect::None]
                },
                TestAction::AddLater(n) => smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(TestAction::Add(n))
                }))],
                TestAction::AddTwiceInOrder(first, second) => {
                    smallvec![Effect::chain(vec![
                        Effect::Delay {
                            duration: Duration::from_millis(20),
                            action: Box::new(TestAction::Add(first)),
                        },
                        Effect::Delay {
                            duration: Duration::from_millis(1),
                            action: Box::new(TestAction::Add(second)),
                        },
                    ])]
                },
            }
        }
    }

    #[tokio::test]
    async fn send_applies_action_synchronously() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let handle = store.send(TestAction::Add(3)).await.unwrap();

        assert_eq!(handle.pending(), 0);
        assert_eq!(store.state(|s| s.total).await, 3);
    }

    #[tokio::test]
    async fn handle_waits_for_feedback_action() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let mut handle = store.send(TestAction::AddLater(7)).await.unwrap();

        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("effect should finish");

        assert_eq!(store.state(|s| s.total).await, 7);
    }

    #[tokio::test]
    async fn sequential_effects_keep_order() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let mut handle = store.send(TestAction::AddTwiceInOrder(1, 2)).await.unwrap();

        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .expect("sequence should finish");

        assert_eq!(store.state(|s| s.applied.clone()).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn feedback_actions_are_broadcast() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let mut actions = store.subscribe_actions();

        let _ = store.send(TestAction::AddLater(4)).await.unwrap();

        let observed = tokio::time::timeout(Duration::from_secs(1), actions.recv())
            .await
            .expect("broadcast in time")
            .expect("channel open");
        assert_eq!(observed, TestAction::Add(4));
    }

    #[tokio::test]
    async fn state_version_bumps_per_reduce() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let versions = store.subscribe_state();

        let _ = store.send(TestAction::Add(1)).await.unwrap();
        let _ = store.send(TestAction::Add(1)).await.unwrap();

        assert_eq!(*versions.borrow(), 2);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = Store::new(TestState::default(), TestReducer, ());
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send(TestAction::Add(1)).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn shutdown_times_out_with_running_effects() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let _ = store
            .send(TestAction::AddTwiceInOrder(1, 1))
            .await
            .unwrap();

        let result = store.shutdown(Duration::from_millis(1)).await;
        assert!(matches!(result, Err(StoreError::ShutdownTimeout(n)) if n > 0));
    }

    #[tokio::test]
    async fn settle_waits_for_effects_from_earlier_sends() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let _ = store.send(TestAction::AddLater(5)).await.unwrap();

        // Nothing started by this send, but the earlier effect is still running
        let mut idle = store.send(TestAction::Add(1)).await.unwrap();
        idle.wait_with_timeout(Duration::from_millis(50)).await.unwrap();

        store.settle(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.total).await, 6);

        // Still open for business
        let _ = store.send(TestAction::Add(1)).await.unwrap();
        assert_eq!(store.state(|s| s.total).await, 7);
    }

    #[tokio::test]
    async fn settle_times_out_with_running_effects() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let _ = store
            .send(TestAction::AddTwiceInOrder(1, 1))
            .await
            .unwrap();

        let result = store.settle(Duration::from_millis(1)).await;
        assert!(matches!(result, Err(StoreError::SettleTimeout(n)) if n > 0));
    }

    #[tokio::test]
    async fn completed_handle_does_not_block() {
        let mut handle = EffectHandle::completed();
        handle
            .wait_with_timeout(Duration::from_millis(50))
            .await
            .expect("already complete");
    }
}
