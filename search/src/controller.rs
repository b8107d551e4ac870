//! Query controller.
//!
//! Turns query-text changes into fetches and fetch results into
//! [`Action`]s for the request state, suppressing results that belong to a
//! superseded query.
//!
//! Each started fetch is stamped with the generation current when it
//! started. When it settles, the result is applied only if that generation
//! is still the latest one. In-flight requests are never aborted; a stale
//! result is simply dropped without dispatching anything.

use crate::client::SearchClient;
use crate::state::{Action, FetchError, Hit, RequestState};
use chrono::{DateTime, Utc};
use searchbox_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec};
use std::sync::Arc;

/// State owned by the search box
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Query text of the latest started fetch
    pub query: String,
    /// Sequence number of the latest started fetch (0 before the first)
    pub generation: u64,
    /// Lifecycle of the latest request
    pub request: RequestState,
    /// When the latest applied response settled
    pub last_settled_at: Option<DateTime<Utc>>,
}

/// Inputs to the search box
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchAction {
    /// The text field emitted a new value
    QueryChanged {
        /// Current text of the field
        query: String,
    },
    /// A fetch settled
    FetchCompleted {
        /// Generation the fetch was started under
        generation: u64,
        /// Hits, or why there are none
        outcome: Result<Vec<Hit>, FetchError>,
    },
}

impl SearchAction {
    /// Shorthand for [`SearchAction::QueryChanged`]
    #[must_use]
    pub fn query_changed(query: impl Into<String>) -> Self {
        Self::QueryChanged {
            query: query.into(),
        }
    }
}

/// Dependencies of the search box
#[derive(Clone)]
pub struct SearchEnvironment<C: Clock> {
    /// Upstream search
    pub client: Arc<dyn SearchClient>,
    /// Time source for settle stamps
    pub clock: C,
}

impl<C: Clock> SearchEnvironment<C> {
    /// Create an environment from a client and a clock
    #[must_use]
    pub fn new(client: Arc<dyn SearchClient>, clock: C) -> Self {
        Self { client, clock }
    }
}

/// Reducer for [`SearchState`]
///
/// Generic over the Clock type so tests can pin time.
#[derive(Debug, Clone, Copy)]
pub struct SearchReducer<C> {
    _phantom: std::marker::PhantomData<C>,
}

impl<C> SearchReducer<C> {
    /// Create a new search reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C> Default for SearchReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Reducer for SearchReducer<C> {
    type State = SearchState;
    type Action = SearchAction;
    type Environment = SearchEnvironment<C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SearchAction::QueryChanged { query } => {
                if state.generation > 0 && state.query == query {
                    tracing::trace!(%query, "Query unchanged, no fetch");
                    return smallvec![Effect::None];
                }

                state.generation += 1;
                state.query.clone_from(&query);
                state.request.apply(Action::Requested);

                let generation = state.generation;
                tracing::debug!(%query, generation, "Starting search");
                metrics::counter!("search.queries.started").increment(1);

                let client = Arc::clone(&env.client);
                smallvec![Effect::Future(Box::pin(async move {
                    let outcome = client.search(&query).await;
                    Some(SearchAction::FetchCompleted {
                        generation,
                        outcome,
                    })
                }))]
            },
            SearchAction::FetchCompleted {
                generation,
                outcome,
            } => {
                if generation != state.generation {
                    tracing::debug!(
                        generation,
                        latest = state.generation,
                        "Dropping stale search response"
                    );
                    metrics::counter!("search.responses.stale").increment(1);
                    return smallvec![Effect::None];
                }

                let action = match outcome {
                    Ok(results) => {
                        tracing::debug!(generation, hit_count = results.len(), "Search succeeded");
                        Action::Succeeded { results }
                    },
                    Err(error) => {
                        tracing::warn!(generation, %error, "Search failed");
                        metrics::counter!("search.fetch.failed").increment(1);
                        Action::Failed {
                            message: error.message().to_string(),
                        }
                    },
                };

                state.request.apply(action);
                state.last_settled_at = Some(env.clock.now());
                smallvec![Effect::None]
            },
        }
    }
}
