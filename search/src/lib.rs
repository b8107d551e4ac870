//! # Searchbox
//!
//! The state machine behind a search box: the user edits a query, a request
//! goes out, and the box shows a loading indicator, the results, or an error.
//!
//! - [`state`]: [`RequestState`] and the pure [`reduce`] function
//! - [`controller`]: [`SearchReducer`], which starts a fetch per query change
//!   and drops responses to superseded queries
//! - [`client`]: the upstream [`SearchClient`] and its HTTP implementation
//! - [`render`]: what to draw for each state
//! - [`config`]: environment-based configuration
//! - [`cli`]: the line-driven loop behind the `searchbox` binary
//!
//! ## Example
//!
//! ```no_run
//! use searchbox::{HttpSearchClient, SearchAction, SearchConfig, SearchEnvironment, SearchReducer, SearchState};
//! use searchbox_core::environment::SystemClock;
//! use searchbox_runtime::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpSearchClient::new(&SearchConfig::default())?;
//! let env = SearchEnvironment::new(Arc::new(client), SystemClock);
//! let store = Store::new(SearchState::default(), SearchReducer::new(), env);
//!
//! let mut handle = store.send(SearchAction::query_changed("rust")).await?;
//! handle.wait().await;
//!
//! let shown = store.state(|s| searchbox::render::render(&s.request)).await;
//! println!("{shown}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod render;
pub mod state;

pub use client::{ClientError, HttpSearchClient, SearchClient};
pub use config::{ConfigError, SearchConfig};
pub use controller::{SearchAction, SearchEnvironment, SearchReducer, SearchState};
pub use render::{OutputFormat, Screen, View};
pub use state::{Action, FetchError, Hit, RequestState, reduce};
