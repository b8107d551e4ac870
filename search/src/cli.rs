//! Line-driven front end.
//!
//! Every input line is one edit of the query text, passed through as typed.
//! The request state is drawn whenever the store reports a change. When input
//! ends, every search still running is allowed to settle before the final
//! state is drawn.

use crate::controller::{SearchAction, SearchEnvironment, SearchReducer, SearchState};
use crate::render::Screen;
use searchbox_core::environment::Clock;
use searchbox_runtime::{Store, StoreError};
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Store specialised to the search box
pub type SearchStore<C> = Store<SearchState, SearchAction, SearchEnvironment<C>, SearchReducer<C>>;

/// Errors that end [`run`]
#[derive(Error, Debug)]
pub enum RunError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store refused a query change
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Feed `input` lines into `store` as query changes, drawing onto `screen`
///
/// Returns once input is exhausted and the store has settled, or `grace`
/// ran out while waiting for it. A search that fails to settle in time is
/// logged, not an error; the last drawn state then stays on screen.
///
/// # Errors
///
/// Returns [`RunError::Io`] on read or write failure, and
/// [`RunError::Store`] if the store is already shutting down.
pub async fn run<C, R, W>(
    store: &SearchStore<C>,
    input: R,
    screen: &mut Screen<W>,
    grace: Duration,
) -> Result<(), RunError>
where
    C: Clock + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut versions = store.subscribe_state();
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(query) = line? else {
                    break;
                };
                let _ = store.send(SearchAction::QueryChanged { query }).await?;
            }
            changed = versions.changed() => {
                if changed.is_err() {
                    break;
                }
                let request = store.state(|s| s.request.clone()).await;
                screen.show(&request)?;
            }
        }
    }

    // Also covers fetches started before a final no-op edit
    if store.settle(grace).await.is_err() {
        tracing::warn!("Latest search did not settle before end of input");
    }
    let request = store.state(|s| s.request.clone()).await;
    screen.show(&request)?;

    Ok(())
}
