//! Request lifecycle of a single search.
//!
//! [`RequestState`] is the only thing a view needs to render a search box;
//! [`reduce`] is the only way it changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One search result item
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hit {
    /// Identifier, unique within one response
    pub id: String,
    /// Display title
    pub title: String,
    /// Link target
    pub url: String,
}

impl Hit {
    /// Creates a hit
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Where the latest search request stands
///
/// Always exactly one tag. Created as [`RequestState::Empty`] and only ever
/// replaced through [`reduce`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestState {
    /// No request has been issued
    #[default]
    Empty,
    /// A request is in flight
    Loading,
    /// The last request completed successfully
    Success {
        /// Hits in the order the upstream returned them
        results: Vec<Hit>,
    },
    /// The last request failed
    Error {
        /// Human-readable failure description
        message: String,
    },
}

impl RequestState {
    /// Short name of the current tag, for logs
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }

    /// Whether a request is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Results of the last successful request, if that is the current state
    #[must_use]
    pub fn results(&self) -> Option<&[Hit]> {
        match self {
            Self::Success { results } => Some(results),
            _ => None,
        }
    }

    /// Replace `self` with the result of reducing `action` over it
    pub fn apply(&mut self, action: Action) {
        *self = reduce(self, action);
    }
}

/// Inputs that move a [`RequestState`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// A request was issued
    Requested,
    /// The request completed with `results`
    Succeeded {
        /// Hits returned by the upstream
        results: Vec<Hit>,
    },
    /// The request failed
    Failed {
        /// Human-readable failure description
        message: String,
    },
}

/// Next request state for `action`
///
/// Transitions do not depend on the current state: any state accepts any
/// action. Dropping responses that belong to a superseded query is the
/// caller's job (see [`crate::controller`]).
///
/// | action | next state |
/// |---|---|
/// | `Requested` | `Loading` |
/// | `Succeeded { results }` | `Success { results }` |
/// | `Failed { message }` | `Error { message }` |
#[must_use]
pub fn reduce(_current: &RequestState, action: Action) -> RequestState {
    match action {
        Action::Requested => RequestState::Loading,
        Action::Succeeded { results } => RequestState::Success { results },
        Action::Failed { message } => RequestState::Error { message },
    }
}

/// The one recoverable failure a search can end in
///
/// Network failures, non-2xx statuses and undecodable bodies all collapse
/// into this; the message is what the user sees.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream call rejected
    #[error("{message}")]
    FetchFailed {
        /// Human-readable failure description
        message: String,
    },
}

impl FetchError {
    /// Creates a `FetchFailed` error
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// The user-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::FetchFailed { message } => message,
        }
    }
}
