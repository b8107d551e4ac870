//! What a search box shows for each request state.

use crate::state::RequestState;
use std::fmt;
use std::io::{self, Write};

/// One rendered result row, keyed by the hit id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedHit {
    /// Stable key for list diffing
    pub key: String,
    /// Link text
    pub title: String,
    /// Link target
    pub url: String,
}

/// Render surface contents
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Nothing is drawn
    Nothing,
    /// A loading indicator
    Loading,
    /// A list of `(title, url)` rows
    Results(Vec<RenderedHit>),
    /// An error message
    Error(String),
}

/// Map a request state to what should be on screen
#[must_use]
pub fn render(state: &RequestState) -> View {
    match state {
        RequestState::Empty => View::Nothing,
        RequestState::Loading => View::Loading,
        RequestState::Success { results } => View::Results(
            results
                .iter()
                .map(|hit| RenderedHit {
                    key: hit.id.clone(),
                    title: hit.title.clone(),
                    url: hit.url.clone(),
                })
                .collect(),
        ),
        RequestState::Error { message } => View::Error(message.clone()),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => Ok(()),
            Self::Loading => write!(f, "Loading ..."),
            Self::Results(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    if row.url.is_empty() {
                        write!(f, "- {}", row.title)?;
                    } else {
                        write!(f, "- {} <{}>", row.title, row.url)?;
                    }
                }
                Ok(())
            },
            Self::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// How states are written out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The [`View`] as human-readable lines
    #[default]
    Text,
    /// One JSON object per state
    Json,
}

/// A terminal-like render surface
///
/// Writes a frame only when the state differs from the last one written,
/// so repeated notifications for the same state do not repeat output.
#[derive(Debug)]
pub struct Screen<W> {
    out: W,
    format: OutputFormat,
    last: Option<RequestState>,
}

impl<W: Write> Screen<W> {
    /// Create a screen writing to `out`
    pub const fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            last: None,
        }
    }

    /// Draw `state` unless it is what was drawn last
    ///
    /// Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn show(&mut self, state: &RequestState) -> io::Result<bool> {
        if self.last.as_ref() == Some(state) {
            return Ok(false);
        }

        match self.format {
            OutputFormat::Text => {
                let view = render(state);
                if view != View::Nothing {
                    writeln!(self.out, "{view}")?;
                }
            },
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, state)?;
                writeln!(self.out)?;
            },
        }
        self.out.flush()?;

        self.last = Some(state.clone());
        Ok(true)
    }

    /// Consume the screen, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Hit;

    #[test]
    fn empty_renders_nothing() {
        assert_eq!(render(&RequestState::Empty), View::Nothing);
        assert_eq!(View::Nothing.to_string(), "");
    }

    #[test]
    fn loading_renders_indicator() {
        assert_eq!(render(&RequestState::Loading), View::Loading);
    }

    #[test]
    fn success_renders_rows_keyed_by_id() {
        let view = render(&RequestState::Success {
            results: vec![
                Hit::new("10", "Rust 2024", "https://blog.rust-lang.org"),
                Hit::new("11", "Ask HN: tooling", ""),
            ],
        });

        let View::Results(rows) = &view else {
            unreachable!("success always renders results");
        };
        assert_eq!(rows[0].key, "10");
        assert_eq!(rows[1].key, "11");
        assert_eq!(
            view.to_string(),
            "- Rust 2024 <https://blog.rust-lang.org>\n- Ask HN: tooling"
        );
    }

    #[test]
    fn error_renders_message() {
        let view = render(&RequestState::Error {
            message: "network error".to_string(),
        });
        assert_eq!(view.to_string(), "Error: network error");
    }

    #[test]
    fn screen_skips_repeated_state() {
        let mut screen = Screen::new(Vec::new(), OutputFormat::Text);

        assert!(screen.show(&RequestState::Loading).unwrap_or(false));
        assert!(!screen.show(&RequestState::Loading).unwrap_or(true));
        assert!(screen
            .show(&RequestState::Error {
                message: "boom".to_string()
            })
            .unwrap_or(false));

        let written = String::from_utf8(screen.into_inner()).unwrap_or_default();
        assert_eq!(written, "Loading ...\nError: boom\n");
    }

    #[test]
    fn screen_writes_json_lines() {
        let mut screen = Screen::new(Vec::new(), OutputFormat::Json);
        let _ = screen.show(&RequestState::Loading);

        let written = String::from_utf8(screen.into_inner()).unwrap_or_default();
        assert_eq!(written, "{\"state\":\"loading\"}\n");
    }
}
