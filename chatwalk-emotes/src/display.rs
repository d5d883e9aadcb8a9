//! Message display — a chatter's current message as bounded segments.
//!
//! Pairs the session [`EmoteResolver`] with the segmentation pipeline. A
//! catalog failure never blanks a speech bubble: the message degrades to
//! plain truncated text instead.

use tracing::warn;

use crate::catalog::EmoteResolver;
use crate::segment::{Segment, segment_message};

/// Renders messages into segment sequences under a visible-length budget.
#[derive(Debug)]
pub struct MessageDisplay {
    resolver: EmoteResolver,
    max_visible_len: usize,
}

impl MessageDisplay {
    /// Build a display over a resolver with the given length budget.
    #[must_use]
    pub fn new(resolver: EmoteResolver, max_visible_len: usize) -> Self {
        Self {
            resolver,
            max_visible_len,
        }
    }

    /// Render a message with emote substitution.
    ///
    /// Provider ranges are applied first, then catalog tokens, then the
    /// length budget. If the catalog cannot be loaded the message is
    /// rendered as plain truncated text — never an error, never blank.
    pub async fn render(&self, text: &str, range_spec: Option<&str>) -> Vec<Segment> {
        match self.resolver.catalog().await {
            Ok(catalog) => segment_message(text, range_spec, &catalog, self.max_visible_len),
            Err(e) => {
                warn!(error = %e, "emote catalog unavailable, rendering plain text");
                self.render_plain(text)
            }
        }
    }

    /// Render without any emote substitution, truncated to the budget.
    #[must_use]
    pub fn render_plain(&self, text: &str) -> Vec<Segment> {
        if text.is_empty() {
            return Vec::new();
        }
        let truncated: String = text.chars().take(self.max_visible_len).collect();
        vec![Segment::Text(truncated)]
    }

    /// The configured visible-length budget.
    #[must_use]
    pub fn max_visible_len(&self) -> usize {
        self.max_visible_len
    }
}
