//! Message segmentation — text plus inline emotes, under a length budget.
//!
//! A chat message becomes an ordered sequence of [`Segment`]s:
//!
//! 1. Provider character ranges (`emoteId:start-end,start-end/...`) are applied
//!    first, in ascending start order; each matched range becomes an emote
//!    regardless of its text content. Malformed, overlapping, or
//!    out-of-bounds ranges are skipped.
//! 2. Remaining whitespace-delimited tokens are checked against a
//!    name-keyed catalog (case-exact); hits become emotes.
//! 3. A running visible-length counter (text per character, each emote
//!    exactly 1) enforces the maximum: overflow truncates a text segment or
//!    drops a would-start emote, and nothing further is appended.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Twitch CDN url template for a provider-ranged emote.
const TWITCH_EMOTE_URL: &str = "https://static-cdn.jtvnw.net/emoticons/v2";

/// One rendered piece of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// A run of plain text.
    Text(String),
    /// An inline emote image.
    Emote {
        /// Image url the renderer should load.
        url: String,
        /// Alt text (the emote name or provider id).
        alt: String,
    },
}

/// Visible length of a rendered sequence: text counts per character, each
/// emote counts as exactly one unit.
#[must_use]
pub fn visible_length(segments: &[Segment]) -> usize {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.chars().count(),
            Segment::Emote { .. } => 1,
        })
        .sum()
}

/// Display url for a Twitch emote id.
#[must_use]
pub fn twitch_emote_url(emote_id: &str) -> String {
    format!("{TWITCH_EMOTE_URL}/{emote_id}/default/dark/1.0")
}

// ---------------------------------------------------------------------------
// Provider range spec
// ---------------------------------------------------------------------------

/// A single provider-declared emote occurrence: characters
/// `start..=end` of the message are the emote `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteRange {
    /// Provider emote id.
    pub id: String,
    /// First character index covered (inclusive).
    pub start: usize,
    /// Last character index covered (inclusive).
    pub end: usize,
}

/// Parse a provider range spec (`emoteId:start-end,start-end/emoteId:...`)
/// into ranges sorted by ascending start. Entries that do not parse, or
/// that overlap an earlier-kept range, are dropped with a warning.
#[must_use]
pub fn parse_range_spec(spec: &str) -> Vec<EmoteRange> {
    let mut ranges = Vec::new();
    for group in spec.split('/').filter(|group| !group.is_empty()) {
        let Some((id, range_list)) = group.split_once(':') else {
            warn!(group, "emote range group without id separator, skipping");
            continue;
        };
        for range in range_list.split(',') {
            let parsed = range
                .split_once('-')
                .and_then(|(start, end)| Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)));
            match parsed {
                Some((start, end)) if start <= end => ranges.push(EmoteRange {
                    id: id.to_string(),
                    start,
                    end,
                }),
                _ => warn!(range, "unparseable emote range, skipping"),
            }
        }
    }

    ranges.sort_by_key(|range| range.start);

    // Drop anything overlapping an earlier range; simple replacement only.
    let mut kept: Vec<EmoteRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match kept.last() {
            Some(previous) if range.start <= previous.end => {
                warn!(
                    id = %range.id,
                    start = range.start,
                    "overlapping emote range, skipping"
                );
            }
            _ => kept.push(range),
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Segmentation pipeline
// ---------------------------------------------------------------------------

/// Intermediate item before the budget pass.
enum Piece<'a> {
    Text(&'a [char]),
    Emote { url: String, alt: String },
}

/// Build the bounded segment sequence for a message.
///
/// `range_spec` is the provider's emote range string, if the transport
/// supplied one; `catalog` maps emote names to urls (case-exact). With no
/// range spec the whole message goes through token substitution; with an
/// empty catalog only provider ranges produce emotes.
#[must_use]
pub fn segment_message(
    text: &str,
    range_spec: Option<&str>,
    catalog: &HashMap<String, String>,
    max_visible_len: usize,
) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    let ranges = range_spec.map(parse_range_spec).unwrap_or_default();

    // Pass 1: provider ranges carve the message into text and emote pieces.
    let mut pieces: Vec<Piece<'_>> = Vec::new();
    let mut cursor = 0usize;
    for range in ranges {
        if range.start >= chars.len() || range.end >= chars.len() {
            warn!(id = %range.id, start = range.start, "emote range out of bounds, skipping");
            continue;
        }
        if range.start > cursor {
            pieces.push(Piece::Text(&chars[cursor..range.start]));
        }
        pieces.push(Piece::Emote {
            url: twitch_emote_url(&range.id),
            alt: range.id,
        });
        cursor = range.end + 1;
    }
    if cursor < chars.len() {
        pieces.push(Piece::Text(&chars[cursor..]));
    }

    // Pass 2: token substitution inside the text pieces, then the budget.
    let mut builder = SegmentBuilder::new(max_visible_len);
    'pieces: for piece in pieces {
        match piece {
            Piece::Emote { url, alt } => {
                if !builder.push_emote(url, alt) {
                    break 'pieces;
                }
            }
            Piece::Text(slice) => {
                let text: String = slice.iter().collect();
                for run in split_keep_whitespace(&text) {
                    let emitted = match catalog.get(run) {
                        Some(url) => builder.push_emote(url.clone(), run.to_string()),
                        None => builder.push_text(run),
                    };
                    if !emitted {
                        break 'pieces;
                    }
                }
            }
        }
    }
    builder.finish()
}

/// Split into alternating word / whitespace runs, keeping both.
fn split_keep_whitespace(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_whitespace = None;
    for (idx, ch) in text.char_indices() {
        let ws = ch.is_whitespace();
        match in_whitespace {
            None => in_whitespace = Some(ws),
            Some(current) if current != ws => {
                runs.push(&text[start..idx]);
                start = idx;
                in_whitespace = Some(ws);
            }
            Some(_) => {}
        }
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

/// Accumulates segments under the visible-length budget, coalescing
/// adjacent text runs into a single [`Segment::Text`].
struct SegmentBuilder {
    segments: Vec<Segment>,
    text_buf: String,
    used: usize,
    max: usize,
}

impl SegmentBuilder {
    fn new(max: usize) -> Self {
        Self {
            segments: Vec::new(),
            text_buf: String::new(),
            used: 0,
            max,
        }
    }

    fn flush_text(&mut self) {
        if !self.text_buf.is_empty() {
            self.segments.push(Segment::Text(std::mem::take(&mut self.text_buf)));
        }
    }

    /// Append a text run; returns false once the budget is exhausted and
    /// the sequence must stop.
    fn push_text(&mut self, run: &str) -> bool {
        let remaining = self.max - self.used;
        if remaining == 0 {
            return false;
        }
        let len = run.chars().count();
        if len <= remaining {
            self.text_buf.push_str(run);
            self.used += len;
            true
        } else {
            self.text_buf.extend(run.chars().take(remaining));
            self.used = self.max;
            false
        }
    }

    /// Append an emote (1 budget unit); returns false if it would not fit.
    fn push_emote(&mut self, url: String, alt: String) -> bool {
        if self.used + 1 > self.max {
            return false;
        }
        self.flush_text();
        self.segments.push(Segment::Emote { url, alt });
        self.used += 1;
        true
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush_text();
        self.segments
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    proptest! {
        #[test]
        fn visible_length_never_exceeds_budget(
            text in ".{0,200}",
            max in 1usize..100,
        ) {
            let segments = segment_message(&text, None, &HashMap::new(), max);
            prop_assert!(visible_length(&segments) <= max);
        }

        #[test]
        fn visible_length_bounded_with_catalog_hits(
            words in proptest::collection::vec("[a-z]{1,8}", 0..40),
            max in 1usize..60,
        ) {
            let text = words.join(" ");
            let catalog: HashMap<String, String> = words
                .iter()
                .step_by(2)
                .map(|w| (w.clone(), format!("https://cdn/{w}")))
                .collect();
            let segments = segment_message(&text, None, &catalog, max);
            prop_assert!(visible_length(&segments) <= max);
        }

        #[test]
        fn range_spec_parsing_never_panics(spec in ".{0,80}") {
            let _ = parse_range_spec(&spec);
        }
    }
}
