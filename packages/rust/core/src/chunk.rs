//! Splitting numbered entries into size-bounded segments.
//!
//! Lengths are counted in characters, which is how chat services measure
//! their message limits.

use serde::Serialize;

use annorelay_shared::{DeliveryConfig, OversizePolicy};

/// Marker appended to truncated entries.
pub const ELLIPSIS: char = '…';

/// One delivery-ready block of numbered entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// 1-based number of the first entry in this segment.
    pub first_number: usize,
    /// Original entry texts, unnumbered and untruncated.
    pub entries: Vec<String>,
    /// Rendered text: numbered entries joined by the separator.
    pub text: String,
    /// Single entry that alone exceeds the limit.
    pub oversized: bool,
    /// `text` was cut to fit and ends with [`ELLIPSIS`].
    pub truncated: bool,
}

impl Segment {
    /// Rendered length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chunk with the default separator and oversize policy.
pub fn chunk<S: AsRef<str>>(texts: &[S], max_length: usize) -> Vec<Segment> {
    let config = DeliveryConfig {
        max_length,
        ..DeliveryConfig::default()
    };
    chunk_with(texts, &config)
}

/// Greedy chunking of numbered entries.
///
/// Entries are rendered as `"{n}. {text}"` and appended to the current segment
/// while its length, separators included, stays within `max_length`. An entry
/// is never split. One that is longer than `max_length` on its own becomes a
/// segment by itself: kept whole and flagged `oversized`, or cut with an
/// ellipsis under [`OversizePolicy::Truncate`].
pub fn chunk_with<S: AsRef<str>>(texts: &[S], config: &DeliveryConfig) -> Vec<Segment> {
    let max = config.max_length;
    let sep = config.entry_separator.as_str();
    let sep_len = sep.chars().count();

    let mut segments = Vec::new();
    let mut current: Option<Builder> = None;

    for (idx, raw) in texts.iter().enumerate() {
        let raw = raw.as_ref();
        let number = idx + 1;
        let rendered = format!("{number}. {raw}");
        let len = rendered.chars().count();

        if len > max {
            if let Some(builder) = current.take() {
                segments.push(builder.finish());
            }
            let (text, truncated) = match config.oversize {
                OversizePolicy::Isolate => (rendered, false),
                OversizePolicy::Truncate => (truncate(&rendered, max), true),
            };
            segments.push(Segment {
                first_number: number,
                entries: vec![raw.to_string()],
                text,
                oversized: true,
                truncated,
            });
            continue;
        }

        match current.as_mut() {
            Some(builder) if builder.len + sep_len + len <= max => {
                builder.text.push_str(sep);
                builder.text.push_str(&rendered);
                builder.len += sep_len + len;
                builder.entries.push(raw.to_string());
            }
            _ => {
                if let Some(builder) = current.take() {
                    segments.push(builder.finish());
                }
                current = Some(Builder {
                    first_number: number,
                    entries: vec![raw.to_string()],
                    text: rendered,
                    len,
                });
            }
        }
    }

    if let Some(builder) = current {
        segments.push(builder.finish());
    }
    segments
}

struct Builder {
    first_number: usize,
    entries: Vec<String>,
    text: String,
    len: usize,
}

impl Builder {
    fn finish(self) -> Segment {
        Segment {
            first_number: self.first_number,
            entries: self.entries,
            text: self.text,
            oversized: false,
            truncated: false,
        }
    }
}

/// Cut `s` to `max` characters, the last being [`ELLIPSIS`].
fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(segments: &[Segment]) -> Vec<String> {
        segments.iter().flat_map(|s| s.entries.clone()).collect()
    }

    #[test]
    fn fifty_entries_fit_in_two_segments() {
        let texts: Vec<String> = (0..50).map(|i| format!("{i:02}{}", "x".repeat(43))).collect();
        assert!(texts.iter().all(|t| t.chars().count() == 45));

        let segments = chunk(&texts, 2000);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].entries.len(), 40);
        assert_eq!(segments[1].entries.len(), 10);
        assert_eq!(segments[1].first_number, 41);
        assert!(segments.iter().all(|s| s.len() <= 2000));
        assert_eq!(flatten(&segments), texts);
    }

    #[test]
    fn entries_are_numbered_and_separated() {
        let segments = chunk(&["alpha", "beta"], 100);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "1. alpha\n2. beta");
        assert_eq!(segments[0].len(), 16);
    }

    #[test]
    fn exact_fit_stays_in_one_segment() {
        // "1. abc" (6) + "\n" (1) + "2. def" (6) = 13
        let segments = chunk(&["abc", "def"], 13);
        assert_eq!(segments.len(), 1);

        let segments = chunk(&["abc", "def"], 12);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "2. def");
    }

    #[test]
    fn oversized_entry_is_isolated_whole() {
        let long = "y".repeat(30);
        let texts = vec!["short".to_string(), long.clone(), "tail".to_string()];
        let segments = chunk(&texts, 20);

        assert_eq!(segments.len(), 3);
        assert!(segments[1].oversized);
        assert!(!segments[1].truncated);
        assert_eq!(segments[1].text, format!("2. {long}"));
        assert!(segments[0].len() <= 20 && segments[2].len() <= 20);
        assert_eq!(flatten(&segments), texts);
    }

    #[test]
    fn truncate_policy_cuts_with_ellipsis() {
        let config = DeliveryConfig {
            max_length: 10,
            oversize: OversizePolicy::Truncate,
            ..DeliveryConfig::default()
        };
        let segments = chunk_with(&["a very long highlight"], &config);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].truncated);
        assert_eq!(segments[0].len(), 10);
        assert!(segments[0].text.ends_with(ELLIPSIS));
        assert_eq!(segments[0].entries, vec!["a very long highlight".to_string()]);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // "1. ééé" is 6 chars but 9 bytes.
        let segments = chunk(&["ééé", "ééé"], 13);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn custom_separator_counts_toward_length() {
        let config = DeliveryConfig {
            max_length: 14,
            entry_separator: "\n\n".into(),
            ..DeliveryConfig::default()
        };
        // 6 + 2 + 6 = 14
        let segments = chunk_with(&["abc", "def", "ghi"], &config);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "1. abc\n\n2. def");
    }

    #[test]
    fn empty_input_yields_no_segments() {
        let empty: [&str; 0] = [];
        assert!(chunk(&empty, 100).is_empty());
    }
}
