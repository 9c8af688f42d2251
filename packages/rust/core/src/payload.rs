//! Handoff shapes for the downstream collaborators: per-category chat
//! payloads and a flat spreadsheet row.

use serde::Serialize;

use annorelay_shared::{Category, DeliveryConfig, ItemKey, MetadataRecord, SheetConfig};

use crate::aggregate::Aggregate;
use crate::chunk::{Segment, chunk_with};

// ---------------------------------------------------------------------------
// Delivery payload
// ---------------------------------------------------------------------------

/// One category's intro line and its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPayload {
    pub category: Category,
    pub intro: String,
    pub segments: Vec<Segment>,
}

/// Everything a chat collaborator posts for one item key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryPayload {
    pub key: ItemKey,
    pub max_length: usize,
    pub entries: Vec<CategoryPayload>,
}

impl DeliveryPayload {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of messages the collaborator will send, intros excluded.
    pub fn segment_count(&self) -> usize {
        self.entries.iter().map(|e| e.segments.len()).sum()
    }

    /// Whether any entry exceeded `max_length` (kept whole or truncated).
    pub fn has_oversized(&self) -> bool {
        self.entries
            .iter()
            .flat_map(|e| &e.segments)
            .any(|s| s.oversized)
    }

    /// Reader-facing note about over-long highlights, worded for how they were handled.
    pub fn oversize_note(&self) -> Option<String> {
        let truncated = self
            .entries
            .iter()
            .flat_map(|e| &e.segments)
            .any(|s| s.truncated);
        if truncated {
            Some(format!(
                "some highlights exceeded {} characters and were truncated",
                self.max_length
            ))
        } else if self.has_oversized() {
            Some(format!(
                "some highlights exceed {} characters and were sent on their own",
                self.max_length
            ))
        } else {
            None
        }
    }
}

/// Build chat payloads in category order. Empty categories produce nothing.
pub fn build_payload(
    key: &ItemKey,
    metadata: &MetadataRecord,
    aggregate: &Aggregate,
    config: &DeliveryConfig,
) -> DeliveryPayload {
    let subject = metadata.title.as_deref().unwrap_or(key.as_str());
    let entries = aggregate
        .groups()
        .iter()
        .map(|group| CategoryPayload {
            category: group.category,
            intro: intro_line(group.category, subject, group.texts.len()),
            segments: chunk_with(&group.texts, config),
        })
        .collect();

    DeliveryPayload {
        key: key.clone(),
        max_length: config.max_length,
        entries,
    }
}

fn intro_line(category: Category, subject: &str, count: usize) -> String {
    let noun = if count == 1 { "highlight" } else { "highlights" };
    format!(
        "{} from \"{subject}\" ({count} {noun})",
        category.title()
    )
}

// ---------------------------------------------------------------------------
// Spreadsheet row
// ---------------------------------------------------------------------------

/// Column headers, in cell order.
pub const SHEET_HEADERS: [&str; 10] = [
    "title",
    "authors",
    "year",
    "venue",
    "identifier",
    "methods",
    "contribution",
    "results",
    "claims",
    "limitations",
];

/// Flat record for a single spreadsheet row. Missing metadata stays `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    pub venue: Option<String>,
    pub identifier: Option<String>,
    pub methods: String,
    pub contribution: String,
    pub results: String,
    pub claims: String,
    pub limitations: String,
}

impl SheetRow {
    /// Cells in [`SHEET_HEADERS`] order, `None` rendered as an empty cell.
    pub fn to_cells(&self) -> Vec<String> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            opt(&self.title),
            opt(&self.authors),
            opt(&self.year),
            opt(&self.venue),
            opt(&self.identifier),
            self.methods.clone(),
            self.contribution.clone(),
            self.results.clone(),
            self.claims.clone(),
            self.limitations.clone(),
        ]
    }
}

/// Build the spreadsheet row; each category becomes one delimited text block.
pub fn build_sheet_row(
    metadata: &MetadataRecord,
    aggregate: &Aggregate,
    config: &SheetConfig,
) -> SheetRow {
    let block = |category: Category| {
        aggregate
            .get(category)
            .map(|texts| texts.join(config.block_separator.as_str()))
            .unwrap_or_default()
    };

    SheetRow {
        title: metadata.title.clone(),
        authors: metadata.authors_joined(),
        year: metadata.year.clone(),
        venue: metadata.venue.clone(),
        identifier: metadata.identifier.clone(),
        methods: block(Category::Methods),
        contribution: block(Category::Contribution),
        results: block(Category::Results),
        claims: block(Category::Claims),
        limitations: block(Category::Limitations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use annorelay_shared::{ClassifiedAnnotation, ColorBucket, OversizePolicy};

    fn sample_aggregate() -> Aggregate {
        let anns: Vec<ClassifiedAnnotation> = [
            (1, "we fine-tune on X", ColorBucket::Yellow),
            (2, "a new benchmark", ColorBucket::Green),
            (3, "ablation on Y", ColorBucket::Yellow),
        ]
        .into_iter()
        .map(|(id, text, bucket)| ClassifiedAnnotation {
            id,
            text: text.into(),
            bucket,
            category: bucket.category(),
        })
        .collect();
        aggregate(&anns)
    }

    #[test]
    fn payload_follows_category_order() {
        let key = ItemKey::new("RFCM2DHI").unwrap();
        let meta = MetadataRecord {
            title: Some("Some Paper".into()),
            ..Default::default()
        };
        let payload = build_payload(&key, &meta, &sample_aggregate(), &DeliveryConfig::default());

        assert_eq!(payload.entries.len(), 2);
        assert_eq!(payload.entries[0].category, Category::Methods);
        assert_eq!(
            payload.entries[0].intro,
            "Methods from \"Some Paper\" (2 highlights)"
        );
        assert_eq!(payload.entries[0].segments[0].text, "1. we fine-tune on X\n2. ablation on Y");
        assert_eq!(payload.entries[1].category, Category::Contribution);
        assert!(payload.entries[1].intro.ends_with("(1 highlight)"));
        assert_eq!(payload.segment_count(), 2);
        assert!(!payload.has_oversized());
    }

    #[test]
    fn oversize_note_follows_policy() {
        let key = ItemKey::new("LONGPDF1").unwrap();
        let long = ClassifiedAnnotation {
            id: 9,
            text: "x".repeat(50),
            bucket: ColorBucket::Blue,
            category: Category::Results,
        };
        let agg = aggregate(&[long]);
        let meta = MetadataRecord::default();

        let isolate = DeliveryConfig {
            max_length: 20,
            ..Default::default()
        };
        let payload = build_payload(&key, &meta, &agg, &isolate);
        assert!(payload.has_oversized());
        let note = payload.oversize_note().expect("note");
        assert!(note.contains("sent on their own"), "{note}");

        let truncate = DeliveryConfig {
            max_length: 20,
            oversize: OversizePolicy::Truncate,
            ..Default::default()
        };
        let payload = build_payload(&key, &meta, &agg, &truncate);
        let note = payload.oversize_note().expect("note");
        assert!(note.contains("truncated"), "{note}");

        let fits = build_payload(&key, &meta, &sample_aggregate(), &DeliveryConfig::default());
        assert_eq!(fits.oversize_note(), None);
    }

    #[test]
    fn intro_falls_back_to_item_key() {
        let key = ItemKey::new("ORPHAN01").unwrap();
        let payload = build_payload(
            &key,
            &MetadataRecord::default(),
            &sample_aggregate(),
            &DeliveryConfig::default(),
        );
        assert!(payload.entries[0].intro.contains("\"ORPHAN01\""));
    }

    #[test]
    fn empty_aggregate_gives_empty_payload() {
        let key = ItemKey::new("EMPTYPDF").unwrap();
        let payload = build_payload(
            &key,
            &MetadataRecord::default(),
            &Aggregate::default(),
            &DeliveryConfig::default(),
        );
        assert!(payload.is_empty());
    }

    #[test]
    fn sheet_row_blocks_and_nulls() {
        let meta = MetadataRecord {
            title: Some("Some Paper".into()),
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            year: Some("1843".into()),
            ..Default::default()
        };
        let row = build_sheet_row(&meta, &sample_aggregate(), &SheetConfig::default());

        assert_eq!(row.methods, "we fine-tune on X\n\nablation on Y");
        assert_eq!(row.contribution, "a new benchmark");
        assert_eq!(row.limitations, "");
        assert_eq!(row.venue, None);

        let cells = row.to_cells();
        assert_eq!(cells.len(), SHEET_HEADERS.len());
        assert_eq!(cells[1], "Ada Lovelace, Alan Turing");
        assert_eq!(cells[3], "");
    }
}
