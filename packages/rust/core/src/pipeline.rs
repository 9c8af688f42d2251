//! End-to-end extraction: item key → attachment → highlights + metadata.
//!
//! Each call opens its own read-only store and drops it before returning, so
//! concurrent callers never share a connection and nothing is cached.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use annorelay_shared::{
    AppConfig, AttachmentHandle, Category, ClassifiedAnnotation, ClassifierConfig, ColorBucket,
    DeliveryConfig, ItemKey, MetadataRecord, ParentId, RawAnnotation, Result, SheetConfig,
};
use annorelay_storage::ZoteroStore;

use crate::aggregate::{Aggregate, aggregate};
use crate::classifier::ColorClassifier;
use crate::payload::{DeliveryPayload, SheetRow, build_payload, build_sheet_row};

/// Configuration for an [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Path to `zotero.sqlite`.
    pub store_path: PathBuf,
    pub classifier: ClassifierConfig,
}

impl ExtractorConfig {
    /// Merge the store path and classifier settings from the app config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            store_path: config.store_path()?,
            classifier: ClassifierConfig::from(config),
        })
    }
}

/// Result of one extraction request.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub key: ItemKey,
    pub handle: AttachmentHandle,
    pub parent: Option<ParentId>,
    pub metadata: MetadataRecord,
    /// Classified highlights in store order.
    pub annotations: Vec<ClassifiedAnnotation>,
    /// Highlights dropped because their color matched no bucket.
    pub dropped_unclassified: usize,
    /// Highlights dropped because their text was empty after trimming.
    pub dropped_empty: usize,
}

/// Whether an extraction found anything to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Extracted { annotations: usize },
    /// Valid attachment with no classifiable highlights. Informational.
    NoAnnotations,
}

impl Extraction {
    pub fn outcome(&self) -> Outcome {
        if self.annotations.is_empty() {
            Outcome::NoAnnotations
        } else {
            Outcome::Extracted {
                annotations: self.annotations.len(),
            }
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate(&self.annotations)
    }

    /// Per-category chat payload.
    pub fn delivery_payload(&self, config: &DeliveryConfig) -> DeliveryPayload {
        build_payload(&self.key, &self.metadata, &self.aggregate(), config)
    }

    /// Flat spreadsheet row.
    pub fn sheet_row(&self, config: &SheetConfig) -> SheetRow {
        build_sheet_row(&self.metadata, &self.aggregate(), config)
    }
}

/// Annotations that survived classification plus drop counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedRows {
    pub annotations: Vec<ClassifiedAnnotation>,
    pub dropped_unclassified: usize,
    pub dropped_empty: usize,
}

/// Classify raw highlight rows, trimming text and dropping empty or unknown ones.
pub fn classify_rows(classifier: &ColorClassifier, rows: Vec<RawAnnotation>) -> ClassifiedRows {
    let mut out = ClassifiedRows::default();
    for row in rows {
        let Some(bucket) = row.color.as_deref().and_then(|c| classifier.classify_hex(c)) else {
            trace!(annotation = row.id, color = ?row.color, "unclassified color");
            out.dropped_unclassified += 1;
            continue;
        };
        let text = row.text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            out.dropped_empty += 1;
            continue;
        }
        out.annotations.push(ClassifiedAnnotation {
            id: row.id,
            text: text.to_string(),
            bucket,
            category: bucket.category(),
        });
    }
    out
}

/// Highlights of an attachment, classified. Empty when there are none.
pub async fn extract_annotations(
    store: &ZoteroStore,
    classifier: &ColorClassifier,
    handle: AttachmentHandle,
) -> Result<ClassifiedRows> {
    let rows = store.highlight_rows(handle).await?;
    let classified = classify_rows(classifier, rows);
    debug!(
        attachment = handle.0,
        kept = classified.annotations.len(),
        dropped_unclassified = classified.dropped_unclassified,
        dropped_empty = classified.dropped_empty,
        "classified highlights"
    );
    Ok(classified)
}

/// One raw color with its usage count and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorReport {
    pub color: Option<String>,
    pub hits: u64,
    pub bucket: Option<ColorBucket>,
    pub category: Option<Category>,
}

/// Runs extraction requests against one configured store path.
#[derive(Debug, Clone)]
pub struct Extractor {
    store_path: PathBuf,
    classifier: ColorClassifier,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let classifier = ColorClassifier::from(&config.classifier);
        Self {
            store_path: config.store_path,
            classifier,
        }
    }

    pub fn classifier(&self) -> &ColorClassifier {
        &self.classifier
    }

    async fn open(&self) -> Result<ZoteroStore> {
        ZoteroStore::open_readonly(&self.store_path).await
    }

    /// Resolve `key` to its attachment handle.
    pub async fn resolve(&self, key: &ItemKey) -> Result<AttachmentHandle> {
        let store = self.open().await?;
        store.resolve(key).await.map_err(|e| e.for_key(key.as_str()))
    }

    /// Run one full extraction for `key`.
    ///
    /// Fails with `StoreUnavailable` or `NotFound`; an attachment without
    /// highlights is a success with [`Outcome::NoAnnotations`]. Query failures
    /// after the store opened carry `key`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn extract(&self, key: &ItemKey) -> Result<Extraction> {
        self.run_extract(key)
            .await
            .map_err(|e| e.for_key(key.as_str()))
    }

    async fn run_extract(&self, key: &ItemKey) -> Result<Extraction> {
        let store = self.open().await?;
        let handle = store.resolve(key).await?;
        let parent = store.parent_of(handle).await?;

        let ClassifiedRows {
            annotations,
            dropped_unclassified,
            dropped_empty,
        } = extract_annotations(&store, &self.classifier, handle).await?;
        let metadata = store.parent_metadata(parent).await;
        drop(store);

        info!(
            attachment = handle.0,
            annotations = annotations.len(),
            overrides = %self.classifier.overrides().name,
            "extraction complete"
        );

        Ok(Extraction {
            key: key.clone(),
            handle,
            parent,
            metadata,
            annotations,
            dropped_unclassified,
            dropped_empty,
        })
    }

    /// Distinct raw highlight colors for `key` and how each classifies.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn color_report(&self, key: &ItemKey) -> Result<Vec<ColorReport>> {
        let store = self.open().await?;
        let handle = store.resolve(key).await?;
        let summary = store
            .color_summary(handle)
            .await
            .map_err(|e| e.for_key(key.as_str()))?;

        Ok(summary
            .into_iter()
            .map(|c| {
                let bucket = c.color.as_deref().and_then(|hex| self.classifier.classify_hex(hex));
                ColorReport {
                    color: c.color,
                    hits: c.hits,
                    bucket,
                    category: bucket.map(ColorBucket::category),
                }
            })
            .collect())
    }
}
