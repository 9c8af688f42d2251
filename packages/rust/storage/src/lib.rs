//! Read-only access to a local Zotero database (`zotero.sqlite`).
//!
//! The [`ZoteroStore`] wraps a libSQL connection opened with read-only flags.
//! One store is opened per request and dropped when the request finishes, so
//! the file handle is released on every exit path.
//!
//! **Tables read:**
//! - `items` + `itemTypes`: key lookup with an `attachment` type filter
//! - `itemAttachments`: attachment → parent item
//! - `itemAnnotations`: highlight rows (`type = 1`)
//! - `itemData` + `fields` + `itemDataValues`, `itemCreators` + `creators`: metadata

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use annorelay_shared::{
    AnnoRelayError, AttachmentHandle, ItemKey, MetadataRecord, ParentId, RawAnnotation, Result,
};
use libsql::{Connection, Database, OpenFlags, Value, params};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

/// `itemAnnotations.type` for highlights.
const HIGHLIGHT_TYPE: i64 = 1;

/// Tables the extraction path cannot work without.
const REQUIRED_TABLES: [&str; 4] = ["items", "itemTypes", "itemAttachments", "itemAnnotations"];

/// Venue fields, in order of preference.
const VENUE_FIELDS: [&str; 5] = [
    "publicationTitle",
    "proceedingsTitle",
    "conferenceName",
    "bookTitle",
    "websiteTitle",
];

/// Identifier fields, in order of preference.
const IDENTIFIER_FIELDS: [&str; 3] = ["DOI", "ISBN", "ISSN"];

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

/// Read-only handle on a Zotero database.
pub struct ZoteroStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    path: PathBuf,
}

/// Number of highlights using one raw color string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorCount {
    /// Color as stored; `None` for NULL.
    pub color: Option<String>,
    pub hits: u64,
}

fn storage_err(e: libsql::Error) -> AnnoRelayError {
    AnnoRelayError::Storage(e.to_string())
}

impl ZoteroStore {
    /// Open `path` read-only and check that it looks like a Zotero database.
    ///
    /// Every failure here is reported as `StoreUnavailable`, so callers can
    /// tell a broken store apart from a key that does not exist.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AnnoRelayError::store_unavailable(path, "file not found"));
        }

        let db = libsql::Builder::new_local(path)
            .flags(OpenFlags::SQLITE_OPEN_READ_ONLY)
            .build()
            .await
            .map_err(|e| AnnoRelayError::store_unavailable(path, e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AnnoRelayError::store_unavailable(path, e.to_string()))?;

        let store = Self {
            db,
            conn,
            path: path.to_path_buf(),
        };
        store.check_schema().await?;
        debug!("zotero store opened read-only");
        Ok(store)
    }

    /// Fail with `StoreUnavailable` if the file is not a database, is locked,
    /// or lacks the tables extraction needs.
    async fn check_schema(&self) -> Result<()> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table'",
                params![],
            )
            .await
            .map_err(|e| AnnoRelayError::store_unavailable(&self.path, e.to_string()))?;

        let mut tables = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AnnoRelayError::store_unavailable(&self.path, e.to_string()))?
        {
            if let Some(name) = text_at(&row, 0) {
                tables.push(name);
            }
        }

        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|t| !tables.iter().any(|name| name == t))
            .collect();
        if !missing.is_empty() {
            return Err(AnnoRelayError::store_unavailable(
                &self.path,
                format!("not a Zotero database (missing tables: {})", missing.join(", ")),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Identifier resolution
    // -----------------------------------------------------------------------

    /// Resolve an item key to its attachment handle.
    ///
    /// Keys of non-attachment items (parents, notes, annotations) resolve to
    /// `NotFound` just like absent keys.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn resolve(&self, key: &ItemKey) -> Result<AttachmentHandle> {
        let mut rows = self
            .conn
            .query(
                "SELECT i.itemID
                 FROM items i
                 JOIN itemTypes t ON t.itemTypeID = i.itemTypeID
                 WHERE i.key = ?1 AND t.typeName = 'attachment'
                 ORDER BY i.itemID
                 LIMIT 1",
                params![key.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => {
                let id = row.get::<i64>(0).map_err(storage_err)?;
                debug!(attachment = id, "resolved item key");
                Ok(AttachmentHandle(id))
            }
            None => Err(AnnoRelayError::not_found(key.as_str())),
        }
    }

    /// Parent record of an attachment, `None` for standalone attachments.
    pub async fn parent_of(&self, handle: AttachmentHandle) -> Result<Option<ParentId>> {
        let mut rows = self
            .conn
            .query(
                "SELECT parentItemID FROM itemAttachments WHERE itemID = ?1",
                params![handle.0],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => match row.get_value(0).map_err(storage_err)? {
                Value::Integer(id) => Ok(Some(ParentId(id))),
                _ => Ok(None),
            },
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    /// All highlight rows of an attachment in insertion order.
    ///
    /// Notes, ink, image and underline annotations are excluded by the query.
    #[instrument(skip(self), fields(attachment = handle.0))]
    pub async fn highlight_rows(&self, handle: AttachmentHandle) -> Result<Vec<RawAnnotation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT itemID, text, color
                 FROM itemAnnotations
                 WHERE parentItemID = ?1 AND type = ?2
                 ORDER BY itemID",
                params![handle.0, HIGHLIGHT_TYPE],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(RawAnnotation {
                id: row.get::<i64>(0).map_err(storage_err)?,
                text: text_at(&row, 1),
                color: text_at(&row, 2),
            });
        }
        debug!(rows = results.len(), "fetched highlight rows");
        Ok(results)
    }

    /// Distinct raw highlight colors of an attachment, most used first.
    pub async fn color_summary(&self, handle: AttachmentHandle) -> Result<Vec<ColorCount>> {
        let mut rows = self
            .conn
            .query(
                "SELECT color, COUNT(*) AS hits
                 FROM itemAnnotations
                 WHERE parentItemID = ?1 AND type = ?2
                 GROUP BY color
                 ORDER BY hits DESC, color",
                params![handle.0, HIGHLIGHT_TYPE],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(ColorCount {
                color: text_at(&row, 0),
                hits: row.get::<i64>(1).map_err(storage_err)?.max(0) as u64,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Bibliographic metadata of the attachment's parent.
    ///
    /// Standalone attachments yield an all-empty record. Each field is looked
    /// up on its own; a failed or missing field leaves only that field empty.
    #[instrument(skip(self), fields(attachment = handle.0))]
    pub async fn fetch_metadata(&self, handle: AttachmentHandle) -> Result<MetadataRecord> {
        let parent = self.parent_of(handle).await?;
        Ok(self.parent_metadata(parent).await)
    }

    /// Metadata for an already resolved parent. `None` yields an empty record.
    pub async fn parent_metadata(&self, parent: Option<ParentId>) -> MetadataRecord {
        let Some(parent) = parent else {
            debug!("attachment has no parent, metadata left empty");
            return MetadataRecord::default();
        };

        let record = MetadataRecord {
            title: self.field(parent, "title").await,
            url: self.field(parent, "url").await,
            authors: self.authors(parent).await,
            year: self
                .field(parent, "date")
                .await
                .and_then(|date| parse_year(&date)),
            venue: self.first_field(parent, &VENUE_FIELDS).await,
            identifier: self.first_field(parent, &IDENTIFIER_FIELDS).await,
        };
        debug!(
            parent = parent.0,
            has_title = record.title.is_some(),
            authors = record.authors.len(),
            "fetched metadata"
        );
        record
    }

    /// One field value, `None` when absent, blank, or when the lookup fails.
    async fn field(&self, item: ParentId, name: &str) -> Option<String> {
        match self.try_field(item, name).await {
            Ok(value) => value,
            Err(e) => {
                debug!(field = name, error = %e, "field lookup failed");
                None
            }
        }
    }

    async fn try_field(&self, item: ParentId, name: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT v.value
                 FROM itemData d
                 JOIN fields f ON f.fieldID = d.fieldID
                 JOIN itemDataValues v ON v.valueID = d.valueID
                 WHERE d.itemID = ?1 AND f.fieldName = ?2",
                params![item.0, name],
            )
            .await
            .map_err(storage_err)?;

        Ok(rows
            .next()
            .await
            .map_err(storage_err)?
            .and_then(|row| scalar_at(&row, 0))
            .filter(|v| !v.is_empty()))
    }

    async fn first_field(&self, item: ParentId, names: &[&str]) -> Option<String> {
        for name in names {
            if let Some(value) = self.field(item, name).await {
                return Some(value);
            }
        }
        None
    }

    /// Creators in declared order as "first last". Failures yield an empty list.
    async fn authors(&self, item: ParentId) -> Vec<String> {
        match self.try_authors(item).await {
            Ok(authors) => authors,
            Err(e) => {
                debug!(error = %e, "creator lookup failed");
                Vec::new()
            }
        }
    }

    async fn try_authors(&self, item: ParentId) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.firstName, c.lastName
                 FROM itemCreators ic
                 JOIN creators c ON c.creatorID = ic.creatorID
                 WHERE ic.itemID = ?1
                 ORDER BY ic.orderIndex",
                params![item.0],
            )
            .await
            .map_err(storage_err)?;

        let mut authors = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let name = format_creator(text_at(&row, 0).as_deref(), text_at(&row, 1).as_deref());
            if !name.is_empty() {
                authors.push(name);
            }
        }
        Ok(authors)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text column value, `None` for NULL or non-text values.
fn text_at(row: &libsql::Row, idx: i32) -> Option<String> {
    match row.get_value(idx).ok()? {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

/// Untyped column (`itemDataValues.value`) rendered as trimmed text.
fn scalar_at(row: &libsql::Row, idx: i32) -> Option<String> {
    match row.get_value(idx).ok()? {
        Value::Text(s) => Some(s.trim().to_string()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

/// "first last", or whichever part is present.
fn format_creator(first: Option<&str>, last: Option<&str>) -> String {
    let first = first.map(str::trim).unwrap_or_default();
    let last = last.map(str::trim).unwrap_or_default();
    match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{first} {last}"),
        (false, true) => first.to_string(),
        (true, false) => last.to_string(),
        (true, true) => String::new(),
    }
}

/// First four-digit run of a Zotero date (`"2020-05-00 2020/05"` → `"2020"`).
fn parse_year(date: &str) -> Option<String> {
    YEAR_RE
        .captures(date)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
