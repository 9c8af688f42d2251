//! Throwaway Zotero-shaped databases for tests.
//!
//! Only the tables and columns the store reads are created. Item type and
//! field ids are arbitrary; the store matches on names, never on ids.

use std::path::{Path, PathBuf};

use annorelay_shared::{AnnoRelayError, Result};
use libsql::{Connection, Database, params};

/// Zotero's `itemAnnotations.type` values.
pub mod annotation_kind {
    pub const HIGHLIGHT: i64 = 1;
    pub const NOTE: i64 = 2;
    pub const IMAGE: i64 = 3;
    pub const INK: i64 = 4;
    pub const UNDERLINE: i64 = 5;
}

const SCHEMA: &str = r#"
CREATE TABLE itemTypes (
    itemTypeID INTEGER PRIMARY KEY,
    typeName   TEXT NOT NULL UNIQUE
);

INSERT INTO itemTypes (itemTypeID, typeName) VALUES
    (1, 'annotation'),
    (3, 'attachment'),
    (11, 'conferencePaper'),
    (22, 'journalArticle'),
    (28, 'note');

CREATE TABLE items (
    itemID     INTEGER PRIMARY KEY,
    itemTypeID INT NOT NULL,
    libraryID  INT NOT NULL DEFAULT 1,
    key        TEXT NOT NULL,
    UNIQUE (libraryID, key)
);

CREATE TABLE itemAttachments (
    itemID       INTEGER PRIMARY KEY,
    parentItemID INT,
    contentType  TEXT,
    path         TEXT
);

CREATE TABLE itemAnnotations (
    itemID       INTEGER PRIMARY KEY,
    parentItemID INT NOT NULL,
    type         INTEGER NOT NULL,
    text         TEXT,
    comment      TEXT,
    color        TEXT,
    pageLabel    TEXT,
    sortIndex    TEXT NOT NULL DEFAULT '00000|000000|00000'
);

CREATE TABLE fields (
    fieldID   INTEGER PRIMARY KEY,
    fieldName TEXT NOT NULL UNIQUE
);

INSERT INTO fields (fieldID, fieldName) VALUES
    (1, 'title'),
    (2, 'url'),
    (3, 'date'),
    (4, 'DOI'),
    (5, 'publicationTitle'),
    (6, 'proceedingsTitle'),
    (7, 'conferenceName'),
    (8, 'bookTitle'),
    (9, 'websiteTitle'),
    (10, 'ISBN'),
    (11, 'ISSN');

CREATE TABLE itemDataValues (
    valueID INTEGER PRIMARY KEY,
    value   UNIQUE
);

CREATE TABLE itemData (
    itemID  INT,
    fieldID INT,
    valueID INT,
    PRIMARY KEY (itemID, fieldID)
);

CREATE TABLE creators (
    creatorID INTEGER PRIMARY KEY,
    firstName TEXT,
    lastName  TEXT,
    fieldMode INT
);

CREATE TABLE itemCreators (
    itemID        INT NOT NULL,
    creatorID     INT NOT NULL,
    creatorTypeID INT NOT NULL DEFAULT 1,
    orderIndex    INT NOT NULL DEFAULT 0,
    PRIMARY KEY (itemID, creatorTypeID, orderIndex)
);
"#;

/// A fresh path under the system temp directory.
pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("annorelay_test_{}.sqlite", uuid::Uuid::now_v7()))
}

/// Read-write handle used to populate a fixture database.
pub struct FixtureDb {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    path: PathBuf,
}

impl FixtureDb {
    /// Create a new database at `path` with the Zotero subset schema.
    pub async fn create(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AnnoRelayError::Storage(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| AnnoRelayError::Storage(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| AnnoRelayError::Storage(format!("fixture schema failed: {e}")))?;

        Ok(Self {
            db,
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Create a fixture at a fresh temp path.
    pub async fn create_temp() -> Result<Self> {
        Self::create(&temp_db_path()).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn exec(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<()> {
        self.conn
            .execute(sql, params)
            .await
            .map_err(|e| AnnoRelayError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Run a raw statement, e.g. to damage the schema after seeding.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        self.exec(sql, ()).await
    }

    /// Insert an `items` row whose type is looked up by name.
    pub async fn add_item(&self, item_id: i64, key: &str, type_name: &str) -> Result<()> {
        self.exec(
            "INSERT INTO items (itemID, itemTypeID, key)
             SELECT ?1, itemTypeID, ?2 FROM itemTypes WHERE typeName = ?3",
            params![item_id, key, type_name],
        )
        .await
    }

    /// Insert an attachment item and its `itemAttachments` row.
    pub async fn add_attachment(&self, item_id: i64, key: &str, parent: Option<i64>) -> Result<()> {
        self.add_item(item_id, key, "attachment").await?;
        self.exec(
            "INSERT INTO itemAttachments (itemID, parentItemID, contentType)
             VALUES (?1, ?2, 'application/pdf')",
            params![item_id, parent],
        )
        .await
    }

    /// Insert an annotation item under `attachment`.
    pub async fn add_annotation(
        &self,
        item_id: i64,
        attachment: i64,
        kind: i64,
        text: Option<&str>,
        color: Option<&str>,
    ) -> Result<()> {
        self.add_item(item_id, &format!("ANN{item_id:05}"), "annotation")
            .await?;
        self.exec(
            "INSERT INTO itemAnnotations (itemID, parentItemID, type, text, color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![item_id, attachment, kind, text, color],
        )
        .await
    }

    /// Shorthand for a highlight annotation.
    pub async fn add_highlight(
        &self,
        item_id: i64,
        attachment: i64,
        text: &str,
        color: &str,
    ) -> Result<()> {
        self.add_annotation(
            item_id,
            attachment,
            annotation_kind::HIGHLIGHT,
            Some(text),
            Some(color),
        )
        .await
    }

    /// Set a bibliographic field on an item, interning the value.
    pub async fn set_field(&self, item_id: i64, field_name: &str, value: &str) -> Result<()> {
        self.exec(
            "INSERT OR IGNORE INTO itemDataValues (value) VALUES (?1)",
            params![value],
        )
        .await?;
        self.exec(
            "INSERT INTO itemData (itemID, fieldID, valueID)
             SELECT ?1, f.fieldID, v.valueID
             FROM fields f, itemDataValues v
             WHERE f.fieldName = ?2 AND v.value = ?3",
            params![item_id, field_name, value],
        )
        .await
    }

    /// Attach a creator to an item at position `order`.
    pub async fn add_creator(
        &self,
        item_id: i64,
        first: &str,
        last: &str,
        order: i64,
    ) -> Result<()> {
        let field_mode: i64 = if first.is_empty() { 1 } else { 0 };
        self.exec(
            "INSERT INTO creators (firstName, lastName, fieldMode) VALUES (?1, ?2, ?3)",
            params![first, last, field_mode],
        )
        .await?;
        self.exec(
            "INSERT INTO itemCreators (itemID, creatorID, orderIndex)
             VALUES (?1, last_insert_rowid(), ?2)",
            params![item_id, order],
        )
        .await
    }
}
