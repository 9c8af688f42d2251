//! Core domain types for highlight extraction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnnoRelayError, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Public-facing Zotero item key (e.g. `RFCM2DHI`). Supplied by callers, never generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Build a key from user input, trimming surrounding whitespace.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AnnoRelayError::validation("item key must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal `itemID` of an attachment-typed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentHandle(pub i64);

/// Internal `itemID` of a bibliographic parent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentId(pub i64);

impl std::fmt::Display for AttachmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ParentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Color buckets and categories
// ---------------------------------------------------------------------------

/// One of the five canonical highlight colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBucket {
    Yellow,
    Green,
    Blue,
    Purple,
    Red,
}

impl ColorBucket {
    pub const ALL: [ColorBucket; 5] = [
        ColorBucket::Yellow,
        ColorBucket::Green,
        ColorBucket::Blue,
        ColorBucket::Purple,
        ColorBucket::Red,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Red => "red",
        }
    }

    /// The category this bucket stands for. Static, never configurable.
    pub fn category(self) -> Category {
        match self {
            Self::Yellow => Category::Methods,
            Self::Green => Category::Contribution,
            Self::Blue => Category::Results,
            Self::Purple => Category::Claims,
            Self::Red => Category::Limitations,
        }
    }
}

impl std::fmt::Display for ColorBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorBucket {
    type Err = AnnoRelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            "purple" => Ok(Self::Purple),
            "red" => Ok(Self::Red),
            other => Err(AnnoRelayError::validation(format!(
                "unknown color bucket '{other}'"
            ))),
        }
    }
}

/// Semantic highlight category. Declaration order is the delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Methods,
    Contribution,
    Results,
    Claims,
    Limitations,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Methods,
        Category::Contribution,
        Category::Results,
        Category::Claims,
        Category::Limitations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Methods => "methods",
            Self::Contribution => "contribution",
            Self::Results => "results",
            Self::Claims => "claims",
            Self::Limitations => "limitations",
        }
    }

    /// Capitalized label for headings.
    pub fn title(self) -> &'static str {
        match self {
            Self::Methods => "Methods",
            Self::Contribution => "Contribution",
            Self::Results => "Results",
            Self::Claims => "Claims",
            Self::Limitations => "Limitations",
        }
    }

    pub fn bucket(self) -> ColorBucket {
        match self {
            Self::Methods => ColorBucket::Yellow,
            Self::Contribution => ColorBucket::Green,
            Self::Results => ColorBucket::Blue,
            Self::Claims => ColorBucket::Purple,
            Self::Limitations => ColorBucket::Red,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// A highlight row as stored, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnnotation {
    /// `itemID` of the annotation row.
    pub id: i64,
    /// Highlighted text, untrimmed. `None` when the column is NULL.
    pub text: Option<String>,
    /// Color exactly as stored (usually `#rrggbb`).
    pub color: Option<String>,
}

/// A highlight with a known category and non-empty trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedAnnotation {
    pub id: i64,
    pub text: String,
    pub bucket: ColorBucket,
    pub category: Category,
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Bibliographic fields of a parent record. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Authors in creator order, each rendered as "first last".
    #[serde(default)]
    pub authors: Vec<String>,
    pub year: Option<String>,
    pub venue: Option<String>,
    /// DOI, or another standard identifier when no DOI is recorded.
    pub identifier: Option<String>,
}

impl MetadataRecord {
    /// Authors joined for single-line display, `None` when there are none.
    pub fn authors_joined(&self) -> Option<String> {
        if self.authors.is_empty() {
            None
        } else {
            Some(self.authors.join(", "))
        }
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.authors.is_empty()
            && self.year.is_none()
            && self.venue.is_none()
            && self.identifier.is_none()
    }
}
