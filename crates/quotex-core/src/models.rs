//! Data models for QuoteX
//!
//! The promise collection is a four-level tree:
//! Category → Title → Subtitle → Promise.
//!
//! "Title" always names the second level of the tree. A promise's own
//! label is its *promise title* (`Promise::title`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

node_id!(
    /// Stable key of a category row
    CategoryId
);
node_id!(
    /// Stable key of a title row
    TitleId
);
node_id!(
    /// Stable key of a subtitle row
    SubtitleId
);
node_id!(
    /// Stable key of a promise row
    PromiseId
);

/// Which level of the tree a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Category,
    Title,
    Subtitle,
    Promise,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Category => "category",
            NodeKind::Title => "title",
            NodeKind::Subtitle => "subtitle",
            NodeKind::Promise => "promise",
        };
        f.write_str(name)
    }
}

/// Top level of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Second level, scoped to a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub id: TitleId,
    pub category_id: CategoryId,
    pub name: String,
}

/// Third level, scoped to a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: SubtitleId,
    pub title_id: TitleId,
    pub name: String,
}

/// A saved verse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promise {
    /// Unique identifier
    pub id: PromiseId,
    /// Subtitle this promise is filed under
    pub subtitle_id: SubtitleId,
    /// The promise's own label
    pub title: String,
    /// Verse text
    pub verse: String,
    /// Scripture reference, e.g. "Josh 1:9"
    pub reference: String,
    /// When this promise was created
    pub created_at: DateTime<Utc>,
    /// When this promise was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a promise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPromise {
    pub subtitle_id: SubtitleId,
    pub title: String,
    pub verse: String,
    pub reference: String,
}

impl NewPromise {
    pub fn new(subtitle_id: SubtitleId, verse: impl Into<String>) -> Self {
        Self {
            subtitle_id,
            title: String::new(),
            verse: verse.into(),
            reference: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

/// Names of the three ancestors of a promise
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    pub category: String,
    pub title: String,
    pub subtitle: String,
}

impl NodePath {
    pub fn new(
        category: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.category, self.title, self.subtitle)
    }
}

/// Row counts per level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub categories: i64,
    pub titles: i64,
    pub subtitles: i64,
    pub promises: i64,
}
