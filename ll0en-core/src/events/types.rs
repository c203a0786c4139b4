//! Event type definitions.

/// A record received from the happenings feed.
///
/// Owned by the subscriber until it is handed to the classifier; never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// The free-text happening, e.g. `@@name@@ resigned from the World Assembly.`
    pub text: String,
    /// SSE event id, when the feed supplied one.
    pub id: Option<String>,
}

/// The kind of happening a reaction responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A nation resigned from the World Assembly.
    Resignation,
    /// A nation moved out of the tracked region.
    Relocation,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Resignation => write!(f, "resignation"),
            Category::Relocation => write!(f, "relocation"),
        }
    }
}

/// A happening that matched one of the tracked patterns.
///
/// Only the classifier constructs these, and only with a non-empty,
/// normalised nation name. A `Relocation` always originated in the
/// tracked region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedMatch {
    Resignation { nation: String },
    Relocation { nation: String },
}

impl ClassifiedMatch {
    /// The nation the happening refers to.
    pub fn nation(&self) -> &str {
        match self {
            ClassifiedMatch::Resignation { nation } => nation,
            ClassifiedMatch::Relocation { nation } => nation,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ClassifiedMatch::Resignation { .. } => Category::Resignation,
            ClassifiedMatch::Relocation { .. } => Category::Relocation,
        }
    }
}
