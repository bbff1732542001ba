//! Domain model shared across ingestion, storage, and the tool loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the retrieval core.
///
/// Tool-level conditions (no matching course, zero hits, malformed tool
/// arguments) are deliberately *not* variants here: they travel back to the
/// model as tool-result text. `RagError` is reserved for failures the
/// coordinator must handle.
#[derive(Debug, Error)]
pub enum RagError {
    /// Vector index or its SQLite host failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding provider failed or returned a malformed batch.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The language-model service was unreachable or returned an
    /// unusable response.
    #[error("model service error: {0}")]
    Model(String),

    /// A source document could not be parsed into a course.
    #[error("invalid course document: {0}")]
    InvalidDocument(String),

    /// A tool was dispatched by a name nobody registered.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A course as parsed from one source document.
///
/// The title is the primary key across both indices; re-ingesting a title
/// that already exists is a no-op.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

/// One lesson within a course. `number` is the ordering key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// An immutable span of lesson text, the unit of semantic search.
///
/// `chunk_index` increases monotonically across the whole course, not per
/// lesson, so a chunk can be addressed without knowing its lesson.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub text: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl CourseChunk {
    pub fn new(
        text: impl Into<String>,
        course_title: impl Into<String>,
        lesson_number: Option<u32>,
        chunk_index: usize,
    ) -> Self {
        Self {
            text: text.into(),
            course_title: course_title.into(),
            lesson_number,
            chunk_index,
        }
    }
}

/// Catalog row backing fuzzy course-name resolution.
///
/// The embedded document is the course title; link, instructor, and the
/// lesson list ride along for outline and link lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl CatalogEntry {
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

impl From<&Course> for CatalogEntry {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            link: course.link.clone(),
            instructor: course.instructor.clone(),
            lessons: course.lessons.clone(),
        }
    }
}

/// Exact-match filter applied to the content index.
///
/// `course_title` holds a *resolved* title; fuzzy candidates never reach the
/// index. Both fields present means AND.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }
}

/// One content-index hit, ascending `distance` means better match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
    pub text: String,
    pub distance: f32,
}

/// Outcome of a retrieval-store search.
///
/// Zero hits is `Hits(vec![])`; callers must not conflate it with
/// `NoMatchingCourse` (the candidate resolved to nothing) or `Unavailable`
/// (the index itself failed) in user-facing text.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    Hits(Vec<ScoredChunk>),
    NoMatchingCourse { candidate: String },
    Unavailable { detail: String },
}

/// Human-readable provenance for one retrieval hit, surfaced to callers
/// alongside the answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub label: String,
    pub link: Option<String>,
}

impl SourceRef {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}
