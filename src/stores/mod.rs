//! Dual-index retrieval storage.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │  RetrievalStore  │  embeds queries, resolves fuzzy
//!                  │                  │  course names, builds filters
//!                  └────────┬─────────┘
//!                           │
//!                  ┌────────▼─────────┐
//!                  │  Backend trait   │  create-if-absent collections,
//!                  │  (async CRUD)    │  upsert / ranked filtered query
//!                  └────────┬─────────┘
//!                           │
//!                  ┌────────▼─────────┐
//!                  │     SQLite       │  vec0 virtual tables via
//!                  │   sqlite-vec     │  tokio-rusqlite
//!                  └──────────────────┘
//! ```
//!
//! Two collections live behind the trait: the **catalog index** (one row per
//! course, embedded document is the title, used only for fuzzy name
//! resolution) and the **content index** (one row per chunk, exact-match
//! filterable by course title and lesson number).

pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::embeddings::EmbeddingProvider;
use crate::types::{
    CatalogEntry, Course, CourseChunk, RagError, ScoredChunk, SearchFilter, SearchOutcome,
};

pub use sqlite::SqliteBackend;

/// Vector-index capability consumed by [`RetrievalStore`].
///
/// Implementations own both collections and guarantee internal consistency
/// between a row and its embedding.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Idempotent catalog upsert keyed by course title.
    async fn upsert_course(&self, entry: CatalogEntry, embedding: Vec<f32>)
        -> Result<(), RagError>;

    /// Existence check used to skip re-ingestion.
    async fn course_exists(&self, title: &str) -> Result<bool, RagError>;

    /// Fetch a catalog row by exact title.
    async fn catalog_entry(&self, title: &str) -> Result<Option<CatalogEntry>, RagError>;

    /// All catalog titles, unordered.
    async fn course_titles(&self) -> Result<Vec<String>, RagError>;

    /// Single nearest catalog hit for an embedded candidate, with its
    /// distance. `None` only when the catalog is empty.
    async fn nearest_course(&self, embedding: &[f32]) -> Result<Option<(String, f32)>, RagError>;

    /// Bulk upsert into the content index.
    async fn insert_chunks(&self, rows: Vec<(CourseChunk, Vec<f32>)>) -> Result<(), RagError>;

    /// Ranked content query, ascending distance, capped at `limit`.
    async fn query_chunks(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError>;

    /// Total chunks stored.
    async fn chunk_count(&self) -> Result<usize, RagError>;
}

/// How a fuzzy course-name candidate is accepted.
///
/// The permissive default takes the nearest catalog hit no matter how far
/// away it is, a documented source of mismatches. `WithinDistance` rejects
/// hits beyond a caller-chosen cosine distance; no default threshold is
/// shipped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResolutionPolicy {
    AcceptBest,
    WithinDistance { max_distance: f32 },
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self::AcceptBest
    }
}

impl ResolutionPolicy {
    fn accepts(&self, distance: f32) -> bool {
        match self {
            Self::AcceptBest => true,
            Self::WithinDistance { max_distance } => distance <= *max_distance,
        }
    }
}

/// High-level retrieval API over a [`Backend`] and an embedding provider.
pub struct RetrievalStore {
    backend: Arc<dyn Backend>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_results: usize,
    policy: ResolutionPolicy,
}

impl RetrievalStore {
    pub fn new(
        backend: Arc<dyn Backend>,
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> Self {
        Self {
            backend,
            embedder,
            max_results,
            policy: ResolutionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upsert a course into the catalog. Callers wanting skip-if-present
    /// semantics check [`course_exists`](Self::course_exists) first.
    pub async fn add_course(&self, course: &Course) -> Result<(), RagError> {
        let entry = CatalogEntry::from(course);
        let embedding = self.embedder.embed(&entry.title).await?;
        self.backend.upsert_course(entry, embedding).await
    }

    /// Embed and upsert a batch of chunks into the content index.
    pub async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        let rows = chunks.iter().cloned().zip(embeddings).collect();
        self.backend.insert_chunks(rows).await
    }

    pub async fn course_exists(&self, title: &str) -> Result<bool, RagError> {
        self.backend.course_exists(title).await
    }

    pub async fn course_titles(&self) -> Result<Vec<String>, RagError> {
        self.backend.course_titles().await
    }

    pub async fn course_count(&self) -> Result<usize, RagError> {
        Ok(self.backend.course_titles().await?.len())
    }

    pub async fn chunk_count(&self) -> Result<usize, RagError> {
        self.backend.chunk_count().await
    }

    /// Resolve a fuzzy course-name candidate to a catalog title.
    ///
    /// `Ok(None)` means the catalog is empty or the policy rejected the
    /// nearest hit.
    pub async fn resolve_course_name(&self, candidate: &str) -> Result<Option<String>, RagError> {
        let embedding = self.embedder.embed(candidate).await?;
        let nearest = self.backend.nearest_course(&embedding).await?;
        Ok(nearest.and_then(|(title, distance)| {
            if self.policy.accepts(distance) {
                Some(title)
            } else {
                tracing::debug!(candidate, %title, distance, "nearest course rejected by policy");
                None
            }
        }))
    }

    /// Filtered similarity search over the content index.
    ///
    /// Resolution failure and index failure are distinct in-band outcomes;
    /// zero hits is `Hits(vec![])`. Callers must not conflate the three in
    /// user-facing text.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchOutcome {
        match self.try_search(query, course_name, lesson_number).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "content search unavailable");
                SearchOutcome::Unavailable {
                    detail: err.to_string(),
                }
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchOutcome, RagError> {
        let course_title = match course_name {
            Some(candidate) => match self.resolve_course_name(candidate).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchOutcome::NoMatchingCourse {
                        candidate: candidate.to_string(),
                    });
                }
            },
            None => None,
        };

        let filter = SearchFilter {
            course_title,
            lesson_number,
        };
        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .backend
            .query_chunks(&embedding, &filter, self.max_results)
            .await?;
        Ok(SearchOutcome::Hits(hits))
    }

    /// Resolve a candidate and return its full catalog entry, for outlines.
    pub async fn course_outline(&self, candidate: &str) -> Result<Option<CatalogEntry>, RagError> {
        match self.resolve_course_name(candidate).await? {
            Some(title) => self.backend.catalog_entry(&title).await,
            None => Ok(None),
        }
    }

    /// Link of one lesson, when the catalog knows it.
    pub async fn lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>, RagError> {
        Ok(self
            .backend
            .catalog_entry(course_title)
            .await?
            .and_then(|entry| entry.lesson(lesson_number).and_then(|l| l.link.clone())))
    }
}
