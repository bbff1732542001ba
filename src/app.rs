//! The `Assistant`: process-wide wiring of store, tools, sessions, and the
//! orchestrator, constructed once at startup and shared by request handlers.

use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, OllamaEmbeddingProvider};
use crate::ingestion::{
    chunk_course, parse_course_document, Chunker, PlainTextExtractor, TextExtractor,
};
use crate::model::ModelService;
use crate::orchestrator::Orchestrator;
use crate::providers::AnthropicClient;
use crate::session::SessionStore;
use crate::stores::{Backend, ResolutionPolicy, RetrievalStore, SqliteBackend};
use crate::tools::{OutlineTool, SearchTool, ToolRegistry};
use crate::types::{RagError, SourceRef};

/// Answer to one query: the text, the sources the tools consulted, and the
/// session the exchange was recorded under.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub session_id: String,
}

/// Totals for one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub courses_added: usize,
    pub chunks_added: usize,
    pub documents_skipped: usize,
}

/// Corpus-level numbers, for status endpoints and smoke checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogStats {
    pub course_count: usize,
    pub course_titles: Vec<String>,
    pub chunk_count: usize,
}

/// The assembled assistant context.
pub struct Assistant {
    store: Arc<RetrievalStore>,
    registry: ToolRegistry,
    orchestrator: Orchestrator,
    sessions: SessionStore,
    chunker: Chunker,
    extractor: Box<dyn TextExtractor>,
}

impl Assistant {
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// Wire the full production stack from configuration: sqlite-vec storage,
    /// Ollama embeddings, the Anthropic model client.
    pub async fn from_config(config: RagConfig) -> Result<Self, RagError> {
        let backend = SqliteBackend::open(&config.db_path, config.embedding_dims).await?;
        let embedder = OllamaEmbeddingProvider::new(
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dims,
        );
        let model = AnthropicClient::new(
            config.anthropic_base_url.clone(),
            config.anthropic_api_key.clone(),
            config.anthropic_model.clone(),
        );
        Ok(Self::builder()
            .with_config(config)
            .with_backend(Arc::new(backend))
            .with_embeddings(Arc::new(embedder))
            .with_model(Arc::new(model))
            .build())
    }

    /// Answer one query inside a session.
    ///
    /// The exchange is appended to history only after the tool loop fully
    /// completes; a model-service failure propagates and leaves the session
    /// untouched.
    pub async fn query(
        &self,
        text: &str,
        session_id: Option<&str>,
    ) -> Result<QueryOutcome, RagError> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create(),
        };
        let history = self.sessions.render(&session_id);

        let outcome = self
            .orchestrator
            .respond(text, &history, &self.registry)
            .await?;

        self.sessions.record(&session_id, text, &outcome.answer);
        tracing::debug!(
            session = %session_id,
            sources = outcome.sources.len(),
            "query answered"
        );

        Ok(QueryOutcome {
            answer: outcome.answer,
            sources: outcome.sources,
            session_id,
        })
    }

    /// Ingest one course document. Re-ingesting an already-cataloged title is
    /// a no-op counted as skipped.
    pub async fn ingest_document(&self, path: &Path) -> Result<IngestStats, RagError> {
        let raw = self.extractor.extract(path).await?;
        let parsed = parse_course_document(&raw)?;

        if self.store.course_exists(&parsed.course.title).await? {
            tracing::debug!(title = %parsed.course.title, "course already indexed, skipping");
            return Ok(IngestStats {
                documents_skipped: 1,
                ..Default::default()
            });
        }

        let chunks = chunk_course(&parsed, &self.chunker);
        self.store.add_course(&parsed.course).await?;
        self.store.add_chunks(&chunks).await?;
        tracing::info!(
            title = %parsed.course.title,
            chunks = chunks.len(),
            "course indexed"
        );

        Ok(IngestStats {
            courses_added: 1,
            chunks_added: chunks.len(),
            documents_skipped: 0,
        })
    }

    /// Ingest every `.txt` document in a directory, sorted by file name for
    /// deterministic runs. A failing document is logged and skipped; the run
    /// continues.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestStats, RagError> {
        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
            {
                entries.push(path);
            }
        }
        entries.sort();

        let mut stats = IngestStats::default();
        for path in entries {
            match self.ingest_document(&path).await {
                Ok(one) => {
                    stats.courses_added += one.courses_added;
                    stats.chunks_added += one.chunks_added;
                    stats.documents_skipped += one.documents_skipped;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "document skipped");
                    stats.documents_skipped += 1;
                }
            }
        }
        tracing::info!(
            courses = stats.courses_added,
            chunks = stats.chunks_added,
            skipped = stats.documents_skipped,
            "ingestion run complete"
        );
        Ok(stats)
    }

    pub async fn catalog_stats(&self) -> Result<CatalogStats, RagError> {
        let course_titles = self.store.course_titles().await?;
        Ok(CatalogStats {
            course_count: course_titles.len(),
            course_titles,
            chunk_count: self.store.chunk_count().await?,
        })
    }

    pub fn store(&self) -> &RetrievalStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// Builder for [`Assistant`]. Backend, embeddings, and model service are
/// required; everything else defaults from [`RagConfig`].
#[derive(Default)]
pub struct AssistantBuilder {
    config: Option<RagConfig>,
    backend: Option<Arc<dyn Backend>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    model: Option<Arc<dyn ModelService>>,
    extractor: Option<Box<dyn TextExtractor>>,
    policy: Option<ResolutionPolicy>,
    system_prompt: Option<String>,
}

impl AssistantBuilder {
    #[must_use]
    pub fn with_config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_embeddings(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn ModelService>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn with_resolution_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Assemble the assistant.
    ///
    /// # Panics
    ///
    /// Panics if backend, embeddings, or model service were not provided.
    pub fn build(self) -> Assistant {
        let config = self.config.unwrap_or_default();
        config.warn_on_degenerate_caps();

        let backend = self.backend.expect("AssistantBuilder requires a backend");
        let embedder = self
            .embedder
            .expect("AssistantBuilder requires an embedding provider");
        let model = self.model.expect("AssistantBuilder requires a model service");

        let mut store = RetrievalStore::new(backend, embedder, config.max_results);
        if let Some(policy) = self.policy {
            store = store.with_policy(policy);
        }
        let store = Arc::new(store);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool::new(store.clone())));
        registry.register(Arc::new(OutlineTool::new(store.clone())));

        let mut orchestrator = Orchestrator::new(model);
        if let Some(prompt) = self.system_prompt {
            orchestrator = orchestrator.with_system_prompt(prompt);
        }

        Assistant {
            store,
            registry,
            orchestrator,
            sessions: SessionStore::new(config.max_history),
            chunker: Chunker::new(config.chunk_size, config.chunk_overlap),
            extractor: self.extractor.unwrap_or(Box::new(PlainTextExtractor)),
        }
    }
}
