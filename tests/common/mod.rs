//! Shared fixtures for integration tests: in-memory sqlite-vec storage,
//! deterministic mock embeddings, and scripted model replies.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use coursesmith::app::Assistant;
use coursesmith::config::RagConfig;
use coursesmith::embeddings::MockEmbeddingProvider;
use coursesmith::model::ModelReply;
use coursesmith::providers::MockModelService;
use coursesmith::stores::{RetrievalStore, SqliteBackend};

pub const DIMS: usize = 32;

pub const COURSE_X_DOC: &str = "\
Course Title: Course X
Course Link: https://example.com/course-x
Course Instructor: Pat Example
Lesson 0: Overview
Lesson Link: https://example.com/course-x/0
This course introduces retrieval. The overview stays short.
Lesson 1: Vector Embeddings
Lesson Link: https://example.com/course-x/1
Embeddings map text into vectors that capture meaning. Similar passages land close together.
";

pub const COURSE_Y_DOC: &str = "\
Course Title: Course Y
Course Instructor: Sam Example
Lesson 1: Unrelated Material
This course covers something else entirely. It talks about scheduling.
";

/// Route `tracing` output through the test harness, once per binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn sqlite_store() -> (Arc<SqliteBackend>, RetrievalStore) {
    init_tracing();
    let backend = Arc::new(SqliteBackend::open_in_memory(DIMS).await.unwrap());
    let store = RetrievalStore::new(
        backend.clone(),
        Arc::new(MockEmbeddingProvider::with_dimensions(DIMS)),
        5,
    );
    (backend, store)
}

pub async fn sqlite_assistant(replies: Vec<ModelReply>) -> (Assistant, Arc<MockModelService>) {
    init_tracing();
    let backend = Arc::new(SqliteBackend::open_in_memory(DIMS).await.unwrap());
    let model = Arc::new(MockModelService::scripted(replies));
    let assistant = Assistant::builder()
        .with_config(RagConfig::default())
        .with_backend(backend)
        .with_embeddings(Arc::new(MockEmbeddingProvider::with_dimensions(DIMS)))
        .with_model(model.clone())
        .build();
    (assistant, model)
}

pub async fn write_doc(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, contents).await.unwrap();
    path
}
