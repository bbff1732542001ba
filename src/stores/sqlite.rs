//! SQLite + sqlite-vec implementation of the [`Backend`] trait.
//!
//! Layout per collection: one ordinary table holding the row data and one
//! `vec0` virtual table holding the embedding, joined on rowid. Similarity
//! queries rank with `vec_distance_cosine` ascending, embeddings travel as
//! JSON-encoded `float[n]` text.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use tokio_rusqlite::{Connection, OptionalExtension, ffi};

use super::Backend;
use crate::types::{
    CatalogEntry, CourseChunk, Lesson, RagError, ScoredChunk, SearchFilter,
};
use async_trait::async_trait;

/// Both vector collections in one SQLite database.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database at `path` with `dims`-wide embeddings.
    ///
    /// Collections are created if absent; an existing database keeps its
    /// schema, so `dims` must match the provider it was created with.
    pub async fn open(path: impl AsRef<Path>, dims: usize) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn, dims).await
    }

    /// In-memory database, used by tests and throwaway runs.
    pub async fn open_in_memory(dims: usize) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn, dims).await
    }

    async fn initialize(conn: Connection, dims: usize) -> Result<Self, RagError> {
        conn.call(move |conn| -> tokio_rusqlite::Result<()> {
            // Probe the extension before touching the schema.
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Error)?;

            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS catalog (
                     title TEXT PRIMARY KEY,
                     link TEXT,
                     instructor TEXT,
                     lessons TEXT NOT NULL
                 );
                 CREATE VIRTUAL TABLE IF NOT EXISTS catalog_vectors
                     USING vec0(embedding float[{dims}]);
                 CREATE TABLE IF NOT EXISTS chunks (
                     id TEXT PRIMARY KEY,
                     course_title TEXT NOT NULL,
                     lesson_number INTEGER,
                     chunk_index INTEGER NOT NULL,
                     content TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title);
                 CREATE VIRTUAL TABLE IF NOT EXISTS chunk_vectors
                     USING vec0(embedding float[{dims}]);"
            ))
            .map_err(tokio_rusqlite::Error::Error)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        tracing::debug!(dims, "sqlite vector collections ready");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn upsert_course(
        &self,
        entry: CatalogEntry,
        embedding: Vec<f32>,
    ) -> Result<(), RagError> {
        let lessons_json = serde_json::to_string(&entry.lessons)?;
        let embedding_json = serde_json::to_string(&embedding)?;
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Error)?;
                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT rowid FROM catalog WHERE title = ?1",
                        [&entry.title],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(tokio_rusqlite::Error::Error)?;
                if let Some(rowid) = existing {
                    tx.execute("DELETE FROM catalog_vectors WHERE rowid = ?1", [rowid])
                        .map_err(tokio_rusqlite::Error::Error)?;
                    tx.execute("DELETE FROM catalog WHERE rowid = ?1", [rowid])
                        .map_err(tokio_rusqlite::Error::Error)?;
                }
                tx.execute(
                    "INSERT INTO catalog (title, link, instructor, lessons)
                     VALUES (?1, ?2, ?3, ?4)",
                    (
                        &entry.title,
                        &entry.link,
                        &entry.instructor,
                        &lessons_json,
                    ),
                )
                .map_err(tokio_rusqlite::Error::Error)?;
                let rowid = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO catalog_vectors (rowid, embedding) VALUES (?1, ?2)",
                    (rowid, &embedding_json),
                )
                .map_err(tokio_rusqlite::Error::Error)?;
                tx.commit().map_err(tokio_rusqlite::Error::Error)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn course_exists(&self, title: &str) -> Result<bool, RagError> {
        let title = title.to_string();
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<bool> {
                let found: Option<i64> = conn
                    .query_row("SELECT 1 FROM catalog WHERE title = ?1", [&title], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(tokio_rusqlite::Error::Error)?;
                Ok(found.is_some())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn catalog_entry(&self, title: &str) -> Result<Option<CatalogEntry>, RagError> {
        let title = title.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT title, link, instructor, lessons FROM catalog WHERE title = ?1",
                    [&title],
                    |row| {
                        let lessons_json: String = row.get(3)?;
                        let lessons: Vec<Lesson> =
                            serde_json::from_str(&lessons_json).unwrap_or_default();
                        Ok(CatalogEntry {
                            title: row.get(0)?,
                            link: row.get(1)?,
                            instructor: row.get(2)?,
                            lessons,
                        })
                    },
                )
                .optional()
                .map_err(tokio_rusqlite::Error::Error)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn course_titles(&self) -> Result<Vec<String>, RagError> {
        self.conn
            .call(|conn| -> tokio_rusqlite::Result<Vec<String>> {
                let mut stmt = conn
                    .prepare("SELECT title FROM catalog ORDER BY title")
                    .map_err(tokio_rusqlite::Error::Error)?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(tokio_rusqlite::Error::Error)?;
                let mut titles = Vec::new();
                for row in rows {
                    titles.push(row.map_err(tokio_rusqlite::Error::Error)?);
                }
                Ok(titles)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn nearest_course(&self, embedding: &[f32]) -> Result<Option<(String, f32)>, RagError> {
        let embedding_json = serde_json::to_string(embedding)?;
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT c.title, vec_distance_cosine(v.embedding, vec_f32(?1)) AS distance
                     FROM catalog c
                     JOIN catalog_vectors v ON v.rowid = c.rowid
                     ORDER BY distance ASC
                     LIMIT 1",
                    [&embedding_json],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, f32>(1)?)),
                )
                .optional()
                .map_err(tokio_rusqlite::Error::Error)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn insert_chunks(&self, rows: Vec<(CourseChunk, Vec<f32>)>) -> Result<(), RagError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(rows.len());
        for (chunk, embedding) in rows {
            let embedding_json = serde_json::to_string(&embedding)?;
            encoded.push((chunk, embedding_json));
        }
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Error)?;
                for (chunk, embedding_json) in &encoded {
                    // Chunk ids are deterministic, so a re-run replaces rather
                    // than duplicates; the old vector row goes first because
                    // the rowid changes on replace.
                    let id = format!("{}::{}", chunk.course_title, chunk.chunk_index);
                    let existing: Option<i64> = tx
                        .query_row("SELECT rowid FROM chunks WHERE id = ?1", [&id], |row| {
                            row.get(0)
                        })
                        .optional()
                        .map_err(tokio_rusqlite::Error::Error)?;
                    if let Some(rowid) = existing {
                        tx.execute("DELETE FROM chunk_vectors WHERE rowid = ?1", [rowid])
                            .map_err(tokio_rusqlite::Error::Error)?;
                        tx.execute("DELETE FROM chunks WHERE rowid = ?1", [rowid])
                            .map_err(tokio_rusqlite::Error::Error)?;
                    }
                    tx.execute(
                        "INSERT INTO chunks (id, course_title, lesson_number, chunk_index, content)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        (
                            &id,
                            &chunk.course_title,
                            chunk.lesson_number.map(i64::from),
                            chunk.chunk_index as i64,
                            &chunk.text,
                        ),
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;
                    let rowid = tx.last_insert_rowid();
                    tx.execute(
                        "INSERT INTO chunk_vectors (rowid, embedding) VALUES (?1, ?2)",
                        (rowid, embedding_json),
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Error)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn query_chunks(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let embedding_json = serde_json::to_string(embedding)?;
        let course_title = filter.course_title.clone();
        let lesson_number = filter.lesson_number.map(i64::from);
        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<Vec<ScoredChunk>> {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.course_title, c.lesson_number, c.chunk_index, c.content,
                                vec_distance_cosine(v.embedding, vec_f32(?1)) AS distance
                         FROM chunks c
                         JOIN chunk_vectors v ON v.rowid = c.rowid
                         WHERE (?2 IS NULL OR c.course_title = ?2)
                           AND (?3 IS NULL OR c.lesson_number = ?3)
                         ORDER BY distance ASC
                         LIMIT {limit}"
                    ))
                    .map_err(tokio_rusqlite::Error::Error)?;
                let rows = stmt
                    .query_map(
                        (&embedding_json, &course_title, &lesson_number),
                        |row| {
                            Ok(ScoredChunk {
                                course_title: row.get(0)?,
                                lesson_number: row
                                    .get::<_, Option<i64>>(1)?
                                    .map(|n| n as u32),
                                chunk_index: row.get::<_, i64>(2)? as usize,
                                text: row.get(3)?,
                                distance: row.get(4)?,
                            })
                        },
                    )
                    .map_err(tokio_rusqlite::Error::Error)?;
                let mut hits = Vec::new();
                for row in rows {
                    hits.push(row.map_err(tokio_rusqlite::Error::Error)?);
                }
                Ok(hits)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn chunk_count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| -> tokio_rusqlite::Result<usize> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Error)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

/// Register sqlite-vec as an auto extension, once per process.
fn register_sqlite_vec() -> Result<(), RagError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| unsafe {
        type SqliteExtensionInit = unsafe extern "C" fn(
            *mut ffi::sqlite3,
            *mut *mut c_char,
            *const ffi::sqlite3_api_routines,
        ) -> i32;

        let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
        let init_fn: SqliteExtensionInit =
            transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
        let rc = ffi::sqlite3_auto_extension(Some(init_fn));
        if rc != ffi::SQLITE_OK {
            Err(format!("failed to register sqlite-vec extension (code {rc})"))
        } else {
            Ok(())
        }
    })
    .clone()
    .map_err(RagError::Storage)
}
