//! Ingestion utilities for turning course documents into indexed chunks.
//!
//! Three capabilities live here:
//!
//! * [`parser`] — structured course documents (header + `Lesson N:` sections)
//!   into [`Course`](crate::types::Course) values and lesson bodies.
//! * [`chunker`] — sentence-accumulating, overlap-carrying text chunking.
//! * [`TextExtractor`] — file to raw text; binary formats (PDF/DOCX) are
//!   external concerns behind this trait, plain text is built in.

pub mod chunker;
pub mod parser;

use std::path::Path;

use async_trait::async_trait;

use crate::types::{CourseChunk, RagError};

pub use chunker::Chunker;
pub use parser::{parse_course_document, ParsedDocument, Section};

/// Byte-to-text extraction capability. The format is opaque to the core.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, RagError>;
}

/// Reads the file as UTF-8 text. The default extractor.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, RagError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

/// Chunk every section of a parsed document into [`CourseChunk`]s.
///
/// Chunk indices increase monotonically across the whole course. The first
/// chunk of the course is prefixed with a normalized header
/// (`Course {title} Lesson {n}: {lesson title}`) so it carries course
/// identity even in isolation.
pub fn chunk_course(parsed: &ParsedDocument, chunker: &Chunker) -> Vec<CourseChunk> {
    let mut chunks = Vec::new();
    let mut index = 0usize;

    for section in &parsed.sections {
        for text in chunker.chunk(&section.body) {
            let text = if index == 0 {
                format!("{}\n{}", course_header(parsed, section), text)
            } else {
                text
            };
            chunks.push(CourseChunk::new(
                text,
                parsed.course.title.clone(),
                section.lesson_number,
                index,
            ));
            index += 1;
        }
    }
    chunks
}

fn course_header(parsed: &ParsedDocument, section: &Section) -> String {
    match (section.lesson_number, section.lesson_title.as_deref()) {
        (Some(number), Some(title)) => {
            format!("Course {} Lesson {}: {}", parsed.course.title, number, title)
        }
        _ => format!("Course {}", parsed.course.title),
    }
}
