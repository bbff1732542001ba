//! Parser for structured course documents.
//!
//! Expected shape: a short header (`Course Title:` / `Course Link:` /
//! `Course Instructor:` lines, prefixes optional), then lesson sections each
//! introduced by a `Lesson N: title` marker with an optional `Lesson Link:`
//! line directly underneath. Text without any lesson marker ingests as a
//! single unnumbered section.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Course, Lesson, RagError};

static LESSON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Lesson\s+(\d+)\s*:\s*(.+)$").expect("lesson marker regex"));

/// A parsed document: the course record plus the raw body of each section,
/// kept separate so the chunker can work on clean lesson text.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDocument {
    pub course: Course,
    pub sections: Vec<Section>,
}

/// One lesson body (or the whole body, for marker-less documents).
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub lesson_number: Option<u32>,
    pub lesson_title: Option<String>,
    pub body: String,
}

/// Parse one document's raw text into a [`ParsedDocument`].
///
/// Fails only when no course title can be determined (empty document or a
/// document that opens directly with a lesson marker).
pub fn parse_course_document(text: &str) -> Result<ParsedDocument, RagError> {
    let lines: Vec<&str> = text.lines().collect();

    let marker_start = lines
        .iter()
        .position(|line| LESSON_MARKER.is_match(line.trim()))
        .unwrap_or(lines.len());

    let mut title: Option<String> = None;
    let mut link: Option<String> = None;
    let mut instructor: Option<String> = None;

    // Header: leading empty or prefixed lines; the first unprefixed line
    // doubles as a title fallback, anything after that is body.
    let mut header_end = 0;
    while header_end < marker_start {
        let line = lines[header_end].trim();
        if line.is_empty() {
            header_end += 1;
        } else if let Some(value) = strip_prefix_ci(line, "Course Title:") {
            title = Some(value.to_string());
            header_end += 1;
        } else if let Some(value) = strip_prefix_ci(line, "Course Link:") {
            link = Some(value.to_string());
            header_end += 1;
        } else if let Some(value) = strip_prefix_ci(line, "Course Instructor:") {
            instructor = Some(value.to_string());
            header_end += 1;
        } else if title.is_none() {
            title = Some(line.to_string());
            header_end += 1;
        } else {
            break;
        }
    }

    let title = title.ok_or_else(|| {
        RagError::InvalidDocument("no course title found in document header".into())
    })?;

    let mut lessons = Vec::new();
    let mut sections = Vec::new();
    let mut cursor = marker_start;

    while cursor < lines.len() {
        let marker = LESSON_MARKER
            .captures(lines[cursor].trim())
            .expect("cursor always rests on a lesson marker");
        let number: u32 = marker[1]
            .parse()
            .map_err(|_| RagError::InvalidDocument(format!("lesson number in '{}'", &marker[0])))?;
        let lesson_title = marker[2].trim().to_string();
        cursor += 1;

        // Optional link line directly under the marker.
        let lesson_link = lines
            .get(cursor)
            .and_then(|line| strip_prefix_ci(line.trim(), "Lesson Link:"))
            .map(|value| {
                cursor += 1;
                value.to_string()
            });

        let body_start = cursor;
        while cursor < lines.len() && !LESSON_MARKER.is_match(lines[cursor].trim()) {
            cursor += 1;
        }
        let body = lines[body_start..cursor].join("\n").trim().to_string();

        lessons.push(Lesson {
            number,
            title: lesson_title.clone(),
            link: lesson_link,
        });
        if !body.is_empty() {
            sections.push(Section {
                lesson_number: Some(number),
                lesson_title: Some(lesson_title),
                body,
            });
        }
    }

    // No markers at all: everything after the header is one unnumbered section.
    if lessons.is_empty() {
        let body = lines[header_end..marker_start].join("\n").trim().to_string();
        if !body.is_empty() {
            sections.push(Section {
                lesson_number: None,
                lesson_title: None,
                body,
            });
        }
    }

    Ok(ParsedDocument {
        course: Course {
            title,
            link,
            instructor,
            lessons,
        },
        sections,
    })
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(line[prefix.len()..].trim())
    } else {
        None
    }
}
