//! The two retrieval-backed tools: content search and course outlines.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolOutput, ToolSchema};
use crate::stores::RetrievalStore;
use crate::types::{ScoredChunk, SearchOutcome, SourceRef};

/// `search_course_content`: filtered similarity search over course material.
pub struct SearchTool {
    store: Arc<RetrievalStore>,
}

impl SearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(store: Arc<RetrievalStore>) -> Self {
        Self { store }
    }

    async fn format_hits(&self, hits: &[ScoredChunk]) -> ToolOutput {
        let mut blocks = Vec::with_capacity(hits.len());
        let mut sources = Vec::with_capacity(hits.len());
        for hit in hits {
            let label = match hit.lesson_number {
                Some(n) => format!("{} - Lesson {}", hit.course_title, n),
                None => hit.course_title.clone(),
            };
            blocks.push(format!("[{label}]\n{}", hit.text));

            let link = match hit.lesson_number {
                Some(n) => self
                    .store
                    .lesson_link(&hit.course_title, n)
                    .await
                    .unwrap_or_default(),
                None => None,
            };
            sources.push(SourceRef::new(label, link));
        }
        ToolOutput {
            text: blocks.join("\n\n"),
            sources,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: String,
    course_name: Option<String>,
    lesson_number: Option<u32>,
}

#[async_trait]
impl Tool for SearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: SearchArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(err) => {
                return ToolOutput::text_only(format!(
                    "Invalid arguments for {}: {err}",
                    Self::NAME
                ));
            }
        };

        let outcome = self
            .store
            .search(&args.query, args.course_name.as_deref(), args.lesson_number)
            .await;

        match outcome {
            SearchOutcome::NoMatchingCourse { candidate } => {
                ToolOutput::text_only(format!("No course found matching '{candidate}'"))
            }
            SearchOutcome::Unavailable { detail } => {
                ToolOutput::text_only(format!("Search error: {detail}"))
            }
            SearchOutcome::Hits(hits) if hits.is_empty() => {
                let mut filter_info = String::new();
                if let Some(course) = &args.course_name {
                    filter_info.push_str(&format!(" in course '{course}'"));
                }
                if let Some(lesson) = args.lesson_number {
                    filter_info.push_str(&format!(" in lesson {lesson}"));
                }
                ToolOutput::text_only(format!("No relevant content found{filter_info}."))
            }
            SearchOutcome::Hits(hits) => self.format_hits(&hits).await,
        }
    }
}

/// `get_course_outline`: title, link, and the full lesson list of one course.
pub struct OutlineTool {
    store: Arc<RetrievalStore>,
}

impl OutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(store: Arc<RetrievalStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

#[async_trait]
impl Tool for OutlineTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.to_string(),
            description: "Get the complete outline of a course including its title, link, and every lesson".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: OutlineArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(err) => {
                return ToolOutput::text_only(format!(
                    "Invalid arguments for {}: {err}",
                    Self::NAME
                ));
            }
        };

        let entry = match self.store.course_outline(&args.course_name).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                return ToolOutput::text_only(format!(
                    "No course found matching '{}'",
                    args.course_name
                ));
            }
            Err(err) => return ToolOutput::text_only(format!("Outline error: {err}")),
        };

        let mut text = format!("Course: {}", entry.title);
        if let Some(link) = &entry.link {
            text.push_str(&format!("\nCourse Link: {link}"));
        }
        if let Some(instructor) = &entry.instructor {
            text.push_str(&format!("\nInstructor: {instructor}"));
        }
        text.push_str(&format!("\nLessons ({}):", entry.lessons.len()));
        for lesson in &entry.lessons {
            text.push_str(&format!("\n  Lesson {}: {}", lesson.number, lesson.title));
        }

        let sources = vec![SourceRef::new(entry.title.clone(), entry.link.clone())];
        ToolOutput { text, sources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::stub::StubBackend;
    use crate::types::{Course, CourseChunk, Lesson};

    fn store() -> Arc<RetrievalStore> {
        Arc::new(RetrievalStore::new(
            Arc::new(StubBackend::default()),
            Arc::new(MockEmbeddingProvider::new()),
            5,
        ))
    }

    fn failing_store() -> Arc<RetrievalStore> {
        Arc::new(RetrievalStore::new(
            Arc::new(StubBackend::failing()),
            Arc::new(MockEmbeddingProvider::new()),
            5,
        ))
    }

    async fn seed(store: &RetrievalStore) {
        let course = Course {
            title: "Advanced Retrieval for AI with Chroma".into(),
            link: Some("https://example.com/course".into()),
            instructor: Some("Test Instructor".into()),
            lessons: vec![Lesson {
                number: 1,
                title: "Introduction".into(),
                link: Some("https://example.com/lesson1".into()),
            }],
        };
        store.add_course(&course).await.unwrap();
        store
            .add_chunks(&[CourseChunk::new(
                "RAG stands for Retrieval-Augmented Generation.",
                "Advanced Retrieval for AI with Chroma",
                Some(1),
                0,
            )])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn formats_hits_with_course_headers() {
        let store = store();
        seed(&store).await;
        let tool = SearchTool::new(store);

        let output = tool
            .invoke(serde_json::json!({"query": "What is RAG?"}))
            .await;

        assert!(output
            .text
            .starts_with("[Advanced Retrieval for AI with Chroma - Lesson 1]\n"));
        assert!(output.text.contains("RAG stands for Retrieval-Augmented Generation."));
    }

    #[tokio::test]
    async fn returns_sources_with_lesson_links() {
        let store = store();
        seed(&store).await;
        let tool = SearchTool::new(store);

        let output = tool
            .invoke(serde_json::json!({"query": "What is RAG?"}))
            .await;

        assert_eq!(output.sources.len(), 1);
        assert_eq!(
            output.sources[0].label,
            "Advanced Retrieval for AI with Chroma - Lesson 1"
        );
        assert_eq!(
            output.sources[0].link.as_deref(),
            Some("https://example.com/lesson1")
        );
    }

    #[tokio::test]
    async fn empty_results_name_the_filters() {
        let store = store();
        seed(&store).await;
        let tool = SearchTool::new(store);

        let output = tool
            .invoke(serde_json::json!({
                "query": "nonexistent",
                "course_name": "Advanced Retrieval for AI with Chroma",
                "lesson_number": 5
            }))
            .await;

        assert!(output.text.contains("No relevant content found"));
        assert!(output.text.contains("Advanced Retrieval for AI with Chroma"));
        assert!(output.text.contains("lesson 5"));
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn unresolved_course_names_are_reported() {
        let tool = SearchTool::new(store());
        let output = tool
            .invoke(serde_json::json!({"query": "q", "course_name": "InvalidCourse"}))
            .await;
        assert!(output.text.contains("No course found matching 'InvalidCourse'"));
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn index_failures_become_search_errors() {
        let tool = SearchTool::new(failing_store());
        let output = tool.invoke(serde_json::json!({"query": "q"})).await;
        assert!(output.text.starts_with("Search error:"), "{}", output.text);
    }

    #[tokio::test]
    async fn malformed_arguments_fold_into_text() {
        let tool = SearchTool::new(store());
        let output = tool
            .invoke(serde_json::json!({"lesson_number": "one"}))
            .await;
        assert!(output.text.starts_with("Invalid arguments for search_course_content"));
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn search_schema_matches_declared_shape() {
        let tool = SearchTool::new(store());
        let schema = tool.schema();
        assert_eq!(schema.name, "search_course_content");
        assert_eq!(schema.input_schema["type"], "object");
        assert_eq!(
            schema.input_schema["properties"]["query"]["type"],
            "string"
        );
        assert_eq!(
            schema.input_schema["properties"]["course_name"]["type"],
            "string"
        );
        assert_eq!(
            schema.input_schema["properties"]["lesson_number"]["type"],
            "integer"
        );
        assert_eq!(
            schema.input_schema["required"],
            serde_json::json!(["query"])
        );
    }

    #[tokio::test]
    async fn outline_lists_every_lesson() {
        let store = store();
        seed(&store).await;
        let tool = OutlineTool::new(store);

        let output = tool
            .invoke(serde_json::json!({"course_name": "Advanced Retrieval for AI with Chroma"}))
            .await;

        assert!(output.text.starts_with("Course: Advanced Retrieval"));
        assert!(output.text.contains("Course Link: https://example.com/course"));
        assert!(output.text.contains("Lessons (1):"));
        assert!(output.text.contains("Lesson 1: Introduction"));
        assert_eq!(output.sources.len(), 1);
        assert_eq!(
            output.sources[0].link.as_deref(),
            Some("https://example.com/course")
        );
    }

    #[tokio::test]
    async fn outline_reports_unknown_courses() {
        let tool = OutlineTool::new(store());
        let output = tool
            .invoke(serde_json::json!({"course_name": "Ghost"}))
            .await;
        assert_eq!(output.text, "No course found matching 'Ghost'");
    }
}
