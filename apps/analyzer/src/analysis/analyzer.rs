//! End-to-end resume analysis: extract → normalize → assemble → call model.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, dispatcher, info, Dispatch, Span};

use crate::analysis::normalize::clean_text;
use crate::analysis::prompts::build_analysis_prompt;
use crate::extraction::{extract_from_file, ExtractionError};
use crate::llm_client::{GenerativeModel, LlmError};

/// Prefix put in front of every failure shown to the user.
pub const WARNING_PREFIX: &str = "⚠️";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("Analysis failed: {0}")]
    Model(#[from] LlmError),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Extraction(e) => e.kind(),
            AnalysisError::Model(_) => "ANALYSIS_FAILED",
            AnalysisError::Worker(_) => "INTERNAL_ERROR",
        }
    }
}

/// Turns an analysis outcome into the text shown to the user: the model's
/// report untouched, or the error behind a warning sign.
pub fn render(result: &Result<String, AnalysisError>) -> String {
    match result {
        Ok(report) => report.clone(),
        Err(e) => format!("{WARNING_PREFIX} {e}"),
    }
}

/// Runs one analysis per call. The model is shared read-only between requests.
#[derive(Clone)]
pub struct ResumeAnalyzer {
    model: Arc<dyn GenerativeModel>,
}

impl ResumeAnalyzer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Analyzes the resume at `resume` against `job_description`.
    ///
    /// Any extraction failure ends the analysis before the model is called.
    /// The model is called at most once and its text is returned as-is.
    pub async fn analyze(
        &self,
        resume: Option<&Path>,
        job_description: &str,
    ) -> Result<String, AnalysisError> {
        let path: Option<PathBuf> = resume.map(Path::to_path_buf);
        // Blocking threads start with no span or subscriber of their own.
        let span = Span::current();
        let dispatch = dispatcher::get_default(Dispatch::clone);
        let extracted = tokio::task::spawn_blocking(move || {
            dispatcher::with_default(&dispatch, || {
                span.in_scope(|| extract_from_file(path.as_deref()))
            })
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))??;

        debug!(
            "Extracted {} chars and {} profile links",
            extracted.text.chars().count(),
            extracted.links.len()
        );

        let resume_text = clean_text(&extracted.text);
        let prompt = build_analysis_prompt(&resume_text, &extracted.links, job_description);

        let report = self.model.generate(&prompt).await?;
        info!("Analysis complete ({} chars)", report.chars().count());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fmt;
    use std::io::Write;
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Instrument, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::Layer;
    use zip::write::SimpleFileOptions;

    /// Records every prompt and answers with a canned response.
    struct FakeModel {
        prompts: Mutex<Vec<String>>,
        response: Result<String, String>,
    }

    impl FakeModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                response: Ok(text.to_string()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                response: Err(message.to_string()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone().map_err(|message| LlmError::Api {
                status: 503,
                message,
            })
        }
    }

    fn write_docx(dir: &Path, body: &str) -> PathBuf {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let path = dir.join("resume.docx");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    #[tokio::test]
    async fn test_unsupported_file_never_calls_model() {
        let model = FakeModel::replying("report");
        let analyzer = ResumeAnalyzer::new(model.clone());

        let result = analyzer
            .analyze(Some(Path::new("resume.txt")), "Backend engineer")
            .await;

        assert_eq!(
            render(&result),
            "⚠️ Error: Unsupported file type. Please upload a PDF or DOCX."
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_file_never_calls_model() {
        let model = FakeModel::replying("report");
        let analyzer = ResumeAnalyzer::new(model.clone());

        let result = analyzer.analyze(None, "Backend engineer").await;

        assert_eq!(render(&result), "⚠️ Error: No file uploaded.");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_broken_docx_stops_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.docx");
        std::fs::write(&path, b"not a zip").unwrap();

        let model = FakeModel::replying("report");
        let analyzer = ResumeAnalyzer::new(model.clone());
        let result = analyzer.analyze(Some(&path), "JD").await;

        let err = result.as_ref().unwrap_err();
        assert_eq!(err.kind(), "DOCX_EXTRACTION_FAILED");
        assert!(render(&result).starts_with("⚠️ DOCX extraction failed: "));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_broken_pdf_stops_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"garbage").unwrap();

        let model = FakeModel::replying("report");
        let analyzer = ResumeAnalyzer::new(model.clone());
        let result = analyzer.analyze(Some(&path), "JD").await;

        assert!(render(&result).starts_with("⚠️ PDF extraction failed: "));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_table_link_gets_single_profile_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(
            dir.path(),
            "<w:p><w:r><w:t>Jane Doe, Rust engineer</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>https://www.linkedin.com/in/jane-doe</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );

        let model = FakeModel::replying("## 🔍 Match Score (0-100)\n80");
        let analyzer = ResumeAnalyzer::new(model.clone());
        let result = analyzer.analyze(Some(&path), "Rust backend role").await;

        assert_eq!(result.unwrap(), "## 🔍 Match Score (0-100)\n80");
        assert_eq!(model.calls(), 1);

        let prompt = model.last_prompt();
        assert_eq!(prompt.matches("📎 LinkedIn Profiles:").count(), 1);
        assert_eq!(
            prompt
                .matches("- https://www.linkedin.com/in/jane-doe")
                .count(),
            1
        );
        assert!(prompt.contains("Jane Doe, Rust engineer"));
        assert!(prompt.contains("Rust backend role"));
    }

    #[tokio::test]
    async fn test_model_failure_is_rendered_with_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(dir.path(), "<w:p><w:r><w:t>Resume</w:t></w:r></w:p>");

        let model = FakeModel::failing("model overloaded");
        let analyzer = ResumeAnalyzer::new(model.clone());
        let result = analyzer.analyze(Some(&path), "JD").await;

        assert_eq!(
            render(&result),
            "⚠️ Analysis failed: API error (status 503): model overloaded"
        );
        assert_eq!(result.unwrap_err().kind(), "ANALYSIS_FAILED");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_resume_text_is_normalized_before_prompting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_docx(
            dir.path(),
            "<w:p><w:r><w:t>Top</w:t></w:r></w:p><w:p/><w:p/><w:p/><w:p><w:r><w:t>Bottom</w:t></w:r></w:p>",
        );

        let model = FakeModel::replying("ok");
        let analyzer = ResumeAnalyzer::new(model.clone());
        analyzer.analyze(Some(&path), "JD").await.unwrap();

        assert!(model.last_prompt().contains("Top\n\nBottom"));
    }

    /// Records each event's message with the names of its enclosing spans.
    #[derive(Clone, Default)]
    struct SpanRecorder {
        events: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    }

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S> Layer<S> for SpanRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let spans = ctx
                .event_scope(event)
                .map(|scope| scope.map(|span| span.name().to_string()).collect())
                .unwrap_or_default();
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.events.lock().unwrap().push((visitor.0, spans));
        }
    }

    #[tokio::test]
    async fn test_extraction_logs_stay_in_request_span() {
        let recorder = SpanRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();

        let model = FakeModel::replying("unused");
        let analyzer = ResumeAnalyzer::new(model.clone());
        let result = analyzer
            .analyze(Some(&path), "JD")
            .instrument(tracing::info_span!("analyze", request_id = "req-1"))
            .await;
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));

        let events = recorder.events.lock().unwrap();
        let strategy_logs: Vec<_> = events
            .iter()
            .filter(|(message, _)| message.starts_with("PDF strategy"))
            .collect();
        assert_eq!(strategy_logs.len(), 2);
        for (message, spans) in strategy_logs {
            assert!(spans.iter().any(|name| name == "analyze"), "{message}");
        }
    }
}
