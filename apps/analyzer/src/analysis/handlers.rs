//! Axum route handlers for the Analysis API.

use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tempfile::TempDir;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::analyzer::render;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: AnalysisStatus,
    pub error_kind: Option<&'static str>,
    /// Exactly what the user should see: the report, or a warning-prefixed error.
    pub markdown: String,
}

/// Upload held on disk for the lifetime of one request.
struct StagedUpload {
    _dir: TempDir,
    path: PathBuf,
}

struct AnalyzeForm {
    resume: Option<StagedUpload>,
    job_description: String,
}

/// POST /api/v1/analyze
///
/// Multipart fields: `resume` (PDF or DOCX file) and `job_description` (text).
/// Extraction and model failures are reported in the body, not as HTTP errors.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request_id = Uuid::new_v4();
    run_analysis(state, multipart)
        .instrument(info_span!("analyze", %request_id))
        .await
}

async fn run_analysis(
    state: AppState,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = read_form(multipart).await?;

    info!(
        file = ?form.resume.as_ref().map(|r| r.path.display().to_string()),
        job_description_chars = form.job_description.chars().count(),
        "Analysis requested"
    );

    let resume_path = form.resume.as_ref().map(|r| r.path.as_path());
    let result = state
        .analyzer
        .analyze(resume_path, &form.job_description)
        .await;

    let response = match &result {
        Ok(_) => AnalyzeResponse {
            status: AnalysisStatus::Ok,
            error_kind: None,
            markdown: render(&result),
        },
        Err(e) => {
            warn!(kind = e.kind(), "Analysis failed: {e}");
            AnalyzeResponse {
                status: AnalysisStatus::Error,
                error_kind: Some(e.kind()),
                markdown: render(&result),
            }
        }
    };

    Ok(Json(response))
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut resume: Option<StagedUpload> = None;
    let mut job_description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "resume" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file data: {e}")))?;

                // Browsers send an empty, nameless part when no file was chosen.
                if file_name.as_deref().unwrap_or("").is_empty() && data.is_empty() {
                    continue;
                }
                let file_name = file_name.unwrap_or_else(|| "upload".to_string());
                let staged = tokio::task::spawn_blocking(move || stage_upload(&file_name, &data))
                    .await
                    .map_err(|e| AppError::Internal(e.into()))??;
                resume = Some(staged);
            }
            "job_description" => {
                job_description = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read job_description: {e}"))
                })?;
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    Ok(AnalyzeForm {
        resume,
        job_description,
    })
}

/// Writes the upload into a fresh temp dir under its original file name so
/// the extension survives for routing. Blocking; run it off the async workers.
fn stage_upload(file_name: &str, data: &[u8]) -> Result<StagedUpload, AppError> {
    let base_name = Path::new(file_name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "upload".into());

    let dir = tempfile::Builder::new()
        .prefix("resume-")
        .tempdir()
        .map_err(|e| AppError::Internal(e.into()))?;
    let path = dir.path().join(base_name);
    std::fs::write(&path, data).map_err(|e| AppError::Internal(e.into()))?;

    Ok(StagedUpload { _dir: dir, path })
}
