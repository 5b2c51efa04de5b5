use crate::analysis::analyzer::ResumeAnalyzer;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup around the process-wide model client; read-only afterwards.
    pub analyzer: ResumeAnalyzer,
    pub config: Config,
}
