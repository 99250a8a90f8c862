use serde::Deserialize;

/// Main configuration structure for Sumi-Archive
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub api: ApiConfig,
    pub export: ExportConfig,
}

/// Which part of the remote workspace to archive
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Identity of the root container (the workspace)
    #[serde(rename = "root-id")]
    pub root_id: String,

    /// Optional narrower scope: a single space inside the workspace
    #[serde(rename = "scope-id", default)]
    pub scope_id: Option<String>,
}

/// Remote API access and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are joined onto
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Literal API token; takes precedence over `token_env`
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable holding the API token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    /// Fixed delay between consecutive requests (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// What to export and where
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Root directory of the archive
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Export documents and their pages as markdown
    #[serde(rename = "include-docs", default = "default_true")]
    pub include_docs: bool,

    /// Export task lists as CSV
    #[serde(rename = "include-tasks", default = "default_true")]
    pub include_tasks: bool,

    /// How task lists are written
    #[serde(rename = "tabular-mode", default)]
    pub tabular_mode: TabularMode,
}

/// Tabular export strategy for task lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularMode {
    /// Write rows as records arrive, growing the header in place
    #[default]
    Streaming,
    /// Collect a whole list, then write it with a fixed header
    Batch,
}

fn default_token_env() -> String {
    "SUMI_ARCHIVE_TOKEN".to_string()
}

fn default_request_delay_ms() -> u64 {
    250
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
