use crate::config::types::{ApiConfig, Config, ExportConfig, WorkspaceConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for the fixed inter-request delay
const MAX_REQUEST_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_workspace_config(&config.workspace)?;
    validate_api_config(&config.api)?;
    validate_export_config(&config.export)?;
    Ok(())
}

/// Validates the workspace identifiers
fn validate_workspace_config(config: &WorkspaceConfig) -> Result<(), ConfigError> {
    validate_identifier("root-id", &config.root_id)?;

    if let Some(scope) = &config.scope_id {
        validate_identifier("scope-id", scope)?;
    }

    Ok(())
}

/// Validates API access settings
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.request_delay_ms > MAX_REQUEST_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "request-delay-ms must be <= {}ms, got {}ms",
            MAX_REQUEST_DELAY_MS, config.request_delay_ms
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates export settings
fn validate_export_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if !config.include_docs && !config.include_tasks {
        return Err(ConfigError::Validation(
            "nothing to export: include-docs and include-tasks are both false".to_string(),
        ));
    }

    Ok(())
}

/// Validates a remote identifier: non-empty, no whitespace or path separators
fn validate_identifier(field: &str, id: &str) -> Result<(), ConfigError> {
    if id.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#') {
        return Err(ConfigError::Validation(format!(
            "{} contains invalid characters: '{}'",
            field, id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TabularMode;

    fn create_test_config() -> Config {
        Config {
            workspace: WorkspaceConfig {
                root_id: "9001".to_string(),
                scope_id: None,
            },
            api: ApiConfig {
                base_url: "https://api.example.com/api".to_string(),
                token: Some("pk_test".to_string()),
                token_env: "SUMI_ARCHIVE_TOKEN".to_string(),
                request_delay_ms: 250,
                timeout_secs: 30,
            },
            export: ExportConfig {
                output_dir: "./archive".to_string(),
                include_docs: true,
                include_tasks: true,
                tabular_mode: TabularMode::Streaming,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&create_test_config()).is_ok());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("root-id", "9001").is_ok());
        assert!(validate_identifier("root-id", "abc_123-x").is_ok());

        assert!(validate_identifier("root-id", "").is_err());
        assert!(validate_identifier("root-id", "   ").is_err());
        assert!(validate_identifier("root-id", "90 01").is_err());
        assert!(validate_identifier("root-id", "../etc").is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = create_test_config();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "ftp://api.example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_request_delay_bounds() {
        let mut config = create_test_config();
        config.api.request_delay_ms = 0;
        assert!(validate(&config).is_ok());

        config.api.request_delay_ms = MAX_REQUEST_DELAY_MS + 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = create_test_config();
        config.api.timeout_secs = 0;
        assert!(validate(&config).is_err());

        config.api.timeout_secs = 301;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_nothing_to_export() {
        let mut config = create_test_config();
        config.export.include_docs = false;
        config.export.include_tasks = false;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_scope_rejected() {
        let mut config = create_test_config();
        config.workspace.scope_id = Some(String::new());
        assert!(validate(&config).is_err());
    }
}
