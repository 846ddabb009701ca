use crate::config::types::{
    CrawlConfig, CrawlerConfig, HttpConfig, IssueConfig, JavascriptConfig, SettingsUpdate,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_javascript_config(&config.javascript)?;
    validate_issue_config(&config.issues)?;
    Ok(())
}

/// Validates a live settings change before it is applied
pub fn validate_update(update: &SettingsUpdate) -> Result<(), ConfigError> {
    if let Some(concurrency) = update.concurrency {
        validate_concurrency(concurrency)?;
    }
    Ok(())
}

fn validate_concurrency(concurrency: usize) -> Result<(), ConfigError> {
    if !(1..=100).contains(&concurrency) {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            concurrency
        )));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_concurrency(config.concurrency)?;

    if config.max_urls < 1 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be >= 1, got {}",
            config.max_urls
        )));
    }

    if config.max_file_size < 1 {
        return Err(ConfigError::Validation(
            "max_file_size must be at least 1 byte".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "timeout must be >= 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.retry_backoff > config.retry_backoff_max {
        return Err(ConfigError::Validation(format!(
            "retry_backoff ({}ms) cannot exceed retry_backoff_max ({}ms)",
            config.retry_backoff, config.retry_backoff_max
        )));
    }

    if let Some(proxy) = &config.proxy_url {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy_url: {}", e)))?;
    }

    for name in config.custom_headers.keys() {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid custom header name '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates rendered-fetch configuration, only when it is enabled
fn validate_javascript_config(config: &JavascriptConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let service = Url::parse(&config.service_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid service_url: {}", e)))?;
    if service.scheme() != "http" && service.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "service_url must be http or https, got '{}'",
            config.service_url
        )));
    }

    if config.max_concurrent_pages < 1 {
        return Err(ConfigError::Validation(
            "max_concurrent_pages must be >= 1".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "javascript timeout must be >= 1 second".to_string(),
        ));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-zero, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    Ok(())
}

/// Validates issue configuration
fn validate_issue_config(config: &IssueConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.duplication_threshold) {
        return Err(ConfigError::Validation(format!(
            "duplication_threshold must be between 0.0 and 1.0, got {}",
            config.duplication_threshold
        )));
    }
    Ok(())
}
