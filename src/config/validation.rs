use crate::config::types::{
    Config, EndpointConfig, OutputConfig, PacingConfig, QueryConfig, RetryConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Largest page the search endpoint accepts in one request
const MAX_PAGE_SIZE: u32 = 10_000;

/// Largest identifier list sent in one detail request
const MAX_BATCH_SIZE: usize = 500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_query_config(&config.query)?;
    validate_endpoint_config(&config.endpoint)?;
    validate_pacing_config(&config.pacing)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the search query and date range
fn validate_query_config(config: &QueryConfig) -> Result<(), ConfigError> {
    if config.term.trim().is_empty() {
        return Err(ConfigError::MissingQuery);
    }

    match (config.start_date, config.end_date) {
        (Some(start), Some(end)) if start > end => {
            return Err(ConfigError::InvalidDateRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ConfigError::InvalidDateRange(
                "start-date and end-date must be given together".to_string(),
            ));
        }
        _ => {}
    }

    if config.window_days < 1 {
        return Err(ConfigError::Validation(
            "window_days must be >= 1".to_string(),
        ));
    }

    if config.max_results < 1 {
        return Err(ConfigError::Validation(
            "max_results must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates endpoint configuration
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    validate_http_url("search_url", &config.search_url)?;
    validate_http_url("fetch_url", &config.fetch_url)?;

    if config.database.is_empty() {
        return Err(ConfigError::Validation(
            "database cannot be empty".to_string(),
        ));
    }

    if config.result_cap < 1 {
        return Err(ConfigError::Validation(
            "result_cap must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates page and batch sizing
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Client name: non-empty, alphanumeric + hyphens/underscores only
    if config.client_name.is_empty() {
        return Err(ConfigError::Validation(
            "client_name cannot be empty".to_string(),
        ));
    }

    if !config
        .client_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "client_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.client_name
        )));
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
