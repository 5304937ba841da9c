// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::SagaConfig;

/// Validates a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &SagaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_host(&mut errors, "server.host", &config.server.host);
    if config.server.port == 0 {
        errors.push(ConfigError::invalid("server.port", "must be non-zero"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    if config.provider.model.trim().is_empty() {
        errors.push(ConfigError::invalid("provider.model", "must not be empty"));
    }
    if !config.provider.base_url.starts_with("http://")
        && !config.provider.base_url.starts_with("https://")
    {
        errors.push(ConfigError::invalid(
            "provider.base_url",
            format!("`{}` is not an http(s) URL", config.provider.base_url),
        ));
    }
    if config.provider.timeout_secs == 0 {
        errors.push(ConfigError::invalid("provider.timeout_secs", "must be positive"));
    }

    if config.embedding.dimensions == 0 {
        errors.push(ConfigError::invalid("embedding.dimensions", "must be positive"));
    }

    if config.vector_store.enabled {
        check_host(&mut errors, "vector_store.host", &config.vector_store.host);
        if config.vector_store.collection.trim().is_empty() {
            errors.push(ConfigError::invalid("vector_store.collection", "must not be empty"));
        }
    }

    if config.rag.max_context_lines == 0 {
        errors.push(ConfigError::invalid("rag.max_context_lines", "must be at least 1"));
    }

    let c = &config.consolidator;
    for (field, value) in [
        ("consolidator.lore_interval_secs", c.lore_interval_secs as usize),
        ("consolidator.summary_interval_secs", c.summary_interval_secs as usize),
        ("consolidator.lore_batch_size", c.lore_batch_size),
        ("consolidator.summary_chunk_size", c.summary_chunk_size),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(field, "must be positive"));
        }
    }

    if config.indexer.max_attempts == 0 {
        errors.push(ConfigError::invalid("indexer.max_attempts", "must be at least 1"));
    }
    if config.indexer.lease_secs == 0 {
        errors.push(ConfigError::invalid("indexer.lease_secs", "must be positive"));
    }
    if config.indexer.poll_interval_secs == 0 {
        errors.push(ConfigError::invalid("indexer.poll_interval_secs", "must be positive"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts IP addresses and hostname-shaped strings.
fn check_host(errors: &mut Vec<ConfigError>, field: &str, host: &str) {
    let host = host.trim();
    if host.is_empty() {
        errors.push(ConfigError::invalid(field, "must not be empty"));
        return;
    }
    let is_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_hostname = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !is_ip && !is_hostname {
        errors.push(ConfigError::invalid(
            field,
            format!("`{host}` is not a valid IP address or hostname"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &SagaConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SagaConfig::default()).is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut config = SagaConfig::default();
        config.consolidator.summary_chunk_size = 0;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("summary_chunk_size")));
    }

    #[test]
    fn zero_indexer_poll_interval_is_rejected() {
        let mut config = SagaConfig::default();
        config.indexer.poll_interval_secs = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("indexer.poll_interval_secs"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = SagaConfig::default();
        config.storage.database_path = " ".into();
        config.rag.max_context_lines = 0;
        config.indexer.max_attempts = 0;
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn bad_vector_host_ignored_when_disabled() {
        let mut config = SagaConfig::default();
        config.vector_store.host = "not a host!".into();
        assert!(validate_config(&config).is_err());

        config.vector_store.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn provider_url_must_be_http() {
        let mut config = SagaConfig::default();
        config.provider.base_url = "ftp://example.com".into();
        assert!(messages(&config)[0].contains("provider.base_url"));
    }
}
