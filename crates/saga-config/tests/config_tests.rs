// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and diagnostics.

use saga_config::diagnostic::ConfigError;
use saga_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_config_deserializes() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[storage]
database_path = "/tmp/saga-test.db"
wal_mode = false

[provider]
base_url = "http://localhost:11434/v1"
api_key = "gsk-test"
model = "llama-3.1-8b-instant"
timeout_secs = 20
max_retries = 2

[embedding]
dimensions = 384

[vector_store]
host = "milvus.internal"
port = 19531
collection = "tales"
connect_timeout_secs = 2

[rag]
max_context_lines = 6

[consolidator]
lore_interval_secs = 600
lore_batch_size = 15
summary_interval_secs = 1200
summary_chunk_size = 8
summary_min_lines = 3

[indexer]
max_attempts = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.storage.database_path, "/tmp/saga-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.provider.api_key.as_deref(), Some("gsk-test"));
    assert_eq!(config.provider.max_retries, 2);
    assert_eq!(config.vector_store.endpoint(), "http://milvus.internal:19531");
    assert_eq!(config.vector_store.collection, "tales");
    assert_eq!(config.rag.max_context_lines, 6);
    assert_eq!(config.consolidator.summary_chunk_size, 8);
    assert_eq!(config.indexer.max_attempts, 5);
    // Unset keys keep their defaults.
    assert_eq!(config.indexer.lease_secs, 60);
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.provider.model, "llama-3.1-70b-versatile");
    assert_eq!(config.embedding.dimensions, 384);
    assert_eq!(config.vector_store.collection, "story_embeddings");
    assert_eq!(config.consolidator.lore_interval_secs, 1800);
    assert_eq!(config.consolidator.summary_interval_secs, 3600);
    assert_eq!(config.rag.max_context_lines, 10);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[provider]
modle = "llama"
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "modle" && suggestion.as_deref() == Some("model")
        )
    });
    assert!(found, "expected an UnknownKey diagnostic, got {errors:?}");
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_)))
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let errors = load_and_validate_str("[rag]\nmax_context_lines = 0\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { field, .. } if field == "rag.max_context_lines"))
    );
}

#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[provider]
model = "from-file"

[vector_store]
host = "file-host"
"#,
        )?;
        jail.set_env("SAGA_PROVIDER_MODEL", "from-env");
        jail.set_env("SAGA_VECTOR_STORE_PORT", "19999");

        let config = saga_config::load_and_validate_path(std::path::Path::new("custom.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.provider.model, "from-env");
        assert_eq!(config.vector_store.host, "file-host");
        assert_eq!(config.vector_store.port, 19999);
        Ok(())
    });
}
