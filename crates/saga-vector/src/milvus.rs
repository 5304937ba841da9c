// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Milvus backend over the v2 RESTful API.
//!
//! The collection holds `embedding_id` (primary key), `text`, `category`, and
//! an `embedding` float vector indexed with IVF_FLAT under squared L2.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use saga_config::model::VectorStoreConfig;
use saga_core::types::{VectorBackend, VectorHit, VectorRecord};
use saga_core::{AdapterType, HealthStatus, PluginAdapter, SagaError, VectorStore};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Longest text stored per record, in bytes.
const MAX_TEXT_BYTES: usize = 5000;
const INDEX_NLIST: u32 = 128;
const SEARCH_NPROBE: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope shared by every v2 endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct HasCollection {
    has: bool,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    distance: f32,
    embedding_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    category: String,
}

/// Milvus collection client.
#[derive(Debug, Clone)]
pub struct MilvusStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    dimensions: usize,
}

impl MilvusStore {
    /// Connects to the server, creating and loading the collection if needed.
    pub async fn connect(config: &VectorStoreConfig, dimensions: usize) -> Result<Self, SagaError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SagaError::Config(format!("invalid vector store token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SagaError::VectorStore {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let store = Self {
            client,
            base_url: config.endpoint(),
            collection: config.collection.clone(),
            dimensions,
        };
        store.ensure_collection().await?;
        info!(
            endpoint = %store.base_url,
            collection = %store.collection,
            "connected to Milvus"
        );
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), SagaError> {
        let existing: HasCollection = self
            .post(
                "/v2/vectordb/collections/has",
                json!({ "collectionName": self.collection }),
            )
            .await?;

        if !existing.has {
            info!(collection = %self.collection, "creating vector collection");
            let _: Value = self
                .post("/v2/vectordb/collections/create", self.create_body())
                .await?;
        }

        let _: Value = self
            .post(
                "/v2/vectordb/collections/load",
                json!({ "collectionName": self.collection }),
            )
            .await?;
        Ok(())
    }

    fn create_body(&self) -> Value {
        json!({
            "collectionName": self.collection,
            "schema": {
                "autoId": false,
                "enableDynamicField": false,
                "fields": [
                    {
                        "fieldName": "embedding_id",
                        "dataType": "VarChar",
                        "isPrimary": true,
                        "elementTypeParams": { "max_length": 256 }
                    },
                    {
                        "fieldName": "text",
                        "dataType": "VarChar",
                        "elementTypeParams": { "max_length": MAX_TEXT_BYTES }
                    },
                    {
                        "fieldName": "category",
                        "dataType": "VarChar",
                        "elementTypeParams": { "max_length": 64 }
                    },
                    {
                        "fieldName": "embedding",
                        "dataType": "FloatVector",
                        "elementTypeParams": { "dim": self.dimensions }
                    }
                ]
            },
            "indexParams": [{
                "fieldName": "embedding",
                "indexName": "embedding_ivf",
                "metricType": "L2",
                "params": { "index_type": "IVF_FLAT", "nlist": INDEX_NLIST }
            }]
        })
    }

    /// Posts `body` to `path` and unwraps the response envelope.
    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, SagaError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SagaError::VectorStore {
                message: format!("request to {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SagaError::vector(format!("{path} returned {status}: {body}")));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| SagaError::VectorStore {
            message: format!("failed to parse {path} response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if envelope.code != 0 {
            return Err(SagaError::vector(format!(
                "{path} failed with code {}: {}",
                envelope.code,
                envelope.message.unwrap_or_default()
            )));
        }
        envelope
            .data
            .ok_or_else(|| SagaError::vector(format!("{path} returned no data")))
    }
}

/// Builds a Milvus boolean filter `category == "<value>"`.
fn category_filter(category: &str) -> String {
    let escaped = category.replace('\\', "\\\\").replace('"', "\\\"");
    format!("category == \"{escaped}\"")
}

/// Truncates to at most `max` bytes on a char boundary.
fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl PluginAdapter for MilvusStore {
    fn name(&self) -> &str {
        "milvus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, SagaError> {
        let result: Result<HasCollection, _> = self
            .post(
                "/v2/vectordb/collections/has",
                json!({ "collectionName": self.collection }),
            )
            .await;
        Ok(match result {
            Ok(h) if h.has => HealthStatus::Healthy,
            Ok(_) => HealthStatus::Unhealthy("collection missing".into()),
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), SagaError> {
        debug!(collection = %self.collection, "Milvus client released");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MilvusStore {
    fn backend(&self) -> VectorBackend {
        VectorBackend::Milvus
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), SagaError> {
        if record.vector.len() != self.dimensions {
            return Err(SagaError::vector(format!(
                "vector has {} dimensions, expected {}",
                record.vector.len(),
                self.dimensions
            )));
        }
        let body = json!({
            "collectionName": self.collection,
            "data": [{
                "embedding_id": record.embedding_id,
                "text": truncate_bytes(&record.text, MAX_TEXT_BYTES),
                "category": record.category,
                "embedding": record.vector,
            }]
        });
        let _: Value = self.post("/v2/vectordb/entities/upsert", body).await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<VectorHit>, SagaError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut body = json!({
            "collectionName": self.collection,
            "data": [query],
            "annsField": "embedding",
            "limit": k,
            "outputFields": ["embedding_id", "text", "category"],
            "searchParams": {
                "metricType": "L2",
                "params": { "nprobe": SEARCH_NPROBE }
            }
        });
        if let Some(category) = category {
            body["filter"] = Value::String(category_filter(category));
        }

        let rows: Vec<SearchRow> = self.post("/v2/vectordb/entities/search", body).await?;
        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .map(|row| VectorHit {
                embedding_id: row.embedding_id,
                text: row.text,
                category: row.category,
                distance: row.distance,
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, category: Option<&str>) -> Result<usize, SagaError> {
        let body = json!({
            "collectionName": self.collection,
            "filter": category.map(category_filter).unwrap_or_default(),
            "outputFields": ["count(*)"]
        });
        let rows: Vec<Value> = self.post("/v2/vectordb/entities/query", body).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count(*)"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> VectorStoreConfig {
        let address = server.address();
        VectorStoreConfig {
            host: address.ip().to_string(),
            port: address.port(),
            collection: "test_stories".into(),
            connect_timeout_secs: 1,
            ..VectorStoreConfig::default()
        }
    }

    async fn mount_ok(server: &MockServer, endpoint: &str, data: Value) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": data})))
            .mount(server)
            .await;
    }

    async fn connected_store(server: &MockServer) -> MilvusStore {
        mount_ok(server, "/v2/vectordb/collections/has", json!({"has": true})).await;
        mount_ok(server, "/v2/vectordb/collections/load", json!({})).await;
        MilvusStore::connect(&config_for(server), 3).await.unwrap()
    }

    #[test]
    fn filter_escapes_quotes() {
        assert_eq!(category_filter("story_line"), "category == \"story_line\"");
        assert_eq!(category_filter("a\"b"), "category == \"a\\\"b\"");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate_bytes(&text, 5);
        assert_eq!(cut.len(), 4);
        assert_eq!(truncate_bytes("short", 100), "short");
    }

    #[tokio::test]
    async fn connect_creates_missing_collection() {
        let server = MockServer::start().await;
        mount_ok(&server, "/v2/vectordb/collections/has", json!({"has": false})).await;
        Mock::given(method("POST"))
            .and(path("/v2/vectordb/collections/create"))
            .and(body_partial_json(json!({"collectionName": "test_stories"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
            .expect(1)
            .mount(&server)
            .await;
        mount_ok(&server, "/v2/vectordb/collections/load", json!({})).await;

        MilvusStore::connect(&config_for(&server), 384).await.unwrap();
    }

    #[tokio::test]
    async fn search_sends_filter_and_sorts_hits() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/vectordb/entities/search"))
            .and(body_partial_json(json!({
                "filter": "category == \"story_line\"",
                "limit": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": [
                    {"distance": 0.9, "embedding_id": "story_line_2", "text": "far", "category": "story_line"},
                    {"distance": 0.1, "embedding_id": "story_line_1", "text": "near", "category": "story_line"}
                ]
            })))
            .mount(&server)
            .await;

        let hits = store
            .search(&[0.1, 0.2, 0.3], 2, Some("story_line"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].embedding_id, "story_line_1");
        assert_eq!(hits[1].text, "far");
    }

    #[tokio::test]
    async fn nonzero_code_is_an_error() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/vectordb/entities/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 1100,
                "message": "invalid parameter"
            })))
            .mount(&server)
            .await;

        let err = store
            .upsert(VectorRecord {
                embedding_id: "story_line_1".into(),
                text: "x".into(),
                category: "story_line".into(),
                vector: vec![0.0, 0.0, 1.0],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid parameter"), "got {err}");
    }

    #[tokio::test]
    async fn count_reads_aggregate() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;
        mount_ok(&server, "/v2/vectordb/entities/query", json!([{"count(*)": 7}])).await;
        assert_eq!(store.count(Some("summary")).await.unwrap(), 7);
    }
}
