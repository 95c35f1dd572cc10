//! REST client for a managed serverless Pinecone index.
//!
//! On connect the control plane is asked for the index; if it does not exist
//! it is created (cosine metric, serverless spec from config) and the
//! data-plane host is resolved. Upsert and query then go straight to the
//! data plane.

use serde::Deserialize;
use serde_json::json;

use crate::config::IndexConfig;

use super::{IndexError, Match, ProblemRecord, VectorIndex};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

pub struct PineconeIndex {
    client: reqwest::blocking::Client,
    api_key: String,
    /// Data-plane base url, e.g. "https://myindex-abc123.svc.….pinecone.io"
    host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

impl PineconeIndex {
    /// Connect to the configured index, creating it if it does not exist.
    pub fn connect(config: &IndexConfig, api_key: &str) -> Result<Self, IndexError> {
        let client = reqwest::blocking::Client::new();

        let description = match Self::describe(&client, api_key, &config.name)? {
            Some(description) => description,
            None => {
                log::info!("index '{}' not found, creating it", config.name);
                Self::create(&client, api_key, config)?
            }
        };

        let host = description
            .host
            .ok_or_else(|| IndexError::MissingHost(config.name.clone()))?;

        // control plane reports the host without a scheme
        let host = if host.starts_with("http") {
            host
        } else {
            format!("https://{host}")
        };

        log::info!("connected to index '{}' at {host}", config.name);

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            host,
        })
    }

    fn describe(
        client: &reqwest::blocking::Client,
        api_key: &str,
        name: &str,
    ) -> Result<Option<IndexDescription>, IndexError> {
        let resp = client
            .get(format!("{CONTROL_PLANE_URL}/indexes"))
            .header("Api-Key", api_key)
            .send()?;

        let resp = Self::check_status(resp)?;
        let list: IndexList = resp.json()?;

        Ok(list.indexes.into_iter().find(|idx| idx.name == name))
    }

    fn create(
        client: &reqwest::blocking::Client,
        api_key: &str,
        config: &IndexConfig,
    ) -> Result<IndexDescription, IndexError> {
        let body = json!({
            "name": config.name,
            "dimension": config.dimension,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": config.cloud,
                    "region": config.region,
                }
            }
        });

        let resp = client
            .post(format!("{CONTROL_PLANE_URL}/indexes"))
            .header("Api-Key", api_key)
            .json(&body)
            .send()?;

        let resp = Self::check_status(resp)?;
        Ok(resp.json()?)
    }

    fn check_status(
        resp: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, IndexError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().unwrap_or_default();
        Err(IndexError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, record: ProblemRecord) -> Result<(), IndexError> {
        let body = json!({ "vectors": [record] });

        let resp = self
            .client
            .post(format!("{}/vectors/upsert", self.host))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()?;

        Self::check_status(resp)?;
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&[String]>,
    ) -> Result<Vec<Match>, IndexError> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });

        if let Some(labels) = filter {
            body["filter"] = json!({ "labels": { "$in": labels } });
        }

        let resp = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()?;

        let resp = Self::check_status(resp)?;
        let parsed: QueryResponse = resp.json()?;

        Ok(parsed.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_parsing() {
        let raw = r#"{
            "matches": [
                {
                    "id": "01J0A",
                    "score": 0.98,
                    "metadata": {"text": "2x+3=7を解け", "labels": ["数学 - 1次方程式"]}
                },
                {
                    "id": "01J0B",
                    "score": 0.75,
                    "metadata": {"labels": "数学 - 文字式"}
                }
            ],
            "namespace": ""
        }"#;

        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(parsed.matches[0].metadata.text, "2x+3=7を解け");
        // bare-string labels from older records normalize to a one-element list
        assert_eq!(parsed.matches[1].metadata.labels, vec!["数学 - 文字式"]);
        assert!(parsed.matches[1].metadata.text.is_empty());
    }

    #[test]
    fn test_query_response_no_matches() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.matches.is_empty());
    }

    #[test]
    fn test_index_list_parsing() {
        let raw = r#"{"indexes": [{"name": "myindex", "host": "myindex-abc.svc.pinecone.io"}]}"#;
        let parsed: IndexList = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.indexes[0].name, "myindex");
        assert_eq!(
            parsed.indexes[0].host.as_deref(),
            Some("myindex-abc.svc.pinecone.io")
        );
    }
}
