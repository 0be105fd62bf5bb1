use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;

use pb_core::eval::{DatasetError, DatasetName, EvalError, ImageRow, SplitName, TemplateError, TemplateSet};

// ---------------------------------------------------------------------------
// RowsQuery — cache key for one rows-API fetch
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowsQuery {
    pub dataset: String,
    pub config: String,
    pub split: String,
    pub length: usize,
}

// ---------------------------------------------------------------------------
// Wire types for the datasets-server rows API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RowsEnvelope {
    #[serde(default)]
    rows: Vec<RowEnvelope>,
}

#[derive(Debug, Deserialize)]
struct RowEnvelope {
    row_idx: usize,
    row: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// DatasetClient — memoized read-only access to the dataset service
// ---------------------------------------------------------------------------

/// Fetches dataset rows over HTTP and memoizes them process-wide, keyed by
/// the full query. Entries live for the process lifetime; the upstream is
/// hit at most once per distinct query (a cold-start race may fetch twice,
/// which is harmless for an immutable dataset).
pub struct DatasetClient {
    http: reqwest::Client,
    api_base: String,
    cache: RwLock<HashMap<RowsQuery, Arc<Vec<ImageRow>>>>,
}

impl DatasetClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn rows(&self, query: &RowsQuery) -> Result<Arc<Vec<ImageRow>>, DatasetError> {
        if let Some(cached) = self.cache.read().await.get(query) {
            return Ok(Arc::clone(cached));
        }

        let fetched = Arc::new(self.fetch_rows(query).await?);
        tracing::info!(
            dataset = %query.dataset,
            config = %query.config,
            split = %query.split,
            rows = fetched.len(),
            "fetched dataset rows"
        );

        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(query.clone())
            .or_insert_with(|| Arc::clone(&fetched));
        Ok(Arc::clone(entry))
    }

    /// Loads the template record: the first row of the templates config,
    /// whose `query_templates`, `query_conditions` and `logistics` cells are
    /// JSON-encoded strings.
    pub async fn template_set(&self, query: &RowsQuery) -> Result<TemplateSet, EvalError> {
        let rows = self.rows(query).await?;
        let first = rows.first().ok_or_else(|| DatasetError::EmptySplit {
            dataset: DatasetName::new(&query.dataset),
            split: SplitName::new(&query.split),
        })?;

        let set = TemplateSet::from_parts(
            required_field(first, "query_templates")?,
            required_field(first, "query_conditions")?,
            required_field(first, "logistics")?,
        )?;
        Ok(set)
    }

    async fn fetch_rows(&self, query: &RowsQuery) -> Result<Vec<ImageRow>, DatasetError> {
        let url = format!("{}/rows", self.api_base);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("dataset", query.dataset.as_str()),
                ("config", query.config.as_str()),
                ("split", query.split.as_str()),
            ])
            .query(&[("offset", 0usize), ("length", query.length)])
            .send()
            .await
            .map_err(|e| DatasetError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DatasetError::HttpStatus { status, body });
        }

        let envelope: RowsEnvelope = resp
            .json()
            .await
            .map_err(|e| DatasetError::Decode(e.to_string()))?;

        if envelope.rows.is_empty() {
            return Err(DatasetError::EmptySplit {
                dataset: DatasetName::new(&query.dataset),
                split: SplitName::new(&query.split),
            });
        }

        Ok(envelope
            .rows
            .into_iter()
            .map(|r| ImageRow::new(r.row_idx, r.row))
            .collect())
    }
}

fn required_field<'a>(row: &'a ImageRow, key: &str) -> Result<&'a str, TemplateError> {
    row.string_field(key)
        .ok_or_else(|| TemplateError::Decode(format!("templates row missing field {key}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
