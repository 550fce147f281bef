//! Thin reqwest client over the Elasticsearch/OpenSearch-style HTTP surface
//! the service depends on for search, bulk apply, and index lifecycle.

use std::time::SystemTime;

use anyhow::Context;
use errors::ErrorMetadata;
use serde::Deserialize;
use serde_json::{
    json,
    Value,
};

use crate::page_token::{
    decode_page_token,
    encode_page_token,
    hash_query,
    normalize_groups,
    normalize_tags,
    PageTokenPayload,
};
use crate::query::build_query;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct SearchClientConfig {
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub page_token_secret: Vec<u8>,
}

pub struct SearchClient {
    http: reqwest::Client,
    config: SearchClientConfig,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub asset_ids: Vec<String>,
    pub next_token: Option<String>,
    pub total: Option<u64>,
}

pub enum BulkAction {
    Index { id: String, doc: Value },
    Delete { id: String },
}

impl SearchClient {
    pub fn new(config: SearchClientConfig) -> anyhow::Result<Self> {
        if config.base_url.is_empty() {
            anyhow::bail!("search base_url required");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut req = self.http.request(method, url);
        if let Some(user) = &self.config.user {
            req = req.basic_auth(user, self.config.password.clone());
        }
        req
    }

    fn index_name(app_id: &str) -> String {
        format!("{app_id}_data_assets_v2")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search_asset_ids(
        &self,
        app_id: &str,
        team_id: &str,
        view_tag_groups: &[Vec<String>],
        user_tags: &[String],
        name: &str,
        limit: i64,
        page_token: Option<&str>,
    ) -> anyhow::Result<SearchResult> {
        let limit = clamp_limit(limit);
        let normalized_groups = normalize_groups(view_tag_groups);
        let normalized_tags = normalize_tags(user_tags);
        let tags_hash = hash_query(&normalized_groups, &normalized_tags, name);

        let (anchor, last_updated, last_id) = match page_token {
            Some(token) if !token.is_empty() => {
                let payload = decode_page_token(&self.config.page_token_secret, token)?;
                if payload.app_id != app_id || payload.team_id != team_id || payload.tags_hash != tags_hash {
                    anyhow::bail!(ErrorMetadata::invalid_argument(
                        "PageTokenMismatch",
                        "page_token mismatch"
                    ));
                }
                (payload.anchor, payload.last_updated, payload.last_id)
            }
            _ => (now_millis(), 0, String::new()),
        };

        let query = build_query(team_id, anchor, &normalized_groups, &normalized_tags, name);
        let mut body = json!({
            "size": limit,
            "query": query,
            "sort": [
                {"updated_timestamp": {"order": "desc"}},
                {"asset_id": {"order": "desc"}},
            ],
            "_source": ["asset_id"],
            "track_total_hits": true,
        });
        if last_updated > 0 && !last_id.is_empty() {
            body["search_after"] = json!([last_updated, last_id]);
        }

        let index = Self::index_name(app_id);
        let response = self
            .request(reqwest::Method::POST, &format!("{index}/_search"))
            .json(&body)
            .send()
            .await
            .context("sending search request")?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                format!("search backend returned {status}: {text}")
            ));
        }

        let parsed: EsSearchResponse = response.json().await.context("decoding search response")?;
        let ids: Vec<String> = parsed
            .hits
            .hits
            .iter()
            .filter_map(|hit| hit.source.get("asset_id").and_then(Value::as_str))
            .map(str::to_string)
            .filter(|id| !id.is_empty())
            .collect();

        let next_token = if parsed.hits.hits.len() as i64 == limit {
            parsed.hits.hits.last().and_then(|hit| {
                let (updated, id) = parse_sort(&hit.sort)?;
                encode_page_token(
                    &self.config.page_token_secret,
                    &PageTokenPayload {
                        version: 1,
                        anchor,
                        last_updated: updated,
                        last_id: id,
                        tags_hash: tags_hash.clone(),
                        app_id: app_id.to_string(),
                        team_id: team_id.to_string(),
                    },
                )
                .ok()
            })
        } else {
            None
        };

        Ok(SearchResult {
            asset_ids: ids,
            next_token,
            total: parsed.hits.total.map(|total| total.value),
        })
    }

    pub async fn bulk_apply(&self, index: &str, actions: &[BulkAction]) -> anyhow::Result<Vec<usize>> {
        if actions.is_empty() {
            return Ok(Vec::new());
        }
        let mut body = String::new();
        for action in actions {
            match action {
                BulkAction::Index { id, doc } => {
                    body.push_str(&serde_json::to_string(&json!({"index": {"_index": index, "_id": id}}))?);
                    body.push('\n');
                    body.push_str(&serde_json::to_string(doc)?);
                    body.push('\n');
                }
                BulkAction::Delete { id } => {
                    body.push_str(&serde_json::to_string(&json!({"delete": {"_index": index, "_id": id}}))?);
                    body.push('\n');
                }
            }
        }

        let response = self
            .request(reqwest::Method::POST, "_bulk")
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .context("sending bulk request")?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                format!("bulk apply returned {status}: {text}")
            ));
        }

        let parsed: BulkResponse = response.json().await.context("decoding bulk response")?;
        if parsed.items.len() != actions.len() {
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                "bulk response size mismatch"
            ));
        }

        let mut failed = Vec::new();
        for (idx, (item, action)) in parsed.items.iter().zip(actions.iter()).enumerate() {
            for (action_name, result) in item {
                if result.status >= 300 {
                    let is_idempotent_delete = action_name == "delete" && result.status == 404;
                    let _ = action;
                    if !is_idempotent_delete {
                        failed.push(idx);
                    }
                }
            }
        }
        Ok(failed)
    }

    pub async fn delete_index(&self, index: &str) -> anyhow::Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, index)
            .send()
            .await
            .context("deleting index")?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                format!("delete index returned {status}: {text}")
            ));
        }
        Ok(())
    }

    pub async fn create_index(&self, index: &str) -> anyhow::Result<()> {
        let mapping = json!({
            "mappings": {
                "properties": {
                    "asset_id": {"type": "keyword"},
                    "team_id": {"type": "keyword"},
                    "name": {"type": "text"},
                    "tag_ids": {"type": "keyword"},
                    "asset_type": {"type": "keyword"},
                    "status": {"type": "keyword"},
                    "created_timestamp": {"type": "long"},
                    "updated_timestamp": {"type": "long"},
                }
            }
        });
        let response = self
            .request(reqwest::Method::PUT, index)
            .json(&mapping)
            .send()
            .await
            .context("creating index")?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                format!("create index returned {status}: {text}")
            ));
        }
        Ok(())
    }

    pub async fn refresh_index(&self, index: &str) -> anyhow::Result<()> {
        let response = self
            .request(reqwest::Method::POST, &format!("{index}/_refresh"))
            .send()
            .await
            .context("refreshing index")?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(ErrorMetadata::transient(
                "SearchBackendError",
                format!("refresh index returned {status}: {text}")
            ));
        }
        Ok(())
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let response = self
            .request(reqwest::Method::GET, "")
            .send()
            .await
            .context("pinging search backend")?;
        if !response.status().is_success() {
            anyhow::bail!("search backend ping returned {}", response.status());
        }
        Ok(())
    }
}

pub fn index_name_for(app_id: &str) -> String {
    SearchClient::index_name(app_id)
}

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    hits: Vec<EsHit>,
    total: Option<EsTotal>,
}

#[derive(Debug, Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_source")]
    source: Value,
    sort: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    items: Vec<std::collections::HashMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    status: i32,
}

fn parse_sort(sort: &Option<Vec<Value>>) -> Option<(i64, String)> {
    let sort = sort.as_ref()?;
    if sort.len() < 2 {
        return None;
    }
    let updated = sort[0].as_i64()?;
    let id = sort[1].as_str()?.to_string();
    Some((updated, id))
}

fn clamp_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIMIT
    } else if limit > MAX_LIMIT {
        MAX_LIMIT
    } else {
        limit
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}
