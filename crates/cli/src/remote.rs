//! Drafting and embedding over OpenAI-compatible HTTP endpoints (`/chat/completions`,
//! `/embeddings`). Works with hosted APIs and local servers such as Ollama or vLLM.

use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use citeseek_answer::{Drafter, DraftingError, GenerateOptions};
use citeseek_index_store::{Embedder, IndexStoreError};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Where a model is served and how to authenticate.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")
    }

    async fn post(&self, client: &Client, path: &str, body: &Value) -> Result<Value, PostError> {
        let url = self.url(path);
        log::debug!("POST {url} (model {})", self.model);
        let mut request = client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PostError::Transport(format!("Request to {url} failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PostError::Transport(format!("Failed to read response body: {e}")))?;
        if !status.is_success() {
            return Err(PostError::Status {
                status: status.as_u16(),
                body: truncate(&text, 300),
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| PostError::Transport(format!("Invalid JSON response: {e}")))
    }
}

#[derive(Debug)]
enum PostError {
    Transport(String),
    Status { status: u16, body: String },
}

impl From<PostError> for DraftingError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Transport(message) => Self::Request(message),
            PostError::Status { status, body } => Self::Status { status, body },
        }
    }
}

impl From<PostError> for IndexStoreError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Transport(message) => Self::EmbeddingError(message),
            PostError::Status { status, body } => {
                Self::EmbeddingError(format!("HTTP {status}: {body}"))
            }
        }
    }
}

pub struct OpenAiCompatDrafter {
    client: Client,
    endpoint: Endpoint,
}

impl OpenAiCompatDrafter {
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
        })
    }
}

#[async_trait]
impl Drafter for OpenAiCompatDrafter {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, DraftingError> {
        let body = chat_body(&self.endpoint.model, system_prompt, user_prompt, options);
        let reply = self
            .endpoint
            .post(&self.client, "chat/completions", &body)
            .await?;
        parse_chat_reply(&reply)
    }
}

fn chat_body(
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    options: &GenerateOptions,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
        "temperature": options.temperature,
        "stream": false,
    });
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if options.json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

fn parse_chat_reply(body: &Value) -> Result<String, DraftingError> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(DraftingError::EmptyResponse);
    }
    Ok(content.to_string())
}

pub struct OpenAiCompatEmbedder {
    client: Client,
    endpoint: Endpoint,
    dimension: usize,
}

impl OpenAiCompatEmbedder {
    pub fn new(endpoint: Endpoint, dimension: usize) -> Result<Self> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
            dimension,
        })
    }

    async fn request(&self, input: Value) -> citeseek_index_store::Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.endpoint.model, "input": input });
        let reply = self
            .endpoint
            .post(&self.client, "embeddings", &body)
            .await?;
        let vectors = parse_embeddings(&reply)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(IndexStoreError::InvalidDimension {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiCompatEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> citeseek_index_store::Result<Vec<f32>> {
        self.request(json!(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexStoreError::EmbeddingError("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> citeseek_index_store::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(json!(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(IndexStoreError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

/// Reads `data[*].embedding`, ordered by `data[*].index` when present.
fn parse_embeddings(body: &Value) -> citeseek_index_store::Result<Vec<Vec<f32>>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexStoreError::EmbeddingError("No data in response".to_string()))?;
    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map_or(position, |i| i as usize);
        let vector: Vec<f32> = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexStoreError::EmbeddingError("Missing embedding".to_string()))?
            .iter()
            .filter_map(Value::as_f64)
            .map(|x| x as f32)
            .collect();
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chat_body_carries_options() {
        let body = chat_body("m", "sys", "user", &GenerateOptions::json());
        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["response_format"]["type"], "json_object");

        let prose = chat_body(
            "m",
            "sys",
            "user",
            &GenerateOptions {
                max_tokens: None,
                ..GenerateOptions::default()
            },
        );
        assert!(prose.get("max_tokens").is_none());
        assert!(prose.get("response_format").is_none());
    }

    #[test]
    fn parses_chat_reply_content() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": " Hi [1]. " } }] });
        assert_eq!(parse_chat_reply(&body).unwrap(), "Hi [1].");

        let empty = json!({ "choices": [] });
        assert!(matches!(
            parse_chat_reply(&empty),
            Err(DraftingError::EmptyResponse)
        ));
    }

    #[test]
    fn parses_embeddings_in_index_order() {
        let body = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] },
            ]
        });
        assert_eq!(
            parse_embeddings(&body).unwrap(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
        assert!(parse_embeddings(&json!({})).is_err());
    }

    #[test]
    fn endpoint_url_joins_paths() {
        let endpoint = Endpoint {
            base_url: "http://localhost:11434/v1/".to_string(),
            model: "m".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            endpoint.url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn http_status_keeps_its_code_for_drafting() {
        let err = DraftingError::from(PostError::Status {
            status: 429,
            body: "rate limited".to_string(),
        });
        assert!(matches!(err, DraftingError::Status { status: 429, .. }));
        assert_eq!(
            err.to_string(),
            "Drafting service returned HTTP 429: rate limited"
        );

        let err = IndexStoreError::from(PostError::Transport("refused".to_string()));
        assert!(matches!(err, IndexStoreError::EmbeddingError(m) if m == "refused"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("äöü", 2), "äö...");
        assert_eq!(truncate("ok", 5), "ok");
    }
}
