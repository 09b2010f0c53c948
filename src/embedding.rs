//! Embedding backends and vector codec helpers.
//!
//! Three providers sit behind the `embedding.provider` config switch:
//! - **`hash`** — local deterministic hashed bag-of-words. No network,
//!   always available, dims taken from config.
//! - **`openai`** — remote embeddings API with batching, a bounded
//!   timeout, and exponential-backoff retry (429/5xx/network errors are
//!   retried, other 4xx fail immediately).
//! - **`disabled`** — always errors; retrieval degrades to no context.
//!
//! Every failure surfaces as [`RetrievalError::EmbeddingUnavailable`];
//! the ingest path treats that as a failed upload and the query path
//! treats it as "no relevant passages".
//!
//! Identical input always maps to identical vectors for a given
//! provider/model, which keeps rebuilds and persisted-index round trips
//! deterministic.

use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::RetrievalError;

/// Embed a batch of texts, one vector per input, in input order.
pub async fn embed_texts(
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    match config.provider.as_str() {
        "hash" => Ok(texts.iter().map(|t| hash_embed(t, config.dims)).collect()),
        "openai" => embed_openai(config, texts).await,
        "disabled" => Err(RetrievalError::EmbeddingUnavailable(
            "embedding provider is disabled".to_string(),
        )),
        other => Err(RetrievalError::EmbeddingUnavailable(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

/// Embed a single query text.
pub async fn embed_query(
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f32>, RetrievalError> {
    let texts = [text.to_string()];
    let results = embed_texts(config, &texts).await?;
    results.into_iter().next().ok_or_else(|| {
        RetrievalError::EmbeddingUnavailable("empty embedding response".to_string())
    })
}

// ============ Local hash provider ============

/// Deterministic hashed bag-of-words embedding.
///
/// Each lowercased alphanumeric token is hashed with SHA-256; the first
/// four digest bytes pick a bucket and the fifth picks a sign. The
/// accumulated vector is L2-normalised. Empty input yields the zero
/// vector.
pub fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dims];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let digest = Sha256::digest(token.to_lowercase().as_bytes());
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
            % dims;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        vec[bucket] += sign;
    }

    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vec {
            *v /= norm;
        }
    }

    vec
}

// ============ OpenAI provider ============

/// Call the embeddings API with retry/backoff, batching inputs by
/// `config.batch_size`.
async fn embed_openai(
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
        RetrievalError::EmbeddingUnavailable("OPENAI_API_KEY not set".to_string())
    })?;

    let model = config.model.as_ref().ok_or_else(|| {
        RetrievalError::EmbeddingUnavailable("embedding.model required".to_string())
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;

    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.batch_size.max(1)) {
        let vectors = embed_openai_batch(config, &client, &api_key, model, batch).await?;
        out.extend(vectors);
    }

    for vec in &out {
        if vec.len() != config.dims {
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "backend returned {}-dim vectors, expected {}",
                vec.len(),
                config.dims
            )));
        }
    }

    Ok(out)
}

async fn embed_openai_batch(
    config: &EmbeddingConfig,
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| RetrievalError::EmbeddingUnavailable(e.to_string()))?;
                    return parse_embedding_response(&json);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = RetrievalError::EmbeddingUnavailable(format!(
                    "embeddings API error {}: {}",
                    status, body_text
                ));

                // Rate limited or server error: retry. Other client
                // errors are not transient.
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(RetrievalError::EmbeddingUnavailable(e.to_string()));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        RetrievalError::EmbeddingUnavailable("embedding failed after retries".to_string())
    }))
}

fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        RetrievalError::EmbeddingUnavailable("invalid response: missing data array".to_string())
    })?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                RetrievalError::EmbeddingUnavailable(
                    "invalid response: missing embedding".to_string(),
                )
            })?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Vector codec ============

/// Encode a float vector as little-endian f32 bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
