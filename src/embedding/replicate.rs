use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbedError, EmbeddingProvider};

const REPLICATE_API_URL: &str = "https://api.replicate.com/v1";

/// CLIP image embeddings via the Replicate predictions API.
pub struct ReplicateEmbedder {
    model_version: String,
    api_token: Option<String>,
    dimensions: u32,
    http_client: reqwest::Client,
    base_url: String,
    prediction_deadline: Duration,
    poll_interval: Duration,
}

#[derive(Serialize)]
struct PredictionRequest {
    version: String,
    input: PredictionInput,
}

#[derive(Serialize)]
struct PredictionInput {
    image: String,
}

#[derive(Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ReplicateEmbedder {
    pub fn new(
        model_version: &str,
        api_token: Option<String>,
        dimensions: u32,
        request_timeout: Duration,
        prediction_deadline: Duration,
    ) -> Self {
        Self {
            model_version: model_version.to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            dimensions,
            http_client: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            base_url: REPLICATE_API_URL.to_string(),
            prediction_deadline,
            poll_interval: Duration::from_secs(1),
        }
    }

    async fn create_prediction(
        &self,
        token: &str,
        image: String,
    ) -> Result<PredictionResponse, EmbedError> {
        let request = PredictionRequest {
            version: self.model_version.clone(),
            input: PredictionInput { image },
        };

        let resp = self
            .http_client
            .post(format!("{}/predictions", self.base_url))
            .bearer_auth(token)
            .header("Prefer", "wait")
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::Provider(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Provider(format!(
                "Replicate API error ({status}): {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| EmbedError::Provider(format!("malformed prediction response: {e}")))
    }

    async fn get_prediction(
        &self,
        token: &str,
        id: &str,
    ) -> Result<PredictionResponse, EmbedError> {
        let resp = self
            .http_client
            .get(format!("{}/predictions/{id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| EmbedError::Provider(format!("poll failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Provider(format!(
                "Replicate poll error ({status}): {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| EmbedError::Provider(format!("malformed prediction response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for ReplicateEmbedder {
    async fn embed(&self, image: &str) -> Result<Vec<f32>, EmbedError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| EmbedError::Unavailable("REPLICATE_API_TOKEN is not set".to_string()))?
            .to_string();

        let image_ref = normalize_image_ref(image);
        let mut prediction = self.create_prediction(&token, image_ref).await?;

        let deadline = tokio::time::Instant::now() + self.prediction_deadline;
        while matches!(prediction.status.as_str(), "starting" | "processing") {
            if tokio::time::Instant::now() >= deadline {
                return Err(EmbedError::Provider(format!(
                    "prediction {} did not finish within {:?}",
                    prediction.id, self.prediction_deadline
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.get_prediction(&token, &prediction.id).await?;
        }

        match prediction.status.as_str() {
            "succeeded" => {
                let vector = parse_output(prediction.output.as_ref())?;
                debug!(
                    "Prediction {} produced a {}-dim embedding",
                    prediction.id,
                    vector.len()
                );
                Ok(vector)
            }
            status => {
                let detail = prediction
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                Err(EmbedError::Provider(format!(
                    "prediction {} ended as {status}: {detail}",
                    prediction.id
                )))
            }
        }
    }

    fn dimensions(&self) -> u32 {
        self.dimensions
    }
}

/// Normalize a caller-supplied image reference into what Replicate accepts.
///
/// URLs and data: URIs pass through; a raw base64 payload is wrapped into a
/// data: URI with the MIME type sniffed from its leading bytes.
fn normalize_image_ref(image: &str) -> String {
    let trimmed = image.trim();
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("data:")
    {
        return trimmed.to_string();
    }

    let mime = base64::engine::general_purpose::STANDARD
        .decode(trimmed.as_bytes().get(..16).unwrap_or(trimmed.as_bytes()))
        .map(|head| detect_image_mime(&head))
        .unwrap_or("image/jpeg");
    format!("data:{mime};base64,{trimmed}")
}

/// Detect MIME type from raw image bytes.
fn detect_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(b"\x89PNG") {
        "image/png"
    } else if data.starts_with(b"\xff\xd8") {
        "image/jpeg"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.starts_with(b"RIFF") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Normalize prediction output into an embedding vector.
///
/// Accepts a bare array of numbers or an object carrying an `embedding`
/// array. Null/absent output is "no embedding produced" (empty vector);
/// anything non-numeric or non-finite is rejected rather than propagated.
fn parse_output(output: Option<&serde_json::Value>) -> Result<Vec<f32>, EmbedError> {
    let value = match output {
        None | Some(serde_json::Value::Null) => return Ok(vec![]),
        Some(v) => v,
    };

    let array = match value {
        serde_json::Value::Array(a) => a,
        serde_json::Value::Object(o) => match o.get("embedding") {
            Some(serde_json::Value::Array(a)) => a,
            Some(serde_json::Value::Null) | None => return Ok(vec![]),
            Some(other) => {
                return Err(EmbedError::Provider(format!(
                    "embedding field is not an array: {other}"
                )))
            }
        },
        other => {
            return Err(EmbedError::Provider(format!(
                "unexpected output shape: {other}"
            )))
        }
    };

    let mut vector = Vec::with_capacity(array.len());
    for element in array {
        let n = element
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| EmbedError::Provider(format!("non-numeric element: {element}")))?;
        vector.push(n as f32);
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_request_serialization() {
        let req = PredictionRequest {
            version: "abc123".to_string(),
            input: PredictionInput {
                image: "https://cdn.example.com/a.jpg".to_string(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["version"], "abc123");
        assert_eq!(json["input"]["image"], "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_prediction_response_deserialization() {
        let json = r#"{
            "id": "p1",
            "status": "succeeded",
            "output": [0.1, 0.2, 0.3],
            "error": null,
            "logs": ""
        }"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, "p1");
        assert_eq!(resp.status, "succeeded");
        assert_eq!(parse_output(resp.output.as_ref()).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_output_object_form() {
        let value = serde_json::json!({"embedding": [1.0, -2.5]});
        let vector = parse_output(Some(&value)).unwrap();
        assert_eq!(vector, vec![1.0, -2.5]);
    }

    #[test]
    fn test_parse_output_missing_is_empty() {
        assert!(parse_output(None).unwrap().is_empty());
        assert!(parse_output(Some(&serde_json::Value::Null))
            .unwrap()
            .is_empty());
        let value = serde_json::json!({"embedding": null});
        assert!(parse_output(Some(&value)).unwrap().is_empty());
    }

    #[test]
    fn test_parse_output_rejects_non_numeric() {
        let value = serde_json::json!([0.1, "oops", 0.3]);
        assert!(parse_output(Some(&value)).is_err());

        let value = serde_json::json!("not a vector");
        assert!(parse_output(Some(&value)).is_err());
    }

    #[test]
    fn test_normalize_image_ref() {
        assert_eq!(
            normalize_image_ref("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(
            normalize_image_ref("data:image/png;base64,iVBOR"),
            "data:image/png;base64,iVBOR"
        );

        let png =
            base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nxxxxxxxxxx");
        let normalized = normalize_image_ref(&png);
        assert!(normalized.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_embed_without_token_is_unavailable() {
        let embedder = ReplicateEmbedder::new(
            "abc123",
            None,
            768,
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        let err = embedder
            .embed("https://cdn.example.com/a.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::Unavailable(_)));
    }
}
