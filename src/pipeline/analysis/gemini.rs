use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{GenerationClient, GenerationConfig, GenerationRequest};
use super::RemoteServiceError;
use crate::config::AppConfig;

// ──────────────────────────────────────────────
// Wire types (generateContent)
// ──────────────────────────────────────────────

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<GenerationConfig> for WireGenerationConfig {
    fn from(c: GenerationConfig) -> Self {
        Self {
            temperature: c.temperature,
            top_k: c.top_k,
            top_p: c.top_p,
            max_output_tokens: c.max_output_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
}

/// Translate a non-success HTTP status into a remote error.
pub fn map_status(status: u16, body: &str) -> RemoteServiceError {
    match status {
        400 => RemoteServiceError::InvalidRequest(
            api_error_message(body).unwrap_or_else(|| "Check your prompt format".into()),
        ),
        401 => RemoteServiceError::InvalidApiKey,
        403 => RemoteServiceError::AccessDenied,
        429 => RemoteServiceError::RateLimited,
        500 => RemoteServiceError::Unavailable,
        other => RemoteServiceError::UnknownStatus {
            status: other,
            message: api_error_message(body).unwrap_or_else(|| "Unknown error".into()),
        },
    }
}

// ──────────────────────────────────────────────
// GeminiClient
// ──────────────────────────────────────────────

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteServiceError::RequestConstruction(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteServiceError> {
        Self::new(
            &config.gemini_base_url,
            &config.gemini_model,
            config.gemini_api_key.clone(),
            config.gemini_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, RemoteServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RemoteServiceError::MissingApiKey)?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: request.config.into(),
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        let start = std::time::Instant::now();
        tracing::debug!(model = %self.model, prompt_len = request.prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    RemoteServiceError::RequestConstruction(e.to_string())
                } else {
                    RemoteServiceError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model = %self.model, status = status.as_u16(), "Gemini request rejected");
            return Err(map_status(status.as_u16(), &body));
        }

        // A body that never finishes (timeout, reset) means no response
        // was received; only a complete body can be malformed.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteServiceError::Unreachable {
                reason: e.to_string(),
            })?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RemoteServiceError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| RemoteServiceError::MalformedResponse("no candidate text".into()))?;

        tracing::info!(
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            response_len = text.len(),
            "Gemini response received"
        );
        Ok(text)
    }
}

// ──────────────────────────────────────────────
// MockGenerationClient
// ──────────────────────────────────────────────

/// Mock generation client for testing. Returns a canned answer (or error
/// status) and records every request it receives.
pub struct MockGenerationClient {
    response: Result<String, u16>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerationClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as the real endpoint would for `status`.
    pub fn failing_with_status(status: u16) -> Self {
        Self {
            response: Err(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, RemoteServiceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(map_status(*status, "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::{Json, Router};
    use std::sync::Arc;

    type Captured = Arc<Mutex<Option<(String, Option<String>, serde_json::Value)>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    fn client(url: &str, key: Option<&str>) -> GeminiClient {
        GeminiClient::new(url, "test-model", key.map(String::from), Duration::from_secs(5)).unwrap()
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            config: GenerationConfig::medical(),
        }
    }

    /// Server that answers every request with `status` and `body`.
    async fn fixed_server(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().fallback(move || async move { (status, body) });
        serve(app).await
    }

    #[tokio::test]
    async fn sends_wire_format_and_reads_first_candidate() {
        let captured: Captured = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&captured);
        let app = Router::new().fallback(
            move |uri: Uri, headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    *sink.lock().unwrap() = Some((uri.path().to_string(), key, body));
                    Json(serde_json::json!({
                        "candidates": [
                            { "content": { "parts": [ { "text": "First answer" }, { "text": "ignored" } ] } },
                            { "content": { "parts": [ { "text": "Second candidate" } ] } }
                        ]
                    }))
                }
            },
        );
        let url = serve(app).await;

        let text = client(&url, Some("secret-key"))
            .generate(&request("Explain this"))
            .await
            .unwrap();
        assert_eq!(text, "First answer");

        let (path, key, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(path, "/models/test-model:generateContent");
        assert_eq!(key.as_deref(), Some("secret-key"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Explain this");
        let config = &body["generationConfig"];
        assert!((config["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(config["topK"], 40);
        assert!((config["topP"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(config["maxOutputTokens"], 4096);
        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        // Nothing listens here; reaching the network would be Unreachable.
        let err = client("http://127.0.0.1:9", None)
            .generate(&request("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteServiceError::MissingApiKey));
        assert_eq!(err.kind(), super::super::RemoteErrorKind::Authentication);
    }

    #[tokio::test]
    async fn rate_limit_status_is_mapped() {
        let url = fixed_server(StatusCode::TOO_MANY_REQUESTS, "{}").await;
        let err = client(&url, Some("k")).generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, RemoteServiceError::RateLimited));
    }

    #[tokio::test]
    async fn bad_request_carries_api_message() {
        let url = fixed_server(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"Request contains an invalid argument."}}"#,
        )
        .await;
        let err = client(&url, Some("k")).generate(&request("x")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid API request: Request contains an invalid argument."
        );
    }

    #[tokio::test]
    async fn empty_candidates_is_malformed() {
        let url = fixed_server(StatusCode::OK, r#"{"candidates":[]}"#).await;
        let err = client(&url, Some("k")).generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, RemoteServiceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_success_body_is_malformed() {
        let url = fixed_server(StatusCode::OK, "<html>oops</html>").await;
        let err = client(&url, Some("k")).generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, RemoteServiceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client(&format!("http://127.0.0.1:{port}"), Some("k"))
            .generate(&request("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteServiceError::Unreachable { .. }));
        assert_eq!(
            err.to_string(),
            "Unable to reach Google AI service. Please check your internet connection."
        );
    }

    #[tokio::test]
    async fn stalled_body_times_out_as_unreachable() {
        use futures_util::StreamExt;

        let app = Router::new().fallback(|| async {
            let chunks = futures_util::stream::iter([Ok::<_, std::convert::Infallible>(
                r#"{"candidates":"#,
            )])
            .chain(futures_util::stream::once(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("[]}")
            }));
            axum::body::Body::from_stream(chunks)
        });
        let url = serve(app).await;

        let slow = GeminiClient::new(&url, "test-model", Some("k".into()), Duration::from_millis(300)).unwrap();
        let err = slow.generate(&request("x")).await.unwrap_err();
        assert!(matches!(err, RemoteServiceError::Unreachable { .. }), "got {err:?}");
        assert_eq!(err.kind(), super::super::RemoteErrorKind::Unreachable);
    }

    #[test]
    fn status_table() {
        use super::super::RemoteErrorKind as K;
        let cases = [
            (400, K::InvalidRequest),
            (401, K::Authentication),
            (403, K::AccessDenied),
            (429, K::RateLimited),
            (500, K::UpstreamUnavailable),
            (503, K::UnknownStatus),
            (404, K::UnknownStatus),
        ];
        for (status, kind) in cases {
            assert_eq!(map_status(status, "").kind(), kind, "status {status}");
        }
    }

    #[test]
    fn status_messages() {
        assert_eq!(map_status(400, "").to_string(), "Invalid API request: Check your prompt format");
        assert_eq!(
            map_status(401, "").to_string(),
            "Invalid API key. Please check your Gemini API key configuration."
        );
        assert_eq!(
            map_status(403, "").to_string(),
            "API access denied. Please check your API key permissions and billing."
        );
        assert_eq!(map_status(500, "").to_string(), "Google AI service is temporarily unavailable.");
        assert_eq!(map_status(418, "").to_string(), "API error 418: Unknown error");
        assert_eq!(
            map_status(503, r#"{"error":{"message":"overloaded"}}"#).to_string(),
            "API error 503: overloaded"
        );
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let c = client("https://example.test/v1beta/", Some("k"));
        assert_eq!(c.endpoint(), "https://example.test/v1beta/models/test-model:generateContent");
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let mock = MockGenerationClient::new("ok");
        mock.generate(&request("one")).await.unwrap();
        mock.generate(&request("two")).await.unwrap();
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.requests()[1].prompt, "two");
    }
}
