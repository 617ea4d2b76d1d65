//! Image text recognition.
//!
//! `OllamaVisionOcr` asks a local vision model (MedGemma by default) to
//! transcribe the image and streams the answer back as NDJSON, which gives us
//! incremental progress. `ImageExtractor` adapts any [`OcrEngine`] to the
//! per-encoding [`TextExtractor`] seam.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::types::{Document, OcrEngine, ProgressFn, TextExtractor};
use super::{ExtractionError, OcrError};
use crate::config::AppConfig;

// ──────────────────────────────────────────────
// Constants
// ──────────────────────────────────────────────

const OCR_SYSTEM_PROMPT: &str = "\
You are a medical document text extractor. Transcribe ALL visible text from the \
provided image exactly as written. Do not summarise, interpret or add commentary.";

/// Token budget for one transcription. Also the denominator for progress.
const OCR_NUM_PREDICT: u32 = 2048;

/// Streamed progress never claims completion before the final `done` line.
const STREAMING_PROGRESS_CAP: f32 = 0.95;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Display name for an ISO 639-2 code, used in the prompt.
fn language_name(code: &str) -> &str {
    match code {
        "eng" => "English",
        "fra" | "fre" => "French",
        "deu" | "ger" => "German",
        "spa" => "Spanish",
        "ita" => "Italian",
        "por" => "Portuguese",
        other => other,
    }
}

fn user_prompt(lang: &str) -> String {
    format!(
        "Extract all visible text from this document image. The document is written in {}. \
         Output plain text only, preserving line breaks.",
        language_name(lang)
    )
}

// ──────────────────────────────────────────────
// Wire types (Ollama /api/chat, streaming)
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct VisionChatRequest<'a> {
    model: &'a str,
    messages: Vec<VisionChatMessage>,
    stream: bool,
    options: VisionOptions,
}

#[derive(Debug, Serialize)]
struct VisionChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct VisionOptions {
    temperature: f32,
    num_predict: u32,
}

/// One NDJSON line of a streamed chat response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Fold one NDJSON line into the running transcript.
/// Returns `Ok(true)` once the model reports it is done.
fn apply_chunk(line: &[u8], transcript: &mut String) -> Result<bool, OcrError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(false);
    }
    let chunk: ChatChunk = serde_json::from_slice(line)
        .map_err(|e| OcrError::MalformedResponse(e.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(OcrError::Engine(error));
    }
    if let Some(message) = chunk.message {
        transcript.push_str(&message.content);
    }
    Ok(chunk.done)
}

// ──────────────────────────────────────────────
// OllamaVisionOcr
// ──────────────────────────────────────────────

/// Production OCR engine backed by an Ollama vision model.
pub struct OllamaVisionOcr {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaVisionOcr {
    pub fn new(base_url: &str, model: &str) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OcrError::Engine(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, OcrError> {
        Self::new(&config.ocr_url, &config.ocr_model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl OcrEngine for OllamaVisionOcr {
    async fn recognize(
        &self,
        image_bytes: &[u8],
        lang: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<String, OcrError> {
        let start = std::time::Instant::now();
        progress(0.0);

        let body = VisionChatRequest {
            model: &self.model,
            messages: vec![
                VisionChatMessage {
                    role: "system",
                    content: OCR_SYSTEM_PROMPT.to_string(),
                    images: None,
                },
                VisionChatMessage {
                    role: "user",
                    content: user_prompt(lang),
                    images: Some(vec![
                        base64::engine::general_purpose::STANDARD.encode(image_bytes)
                    ]),
                },
            ],
            stream: true,
            options: VisionOptions {
                temperature: 0.0,
                num_predict: OCR_NUM_PREDICT,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    OcrError::Unreachable(self.base_url.clone())
                } else {
                    OcrError::Engine(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut transcript = String::new();
        let mut chunks: u32 = 0;
        let mut done = false;

        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|e| OcrError::MalformedResponse(e.to_string()))?;
            pending.extend_from_slice(&bytes);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                done |= apply_chunk(&line, &mut transcript)?;
                chunks += 1;
                progress((chunks as f32 / OCR_NUM_PREDICT as f32).min(STREAMING_PROGRESS_CAP));
            }
        }
        if !pending.is_empty() {
            done |= apply_chunk(&pending, &mut transcript)?;
        }

        if !done {
            tracing::warn!(model = %self.model, chunks, "OCR stream ended without done marker");
        }

        tracing::info!(
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            chunks,
            text_len = transcript.len(),
            "Vision OCR complete"
        );

        progress(1.0);
        Ok(transcript)
    }
}

// ──────────────────────────────────────────────
// MockOcrEngine
// ──────────────────────────────────────────────

/// Mock OCR engine for testing. Reports a few progress steps, then returns
/// the configured result. Records the language it was asked for.
pub struct MockOcrEngine {
    result: Result<String, String>,
    last_lang: Mutex<Option<String>>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            last_lang: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            last_lang: Mutex::new(None),
        }
    }

    pub fn last_lang(&self) -> Option<String> {
        self.last_lang.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize(
        &self,
        _image_bytes: &[u8],
        lang: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<String, OcrError> {
        if let Ok(mut guard) = self.last_lang.lock() {
            *guard = Some(lang.to_string());
        }
        for step in [0.25, 0.5, 0.75, 1.0] {
            progress(step);
        }
        self.result.clone().map_err(OcrError::Engine)
    }
}

// ──────────────────────────────────────────────
// ImageExtractor
// ──────────────────────────────────────────────

/// Image handler: delegates recognition to an [`OcrEngine`].
pub struct ImageExtractor {
    engine: Arc<dyn OcrEngine>,
    lang: String,
}

impl ImageExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, lang: &str) -> Self {
        Self {
            engine,
            lang: lang.to_string(),
        }
    }
}

#[async_trait]
impl TextExtractor for ImageExtractor {
    async fn extract(
        &self,
        document: &Document,
        progress: &ProgressFn<'_>,
    ) -> Result<String, ExtractionError> {
        self.engine
            .recognize(document.bytes(), &self.lang, progress)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "OCR engine failed");
                ExtractionError::OcrFailure(e)
            })
    }
}
