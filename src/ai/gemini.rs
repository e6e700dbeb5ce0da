//! Google Gemini implementation of the document AI service
//!
//! Uses the File API (resumable upload protocol) to register documents and
//! `generateContent` with a `file_data` part for inference, as documented at
//! <https://ai.google.dev/api/files>.

use super::error::{AiError, AiErrorKind, AiOp};
use super::{DocumentAi, DocumentHandle};
use async_trait::async_trait;
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tokio_util::codec::{BytesCodec, FramedRead};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PDF_MIME: &str = "application/pdf";

const SUMMARY_PROMPT: &str =
    "Summarize this document. Highlight the key points as a structured, point-by-point list.";

/// Gemini-backed document AI service
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Open an upload session and return the session URL
    async fn start_upload(&self, display_name: &str, num_bytes: u64) -> Result<String, AiError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", num_bytes)
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(&StartUploadRequest {
                file: StartUploadFile { display_name },
            })
            .send()
            .await
            .map_err(|e| transport_error(AiOp::Upload, &e))?;

        if !response.status().is_success() {
            return Err(api_error(AiOp::Upload, response).await);
        }

        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| {
                AiError::upload(
                    AiErrorKind::Unknown,
                    "upload session response missing x-goog-upload-url header",
                )
            })
    }

    /// Send the staged bytes to the session URL and finalize the upload
    async fn finish_upload(
        &self,
        upload_url: &str,
        staged: &std::path::Path,
        num_bytes: u64,
    ) -> Result<FileResource, AiError> {
        let file = tokio::fs::File::open(staged).await.map_err(|e| {
            AiError::upload(AiErrorKind::Unknown, format!("cannot reopen staged file: {e}"))
        })?;
        let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));

        let response = self
            .client
            .post(upload_url)
            .header("Content-Length", num_bytes)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(AiOp::Upload, &e))?;

        if !response.status().is_success() {
            return Err(api_error(AiOp::Upload, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(AiOp::Upload, &e))?;
        let uploaded: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            AiError::upload(
                AiErrorKind::Unknown,
                format!("failed to parse upload response: {e} - body: {body}"),
            )
        })?;
        Ok(uploaded.file)
    }

    /// Read a file resource back from the service
    async fn get_file(&self, name: &str) -> Result<FileResource, AiError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(AiOp::Upload, &e))?;

        if !response.status().is_success() {
            return Err(api_error(AiOp::Upload, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| transport_error(AiOp::Upload, &e))
    }

    /// Single `generateContent` round trip: document handle plus a text prompt
    async fn generate(&self, handle: &DocumentHandle, prompt: &str) -> Result<String, AiError> {
        let request = build_generate_request(handle, prompt);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(AiOp::Inference, &e))?;

        if !response.status().is_success() {
            return Err(api_error(AiOp::Inference, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(AiOp::Inference, &e))?;
        let generated: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            AiError::inference(
                AiErrorKind::Unknown,
                format!("failed to parse response: {e} - body: {body}"),
            )
        })?;

        extract_text(generated)
    }
}

#[async_trait]
impl DocumentAi for GeminiClient {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<DocumentHandle, AiError> {
        // Stage the bytes to a transient file for the upload. The file is
        // removed when `staged` drops, on every exit path below.
        let mut staged = tempfile::Builder::new()
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| {
                AiError::upload(AiErrorKind::Unknown, format!("cannot stage document: {e}"))
            })?;
        staged.write_all(&bytes).map_err(|e| {
            AiError::upload(AiErrorKind::Unknown, format!("cannot stage document: {e}"))
        })?;
        staged.flush().map_err(|e| {
            AiError::upload(AiErrorKind::Unknown, format!("cannot stage document: {e}"))
        })?;
        let num_bytes = bytes.len() as u64;

        let upload_url = self.start_upload(display_name, num_bytes).await?;
        let resource = self
            .finish_upload(&upload_url, staged.path(), num_bytes)
            .await?;

        let handle = DocumentHandle {
            name: resource.name,
            uri: resource.uri,
        };

        // Read the resource back once and log what the service registered.
        match self.get_file(&handle.name).await {
            Ok(meta) => tracing::info!(
                name = %handle.name,
                uri = %handle.uri,
                display_name = ?meta.display_name,
                state = ?meta.state,
                "document registered with AI service"
            ),
            Err(e) => tracing::warn!(
                name = %handle.name,
                error = %e,
                "could not read back uploaded file resource"
            ),
        }

        Ok(handle)
    }

    async fn summarize(&self, handle: &DocumentHandle) -> Result<String, AiError> {
        self.generate(handle, SUMMARY_PROMPT).await
    }

    async fn answer_question(
        &self,
        handle: &DocumentHandle,
        question: &str,
    ) -> Result<String, AiError> {
        self.generate(handle, question).await
    }
}

fn build_generate_request(handle: &DocumentHandle, prompt: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart::FileData {
                    file_data: FileData {
                        mime_type: PDF_MIME.to_string(),
                        file_uri: handle.uri.clone(),
                    },
                },
                GeminiPart::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, AiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AiError::inference(AiErrorKind::Unknown, "no candidates in response"))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    GeminiPart::FileData { .. } => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AiError::inference(
            AiErrorKind::Unknown,
            "no text in model response",
        ));
    }
    Ok(text)
}

fn transport_error(op: AiOp, e: &reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::new(op, AiErrorKind::Network, format!("request timeout: {e}"))
    } else if e.is_connect() {
        AiError::new(op, AiErrorKind::Network, format!("connection failed: {e}"))
    } else {
        AiError::new(op, AiErrorKind::Unknown, format!("request failed: {e}"))
    }
}

async fn api_error(op: AiOp, response: reqwest::Response) -> AiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GeminiErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    };
    AiError::new(
        op,
        classify_status(status.as_u16()),
        format!("HTTP {status}: {message}"),
    )
}

fn classify_status(status: u16) -> AiErrorKind {
    match status {
        400 | 404 => AiErrorKind::InvalidRequest,
        401 | 403 => AiErrorKind::Auth,
        429 => AiErrorKind::RateLimit,
        500..=599 => AiErrorKind::ServerError,
        _ => AiErrorKind::Unknown,
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct StartUploadRequest<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartUploadFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    uri: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[allow(dead_code)]
    code: Option<i32>,
    #[allow(dead_code)]
    status: Option<String>,
}
