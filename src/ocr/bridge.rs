use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::ocr::annotation::TextAnnotation;
use crate::ocr::{OcrError, Recognizer};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
const FEATURE: &str = "DOCUMENT_TEXT_DETECTION";

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl VisionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateReply {
    #[serde(default)]
    responses: Vec<AnnotateResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Client for the document text detection endpoint of the vision service.
/// One request carries exactly one image.
#[derive(Debug, Clone)]
pub struct VisionBridge {
    client: reqwest::Client,
    config: VisionConfig,
}

impl VisionBridge {
    pub fn new(config: VisionConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }
}

#[async_trait]
impl Recognizer for VisionBridge {
    async fn recognize(&self, image_png: &[u8]) -> Result<Option<TextAnnotation>, OcrError> {
        let content = base64::engine::general_purpose::STANDARD.encode(image_png);
        let request = serde_json::json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": FEATURE }],
            }]
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Api(format!("service returned {status}: {body}")));
        }

        let body = response.bytes().await?;
        parse_reply(&body)
    }
}

/// Extracts the annotation of the single image sent in a request.
fn parse_reply(body: &[u8]) -> Result<Option<TextAnnotation>, OcrError> {
    let reply: AnnotateReply = serde_json::from_slice(body)
        .map_err(|err| OcrError::Api(format!("failed to parse service reply: {err}")))?;

    let Some(first) = reply.responses.into_iter().next() else {
        return Ok(None);
    };
    if let Some(status) = first.error {
        return Err(OcrError::Api(format!("code {}: {}", status.code, status.message)));
    }
    Ok(first.full_text_annotation)
}
