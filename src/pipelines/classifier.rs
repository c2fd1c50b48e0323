// SPDX-License-Identifier: GPL-3.0-only

//! Remote classifier client
//!
//! Submits a preprocessed still to `POST <base>/identify` and reads the
//! `prediction` field of the JSON answer. The server also reports how long
//! it spent preprocessing and running the model; those are kept when
//! present.

use super::preprocess::EncodedFrame;
use crate::constants::classifier as defaults;
use crate::errors::ClassifyError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// How the image is put on the wire
///
/// `Json` sends `{"image": "<base64>"}` as `application/json`. `Multipart`
/// sends a `multipart/form-data` body with the JPEG as a file part named
/// `image`, which is what form-based servers read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestEncoding {
    #[default]
    Json,
    Multipart,
}

/// One classification result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Prediction {
    /// Predicted label; empty when the server sent none
    pub label: String,
    /// Server-side preprocessing time, as reported
    pub preprocessing_time: Option<String>,
    /// Server-side inference time, as reported
    pub inference_time: Option<String>,
}

impl Prediction {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }
}

/// Anything that can turn a still into a label
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn identify(&self, frame: &EncodedFrame) -> Result<Prediction, ClassifyError>;
}

#[derive(Serialize)]
struct IdentifyRequest<'a> {
    image: &'a str,
}

/// HTTP classifier client
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    base_url: Url,
    identify_url: Url,
    encoding: RequestEncoding,
}

impl HttpClassifier {
    /// Create a client for the server at `base_url`
    pub fn new(
        base_url: &str,
        encoding: RequestEncoding,
        timeout: Option<Duration>,
    ) -> Result<Self, ClassifyError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base = Url::parse(&format!("{}/", trimmed))
            .map_err(|e| ClassifyError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClassifyError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                base.scheme()
            )));
        }
        let identify_url = base
            .join(defaults::IDENTIFY_PATH)
            .map_err(|e| ClassifyError::InvalidEndpoint(e.to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClassifyError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        info!(endpoint = %identify_url, encoding = ?encoding, "Classifier client ready");
        Ok(Self {
            client,
            base_url: base,
            identify_url,
            encoding,
        })
    }

    /// Full URL identification requests go to
    pub fn identify_url(&self) -> &Url {
        &self.identify_url
    }

    /// Fetch the server's index page as a liveness check
    pub async fn health(&self) -> Result<String, ClassifyError> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassifyError::Status {
                code: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body.trim().to_string())
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn identify(&self, frame: &EncodedFrame) -> Result<Prediction, ClassifyError> {
        let request = self.client.post(self.identify_url.clone());
        let request = match self.encoding {
            RequestEncoding::Json => request.json(&IdentifyRequest {
                image: &frame.base64,
            }),
            RequestEncoding::Multipart => {
                let part = Part::bytes(frame.jpeg.clone())
                    .file_name(defaults::MULTIPART_FILE_NAME)
                    .mime_str("image/jpeg")?;
                request.multipart(Form::new().part(defaults::IMAGE_FIELD, part))
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = server_error_message(&body).unwrap_or_else(|| truncate_body(&body));
            error!(status = status.as_u16(), response = %message, "Classifier returned an error");
            return Err(ClassifyError::Status {
                code: status.as_u16(),
                body: message,
            });
        }

        let prediction = parse_prediction(&body)?;
        debug!(
            label = %prediction.label,
            inference_time = ?prediction.inference_time,
            "Classifier responded"
        );
        Ok(prediction)
    }
}

/// Parse a successful response body
///
/// A missing or null `prediction` yields an empty label; a body that is not
/// a JSON object is malformed.
pub fn parse_prediction(body: &str) -> Result<Prediction, ClassifyError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ClassifyError::MalformedResponse(format!("{}: {}", e, truncate_body(body))))?;
    let object = value
        .as_object()
        .ok_or_else(|| ClassifyError::MalformedResponse(format!("expected object, got {}", value)))?;

    let text_field = |name: &str| -> Option<String> {
        match object.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    };

    Ok(Prediction {
        label: text_field("prediction").unwrap_or_default(),
        preprocessing_time: text_field("preprocessing_time"),
        inference_time: text_field("inference_time"),
    })
}

/// The `error` field of a JSON error body, if any
fn server_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= defaults::MAX_ERROR_BODY_LEN {
        return body.to_string();
    }
    let mut end = defaults::MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
