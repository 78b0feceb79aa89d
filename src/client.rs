use std::time::Duration;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::models::DocumentMetadata;
use crate::domain::{
    BatchProcessRequest, BatchProcessResponse, DocumentUploadResponse, ErrorEnvelope,
    ProcessOptions, QaRequest, QaResponse, SimplifiedDocument,
};
use crate::ingest::validation::{self, ValidationFailure};

pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(120);
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never completed: connection failure or timeout. The
    /// caller decides whether to retry; this client never retries on its own.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The local validator refused the file; no request was sent.
    #[error("{0}")]
    Invalid(#[from] ValidationFailure),
}

/// HTTP client for the document API. One instance per base URL; an optional
/// bearer token attributes uploads to an account.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Validates locally, then uploads the file as one multipart request.
    /// A file the validator refuses never reaches the network.
    pub async fn upload(
        &self,
        filename: &str,
        declared_mime: Option<&str>,
        data: Vec<u8>,
    ) -> Result<DocumentUploadResponse, ClientError> {
        let mime = validation::resolve_mime(filename, declared_mime);
        validation::validate_upload(filename, &mime, data.len())?;

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(&mime)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.http.post(self.url("/documents/upload")))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn process(
        &self,
        document_id: Uuid,
        options: &ProcessOptions,
    ) -> Result<SimplifiedDocument, ClientError> {
        let response = self
            .authorize(
                self.http
                    .post(self.url(&format!("/documents/{document_id}/process"))),
            )
            .json(options)
            .timeout(PROCESS_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn process_batch(
        &self,
        request: &BatchProcessRequest,
    ) -> Result<BatchProcessResponse, ClientError> {
        let response = self
            .authorize(self.http.post(self.url("/documents/batch/process")))
            .json(request)
            .timeout(BATCH_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn fetch_document(
        &self,
        document_id: Uuid,
    ) -> Result<SimplifiedDocument, ClientError> {
        let response = self
            .authorize(self.http.get(self.url(&format!("/documents/{document_id}"))))
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn fetch_metadata(
        &self,
        document_id: Uuid,
    ) -> Result<DocumentMetadata, ClientError> {
        let response = self
            .authorize(
                self.http
                    .get(self.url(&format!("/documents/{document_id}/metadata"))),
            )
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn delete_document(
        &self,
        document_id: Uuid,
    ) -> Result<serde_json::Value, ClientError> {
        let response = self
            .authorize(
                self.http
                    .delete(self.url(&format!("/documents/{document_id}"))),
            )
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    pub async fn ask_question(
        &self,
        document_id: Uuid,
        request: &QaRequest,
    ) -> Result<QaResponse, ClientError> {
        let response = self
            .authorize(
                self.http
                    .post(self.url(&format!("/documents/{document_id}/qa"))),
            )
            .json(request)
            .timeout(PROCESS_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        read_response(response).await
    }

    /// Sends a feedback event to the analytics sink. Fire-and-forget from
    /// the caller's point of view; losses are acceptable.
    pub async fn send_feedback(
        &self,
        document_id: Uuid,
        feedback: &str,
        rating: Option<u8>,
    ) -> Result<(), ClientError> {
        let body = serde_json::json!({
            "document_id": document_id.to_string(),
            "action": "user_feedback",
            "metadata": { "rating": rating },
            "user_feedback": feedback,
        });
        let response = self
            .authorize(self.http.post(self.url("/analytics/track")))
            .json(&body)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(transport)?;

        let _: serde_json::Value = read_response(response).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Transport("request timed out".to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}

/// Maps any non-2xx response to `Rejected`, preferring the server's error
/// envelope message over the raw status text.
async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::validation::MAX_FILE_SIZE;

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_locally() {
        // The base URL points nowhere; a network attempt would surface as a
        // Transport error, so an Invalid result proves no call was made.
        let client = ApiClient::new("http://127.0.0.1:1");
        let data = vec![0u8; MAX_FILE_SIZE + 1];

        let err = client.upload("big.pdf", None, data).await.unwrap_err();
        match err {
            ClientError::Invalid(failure) => {
                assert!(failure.to_string().contains("10 MB"));
            }
            other => panic!("expected local rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected_locally() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let err = client
            .upload("malware.exe", None, vec![0u8; 64])
            .await
            .unwrap_err();
        match err {
            ClientError::Invalid(failure) => {
                assert!(failure.to_string().contains("not supported"));
            }
            other => panic!("expected local rejection, got {other:?}"),
        }
    }
}
