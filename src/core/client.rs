//! Async HTTP client for the Zaban API

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::core::aggregate::BatchResult;
use crate::core::config::ClientConfig;
use crate::core::dispatch::{BatchDispatcher, Invoker};
use crate::core::errors::{Result, ZabanError};
use crate::core::models::{
    Operation, RequestDescriptor, ResponsePayload, SpeechAudio, SpeechRequest, Transcription,
    TranscriptionRequest, Translation, TranslationRequest, Transliteration,
    TransliterationRequest,
};

/// Async client for the Zaban translation and speech API
///
/// Cheap to clone; clones share the HTTP connection pool, configuration and
/// the client-wide concurrency semaphore. The underlying transport handle is
/// released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Zaban {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    semaphore: Arc<Semaphore>,
}

impl Zaban {
    /// Create a new client from a configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));

        Ok(Self {
            http,
            config: Arc::new(config),
            semaphore,
        })
    }

    /// Create a client with an explicit API key and default settings
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::with_api_key(api_key))
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Translate a single text
    pub async fn translate(&self, request: &TranslationRequest) -> Result<Translation> {
        let _permit = self.semaphore.acquire().await.unwrap();

        let mut body = json!({
            "text": request.text,
            "target_lang": request.target_lang,
            "auto_detect": request.auto_detect,
        });
        if let Some(source_lang) = &request.source_lang {
            body["source_lang"] = json!(source_lang);
        }

        let (status, value) = self.post_json("v1/translate", &body).await?;
        parse_translation(status, &value)
    }

    /// Transliterate a single text between scripts
    pub async fn transliterate(
        &self,
        request: &TransliterationRequest,
    ) -> Result<Transliteration> {
        let _permit = self.semaphore.acquire().await.unwrap();

        let mut body = json!({
            "text": request.text,
            "source_script": request.source_script,
            "target_script": request.target_script,
            "lang": request.lang,
        });
        if let Some(topk) = request.topk {
            body["topk"] = json!(topk);
        }

        let (status, value) = self.post_json("v1/transliterate", &body).await?;
        parse_transliteration(status, &value)
    }

    /// Synthesize speech from text, returning the raw audio payload
    pub async fn synthesize_speech(&self, request: &SpeechRequest) -> Result<SpeechAudio> {
        let _permit = self.semaphore.acquire().await.unwrap();

        let body = json!({
            "text": request.text,
            "lang": request.lang,
            "speaker": request.speaker,
            "format": request.format,
        });

        let response = self
            .http
            .post(self.config.endpoint("v1/audio/speech"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &message));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("audio/{}", request.format));

        let content = response.bytes().await?.to_vec();
        debug!("Synthesized {} bytes of {}", content.len(), mime_type);

        Ok(SpeechAudio { content, mime_type })
    }

    /// Transcribe speech audio to text
    pub async fn transcribe(&self, request: &TranscriptionRequest) -> Result<Transcription> {
        let _permit = self.semaphore.acquire().await.unwrap();

        let file_part = reqwest::multipart::Part::bytes(request.audio.clone())
            .file_name(request.file_name.clone())
            .mime_str("application/octet-stream")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("lang", request.lang.clone());

        let response = self
            .http
            .post(self.config.endpoint("v1/audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        let value = parse_body(status.as_u16(), &text)?;
        parse_transcription(status.as_u16(), &value)
    }

    /// Create a batch dispatcher over this client with the configured
    /// concurrency limit
    pub fn dispatcher(&self) -> Result<BatchDispatcher<Zaban>> {
        BatchDispatcher::new(Arc::new(self.clone()), self.config.max_concurrent)
    }

    /// Dispatch a mixed batch of descriptors concurrently
    pub async fn dispatch(&self, requests: Vec<RequestDescriptor>) -> Result<BatchResult> {
        Ok(self.dispatcher()?.run(requests).await)
    }

    /// Translate many requests concurrently
    pub async fn translate_batch(
        &self,
        requests: Vec<TranslationRequest>,
    ) -> Result<BatchResult> {
        let descriptors = requests
            .into_iter()
            .map(|request| RequestDescriptor::new(Operation::Translate(request)))
            .collect();
        self.dispatch(descriptors).await
    }

    /// Transliterate many requests concurrently
    pub async fn transliterate_batch(
        &self,
        requests: Vec<TransliterationRequest>,
    ) -> Result<BatchResult> {
        let descriptors = requests
            .into_iter()
            .map(|request| RequestDescriptor::new(Operation::Transliterate(request)))
            .collect();
        self.dispatch(descriptors).await
    }

    /// Translate one text to several target languages concurrently
    pub async fn translate_to_many(
        &self,
        text: &str,
        target_langs: &[&str],
    ) -> Result<BatchResult> {
        let mut descriptors = Vec::with_capacity(target_langs.len());
        for target_lang in target_langs {
            let request = TranslationRequest::new(text, *target_lang)?.with_auto_detect();
            descriptors.push(RequestDescriptor::new(Operation::Translate(request)));
        }
        self.dispatch(descriptors).await
    }

    /// POST a JSON body and return the parsed response with its status
    async fn post_json(&self, path: &str, body: &Value) -> Result<(u16, Value)> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        let value = parse_body(status.as_u16(), &text)?;
        Ok((status.as_u16(), value))
    }
}

#[async_trait]
impl Invoker for Zaban {
    async fn invoke(&self, request: &RequestDescriptor) -> Result<ResponsePayload> {
        match request.operation() {
            Operation::Translate(r) => self.translate(r).await.map(ResponsePayload::Translation),
            Operation::Transliterate(r) => self
                .transliterate(r)
                .await
                .map(ResponsePayload::Transliteration),
            Operation::SynthesizeSpeech(r) => {
                self.synthesize_speech(r).await.map(ResponsePayload::Audio)
            }
            Operation::TranscribeSpeech(r) => {
                self.transcribe(r).await.map(ResponsePayload::Transcription)
            }
        }
    }
}

/// Map a non-success HTTP status to the error taxonomy
fn classify_error(status: u16, body: &str) -> ZabanError {
    let message = extract_message(body);

    match status {
        401 | 403 => ZabanError::Authentication { message },
        400 | 422 => ZabanError::Validation { message },
        _ => ZabanError::Api { status, message },
    }
}

/// Pull a human-readable message out of an error body, falling back to the
/// raw text
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value["error"]["message"]
            .as_str()
            .or_else(|| value["detail"].as_str())
            .or_else(|| value["message"].as_str())
        {
            return message.to_string();
        }
    }
    body.to_string()
}

/// Parse a success body as JSON; malformed bodies are API errors
fn parse_body(status: u16, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| ZabanError::Api {
        status,
        message: format!("malformed response body: {}", e),
    })
}

fn missing_field(status: u16, field: &str) -> ZabanError {
    ZabanError::Api {
        status,
        message: format!("malformed response body: missing {}", field),
    }
}

fn parse_translation(status: u16, value: &Value) -> Result<Translation> {
    let translated_text = value["translated_text"]
        .as_str()
        .ok_or_else(|| missing_field(status, "translated_text"))?
        .to_string();

    Ok(Translation {
        translated_text,
        source_lang: value["source_lang"].as_str().map(|s| s.to_string()),
        model: value["model"].as_str().map(|s| s.to_string()),
    })
}

fn parse_transliteration(status: u16, value: &Value) -> Result<Transliteration> {
    let results = value["results"]
        .as_array()
        .ok_or_else(|| missing_field(status, "results"))?
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();

    Ok(Transliteration { results })
}

fn parse_transcription(status: u16, value: &Value) -> Result<Transcription> {
    let text = value["text"]
        .as_str()
        .ok_or_else(|| missing_field(status, "text"))?
        .to_string();

    Ok(Transcription {
        text,
        language: value["language"].as_str().map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Zaban::with_api_key("sk-test-key");
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_rejects_empty_key() {
        let config = ClientConfig {
            api_key: String::new(),
            ..ClientConfig::with_api_key("placeholder")
        };
        assert!(matches!(
            Zaban::new(config).unwrap_err(),
            ZabanError::Config { .. }
        ));
    }

    #[test]
    fn test_classify_error_statuses() {
        assert!(matches!(
            classify_error(401, "{\"error\": {\"message\": \"bad key\"}}"),
            ZabanError::Authentication { .. }
        ));
        assert!(matches!(
            classify_error(403, "forbidden"),
            ZabanError::Authentication { .. }
        ));
        assert!(matches!(
            classify_error(422, "{\"detail\": \"unknown language\"}"),
            ZabanError::Validation { .. }
        ));
        assert!(matches!(
            classify_error(500, "oops"),
            ZabanError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_extract_message_prefers_structured_error() {
        assert_eq!(
            extract_message("{\"error\": {\"message\": \"bad key\"}}"),
            "bad key"
        );
        assert_eq!(extract_message("{\"detail\": \"nope\"}"), "nope");
        assert_eq!(extract_message("plain text"), "plain text");
    }

    #[test]
    fn test_parse_translation() {
        let value = serde_json::json!({
            "translated_text": "नमस्ते",
            "source_lang": "eng_Latn",
            "model": "zaban-nmt-1",
        });
        let translation = parse_translation(200, &value).unwrap();
        assert_eq!(translation.translated_text, "नमस्ते");
        assert_eq!(translation.source_lang.as_deref(), Some("eng_Latn"));
        assert_eq!(translation.model.as_deref(), Some("zaban-nmt-1"));
    }

    #[test]
    fn test_parse_translation_malformed() {
        let value = serde_json::json!({ "unexpected": true });
        assert!(matches!(
            parse_translation(200, &value).unwrap_err(),
            ZabanError::Api { status: 200, .. }
        ));
    }

    #[test]
    fn test_parse_transliteration_ranked() {
        let value = serde_json::json!({ "results": ["नमस्ते", "नमसते"] });
        let result = parse_transliteration(200, &value).unwrap();
        assert_eq!(result.top(), Some("नमस्ते"));
        assert_eq!(result.results.len(), 2);
    }

    #[test]
    fn test_parse_transcription() {
        let value = serde_json::json!({ "text": "नमस्ते दुनिया", "language": "hi" });
        let transcription = parse_transcription(200, &value).unwrap();
        assert_eq!(transcription.text, "नमस्ते दुनिया");
        assert_eq!(transcription.language.as_deref(), Some("hi"));
    }

    #[test]
    fn test_parse_body_malformed() {
        assert!(matches!(
            parse_body(200, "not json").unwrap_err(),
            ZabanError::Api { status: 200, .. }
        ));
    }
}
