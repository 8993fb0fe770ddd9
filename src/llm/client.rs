use crate::analysis::FinancialAnalysis;
use crate::error::{PipelineError, Result};
use crate::llm::types::*;
use crate::schema::CanonicalFinancialData;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

const SYSTEM_PROMPT: &str = "You are a financial analyst. The user sends normalized invoices, \
expenses, payments and balances as JSON. Reply with JSON matching the response schema: a short \
summary, a monthly cash-flow forecast, anomalies, procurement suggestions and KPIs.";

/// Delay before retry number `attempt` (0-based): `base * 2^attempt`, unless
/// the server sent a `Retry-After` value in seconds.
pub fn backoff_delay(attempt: u32, base: Duration, retry_after: Option<u64>) -> Duration {
    match retry_after {
        Some(secs) => Duration::from_secs(secs),
        None => base.saturating_mul(2u32.saturating_pow(attempt)),
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
    base_delay: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Reads the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            PipelineError::Config("GEMINI_API_KEY is not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Sends the canonical data verbatim and parses the structured analysis.
    pub async fn analyze(&self, data: &CanonicalFinancialData) -> Result<FinancialAnalysis> {
        info!(
            "Requesting analysis of {} records from model {}",
            data.metadata.record_count, self.model
        );

        let payload = serde_json::to_string(data)
            .map_err(|e| PipelineError::Analysis(format!("could not encode request data: {}", e)))?;
        let schema = FinancialAnalysis::response_schema()?;
        let text = self
            .generate_content(vec![Content::user(payload)], Some(schema))
            .await?;

        FinancialAnalysis::from_response_text(&text)
    }

    async fn generate_content(
        &self,
        messages: Vec<Content>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: Some(Content::user(SYSTEM_PROMPT)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
            },
        };

        let mut attempt = 0;
        let res = loop {
            let res = self.client.post(&url).json(&payload).send().await?;
            if res.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= self.max_retries {
                break res;
            }

            let retry_after = res
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let delay = backoff_delay(attempt, self.base_delay, retry_after);
            warn!(
                "Rate limited by analysis backend, retry {}/{} in {:?}",
                attempt + 1,
                self.max_retries,
                delay
            );
            sleep(delay).await;
            attempt += 1;
        };

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(PipelineError::Analysis(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        debug!("Analysis backend responded after {} retries", attempt);

        let part = body
            .candidates
            .ok_or_else(|| PipelineError::Analysis("No candidates returned".to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Analysis("Empty candidates list".to_string()))?
            .content
            .parts
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Analysis("No parts in content".to_string()))?;

        match part {
            Part::Text { text } => Ok(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(0, base, None), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, base, None), Duration::from_secs(1));
        assert_eq!(backoff_delay(3, base, None), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_after_wins() {
        assert_eq!(
            backoff_delay(2, Duration::from_secs(1), Some(7)),
            Duration::from_secs(7)
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let client = GeminiClient::new("test-key".to_string())
            .with_base_url("http://127.0.0.1:9")
            .with_retry_policy(0, Duration::from_millis(1));
        let data = crate::normalize(serde_json::json!([])).unwrap();

        let err = client.analyze(&data).await.unwrap_err();
        assert!(matches!(err, PipelineError::Http(_)));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content::user("{}")],
            system_instruction: None,
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "{}");
    }
}
