//! `OpenAI`-compatible chat client and the live agent adapters.

use crate::external::{Adjudicator, Extractor, PmidResolver, Verifier};
use crate::prompts;
use crate::types::{Adjudication, DriverOutput, Mismatch, VerifierPass};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use srx_core::{Decision, Node};
use std::env;

/// `OpenAI`-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    api_key: String,
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// Reads the API key from `OPENAI_API_KEY`; the endpoint can be pointed
    /// at any compatible server via `OPENAI_API_BASE`.
    ///
    /// # Errors
    /// Returns an error if `OPENAI_API_KEY` is not set or HTTP client creation fails.
    #[must_use = "creating a client that is not used is a waste of resources"]
    pub fn new() -> Result<Self> {
        let api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable not set")?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url =
            env::var("OPENAI_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        Ok(Self {
            api_key,
            http_client,
            base_url,
        })
    }

    /// Send a chat completion request, forcing a JSON object response.
    ///
    /// # Errors
    /// Returns an error if the API request fails or the response has no content.
    #[must_use = "this function returns an API response that should be processed"]
    pub async fn chat_completion(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens,
            temperature: 0.0, // determinism across repeated runs
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send chat API request")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read chat API response")?;

        if !status.is_success() {
            anyhow::bail!("chat API request failed with status {status}: {response_text}");
        }

        let chat_response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat API response")?;

        let message_content = chat_response
            .choices
            .first()
            .context("No choices in chat response")?
            .message
            .content
            .clone()
            .context("No content in chat response")?;

        Ok(message_content)
    }
}

/// Strip a markdown code fence from a model response, if present.
///
/// Models occasionally wrap JSON in ```json fences despite the response
/// format instruction.
#[must_use]
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Live extraction agent backed by [`ChatClient`].
#[derive(Debug, Clone)]
pub struct LlmExtractor {
    client: ChatClient,
    model: String,
}

impl LlmExtractor {
    /// Bind the extractor to a model.
    #[must_use]
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, view: &str) -> Result<DriverOutput> {
        let prompt = prompts::driver_prompt(view);
        let response = self
            .client
            .chat_completion(&self.model, prompts::DRIVER_SYSTEM, &prompt, 16_384)
            .await?;
        serde_json::from_str(extract_json(&response))
            .context("driver response did not parse as a DriverOutput")
    }
}

/// Live verification agent backed by [`ChatClient`].
#[derive(Debug, Clone)]
pub struct LlmVerifier {
    client: ChatClient,
    model: String,
}

impl LlmVerifier {
    /// Bind the verifier to a model.
    #[must_use]
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Verifier for LlmVerifier {
    async fn verify_chunk(
        &self,
        view: &str,
        record: &Node,
        decisions: &[Decision],
    ) -> Result<VerifierPass> {
        let prompt = prompts::verifier_prompt(view, record, decisions)?;
        let response = self
            .client
            .chat_completion(&self.model, prompts::VERIFIER_SYSTEM, &prompt, 8_192)
            .await?;
        serde_json::from_str(extract_json(&response))
            .context("verifier response did not parse as a VerifierPass")
    }
}

/// Live adjudication agent backed by [`ChatClient`].
#[derive(Debug, Clone)]
pub struct LlmAdjudicator {
    client: ChatClient,
    model: String,
}

impl LlmAdjudicator {
    /// Bind the adjudicator to a model.
    #[must_use]
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdjudicationEnvelope {
    #[serde(default)]
    verdicts: Vec<Adjudication>,
}

#[async_trait]
impl Adjudicator for LlmAdjudicator {
    async fn adjudicate(
        &self,
        view: &str,
        mismatches: &[Mismatch],
    ) -> Result<Vec<Adjudication>> {
        let prompt = prompts::adjudicator_prompt(view, mismatches)?;
        let response = self
            .client
            .chat_completion(&self.model, prompts::ADJUDICATOR_SYSTEM, &prompt, 4_096)
            .await?;
        let envelope: AdjudicationEnvelope = serde_json::from_str(extract_json(&response))
            .context("adjudicator response did not parse as a verdict list")?;
        Ok(envelope.verdicts)
    }
}

/// PMID lookup against the NCBI E-utilities search endpoint.
#[derive(Debug, Clone)]
pub struct EutilsResolver {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl EutilsResolver {
    /// Create a resolver against the public E-utilities endpoint.
    ///
    /// # Errors
    /// Returns an error if HTTP client creation fails.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = env::var("SRX_EUTILS_BASE")
            .unwrap_or_else(|_| "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string());
        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait]
impl PmidResolver for EutilsResolver {
    async fn resolve(&self, title: &str, doi: Option<&str>) -> Result<Option<String>> {
        let term = match doi {
            Some(doi) if !doi.trim().is_empty() => format!("{}[DOI]", doi.trim()),
            _ => format!("{title}[Title]"),
        };
        let response = self
            .http_client
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&[("db", "pubmed"), ("retmode", "json"), ("term", &term)])
            .send()
            .await
            .context("Failed to send esearch request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("esearch request failed with status {status}");
        }

        let parsed: EsearchResponse = response
            .json()
            .await
            .context("Failed to parse esearch response")?;

        Ok(parsed.esearchresult.idlist.into_iter().next())
    }
}
