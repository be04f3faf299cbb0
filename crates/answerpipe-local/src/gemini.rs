//! Google Gemini text completion client.

use answerpipe_core::{CompletionRequest, Error, Result, TextCompleter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::env;

const GEMINI_DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Client for the Gemini `generateContent` API.
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Reads `ANSWERPIPE_GEMINI_API_KEY` (fallbacks `GEMINI_API_KEY`, then
    /// `GOOGLE_API_KEY`). `ANSWERPIPE_GEMINI_BASE_URL` and
    /// `ANSWERPIPE_GEMINI_MODEL` override the defaults.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = env("ANSWERPIPE_GEMINI_API_KEY")
            .or_else(|| env("GEMINI_API_KEY"))
            .or_else(|| env("GOOGLE_API_KEY"))
            .ok_or_else(|| {
                Error::NotConfigured(
                    "set ANSWERPIPE_GEMINI_API_KEY, GEMINI_API_KEY or GOOGLE_API_KEY".into(),
                )
            })?;
        let base_url =
            env("ANSWERPIPE_GEMINI_BASE_URL").unwrap_or_else(|| GEMINI_DEFAULT_BASE.to_string());
        let model =
            env("ANSWERPIPE_GEMINI_MODEL").unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string());
        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiCandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TextCompleter for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let generation_config = if req.temperature.is_some() || req.max_tokens.is_some() {
            Some(GeminiGenerationConfig {
                temperature: req.temperature,
                max_output_tokens: req.max_tokens,
            })
        } else {
            None
        };
        let body = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: req.user.clone(),
                }],
            }],
            system_instruction: req.system.as_ref().map(|s| GeminiContent {
                parts: vec![GeminiPart { text: s.clone() }],
            }),
            generation_config,
        };

        let resp = self
            .client
            .post(self.generate_url())
            .json(&body)
            .timeout(req.timeout())
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Llm(format!(
                "gemini: http {}",
                resp.status().as_u16()
            )));
        }
        let body: GenerateContentResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        let text = body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text)
    }
}
