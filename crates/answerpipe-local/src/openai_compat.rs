//! OpenAI-compatible chat completion client.
//!
//! Talks to any server exposing `POST {base}/v1/chat/completions`: OpenAI
//! itself, vLLM, llama.cpp, LM Studio, or Ollama's compatibility endpoint.

use answerpipe_core::{CompletionRequest, Error, Result, TextCompleter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::env;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Debug)]
pub struct OpenAiCompat {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompat {
    /// Reads `ANSWERPIPE_OPENAI_BASE_URL`, `ANSWERPIPE_OPENAI_MODEL` and
    /// `ANSWERPIPE_OPENAI_API_KEY` (fallback `OPENAI_API_KEY`).
    ///
    /// A key is required only when the base URL is the hosted default;
    /// local servers usually take none.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let base_url =
            env("ANSWERPIPE_OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_DEFAULT_BASE.to_string());
        let api_key = env("ANSWERPIPE_OPENAI_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        if api_key.is_none() && base_url == OPENAI_DEFAULT_BASE {
            return Err(Error::NotConfigured(
                "set ANSWERPIPE_OPENAI_API_KEY or OPENAI_API_KEY, or point ANSWERPIPE_OPENAI_BASE_URL at a local server".into(),
            ));
        }
        let model =
            env("ANSWERPIPE_OPENAI_MODEL").unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());
        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl TextCompleter for OpenAiCompat {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(ChatMessage {
                role: "system".into(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".into(),
            content: req.user.clone(),
        });
        let body = ChatCompletionsRequest {
            model: self.model.clone(),
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.completions_url())
            .json(&body)
            .timeout(req.timeout());
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await.map_err(|e| Error::Llm(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Llm(format!(
                "openai: http {}",
                resp.status().as_u16()
            )));
        }
        let body: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        Ok(body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }

        fn unset(k: &'static str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::remove_var(k);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => std::env::set_var(self.k, v),
                None => std::env::remove_var(self.k),
            }
        }
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn completion(system: Option<&str>, user: &str) -> CompletionRequest {
        CompletionRequest {
            system: system.map(|s| s.to_string()),
            user: user.into(),
            timeout_ms: Some(5_000),
            max_tokens: Some(256),
            temperature: None,
        }
    }

    #[test]
    fn from_env_requires_a_key_for_the_hosted_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _g1 = EnvGuard::unset("ANSWERPIPE_OPENAI_BASE_URL");
        let _g2 = EnvGuard::unset("ANSWERPIPE_OPENAI_API_KEY");
        let _g3 = EnvGuard::unset("OPENAI_API_KEY");
        let err = OpenAiCompat::from_env(reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn from_env_allows_a_local_base_without_a_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _g1 = EnvGuard::set("ANSWERPIPE_OPENAI_BASE_URL", "http://127.0.0.1:11434/");
        let _g2 = EnvGuard::unset("ANSWERPIPE_OPENAI_API_KEY");
        let _g3 = EnvGuard::unset("OPENAI_API_KEY");
        let c = OpenAiCompat::from_env(reqwest::Client::new()).unwrap();
        assert_eq!(
            c.completions_url(),
            "http://127.0.0.1:11434/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn complete_sends_messages_and_parses_the_first_choice() {
        let captured: Arc<Mutex<Option<serde_json::Value>>> = Arc::new(Mutex::new(None));
        let app = Router::new().route("/v1/chat/completions", {
            let captured = captured.clone();
            post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    axum::Json(serde_json::json!({
                        "choices": [
                            { "message": { "role": "assistant", "content": "hi there" } }
                        ]
                    }))
                }
            })
        });
        let base = serve(app).await;
        let client = {
            let _lock = ENV_LOCK.lock().unwrap();
            let _g1 = EnvGuard::set("ANSWERPIPE_OPENAI_BASE_URL", &base);
            let _g2 = EnvGuard::set("ANSWERPIPE_OPENAI_MODEL", "test-model");
            let _g3 = EnvGuard::unset("ANSWERPIPE_OPENAI_API_KEY");
            let _g4 = EnvGuard::unset("OPENAI_API_KEY");
            OpenAiCompat::from_env(reqwest::Client::new()).unwrap()
        };

        let out = client
            .complete(&completion(Some("be brief"), "say hi"))
            .await
            .unwrap();
        assert_eq!(out, "hi there");

        let body = captured.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "say hi");
    }

    #[tokio::test]
    async fn complete_maps_http_errors() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(app).await;
        let client = {
            let _lock = ENV_LOCK.lock().unwrap();
            let _g1 = EnvGuard::set("ANSWERPIPE_OPENAI_BASE_URL", &base);
            let _g2 = EnvGuard::unset("ANSWERPIPE_OPENAI_API_KEY");
            let _g3 = EnvGuard::unset("OPENAI_API_KEY");
            OpenAiCompat::from_env(reqwest::Client::new()).unwrap()
        };
        let err = client.complete(&completion(None, "hi")).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.to_string().contains("500"));
    }
}
