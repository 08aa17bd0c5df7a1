//! Finance assistant: a few questions are answered from the ledger directly,
//! everything else goes to a chat-completion API with the ledger as context.

use std::time::Duration;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::AssistantConfig;
use crate::models::{Transaction, TransactionView, Validate, non_blank};
use crate::reports::{format_amount, totals};

pub const MAX_SENTENCES: usize = 3;
pub const NO_ANSWER: &str = "Sorry, I could not get an answer.";
const MAX_HISTORY: usize = 20;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("finance assistant is not configured")]
    NotConfigured,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not encode ledger: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("bad question pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub error: Option<UpstreamError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamError {
    pub message: String,
}

impl ChatResponse {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: Some(ChoiceMessage {
                    content: Some(content.into()),
                }),
            }],
            error: None,
        }
    }

    fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AssistantError>;
}

/// OpenAI-compatible chat endpoint (OpenRouter by default).
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &AssistantConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AssistantError> {
        let key = self.api_key.as_deref().ok_or(AssistantError::NotConfigured)?;
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        // Error bodies carry `error.message`, so they are decoded too.
        let body: ChatResponse = response.json().await?;
        if !status.is_success() {
            tracing::warn!(%status, "chat completion returned an error status");
        }
        Ok(body)
    }
}

/// Replies with a fixed response and remembers every request.
pub struct CannedCompletion {
    response: ChatResponse,
    requests: Mutex<Vec<ChatRequest>>,
}

impl CannedCompletion {
    pub fn new(response: ChatResponse) -> Self {
        Self {
            response,
            requests: Mutex::default(),
        }
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ChatCompletion for CannedCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AssistantError> {
        self.requests.lock().await.push(request);
        Ok(self.response.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatQuestion {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl Validate for ChatQuestion {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.message, "message")?;
        if self.history.len() > MAX_HISTORY {
            return Err(format!("history is limited to {MAX_HISTORY} messages"));
        }
        if self.history.iter().any(|m| m.role == ChatRole::System) {
            return Err("history may only contain user and assistant messages".to_string());
        }
        Ok(())
    }
}

/// Answers ledger questions that need no model.
pub fn quick_answer(
    message: &str,
    transactions: &[Transaction],
    currency: &str,
) -> Result<Option<String>, AssistantError> {
    let pattern = |p: &str| RegexBuilder::new(p).case_insensitive(true).build();
    let sums = totals(transactions);

    let amount = if pattern(r"balance|current balance|net balance")?.is_match(message) {
        sums.balance
    } else if pattern(r"total income")?.is_match(message) {
        sums.income
    } else if pattern(r"total expense|total spent")?.is_match(message) {
        sums.expense
    } else {
        return Ok(None);
    };
    Ok(Some(format!("{currency}{}", format_amount(amount))))
}

/// Keeps the first `limit` sentences, splitting after `.`, `!` or `?`
/// followed by whitespace.
pub fn first_sentences(text: &str, limit: usize) -> String {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if !chars.peek().is_some_and(|&(_, next)| next.is_whitespace()) {
            continue;
        }
        sentences.push(&text[start..i + c.len_utf8()]);
        while chars.peek().is_some_and(|&(_, w)| w.is_whitespace()) {
            chars.next();
        }
        start = chars.peek().map_or(text.len(), |&(k, _)| k);
        if sentences.len() == limit {
            return sentences.join(" ");
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences.truncate(limit);
    sentences.join(" ")
}

pub fn system_prompt(transactions: &[Transaction]) -> Result<String, AssistantError> {
    let views: Vec<TransactionView> = transactions.iter().map(TransactionView::from).collect();
    Ok(format!(
        "You are a helpful finance assistant. The user's transaction data is: {}. \
         Answer questions using this data if relevant, otherwise answer in 2-3 brief sentences, \
         never more. Be concise and direct.",
        serde_json::to_string(&views)?
    ))
}

pub async fn answer(
    client: &dyn ChatCompletion,
    config: &AssistantConfig,
    question: ChatQuestion,
    transactions: &[Transaction],
    currency: &str,
) -> Result<String, AssistantError> {
    if let Some(reply) = quick_answer(&question.message, transactions, currency)? {
        return Ok(reply);
    }

    let mut messages = Vec::with_capacity(question.history.len() + 2);
    messages.push(ChatMessage::new(ChatRole::System, system_prompt(transactions)?));
    messages.extend(question.history);
    messages.push(ChatMessage::new(ChatRole::User, question.message));

    let response = client
        .complete(ChatRequest {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
        })
        .await?;

    if let Some(content) = response.first_content() {
        return Ok(first_sentences(content, MAX_SENTENCES));
    }
    if let Some(error) = &response.error {
        return Ok(format!("API Error: {}", error.message));
    }
    Ok(NO_ANSWER.to_string())
}
