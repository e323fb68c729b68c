//! Group robot webhook client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use dingbot_core::{DingMap, Error, FeedCardLink, Message, MessageOption, Result, Signer};

/// Default platform API host.
pub const DEFAULT_BASE_URL: &str = "https://oapi.dingtalk.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SEND_PATH: &str = "robot/send";

// =============================================================================
// TokenStrategy
// =============================================================================

/// How a client with several access tokens picks one per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStrategy {
    /// Always use the first token.
    #[default]
    First,
    /// Cycle through the tokens, one per request.
    RoundRobin,
}

/// Body of a `robot/send` response.
#[derive(Debug, Deserialize)]
struct SendResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

// =============================================================================
// DingTalk
// =============================================================================

/// Client for one group robot.
///
/// Tokens and the signing secret are fixed at construction; the client can be
/// shared behind an `Arc` and used from many tasks. Each `send_*` call makes
/// exactly one HTTP request and never retries.
pub struct DingTalk {
    tokens: Vec<String>,
    cursor: AtomicUsize,
    strategy: TokenStrategy,
    signer: Option<Signer>,
    work_dir: String,
    endpoint: Url,
    http: Client,
}

impl DingTalk {
    /// Creates a plain-token client.
    pub fn new(tokens: Vec<String>, work_dir: impl Into<String>) -> Result<Self> {
        Self::builder().tokens(tokens).work_dir(work_dir).build()
    }

    /// Creates a client for a robot with signature security enabled.
    pub fn with_secret(token: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::builder().token(token).secret(secret).build()
    }

    /// Returns a builder for custom settings.
    pub fn builder() -> DingTalkBuilder {
        DingTalkBuilder::default()
    }

    /// The informational working directory given at construction.
    pub fn work_dir(&self) -> &str {
        &self.work_dir
    }

    /// Returns `true` if requests are signed.
    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }

    /// Returns the number of configured tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn next_token(&self) -> &str {
        match self.strategy {
            TokenStrategy::First => &self.tokens[0],
            TokenStrategy::RoundRobin => {
                let i = self.cursor.fetch_add(1, Ordering::Relaxed);
                &self.tokens[i % self.tokens.len()]
            }
        }
    }

    /// Builds the request URL, signing with the current time.
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("access_token", self.next_token());
        if let Some(signer) = &self.signer {
            signer.sign_now().append_to(&mut url);
        }
        url
    }

    // -------------------------------------------------------------------------
    // Sending
    // -------------------------------------------------------------------------

    /// Sends a pre-built message. Invalid envelopes fail before any request.
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        message.validate()?;
        let body = message.to_bytes()?;
        let url = self.request_url();

        debug!(
            msgtype = %message.kind(),
            signed = self.signer.is_some(),
            len = body.len(),
            "Sending robot message"
        );

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Robot webhook returned HTTP error");
            return Err(Error::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let reply: SendResponse = serde_json::from_str(&text)?;
        if reply.errcode != 0 {
            warn!(errcode = reply.errcode, errmsg = %reply.errmsg, "Robot message rejected");
            return Err(Error::Platform {
                code: reply.errcode,
                message: reply.errmsg,
            });
        }

        debug!(msgtype = %message.kind(), "Robot message delivered");
        Ok(())
    }

    /// Sends a text message.
    pub async fn send_text_message<I>(&self, content: impl Into<String>, options: I) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_message(&Message::text_with(content, options)?).await
    }

    /// Sends a link card.
    pub async fn send_link_message(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        pic_url: impl Into<String>,
        message_url: impl Into<String>,
    ) -> Result<()> {
        self.send_message(&Message::link(title, text, pic_url, message_url)).await
    }

    /// Sends a markdown message.
    pub async fn send_markdown_message<I>(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        options: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_message(&Message::markdown_with(title, text, options)?).await
    }

    /// Sends a markdown message built from lines, e.g. [`DingMap::render_lines`].
    pub async fn send_markdown_message_by_slice<I>(
        &self,
        title: impl Into<String>,
        lines: &[String],
        options: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_message(&Message::markdown_lines(title, lines, options)?).await
    }

    /// Sends a markdown message of tappable links that post the map values
    /// back into the chat.
    pub async fn send_dtmd_message<I>(
        &self,
        title: impl Into<String>,
        map: &DingMap,
        options: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_message(&Message::dtmd(title, map, options)?).await
    }

    /// Sends an action card; buttons come from the card options.
    pub async fn send_action_card_message<I>(
        &self,
        title: impl Into<String>,
        text: impl Into<String>,
        options: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_message(&Message::action_card_with(title, text, options)?).await
    }

    /// Sends an action card whose text is built from lines.
    pub async fn send_action_card_message_by_slice<I>(
        &self,
        title: impl Into<String>,
        lines: &[String],
        options: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = MessageOption>,
    {
        self.send_action_card_message(title, lines.join("\n"), options).await
    }

    /// Sends a feed card. An empty list fails without any request.
    pub async fn send_feed_card_message(&self, links: Vec<FeedCardLink>) -> Result<()> {
        self.send_message(&Message::feed_card(links)?).await
    }
}

impl std::fmt::Debug for DingTalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DingTalk")
            .field("tokens", &self.tokens.len())
            .field("strategy", &self.strategy)
            .field("signed", &self.signer.is_some())
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

// =============================================================================
// DingTalkBuilder
// =============================================================================

/// Builder for [`DingTalk`].
///
/// ```rust,ignore
/// let client = DingTalk::builder()
///     .tokens(vec!["token-a".into(), "token-b".into()])
///     .strategy(TokenStrategy::RoundRobin)
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct DingTalkBuilder {
    tokens: Vec<String>,
    secret: Option<String>,
    work_dir: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
    strategy: TokenStrategy,
}

impl DingTalkBuilder {
    /// Replaces the token list.
    pub fn tokens(mut self, tokens: Vec<String>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Adds one token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// Enables signing with this secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the informational working directory.
    pub fn work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Overrides the platform host (default [`DEFAULT_BASE_URL`]).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-request timeout (default [`DEFAULT_TIMEOUT`]).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the token selection strategy.
    pub fn strategy(mut self, strategy: TokenStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validates the settings and creates the client.
    pub fn build(self) -> Result<DingTalk> {
        if self.tokens.is_empty() {
            return Err(Error::configuration("at least one access token is required"));
        }
        if self.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::configuration("access tokens must not be empty"));
        }

        let signer = match self.secret {
            Some(secret) => Some(Signer::new(secret).ok_or_else(|| {
                Error::configuration("signing secret must not be empty in secret mode")
            })?),
            None => None,
        };

        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let endpoint = Url::parse(&format!("{}/{SEND_PATH}", base.trim_end_matches('/')))
            .map_err(|e| Error::configuration(format!("invalid base URL {base}: {e}")))?;

        let http = ClientBuilder::new()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| Error::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(DingTalk {
            tokens: self.tokens,
            cursor: AtomicUsize::new(0),
            strategy: self.strategy,
            signer,
            work_dir: self.work_dir,
            endpoint,
            http,
        })
    }
}
