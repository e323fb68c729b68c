//! Outgoing-robot dispatch.
//!
//! [`OutgoingDispatcher`] is transport-agnostic: it takes the raw body plus
//! the authentication headers and produces the reply bytes. The axum wiring
//! lives in [`crate::server`].
//!
//! Per request:
//!
//! 1. authenticate ([`OutgoingAuth`]), failing with [`Error::Authentication`]
//! 2. parse the JSON body, failing with [`Error::Serialization`]
//! 3. split the text on whitespace into command + arguments
//! 4. resolve the command; unknown commands get a default reply
//! 5. check the mention requirement, then the argument count
//! 6. invoke the handler and return its bytes

use std::sync::Arc;
use std::time::Duration;

use dingbot_core::{Error, Message, Result, Signer, now_millis};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::payload::OutgoingMessage;
use crate::registry::CommandRegistry;

/// Default allowed clock skew for signed callbacks.
pub const DEFAULT_TIMESTAMP_TOLERANCE: Duration = Duration::from_secs(60 * 60);

// =============================================================================
// Authentication
// =============================================================================

/// How inbound callbacks are authenticated.
#[derive(Debug, Clone)]
pub enum OutgoingAuth {
    /// `timestamp` + `sign` headers, signed with the robot's app secret.
    Secret(Signer),
    /// A shared `token` header.
    Token(String),
}

/// Authentication material extracted from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub timestamp: Option<&'a str>,
    pub sign: Option<&'a str>,
    pub token: Option<&'a str>,
}

// =============================================================================
// DispatchOutcome
// =============================================================================

/// What happened to an authenticated callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran; `body` is what it returned.
    Invoked { command: String, body: Vec<u8> },
    /// The command was found but not run.
    Usage { command: String, body: Vec<u8> },
    /// Empty text or no such command.
    Unknown { command: String, body: Vec<u8> },
}

impl DispatchOutcome {
    /// The reply bytes.
    pub fn body(&self) -> &[u8] {
        match self {
            Self::Invoked { body, .. } | Self::Usage { body, .. } | Self::Unknown { body, .. } => {
                body
            }
        }
    }

    pub fn into_body(self) -> Vec<u8> {
        match self {
            Self::Invoked { body, .. } | Self::Usage { body, .. } | Self::Unknown { body, .. } => {
                body
            }
        }
    }

    pub fn is_invoked(&self) -> bool {
        matches!(self, Self::Invoked { .. })
    }
}

// =============================================================================
// OutgoingDispatcher
// =============================================================================

/// Routes outgoing-robot callbacks to registered commands.
#[derive(Debug, Clone)]
pub struct OutgoingDispatcher {
    registry: Arc<CommandRegistry>,
    auth: Option<OutgoingAuth>,
    tolerance: Duration,
}

impl OutgoingDispatcher {
    /// Creates an unauthenticated dispatcher over `registry`.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            auth: None,
            tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
        }
    }

    /// Creates a dispatcher over the process-wide registry.
    pub fn global() -> Self {
        Self::new(CommandRegistry::global())
    }

    /// Requires callbacks to carry a valid signature for `secret`.
    ///
    /// An empty secret leaves authentication unchanged.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        if let Some(signer) = Signer::new(secret) {
            self.auth = Some(OutgoingAuth::Secret(signer));
        }
        self
    }

    /// Requires callbacks to carry this `token` header.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.auth = Some(OutgoingAuth::Token(token));
        }
        self
    }

    /// Sets the accepted clock skew for signed callbacks.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn auth(&self) -> Option<&OutgoingAuth> {
        self.auth.as_ref()
    }

    /// Authenticates, parses and dispatches one raw callback.
    pub fn handle(&self, credentials: Credentials<'_>, body: &[u8]) -> Result<DispatchOutcome> {
        self.authenticate(credentials)?;
        let message: OutgoingMessage = serde_json::from_slice(body)?;
        self.dispatch(&message)
    }

    /// Checks request credentials against the configured mode.
    pub fn authenticate(&self, credentials: Credentials<'_>) -> Result<()> {
        match &self.auth {
            None => Ok(()),
            Some(OutgoingAuth::Token(expected)) => match credentials.token {
                Some(token) if token_matches(expected, token) => Ok(()),
                Some(_) => Err(Error::authentication("token mismatch")),
                None => Err(Error::authentication("missing token header")),
            },
            Some(OutgoingAuth::Secret(signer)) => {
                let (Some(timestamp), Some(sign)) = (credentials.timestamp, credentials.sign)
                else {
                    return Err(Error::authentication("missing timestamp or sign header"));
                };
                let timestamp: i64 = timestamp
                    .trim()
                    .parse()
                    .map_err(|_| Error::authentication("malformed timestamp"))?;

                let skew = now_millis().abs_diff(timestamp);
                if u128::from(skew) > self.tolerance.as_millis() {
                    return Err(Error::authentication("timestamp outside tolerance"));
                }
                if !signer.verify(timestamp, sign) {
                    return Err(Error::authentication("signature mismatch"));
                }
                Ok(())
            }
        }
    }

    /// Dispatches an already authenticated callback.
    pub fn dispatch(&self, message: &OutgoingMessage) -> Result<DispatchOutcome> {
        let mut tokens = message.content().split_whitespace();
        let Some(name) = tokens.next() else {
            debug!("Outgoing callback with empty text");
            return Ok(DispatchOutcome::Unknown {
                command: String::new(),
                body: self.unknown_reply("")?,
            });
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let Some(command) = self.registry.get(name) else {
            debug!(command = %name, "Unrecognized outgoing command");
            return Ok(DispatchOutcome::Unknown {
                command: name.to_string(),
                body: self.unknown_reply(name)?,
            });
        };

        if command.require_mention() && !message.is_mentioned() {
            debug!(command = %name, "Command requires a mention");
            let usage = Error::usage(format!("command {name} requires mentioning the robot"));
            return Ok(DispatchOutcome::Usage {
                command: name.to_string(),
                body: text_reply(usage.to_string())?,
            });
        }

        if args.len() != command.expected_args() {
            debug!(
                command = %name,
                expected = command.expected_args(),
                got = args.len(),
                "Command argument count mismatch"
            );
            let usage = Error::usage(format!(
                "command {name} expects {} argument(s), got {}",
                command.expected_args(),
                args.len()
            ));
            return Ok(DispatchOutcome::Usage {
                command: name.to_string(),
                body: text_reply(usage.to_string())?,
            });
        }

        debug!(
            command = %name,
            args = args.len(),
            sender = ?message.sender_nick,
            "Invoking command"
        );
        let body = command.invoke(&args);
        Ok(DispatchOutcome::Invoked {
            command: name.to_string(),
            body,
        })
    }

    fn unknown_reply(&self, name: &str) -> Result<Vec<u8>> {
        let names = self.registry.names();
        let mut content = if name.is_empty() {
            "unrecognized command".to_string()
        } else {
            format!("unrecognized command: {name}")
        };
        if !names.is_empty() {
            content.push_str(&format!("\navailable commands: {}", names.join(", ")));
        }
        text_reply(content)
    }
}

fn text_reply(content: String) -> Result<Vec<u8>> {
    Message::text(content).to_bytes()
}

/// Logs an authentication failure without echoing credentials.
pub(crate) fn log_rejection(err: &Error) {
    warn!(error = %err, "Rejected outgoing callback");
}

/// Constant-time comparison of the shared outgoing token.
fn token_matches(expected: &str, given: &str) -> bool {
    let (expected, given) = (expected.as_bytes(), given.as_bytes());
    expected.len() == given.len() && bool::from(expected.ct_eq(given))
}
