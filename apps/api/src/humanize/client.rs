//! Rewrite client — the single point of entry for all calls to the external
//! humanizer service.
//!
//! One POST per bullet, retried with exponential backoff. A bullet-level
//! failure is never an error: the caller gets a tagged outcome and splices
//! the original text back in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::events::EventLog;
use crate::humanize::sanitizer::clean_humanized_text;

const BACKOFF_BASE_MS: u64 = 500;

/// Result of one bullet's trip through the rewrite service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Sanitized replacement text, ready to splice.
    Rewritten(String),
    /// The original bullet must be kept, for the given reason.
    FellBack { reason: FallbackReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Span content was empty or whitespace-only; no call was made.
    EmptySpan,
    /// Every attempt failed (network, status, or response shape).
    ExhaustedRetries,
    /// The service answered, but sanitization rejected the output.
    SanitizerVeto,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::EmptySpan => "empty_span",
            FallbackReason::ExhaustedRetries => "exhausted_retries",
            FallbackReason::SanitizerVeto => "sanitizer_veto",
        }
    }
}

/// Seam for the outbound rewrite call so tests can substitute fakes.
#[async_trait]
pub trait RewriteService: Send + Sync {
    /// Rewrites one bullet. `idx` is 1-based and used only for observability.
    async fn rewrite_bullet(
        &self,
        text: &str,
        idx: usize,
        mode_id: &str,
        email: &str,
    ) -> RewriteOutcome;
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: code={code:?}")]
    BadResponse { code: Option<u16> },
}

#[derive(Debug, Serialize)]
struct RewriteRequest<'a> {
    model: &'a str,
    mail: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    code: Option<u16>,
    data: Option<String>,
}

/// HTTP client for the humanizer API. One instance is shared across all
/// bullets of a document so connections are reused; it is caller-owned and
/// carried in `AppState`, never a process-global.
#[derive(Clone)]
pub struct HumanizerClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retries: u32,
    events: EventLog,
}

impl HumanizerClient {
    pub fn new(config: &Config, events: EventLog) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.humanize_timeout_secs))
                .pool_max_idle_per_host(config.humanize_max_concurrent)
                .build()
                .expect("Failed to build HTTP client"),
            api_url: config.humanize_api_url.clone(),
            api_key: config.humanize_api_key.clone(),
            retries: config.humanize_retries,
            events,
        }
    }

    async fn attempt(&self, payload: &RewriteRequest<'_>) -> Result<String, AttemptError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RewriteResponse = response.json().await?;
        match (parsed.code, parsed.data) {
            (Some(200), Some(data)) if !data.trim().is_empty() => Ok(data),
            (code, _) => Err(AttemptError::BadResponse { code }),
        }
    }
}

#[async_trait]
impl RewriteService for HumanizerClient {
    async fn rewrite_bullet(
        &self,
        text: &str,
        idx: usize,
        mode_id: &str,
        email: &str,
    ) -> RewriteOutcome {
        let payload = RewriteRequest {
            model: mode_id,
            mail: email,
            data: text,
        };

        for attempt in 0..=self.retries {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s, 2s...
                let delay = std::time::Duration::from_millis(BACKOFF_BASE_MS * (1 << (attempt - 1)));
                warn!(
                    "Rewrite attempt {} for bullet {} failed, retrying after {}ms",
                    attempt,
                    idx,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&payload).await {
                Ok(raw) => {
                    let candidate = clean_humanized_text(raw.trim());
                    if candidate.is_empty() {
                        self.events.emit(
                            "humanize_bullet_revert_unsafe",
                            json!({"idx": idx, "attempt": attempt}),
                        );
                        return RewriteOutcome::FellBack {
                            reason: FallbackReason::SanitizerVeto,
                        };
                    }
                    debug!("Bullet {} rewritten on attempt {}", idx, attempt);
                    self.events.emit(
                        "humanize_bullet_ok",
                        json!({"idx": idx, "len": candidate.len(), "attempt": attempt}),
                    );
                    return RewriteOutcome::Rewritten(candidate);
                }
                Err(e @ AttemptError::BadResponse { .. }) => {
                    self.events.emit(
                        "humanize_bad_response",
                        json!({"idx": idx, "attempt": attempt, "error": e.to_string()}),
                    );
                }
                Err(e) => {
                    self.events.emit(
                        "humanize_bullet_error",
                        json!({"idx": idx, "attempt": attempt, "error": e.to_string()}),
                    );
                }
            }
        }

        self.events
            .emit("humanize_bullet_fallback", json!({"idx": idx}));
        RewriteOutcome::FellBack {
            reason: FallbackReason::ExhaustedRetries,
        }
    }
}
