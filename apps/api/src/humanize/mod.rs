//! Bullet humanization — rewrites every `\resumeItem{...}` bullet in a LaTeX
//! resume through the external humanizer service.
//!
//! Flow: find_resume_items → rewrite (parallel, bounded by a semaphore) →
//! splice_rewrites → return. Per-bullet failures never fail the document;
//! they fall back to the original text and are recorded in the event log.

pub mod client;
pub mod handlers;
pub mod sanitizer;
pub mod spans;
pub mod splicer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::events::EventLog;
use crate::humanize::client::{FallbackReason, RewriteOutcome, RewriteService};
use crate::humanize::spans::{find_resume_items, has_unbalanced_item};
use crate::humanize::splicer::splice_rewrites;

/// Rewrite intensity offered by the humanizer service. Maps UI names to the
/// numeric model ids the wire protocol expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    Quality,
    Balance,
    Enhanced,
}

impl RewriteMode {
    /// Parses a UI mode string; unknown values fall back to `Quality`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "balance" => RewriteMode::Balance,
            "enhanced" => RewriteMode::Enhanced,
            _ => RewriteMode::Quality,
        }
    }

    pub fn wire_id(&self) -> &'static str {
        match self {
            RewriteMode::Quality => "0",
            RewriteMode::Balance => "1",
            RewriteMode::Enhanced => "2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Quality => "quality",
            RewriteMode::Balance => "balance",
            RewriteMode::Enhanced => "enhanced",
        }
    }
}

/// Outcome of one document's trip through the pipeline.
#[derive(Debug, Clone)]
pub struct HumanizeReport {
    pub tex_content: String,
    pub found: usize,
    pub rewritten: usize,
}

/// Rewrites all `\resumeItem{...}` bullets concurrently and splices the
/// results back into the document.
///
/// All bullets of one call share `service` (and its connection pool); the
/// admission gate is created per call, so concurrent documents do not starve
/// each other. Absence of bullets is a zero-count success, not an error.
pub async fn humanize_resume_items(
    service: Arc<dyn RewriteService>,
    events: &EventLog,
    tex_content: &str,
    mode: RewriteMode,
    email: &str,
    max_concurrent: usize,
) -> HumanizeReport {
    let spans = find_resume_items(tex_content);
    if has_unbalanced_item(tex_content, &spans) {
        // Tolerated: extraction stops at the unbalanced occurrence.
        warn!("Unbalanced \\resumeItem braces; extraction truncated");
        events.emit("humanize_unbalanced_braces", json!({"found": spans.len()}));
    }

    let found = spans.len();
    if found == 0 {
        events.emit("humanize_no_bullets", json!({}));
        return HumanizeReport {
            tex_content: tex_content.to_string(),
            found: 0,
            rewritten: 0,
        };
    }

    let gate = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mode_id = mode.wire_id();

    let mut handles = Vec::with_capacity(found);
    for (i, span) in spans.iter().enumerate() {
        let service = Arc::clone(&service);
        let gate = Arc::clone(&gate);
        let content = span.content.clone();
        let email = email.to_string();
        handles.push(tokio::spawn(async move {
            let _permit = gate
                .acquire_owned()
                .await
                .expect("admission gate never closes");
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return RewriteOutcome::FellBack {
                    reason: FallbackReason::EmptySpan,
                };
            }
            service.rewrite_bullet(trimmed, i + 1, mode_id, &email).await
        }));
    }

    // Collect in span order regardless of completion order.
    let mut outcomes = Vec::with_capacity(found);
    for handle in handles {
        outcomes.push(handle.await.unwrap_or_else(|e| {
            warn!("Rewrite task panicked: {e}");
            RewriteOutcome::FellBack {
                reason: FallbackReason::ExhaustedRetries,
            }
        }));
    }

    for (i, outcome) in outcomes.iter().enumerate() {
        if let RewriteOutcome::FellBack { reason } = outcome {
            events.emit(
                "humanize_bullet_revert",
                json!({"idx": i + 1, "reason": reason.as_str()}),
            );
        }
    }

    let (new_tex, rewritten) = splice_rewrites(tex_content, &spans, &outcomes);

    info!(
        "Humanize complete: found={found}, rewritten={rewritten}, mode={}",
        mode.as_str()
    );
    events.emit(
        "humanize_complete",
        json!({"found": found, "rewritten": rewritten, "mode": mode.as_str()}),
    );

    HumanizeReport {
        tex_content: new_tex,
        found,
        rewritten,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::humanize::sanitizer::clean_humanized_text;

    /// Fake that uppercases every bullet.
    struct UppercaseService;

    #[async_trait]
    impl RewriteService for UppercaseService {
        async fn rewrite_bullet(&self, text: &str, _: usize, _: &str, _: &str) -> RewriteOutcome {
            RewriteOutcome::Rewritten(text.to_uppercase())
        }
    }

    /// Fake whose every attempt exhausts its retries.
    struct FailingService;

    #[async_trait]
    impl RewriteService for FailingService {
        async fn rewrite_bullet(&self, _: &str, _: usize, _: &str, _: &str) -> RewriteOutcome {
            RewriteOutcome::FellBack {
                reason: FallbackReason::ExhaustedRetries,
            }
        }
    }

    /// Fake that answers with a canned raw body and sanitizes it the way the
    /// real client does, so sanitizer vetoes flow through the pipeline.
    struct CannedService {
        body: &'static str,
    }

    #[async_trait]
    impl RewriteService for CannedService {
        async fn rewrite_bullet(&self, _: &str, _: usize, _: &str, _: &str) -> RewriteOutcome {
            let candidate = clean_humanized_text(self.body);
            if candidate.is_empty() {
                RewriteOutcome::FellBack {
                    reason: FallbackReason::SanitizerVeto,
                }
            } else {
                RewriteOutcome::Rewritten(candidate)
            }
        }
    }

    /// Fake that records the peak number of simultaneous in-flight calls.
    struct ConcurrencyProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RewriteService for ConcurrencyProbe {
        async fn rewrite_bullet(&self, text: &str, _: usize, _: &str, _: &str) -> RewriteOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            RewriteOutcome::Rewritten(text.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_uppercase_rewrite_counts() {
        let tex = r"\resumeItem{did X} \resumeItem{did Y}";
        let report = humanize_resume_items(
            Arc::new(UppercaseService),
            &EventLog::disabled(),
            tex,
            RewriteMode::Quality,
            "user@example.com",
            5,
        )
        .await;
        assert_eq!(report.tex_content, r"\resumeItem{DID X} \resumeItem{DID Y}");
        assert_eq!(report.found, 2);
        assert_eq!(report.rewritten, 2);
    }

    #[tokio::test]
    async fn test_always_failing_client_yields_input() {
        let tex = "header\n\\resumeItem{did X}\n\\resumeItem{did Y}\nfooter";
        let report = humanize_resume_items(
            Arc::new(FailingService),
            &EventLog::disabled(),
            tex,
            RewriteMode::Balance,
            "",
            5,
        )
        .await;
        assert_eq!(report.tex_content, tex);
        assert_eq!(report.found, 2);
        assert_eq!(report.rewritten, 0);
    }

    #[tokio::test]
    async fn test_sanitizer_veto_yields_input() {
        let tex = "\\resumeItem{did X} \\resumeItem{did Y}";
        let report = humanize_resume_items(
            Arc::new(CannedService {
                body: "\\documentclass\n\\begin{document}stolen preamble\\end{document}",
            }),
            &EventLog::disabled(),
            tex,
            RewriteMode::Quality,
            "",
            5,
        )
        .await;
        assert_eq!(report.tex_content, tex);
        assert_eq!(report.rewritten, 0);
    }

    #[tokio::test]
    async fn test_no_bullets_is_zero_count_success() {
        let report = humanize_resume_items(
            Arc::new(UppercaseService),
            &EventLog::disabled(),
            "just prose, no bullets",
            RewriteMode::Quality,
            "",
            5,
        )
        .await;
        assert_eq!(report.tex_content, "just prose, no bullets");
        assert_eq!(report.found, 0);
        assert_eq!(report.rewritten, 0);
    }

    #[tokio::test]
    async fn test_unbalanced_bullet_truncates_without_error() {
        let tex = r"\resumeItem{fine} \resumeItem{never closes";
        let report = humanize_resume_items(
            Arc::new(UppercaseService),
            &EventLog::disabled(),
            tex,
            RewriteMode::Quality,
            "",
            5,
        )
        .await;
        assert_eq!(report.found, 1);
        assert_eq!(report.rewritten, 1);
        assert!(report.tex_content.contains(r"\resumeItem{FINE}"));
        assert!(report.tex_content.contains("never closes"));
    }

    #[tokio::test]
    async fn test_empty_bullet_skips_rewrite() {
        let tex = r"\resumeItem{   } \resumeItem{did X}";
        let report = humanize_resume_items(
            Arc::new(UppercaseService),
            &EventLog::disabled(),
            tex,
            RewriteMode::Quality,
            "",
            5,
        )
        .await;
        assert_eq!(report.tex_content, r"\resumeItem{   } \resumeItem{DID X}");
        assert_eq!(report.found, 2);
        assert_eq!(report.rewritten, 1);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let tex = (0..20)
            .map(|i| format!("\\resumeItem{{bullet {i}}}"))
            .collect::<Vec<_>>()
            .join("\n");
        let probe = Arc::new(ConcurrencyProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let report = humanize_resume_items(
            Arc::clone(&probe) as Arc<dyn RewriteService>,
            &EventLog::disabled(),
            &tex,
            RewriteMode::Quality,
            "",
            2,
        )
        .await;
        assert_eq!(report.found, 20);
        assert_eq!(report.rewritten, 20);
        assert!(probe.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_mode_parsing_falls_back_to_quality() {
        assert_eq!(RewriteMode::parse("enhanced"), RewriteMode::Enhanced);
        assert_eq!(RewriteMode::parse(" Balance "), RewriteMode::Balance);
        assert_eq!(RewriteMode::parse("turbo"), RewriteMode::Quality);
        assert_eq!(RewriteMode::parse("").wire_id(), "0");
        assert_eq!(RewriteMode::Enhanced.wire_id(), "2");
    }
}
