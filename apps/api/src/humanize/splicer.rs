//! Order-preserving reassembly of the document from rewritten bullets.
//!
//! Everything outside the extracted spans is copied through byte-for-byte;
//! only span contents are mutated, and only for `Rewritten` outcomes.

use crate::humanize::client::RewriteOutcome;
use crate::humanize::sanitizer::{collapse_excess_newlines, strip_preamble_patterns};
use crate::humanize::spans::BulletSpan;

/// Splices one rewrite outcome per span back into `tex`.
///
/// Returns the assembled document and the number of spans whose content
/// actually changed. Fallback outcomes keep the original content verbatim and
/// are never counted. A single trailing period is trimmed from rewritten text
/// since bullets conventionally avoid ending with one.
pub fn splice_rewrites(
    tex: &str,
    spans: &[BulletSpan],
    outcomes: &[RewriteOutcome],
) -> (String, usize) {
    debug_assert_eq!(spans.len(), outcomes.len());

    let mut out = String::with_capacity(tex.len());
    let mut last = 0;
    let mut rewritten = 0;

    for (span, outcome) in spans.iter().zip(outcomes) {
        out.push_str(&tex[last..span.start]);
        match outcome {
            RewriteOutcome::Rewritten(text) => {
                let trimmed = text.trim();
                let safe = trimmed.strip_suffix('.').unwrap_or(trimmed);
                if safe != span.content.trim() {
                    rewritten += 1;
                }
                out.push_str(safe);
            }
            RewriteOutcome::FellBack { .. } => out.push_str(&span.content),
        }
        last = span.end;
    }
    out.push_str(&tex[last..]);

    // Belt-and-suspenders: anything structural that slipped past per-bullet
    // sanitization is stripped from the assembled document too.
    let out = strip_preamble_patterns(&out);
    (collapse_excess_newlines(&out), rewritten)
}
