//! Brace-aware extraction of `\resumeItem{...}` bullet spans.
//!
//! Offsets are byte offsets into the original document and address the inner
//! content only, excluding the `\resumeItem{` prefix and the closing brace.
//! Braces are ASCII, so byte-wise depth scanning is safe on UTF-8 input.

/// One extracted bullet region: `content == &tex[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletSpan {
    pub start: usize,
    pub end: usize,
    pub content: String,
}

const ITEM_PREFIX: &str = r"\resumeItem{";

/// Finds every well-formed `\resumeItem{...}` span, in document order.
///
/// Nested braces inside a bullet are tolerated via a depth counter. If an
/// occurrence never closes before end of input, extraction stops there and
/// only the spans found so far are returned. The caller decides whether that
/// truncation is worth reporting.
pub fn find_resume_items(tex: &str) -> Vec<BulletSpan> {
    let bytes = tex.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while let Some(found) = tex[i..].find(ITEM_PREFIX) {
        let k = i + found + ITEM_PREFIX.len();
        let mut depth = 1usize;
        let mut p = k;
        while p < bytes.len() && depth > 0 {
            match bytes[p] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            p += 1;
        }
        if depth != 0 {
            // Unbalanced; bail from the scan.
            break;
        }
        spans.push(BulletSpan {
            start: k,
            end: p - 1,
            content: tex[k..p - 1].to_string(),
        });
        i = p;
    }

    spans
}

/// True when the document contains an opening `\resumeItem{` that never
/// closes. Used for observability only; extraction already degraded.
pub fn has_unbalanced_item(tex: &str, spans: &[BulletSpan]) -> bool {
    let resume_from = spans.last().map(|s| s.end + 1).unwrap_or(0);
    tex[resume_from..].contains(ITEM_PREFIX)
}
