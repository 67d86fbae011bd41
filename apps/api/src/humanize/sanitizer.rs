//! LaTeX sanitization for text coming back from the rewrite service.
//!
//! The service occasionally returns whole documents (preamble included) or
//! markdown-fenced output. Anything structural must be removed before the
//! text is spliced back into the resume, and output that still smells like a
//! preamble is rejected outright.

use std::sync::LazyLock;

use regex::Regex;

/// Document-structure patterns that must never survive into a bullet.
/// Shared with the splicer's final defensive pass.
static PREAMBLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\\documentclass(?:\[[^\]]*\])?\{[^}]*\}",
        r"(?i)\\usepackage(?:\[[^\]]*\])?\{[^}]*\}",
        r"(?i)\\begin\{document\}",
        r"(?i)\\end\{document\}",
        r"(?i)\\(?:new|renew)command\*?\{[^}]*\}\{[^}]*\}",
        r"(?i)\\input\{[^}]*\}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("preamble pattern must compile"))
    .collect()
});

static COMMENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*%.*$").expect("comment pattern must compile"));

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("whitespace pattern must compile"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern must compile"));

/// Detects any surviving preamble marker, used as the final reject guard.
static PREAMBLE_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\\documentclass|\\usepackage|\\begin\{document\}|\\end\{document\}")
        .expect("guard pattern must compile")
});

/// Removes all document-structure patterns from `text`.
pub fn strip_preamble_patterns(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pat in PREAMBLE_PATTERNS.iter() {
        cleaned = pat.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Collapses runs of 3+ newlines down to exactly 2.
pub fn collapse_excess_newlines(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text, "\n\n").into_owned()
}

fn strip_md_fences(text: &str) -> String {
    text.replace("```latex", "").replace("```", "")
}

/// Escapes bare `%` as `\%` so a rewritten bullet cannot comment out the
/// rest of its line. Already-escaped percents are left alone.
fn escape_unescaped_percent(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_backslash = false;
    for ch in text.chars() {
        if ch == '%' && !prev_backslash {
            out.push('\\');
        }
        prev_backslash = ch == '\\';
        out.push(ch);
    }
    out
}

/// Cleans rewritten text for safe reinsertion into the document.
///
/// Returns an empty string when the output still contains preamble markers
/// after cleaning; callers must treat that as a veto and fall back to the
/// original bullet. Step order matters: fences can wrap preamble markers, and
/// pattern removal leaves blank lines for the whitespace collapse to absorb.
pub fn clean_humanized_text(text: &str) -> String {
    let cleaned = strip_md_fences(text);
    let cleaned = strip_preamble_patterns(&cleaned);
    let cleaned = COMMENT_LINE.replace_all(&cleaned, "").into_owned();
    let cleaned = HORIZONTAL_WS.replace_all(&cleaned, " ").into_owned();
    let cleaned = collapse_excess_newlines(&cleaned);
    let cleaned = escape_unescaped_percent(cleaned.trim());

    if PREAMBLE_GUARD.is_match(&cleaned) {
        return String::new();
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_fences() {
        let input = "```latex\nLed a team of 4 engineers\n```";
        assert_eq!(clean_humanized_text(input), "Led a team of 4 engineers");
    }

    #[test]
    fn test_removes_preamble_declarations() {
        let input = "\\documentclass[11pt]{article}\nShipped the billing service";
        assert_eq!(clean_humanized_text(input), "Shipped the billing service");
    }

    #[test]
    fn test_removes_usepackage_and_input() {
        let input = "\\usepackage[margin=1in]{geometry} built dashboards \\input{header}";
        assert_eq!(clean_humanized_text(input), "built dashboards");
    }

    #[test]
    fn test_removes_newcommand_case_insensitive() {
        let input = "\\NewCommand{\\x}{y} tuned queries";
        assert_eq!(clean_humanized_text(input), "tuned queries");
    }

    #[test]
    fn test_drops_comment_lines() {
        let input = "% generated header\nReduced latency by half";
        assert_eq!(clean_humanized_text(input), "Reduced latency by half");
    }

    #[test]
    fn test_collapses_whitespace() {
        let input = "spread    across\tcolumns\n\n\n\nand rows";
        assert_eq!(clean_humanized_text(input), "spread across columns\n\nand rows");
    }

    #[test]
    fn test_escapes_bare_percent_only() {
        let input = "cut costs by 30% while keeping 99\\% uptime";
        assert_eq!(
            clean_humanized_text(input),
            "cut costs by 30\\% while keeping 99\\% uptime"
        );
    }

    #[test]
    fn test_rejects_unstripped_preamble() {
        // A braceless \documentclass defeats the exact-pattern removal
        // but still trips the guard, so the whole output is vetoed.
        let input = "\\documentclass\nImproved onboarding flow";
        assert_eq!(clean_humanized_text(input), "");
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        let input = "Deployed 3 APIs with 99\\% uptime";
        let once = clean_humanized_text(input);
        let twice = clean_humanized_text(&once);
        assert_eq!(once, twice);
        assert_eq!(once, input);
    }

    #[test]
    fn test_fences_stripped_before_pattern_removal() {
        let input = "```latex\n\\begin{document}\nGrew revenue 2x\n\\end{document}\n```";
        assert_eq!(clean_humanized_text(input), "Grew revenue 2x");
    }
}
