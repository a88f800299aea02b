//! Text transforms applied at the rendering boundary.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

// ── Answer markup ──

enum Rewrite {
    Template(&'static str),
    WrapList,
}

struct Rule {
    pattern: Regex,
    rewrite: Rewrite,
}

impl Rule {
    fn new(pattern: &str, rewrite: Rewrite) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            rewrite,
        }
    }

    fn apply(&self, text: &str) -> String {
        match self.rewrite {
            Rewrite::Template(t) => self.pattern.replace_all(text, t).into_owned(),
            Rewrite::WrapList => self
                .pattern
                .replace_all(text, |caps: &Captures| {
                    format!("<ul>{}</ul>", caps[0].replace('\n', ""))
                })
                .into_owned(),
        }
    }
}

/// Markup rules, applied in order to HTML-escaped text.
///
/// 1. `**x**` to `<strong>` (before line breaks, so emphasis never spans lines)
/// 2. `` `x` `` to `<code>`
/// 3. lines starting with `•`, `-` or `*` to `<li>` (before list wrapping)
/// 4. runs of consecutive `<li>` lines to one `<ul>`
/// 5. remaining newlines to `<br/>`
static MARKUP_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\*\*(.+?)\*\*", Rewrite::Template("<strong>$1</strong>")),
        Rule::new(r"`([^`\n]+)`", Rewrite::Template("<code>$1</code>")),
        Rule::new(
            r"(?m)^[ \t]*(?:•|[-*])[ \t]+(.+)$",
            Rewrite::Template("<li>$1</li>"),
        ),
        Rule::new(r"(?m)(?:^<li>.*</li>(?:\n|$))+", Rewrite::WrapList),
        Rule::new(r"\n", Rewrite::Template("<br/>")),
    ]
});

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Render assistant text as a small HTML fragment.
pub fn render_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    MARKUP_RULES
        .iter()
        .fold(escape_html(text), |acc, rule| rule.apply(&acc))
}

// ── Model output cleanup ──

static EMPTY_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s*$").unwrap());
static HEADER_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s*").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());

/// Flatten raw model markdown into chat-friendly plain text.
///
/// Drops empty headers, strips header hashes and bold/italic markers,
/// turns `- ` / `* ` bullets into `• `, and collapses runs of blank lines.
pub fn clean_model_output(answer: &str) -> String {
    let mut cleaned: Vec<String> = Vec::new();
    for line in answer.lines() {
        let line = line.trim();
        if EMPTY_HEADER.is_match(line) {
            continue;
        }
        let line = HEADER_PREFIX.replace(line, "");
        let line = BOLD.replace_all(&line, "$1");
        let line = ITALIC.replace_all(&line, "$1");

        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            cleaned.push(format!("• {}", rest.trim()));
        } else {
            cleaned.push(line.to_string());
        }
    }

    let mut kept: Vec<String> = Vec::with_capacity(cleaned.len());
    for line in cleaned {
        let prev_has_text = kept.last().is_some_and(|l| !l.is_empty());
        if !line.is_empty() || prev_has_text {
            kept.push(line);
        }
    }
    kept.join("\n").trim().to_string()
}

// ── Timestamps ──

fn parse_ts(ts: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(ts, &Rfc3339).ok()
}

/// `HH:MM:SS` in the timestamp's own offset; `-` when absent.
pub fn display_time(ts: &str) -> String {
    if ts.is_empty() {
        return "-".to_string();
    }
    match parse_ts(ts) {
        Some(dt) => format!("{:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second()),
        None => ts.to_string(),
    }
}

/// `YYYY-MM-DD HH:MM:SS` in the timestamp's own offset; `-` when absent.
pub fn display_datetime(ts: &str) -> String {
    if ts.is_empty() {
        return "-".to_string();
    }
    match parse_ts(ts) {
        Some(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        None => ts.to_string(),
    }
}
