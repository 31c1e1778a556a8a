use crate::model::Article;

pub const OVERVIEW_MAX_WORDS: usize = 30;
pub const MAX_KEY_POINTS: usize = 4;

pub fn build_prompt(article: &Article) -> String {
    let summary = if article.summary.trim().is_empty() {
        "(no description provided)"
    } else {
        article.summary.trim()
    };

    format!(
        r#"You summarize news articles for a busy reader.

Write exactly this format, in the article's language, with no other text:
OVERVIEW: one sentence of at most {max_words} words
- key point
- key point
- key point

Use 3 or 4 key points. Plain text only, no markdown.

SOURCE: {source}
TITLE: {title}
DESCRIPTION: {summary}
"#,
        max_words = OVERVIEW_MAX_WORDS,
        source = article.source,
        title = article.title,
        summary = summary,
    )
}

/// Overview and key points extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSummary {
    pub overview: String,
    pub key_points: Vec<String>,
}

/// Parses `OVERVIEW:` and bullet lines. Returns `None` when no overview can be found.
pub fn parse_summary_response(text: &str) -> Option<ParsedSummary> {
    let mut overview: Option<String> = None;
    let mut fallback: Option<String> = None;
    let mut key_points = Vec::new();

    for raw in text.lines() {
        // Models like to bold the markers
        let cleaned = raw.replace("**", "");
        let line = cleaned.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = strip_overview_marker(line) {
            if overview.is_none() && !rest.is_empty() {
                overview = Some(rest.to_string());
            }
            continue;
        }

        if let Some(point) = strip_bullet(line) {
            if !point.is_empty() && key_points.len() < MAX_KEY_POINTS {
                key_points.push(point.to_string());
            }
            continue;
        }

        // Section headers such as "Key points:"
        if line.ends_with(':') {
            continue;
        }
        if fallback.is_none() {
            fallback = Some(line.to_string());
        }
    }

    let overview = truncate_words(&overview.or(fallback)?, OVERVIEW_MAX_WORDS);
    Some(ParsedSummary { overview, key_points })
}

fn strip_overview_marker(line: &str) -> Option<&str> {
    const MARKER: &str = "overview:";
    let head = line.get(..MARKER.len())?;
    head.eq_ignore_ascii_case(MARKER).then(|| line[MARKER.len()..].trim())
}

fn strip_bullet(line: &str) -> Option<&str> {
    for prefix in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some(rest.trim());
        }
    }
    if line == "-" || line == "*" || line == "•" {
        return Some("");
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .filter(|r| r.is_empty() || r.starts_with(' '))
        .map(str::trim)
}

fn truncate_words(text: &str, max: usize) -> String {
    text.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}
