//! Search grammar.
//!
//! | token          | effect                                   |
//! |----------------|------------------------------------------|
//! | `"phrase"`     | phrase must appear verbatim              |
//! | `category:tag` | category must equal the canonical name   |
//! | `+term`        | term must appear                         |
//! | `-term`        | term must not appear                     |
//! | `term`         | term must appear (AND with other terms)  |
//!
//! Parsing never fails. Malformed operators are kept as literal terms and an unmatched quote is
//! dropped, leaving the words after it as bare terms.

use tracing::debug;

use crate::model::{canonical_category, resolve_category, Article};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Bare and `+` terms; every one must match
    pub include_terms: Vec<String>,
    /// The `+` subset of `include_terms`
    pub required_terms: Vec<String>,
    /// Any match disqualifies
    pub exclude_terms: Vec<String>,
    pub exact_phrases: Vec<String>,
    pub category_filter: Option<String>,
    /// Diagnostic only
    pub has_operators: bool,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.include_terms.is_empty()
            && self.exclude_terms.is_empty()
            && self.exact_phrases.is_empty()
            && self.category_filter.is_none()
    }

    /// Full boolean match: excludes, phrases, every include term, category.
    pub fn matches(&self, article: &Article) -> bool {
        let corpus = corpus(article);
        self.passes_operators(article, &corpus)
            && self.include_terms.iter().all(|t| corpus.contains(t.as_str()))
    }

    /// Operator-only match: bare terms are ignored. Used before relevance scoring.
    pub fn matches_operators(&self, article: &Article) -> bool {
        let corpus = corpus(article);
        self.passes_operators(article, &corpus)
    }

    fn passes_operators(&self, article: &Article, corpus: &str) -> bool {
        if self.exclude_terms.iter().any(|t| corpus.contains(t.as_str())) {
            return false;
        }
        if self.exact_phrases.iter().any(|p| !corpus.contains(p.as_str())) {
            return false;
        }
        if self.required_terms.iter().any(|t| !corpus.contains(t.as_str())) {
            return false;
        }
        match &self.category_filter {
            Some(category) => category_matches(category, &article.category),
            None => true,
        }
    }

    /// Positive words of the query (include terms and phrase text), for relevance scoring.
    pub fn positive_text(&self) -> String {
        self.include_terms
            .iter()
            .chain(self.exact_phrases.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn category_matches(filter: &str, category: &str) -> bool {
    if canonical_category(filter).is_some() {
        filter == category
    } else {
        filter.eq_ignore_ascii_case(category)
    }
}

/// Lower-cased searchable text of an article.
pub fn corpus(article: &Article) -> String {
    format!("{} {} {}", article.title, article.summary, article.source).to_lowercase()
}

pub fn parse_query(raw: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        // Optional sign directly in front of a quote
        let (sign, quote_at) = match chars[i] {
            c @ ('+' | '-') if chars.get(i + 1) == Some(&'"') => (Some(c), i + 1),
            _ => (None, i),
        };

        if chars[quote_at] == '"' {
            match chars[quote_at + 1..].iter().position(|&c| c == '"') {
                Some(len) => {
                    let phrase: String = chars[quote_at + 1..quote_at + 1 + len].iter().collect();
                    let phrase = phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
                    i = quote_at + len + 2;
                    if phrase.is_empty() {
                        debug!(query = raw, "ignoring empty phrase");
                        continue;
                    }
                    parsed.has_operators = true;
                    if sign == Some('-') {
                        parsed.exclude_terms.push(phrase);
                    } else {
                        parsed.exact_phrases.push(phrase);
                    }
                }
                None => {
                    debug!(query = raw, "unmatched quote, treating the rest as bare words");
                    i = quote_at + 1;
                    // A signed quote keeps its sign on the first word
                    if let Some(sign) = sign {
                        let start = i;
                        while i < chars.len() && !chars[i].is_whitespace() {
                            i += 1;
                        }
                        let word: String = chars[start..i].iter().collect();
                        if !word.is_empty() {
                            push_word(&mut parsed, &format!("{}{}", sign, word));
                        }
                    }
                }
            }
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        let token: String = chars[start..i].iter().collect();
        push_word(&mut parsed, &token);
    }

    parsed
}

fn push_word(parsed: &mut ParsedQuery, token: &str) {
    let lowered = token.to_lowercase();

    if let Some(tag) = lowered.strip_prefix("category:") {
        if tag.is_empty() {
            debug!(token, "empty category tag, treating literally");
            parsed.include_terms.push(lowered);
        } else {
            parsed.has_operators = true;
            parsed.category_filter = Some(resolve_category(tag));
        }
        return;
    }

    match lowered.chars().next() {
        Some('+') if lowered.len() > 1 => {
            let term = lowered[1..].to_string();
            parsed.has_operators = true;
            parsed.required_terms.push(term.clone());
            parsed.include_terms.push(term);
        }
        Some('-') if lowered.len() > 1 => {
            parsed.has_operators = true;
            parsed.exclude_terms.push(lowered[1..].to_string());
        }
        _ => {
            if lowered == "+" || lowered == "-" {
                debug!(token, "dangling operator, treating literally");
            }
            parsed.include_terms.push(lowered);
        }
    }
}
